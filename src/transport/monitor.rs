//! The reporting handle a transport uses for one connect attempt.
//!
//! 传输层在一次连接尝试中使用的报告句柄。

use super::{StampedEvent, TransportEvent};
use crate::{
    error::{Error, Result},
    event::{Cause, ConsumerId, RemoteUri, ResourceId, ResourceKind},
};
use bytes::Bytes;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::trace;

/// Reports raw connectivity transitions, envelopes and remote closures of one
/// physical link to the lifecycle manager.
///
/// Every report is stamped with the generation of the attempt that created the
/// monitor. Once the manager moves on to a newer attempt, reports from this
/// monitor are discarded, so a late event can never move the connection state
/// backwards.
///
/// 向生命周期管理器报告一条物理链路的原始连接变化、消息信封与远端关闭。
///
/// 每个报告都带有创建该监视器的尝试编号。一旦管理器开始更新的尝试，
/// 来自此监视器的报告会被丢弃，因此迟到的事件永远不会让连接状态倒退。
#[derive(Debug, Clone)]
pub struct TransportMonitor {
    generation: u64,
    event_tx: mpsc::Sender<StampedEvent>,
}

impl TransportMonitor {
    pub(crate) fn new(generation: u64, event_tx: mpsc::Sender<StampedEvent>) -> Self {
        Self {
            generation,
            event_tx,
        }
    }

    /// The attempt generation this monitor reports for.
    /// 此监视器所报告的尝试编号。
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether the lifecycle manager behind this monitor is gone.
    /// 此监视器背后的生命周期管理器是否已不存在。
    pub fn is_detached(&self) -> bool {
        self.event_tx.is_closed()
    }

    pub async fn link_up(&self, remote_uri: impl Into<RemoteUri>) -> Result<()> {
        self.report(TransportEvent::LinkUp {
            remote_uri: remote_uri.into(),
        })
        .await
    }

    pub async fn link_down(&self, recoverable: bool, cause: Cause) -> Result<()> {
        self.report(TransportEvent::LinkDown { recoverable, cause })
            .await
    }

    pub async fn fatal(&self, cause: Cause) -> Result<()> {
        self.report(TransportEvent::Fatal { cause }).await
    }

    pub async fn envelope(
        &self,
        consumer_id: ConsumerId,
        destination: Option<Arc<str>>,
        payload: Bytes,
    ) -> Result<()> {
        self.report(TransportEvent::Envelope {
            consumer_id,
            destination,
            payload,
        })
        .await
    }

    pub async fn remote_close(
        &self,
        kind: ResourceKind,
        resource_id: ResourceId,
        cause: Cause,
    ) -> Result<()> {
        self.report(TransportEvent::RemoteClose {
            kind,
            resource_id,
            cause,
        })
        .await
    }

    /// Sends a raw event to the manager.
    ///
    /// 向管理器发送原始事件。
    pub async fn report(&self, event: TransportEvent) -> Result<()> {
        trace!(
            generation = self.generation,
            kind = event.kind_name(),
            "Transport event reported"
        );
        self.event_tx
            .send(StampedEvent {
                generation: self.generation,
                event,
            })
            .await
            .map_err(|_| Error::ChannelClosed)
    }
}
