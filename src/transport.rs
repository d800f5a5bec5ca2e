//! Transport abstraction consumed by the lifecycle manager.
//!
//! The transport owns the wire protocol and physical sessions. The lifecycle
//! manager asks it to open a link to one endpoint at a time and hands it a
//! [`TransportMonitor`] through which it reports everything that happens on
//! that link afterwards.
//!
//! 生命周期管理器所使用的传输层抽象。
//!
//! 传输层负责线路协议与物理会话。生命周期管理器每次请求它打开到一个端点的链路，
//! 并交给它一个 [`TransportMonitor`]，之后该链路上发生的一切都通过它报告。

pub mod monitor;

use crate::{
    error::Result,
    event::{Cause, ConsumerId, RemoteUri, ResourceId, ResourceKind},
};
use async_trait::async_trait;
use bytes::Bytes;
use std::{fmt::Debug, sync::Arc};

pub use monitor::TransportMonitor;

/// A raw event reported by the transport for one physical link.
///
/// 传输层针对某条物理链路报告的原始事件。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// The link to `remote_uri` completed its handshake.
    /// 到 `remote_uri` 的链路完成了握手。
    LinkUp { remote_uri: RemoteUri },
    /// The link was lost. `recoverable` links are retried by the manager.
    /// 链路丢失。`recoverable` 的链路会由管理器重试。
    LinkDown { recoverable: bool, cause: Cause },
    /// The peer or the protocol layer reported an unrecoverable error.
    /// 对端或协议层报告了不可恢复的错误。
    Fatal { cause: Cause },
    /// A decoded message arrived for a consumer.
    /// 某个消费者收到了一条已解码的消息。
    Envelope {
        consumer_id: ConsumerId,
        destination: Option<Arc<str>>,
        payload: Bytes,
    },
    /// The peer closed a session, consumer or producer.
    /// 对端关闭了会话、消费者或生产者。
    RemoteClose {
        kind: ResourceKind,
        resource_id: ResourceId,
        cause: Cause,
    },
}

impl TransportEvent {
    pub fn kind_name(&self) -> &'static str {
        match self {
            TransportEvent::LinkUp { .. } => "LinkUp",
            TransportEvent::LinkDown { .. } => "LinkDown",
            TransportEvent::Fatal { .. } => "Fatal",
            TransportEvent::Envelope { .. } => "Envelope",
            TransportEvent::RemoteClose { .. } => "RemoteClose",
        }
    }
}

/// A transport event tagged with the connect attempt that produced it.
///
/// 带有产生它的连接尝试编号的传输事件。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StampedEvent {
    pub generation: u64,
    pub event: TransportEvent,
}

/// Transport layer interface for the lifecycle manager.
///
/// 生命周期管理器的传输层接口。
#[async_trait]
pub trait Transport: Send + Sync + Debug + 'static {
    /// Opens a physical link to `remote_uri`.
    ///
    /// Returning `Ok(())` means the handshake completed and is treated as a
    /// link-up at `remote_uri`. Later changes on this link must be reported
    /// through `monitor`; events from a monitor whose attempt was superseded are
    /// ignored by the manager.
    ///
    /// 打开到 `remote_uri` 的物理链路。
    ///
    /// 返回 `Ok(())` 表示握手完成，并被视为在 `remote_uri` 上的链路建立。
    /// 此链路之后的变化必须通过 `monitor` 报告；来自已被取代的尝试的监视器事件
    /// 会被管理器忽略。
    async fn connect(&self, remote_uri: &RemoteUri, monitor: TransportMonitor) -> Result<()>;

    /// Tears down the current physical link, if any.
    ///
    /// 拆除当前的物理链路（如果有）。
    async fn close(&self);
}
