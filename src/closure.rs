//! 远端关闭跟踪器。
//! Remote closure tracker.
//!
//! Converts peer-initiated close signals into typed closure events. The
//! tracker does not close any local resource; owners of sessions, consumers
//! and producers listen for these events and close themselves.
//!
//! 将对端发起的关闭信号转换为类型化的关闭事件。跟踪器本身不关闭任何本地资源；
//! 会话、消费者与生产者的所有者监听这些事件并自行关闭。

use crate::{
    dispatch::DispatchBus,
    event::{Cause, RemoteClosure, ResourceId, ResourceKind},
};
use std::collections::HashSet;
use tracing::{debug, info, warn};

#[derive(Debug)]
pub struct RemoteClosureTracker {
    bus: DispatchBus,
    /// Every resource the peer closed during the logical connection. Resource
    /// ids are not reissued across physical links, so this is bounded by the
    /// resources the peer closes and is kept through reconnects.
    /// 逻辑连接期间对端关闭过的所有资源。资源标识不会在物理链路之间重用，
    /// 因此其大小受对端关闭的资源数量限制，并在重连后保留。
    reported: HashSet<(ResourceKind, ResourceId)>,
}

impl RemoteClosureTracker {
    pub fn new(bus: DispatchBus) -> Self {
        Self {
            bus,
            reported: HashSet::new(),
        }
    }

    /// Publishes the closure event for a resource the peer closed. A resource
    /// is reported at most once; repeated signals return `None`.
    ///
    /// 为对端关闭的资源发布关闭事件。每个资源至多报告一次；重复信号返回 `None`。
    pub fn record(
        &mut self,
        kind: ResourceKind,
        resource_id: ResourceId,
        cause: Cause,
    ) -> Option<RemoteClosure> {
        if !self.reported.insert((kind, resource_id)) {
            debug!(%kind, resource_id, "Ignoring repeated remote close");
            return None;
        }

        info!(%kind, resource_id, %cause, "Resource closed by peer");
        let closure = RemoteClosure {
            kind,
            resource_id,
            cause,
        };
        if let Err(e) = self.bus.publish(closure.clone().into_event()) {
            warn!(%kind, resource_id, error = %e, "Remote closure lost: dispatch bus unavailable");
        }
        Some(closure)
    }

    pub fn is_closed(&self, kind: ResourceKind, resource_id: ResourceId) -> bool {
        self.reported.contains(&(kind, resource_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{event::ConnectionEvent, test_utils::RecordingListener};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_consumer_closure_published_once() {
        let bus = DispatchBus::new();
        let listener = Arc::new(RecordingListener::default());
        bus.register(listener.clone());
        let mut tracker = RemoteClosureTracker::new(bus.clone());
        let cause = Cause::new("X");

        assert!(tracker.record(ResourceKind::Consumer, 5, cause.clone()).is_some());
        assert!(tracker.record(ResourceKind::Consumer, 5, cause.clone()).is_none());
        assert!(tracker.is_closed(ResourceKind::Consumer, 5));
        bus.flush().await.unwrap();

        assert_eq!(
            listener.events(),
            vec![ConnectionEvent::ConsumerRemotelyClosed {
                consumer_id: 5,
                cause,
            }]
        );
    }

    #[tokio::test]
    async fn test_same_id_different_kinds_are_distinct() {
        let bus = DispatchBus::new();
        let listener = Arc::new(RecordingListener::default());
        bus.register(listener.clone());
        let mut tracker = RemoteClosureTracker::new(bus.clone());

        tracker.record(ResourceKind::Session, 1, Cause::new("session gone"));
        tracker.record(ResourceKind::Producer, 1, Cause::new("producer gone"));
        bus.flush().await.unwrap();

        let kinds: Vec<_> = listener.events().iter().map(|e| e.kind_name()).collect();
        assert_eq!(kinds, vec!["SessionRemotelyClosed", "ProducerRemotelyClosed"]);
        assert!(!tracker.is_closed(ResourceKind::Consumer, 1));
    }
}
