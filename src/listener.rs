//! 连接监听器契约。
//! The connection listener contract.

use crate::event::{Cause, ConnectionEvent, InboundEnvelope, RemoteUri, ResourceId};

/// A listener for events related to a logical connection.
///
/// All methods are invoked from the dispatch bus's delivery worker for this
/// listener and must not block. Long-running work should be handed off with
/// [`tokio::spawn`] or [`tokio::task::spawn_blocking`]. A panic inside a callback
/// is caught by the bus, logged, and does not affect other listeners.
///
/// 与逻辑连接相关事件的监听器。
///
/// 所有方法都在分发总线为该监听器设置的投递任务上调用，不得阻塞。
/// 耗时工作应通过 [`tokio::spawn`] 或 [`tokio::task::spawn_blocking`] 移交出去。
/// 回调中的 panic 会被总线捕获并记录，不会影响其他监听器。
pub trait ConnectionListener: Send + Sync + 'static {
    /// Called once when the logical connection gets its first physical link.
    ///
    /// Never called again for a fault tolerant connection: later outages are
    /// reported through interrupted / restored.
    ///
    /// 当逻辑连接获得第一条物理链路时调用一次。
    /// 对于容错连接不会再次调用，之后的中断通过 interrupted / restored 报告。
    fn on_connection_established(&self, _remote_uri: &RemoteUri) {}

    /// Called when an unrecoverable error occurs and the connection must be closed.
    /// 当发生不可恢复的错误且连接必须关闭时调用。
    fn on_connection_failure(&self, _error: &Cause) {}

    /// Called when the physical link to the remote peer is lost.
    /// 当到远端对等方的物理链路丢失时调用。
    fn on_connection_interrupted(&self, _remote_uri: &RemoteUri) {}

    /// Called when normal communication has been restored to a remote peer.
    /// 当与远端对等方的正常通信恢复时调用。
    fn on_connection_restored(&self, _remote_uri: &RemoteUri) {}

    /// Called when a new message arrives for one of the active consumers.
    /// 当某个活动消费者收到新消息时调用。
    fn on_inbound_message(&self, _envelope: &InboundEnvelope) {}

    fn on_session_remotely_closed(&self, _session_id: ResourceId, _cause: &Cause) {}

    fn on_consumer_remotely_closed(&self, _consumer_id: ResourceId, _cause: &Cause) {}

    fn on_producer_remotely_closed(&self, _producer_id: ResourceId, _cause: &Cause) {}

    /// Single entry point used by the dispatch bus. The default routes the event
    /// to the matching typed callback; override it to handle the tagged union
    /// directly.
    ///
    /// 分发总线使用的单一入口。默认实现将事件路由到对应的类型化回调；
    /// 覆盖它即可直接处理标签联合。
    fn on_event(&self, event: &ConnectionEvent) {
        match event {
            ConnectionEvent::Established { remote_uri } => {
                self.on_connection_established(remote_uri)
            }
            ConnectionEvent::Failure { error } => self.on_connection_failure(error),
            ConnectionEvent::Interrupted { remote_uri } => {
                self.on_connection_interrupted(remote_uri)
            }
            ConnectionEvent::Restored { remote_uri } => self.on_connection_restored(remote_uri),
            ConnectionEvent::InboundMessage { envelope } => self.on_inbound_message(envelope),
            ConnectionEvent::SessionRemotelyClosed { session_id, cause } => {
                self.on_session_remotely_closed(*session_id, cause)
            }
            ConnectionEvent::ConsumerRemotelyClosed { consumer_id, cause } => {
                self.on_consumer_remotely_closed(*consumer_id, cause)
            }
            ConnectionEvent::ProducerRemotelyClosed { producer_id, cause } => {
                self.on_producer_remotely_closed(*producer_id, cause)
            }
        }
    }
}

/// Closure type accepted by [`FnListener`].
/// [`FnListener`] 接受的闭包类型。
pub type EventListener = Box<dyn Fn(&ConnectionEvent) + Send + Sync>;

/// Adapts a closure over the tagged event into a [`ConnectionListener`].
///
/// 将处理标签事件的闭包适配为 [`ConnectionListener`]。
pub struct FnListener {
    callback: EventListener,
}

impl FnListener {
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(&ConnectionEvent) + Send + Sync + 'static,
    {
        Self {
            callback: Box::new(callback),
        }
    }
}

impl std::fmt::Debug for FnListener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnListener").finish_non_exhaustive()
    }
}

impl ConnectionListener for FnListener {
    fn on_event(&self, event: &ConnectionEvent) {
        (self.callback)(event)
    }
}
