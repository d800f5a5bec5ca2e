//! 连接事件与其载荷类型。
//! Connection events and their payload types.
//!
//! Every value in this module is immutable once constructed and cheap to clone,
//! so the dispatch bus can hand the same event to any number of listeners.
//!
//! 本模块中的每个值在构造后都不可变且克隆开销低，
//! 因此分发总线可以将同一事件交给任意数量的监听器。

use bytes::Bytes;
use std::{fmt, sync::Arc};

/// Opaque locator of the remote peer a physical link is bound to.
///
/// 物理链路所绑定的远端对等方的不透明定位符。
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RemoteUri(Arc<str>);

impl RemoteUri {
    pub fn new(uri: impl AsRef<str>) -> Self {
        Self(Arc::from(uri.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RemoteUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RemoteUri {
    fn from(uri: &str) -> Self {
        Self::new(uri)
    }
}

impl From<String> for RemoteUri {
    fn from(uri: String) -> Self {
        Self(Arc::from(uri))
    }
}

/// A cloneable description of an error reported by the transport or raised
/// by the lifecycle manager.
///
/// 由传输层报告或由生命周期管理器产生的错误的可克隆描述。
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Cause {
    message: Arc<str>,
    /// Protocol condition name, e.g. `amqp:connection:forced`.
    /// 协议条件名称，例如 `amqp:connection:forced`。
    condition: Option<Arc<str>>,
}

impl Cause {
    pub fn new(message: impl AsRef<str>) -> Self {
        Self {
            message: Arc::from(message.as_ref()),
            condition: None,
        }
    }

    pub fn with_condition(message: impl AsRef<str>, condition: impl AsRef<str>) -> Self {
        Self {
            message: Arc::from(message.as_ref()),
            condition: Some(Arc::from(condition.as_ref())),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn condition(&self) -> Option<&str> {
        self.condition.as_deref()
    }
}

impl fmt::Display for Cause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.condition {
            Some(condition) => write!(f, "{} [{}]", self.message, condition),
            None => f.write_str(&self.message),
        }
    }
}

impl std::error::Error for Cause {}

/// Identifier of a consumer the transport delivers messages to.
/// 传输层向其投递消息的消费者标识。
pub type ConsumerId = u64;

/// Identifier of a session, consumer or producer on the remote peer.
/// 远端对等方上会话、消费者或生产者的标识。
pub type ResourceId = u64;

/// A decoded message envelope, routed to listeners as an inbound message.
///
/// 已解码的消息信封，作为入站消息路由给监听器。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundEnvelope {
    /// The consumer this message was dispatched to.
    /// 此消息被分派到的消费者。
    pub consumer_id: ConsumerId,
    /// The destination the message arrived on, if the transport knows it.
    /// 消息到达的目的地（如果传输层知道）。
    pub destination: Option<Arc<str>>,
    /// Per-consumer position, strictly increasing from 1.
    /// 按消费者计算的位置，从1开始严格递增。
    pub delivery_sequence: u64,
    /// The opaque message body.
    /// 不透明的消息体。
    pub payload: Bytes,
}

/// The kind of resource the peer closed.
///
/// 对端关闭的资源类型。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Session,
    Consumer,
    Producer,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResourceKind::Session => "session",
            ResourceKind::Consumer => "consumer",
            ResourceKind::Producer => "producer",
        };
        f.write_str(name)
    }
}

/// A peer-initiated closure of a session, consumer or producer.
///
/// 由对端发起的会话、消费者或生产者关闭。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteClosure {
    pub kind: ResourceKind,
    pub resource_id: ResourceId,
    pub cause: Cause,
}

impl RemoteClosure {
    /// Converts the closure into the typed event listeners receive.
    ///
    /// 将关闭转换为监听器接收的类型化事件。
    pub fn into_event(self) -> ConnectionEvent {
        let RemoteClosure {
            kind,
            resource_id,
            cause,
        } = self;
        match kind {
            ResourceKind::Session => ConnectionEvent::SessionRemotelyClosed {
                session_id: resource_id,
                cause,
            },
            ResourceKind::Consumer => ConnectionEvent::ConsumerRemotelyClosed {
                consumer_id: resource_id,
                cause,
            },
            ResourceKind::Producer => ConnectionEvent::ProducerRemotelyClosed {
                producer_id: resource_id,
                cause,
            },
        }
    }
}

/// A notification delivered to every registered listener.
///
/// 交付给每个已注册监听器的通知。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// The logical connection reached its first physical link.
    /// 逻辑连接建立了第一条物理链路。
    Established { remote_uri: RemoteUri },
    /// The logical connection failed and is unusable from now on.
    /// 逻辑连接失败，此后不可再用。
    Failure { error: Cause },
    /// The physical link to `remote_uri` was lost; recovery is in progress.
    /// 到 `remote_uri` 的物理链路丢失，正在恢复。
    Interrupted { remote_uri: RemoteUri },
    /// A new physical link to `remote_uri` replaced the lost one.
    /// 到 `remote_uri` 的新物理链路替代了丢失的链路。
    Restored { remote_uri: RemoteUri },
    InboundMessage { envelope: InboundEnvelope },
    SessionRemotelyClosed { session_id: ResourceId, cause: Cause },
    ConsumerRemotelyClosed { consumer_id: ResourceId, cause: Cause },
    ProducerRemotelyClosed { producer_id: ResourceId, cause: Cause },
}

impl ConnectionEvent {
    /// Short name of the event kind, used in logs.
    ///
    /// 事件类型的简短名称，用于日志。
    pub fn kind_name(&self) -> &'static str {
        match self {
            ConnectionEvent::Established { .. } => "Established",
            ConnectionEvent::Failure { .. } => "Failure",
            ConnectionEvent::Interrupted { .. } => "Interrupted",
            ConnectionEvent::Restored { .. } => "Restored",
            ConnectionEvent::InboundMessage { .. } => "InboundMessage",
            ConnectionEvent::SessionRemotelyClosed { .. } => "SessionRemotelyClosed",
            ConnectionEvent::ConsumerRemotelyClosed { .. } => "ConsumerRemotelyClosed",
            ConnectionEvent::ProducerRemotelyClosed { .. } => "ProducerRemotelyClosed",
        }
    }

    /// Whether the event describes a connectivity change rather than traffic
    /// on an established link.
    ///
    /// 事件是否描述连接性变化，而不是已建立链路上的流量。
    pub fn is_connectivity(&self) -> bool {
        matches!(
            self,
            ConnectionEvent::Established { .. }
                | ConnectionEvent::Failure { .. }
                | ConnectionEvent::Interrupted { .. }
                | ConnectionEvent::Restored { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cause_display_includes_condition() {
        let cause = Cause::with_condition("forced close", "amqp:connection:forced");
        assert_eq!(cause.to_string(), "forced close [amqp:connection:forced]");
        assert_eq!(Cause::new("plain").to_string(), "plain");
    }

    #[test]
    fn test_remote_closure_maps_to_typed_event() {
        let cause = Cause::new("deleted");
        let closure = RemoteClosure {
            kind: ResourceKind::Consumer,
            resource_id: 5,
            cause: cause.clone(),
        };
        assert_eq!(
            closure.into_event(),
            ConnectionEvent::ConsumerRemotelyClosed {
                consumer_id: 5,
                cause,
            }
        );
    }

    #[test]
    fn test_remote_uri_equality_ignores_construction_path() {
        let a = RemoteUri::from("amqp://host1");
        let b = RemoteUri::from(String::from("amqp://host1"));
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "amqp://host1");
    }

    #[test]
    fn test_connectivity_classification() {
        let established = ConnectionEvent::Established {
            remote_uri: "amqp://host1".into(),
        };
        let closed = ConnectionEvent::SessionRemotelyClosed {
            session_id: 1,
            cause: Cause::new("bye"),
        };
        assert!(established.is_connectivity());
        assert!(!closed.is_connectivity());
        assert_eq!(closed.kind_name(), "SessionRemotelyClosed");
    }
}
