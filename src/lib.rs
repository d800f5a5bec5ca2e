#![deny(clippy::expect_used, clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

//! The root of the fault tolerant connection lifecycle library.
//! 容错连接生命周期库的根。
//!
//! A [`Connection`] drives one logical connection over a pluggable
//! [`Transport`], reconnecting across a list of endpoints, and publishes
//! connectivity changes, inbound messages and remote closures to the listeners
//! registered on its [`DispatchBus`].
//!
//! [`Connection`] 在可插拔的 [`Transport`] 之上驱动一个逻辑连接，在端点列表之间
//! 重连，并将连接性变化、入站消息与远端关闭发布给在其 [`DispatchBus`] 上注册的监听器。

pub mod closure;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod event;
pub mod lifecycle;
pub mod listener;
pub mod router;
pub mod transport;

#[cfg(test)]
mod test_utils;

pub use config::{Config, LifecycleConfig, ReconnectConfig};
pub use dispatch::{DispatchBus, DispatchStats, ListenerHandle};
pub use error::{Error, Result};
pub use event::{
    Cause, ConnectionEvent, ConsumerId, InboundEnvelope, RemoteClosure, RemoteUri, ResourceId,
    ResourceKind,
};
pub use lifecycle::{Connection, ConnectionState, ConnectionStatus};
pub use listener::{ConnectionListener, EventListener, FnListener};
pub use transport::{Transport, TransportEvent, TransportMonitor};
