//! The public handle to a logical connection.
//!
//! 逻辑连接的公共句柄。

use super::{
    actor::LifecycleActor,
    command::{ConnectionStatus, LifecycleCommand},
    manager::LifecycleManager,
    reconnect::EndpointRotation,
    state::ConnectionState,
};
use crate::{
    config::Config,
    dispatch::{DispatchBus, ListenerHandle},
    error::{Error, Result},
    event::RemoteUri,
    listener::ConnectionListener,
    transport::Transport,
};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::info;

/// A fault tolerant logical connection over a pluggable [`Transport`].
///
/// The connection is driven by a lifecycle actor spawned on the dispatch bus's
/// runtime. Cloning the handle is cheap; the actor closes the physical link and
/// stops once every clone is dropped.
///
/// 基于可插拔 [`Transport`] 的容错逻辑连接。
///
/// 连接由派生在分发总线运行时上的生命周期 actor 驱动。克隆句柄开销很低；
/// 当所有克隆都被丢弃后，actor 会关闭物理链路并停止。
///
/// # Examples
///
/// ```no_run
/// # use std::sync::Arc;
/// # use kestrel_failover::{Config, Connection, DispatchBus, FnListener, Transport};
/// # async fn demo(transport: Arc<dyn Transport>) -> kestrel_failover::Result<()> {
/// let bus = DispatchBus::new();
/// let connection = Connection::new(
///     vec!["amqp://host1".into(), "amqp://host2".into()],
///     transport,
///     bus,
///     Config::default(),
/// )?;
/// connection.register_listener(Arc::new(FnListener::new(|event| {
///     println!("{}", event.kind_name());
/// })));
/// connection.connect().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Connection {
    command_tx: mpsc::Sender<LifecycleCommand>,
    bus: DispatchBus,
}

impl Connection {
    /// Creates a connection in the `Disconnected` state. Nothing is attempted
    /// until [`Connection::connect`] is called.
    ///
    /// Fails with [`Error::NoEndpoints`] when `endpoints` is empty.
    ///
    /// 创建一个处于 `Disconnected` 状态的连接。在调用 [`Connection::connect`]
    /// 之前不会进行任何尝试。
    pub fn new(
        endpoints: Vec<RemoteUri>,
        transport: Arc<dyn Transport>,
        bus: DispatchBus,
        config: Config,
    ) -> Result<Self> {
        let rotation = EndpointRotation::new(endpoints, config.reconnect.randomize)?;
        info!(
            endpoints = rotation.endpoints().len(),
            first = %rotation.current(),
            "Creating connection"
        );

        let capacity = config.lifecycle.command_queue_capacity.max(1);
        let (command_tx, command_rx) = mpsc::channel(capacity);
        let manager = LifecycleManager::new(rotation, config.reconnect.clone(), bus.clone());
        let actor = LifecycleActor::new(manager, transport, config.reconnect, command_rx, capacity);
        bus.runtime().spawn(actor.run());

        Ok(Self { command_tx, bus })
    }

    /// Starts the lifecycle. Returns once the first attempt is scheduled; the
    /// outcome is reported to listeners.
    ///
    /// Calling it again while the connection is active is a no-op. Fails with
    /// [`Error::ConnectionClosed`] after `close` or a failure.
    ///
    /// 启动生命周期。在第一次尝试被调度后返回；结果通过监听器报告。
    pub async fn connect(&self) -> Result<()> {
        let (response_tx, response_rx) = oneshot::channel();
        self.send(LifecycleCommand::Connect { response_tx }).await?;
        response_rx.await.map_err(|_| Error::ConnectionClosed)?
    }

    /// Closes the connection locally. No notification is published and anything
    /// the transport reports afterwards is dropped. Idempotent.
    ///
    /// 在本地关闭连接。不发布任何通知，之后传输层报告的任何内容都会被丢弃。幂等。
    pub async fn close(&self) -> Result<()> {
        let (response_tx, response_rx) = oneshot::channel();
        if self
            .send(LifecycleCommand::Close { response_tx })
            .await
            .is_err()
        {
            return Ok(());
        }
        let _ = response_rx.await;
        Ok(())
    }

    pub async fn status(&self) -> Result<ConnectionStatus> {
        let (response_tx, response_rx) = oneshot::channel();
        self.send(LifecycleCommand::Status { response_tx }).await?;
        response_rx.await.map_err(|_| Error::ConnectionClosed)
    }

    pub async fn state(&self) -> Result<ConnectionState> {
        Ok(self.status().await?.state)
    }

    /// Endpoint of the current physical link, or of the lost one while
    /// interrupted.
    ///
    /// 当前物理链路的端点；中断期间为已丢失链路的端点。
    pub async fn remote_uri(&self) -> Result<Option<RemoteUri>> {
        Ok(self.status().await?.remote_uri)
    }

    /// Returns an error when the connection can no longer be used: it was
    /// closed locally or has failed.
    ///
    /// 当连接已不可用（在本地关闭或已失败）时返回错误。
    pub async fn ensure_usable(&self) -> Result<()> {
        let status = self.status().await?;
        if status.closed {
            Err(Error::ConnectionClosed)
        } else {
            Ok(())
        }
    }

    /// Resolves once every transport report queued before this call has been
    /// processed and every notification it produced has been delivered.
    ///
    /// 在此调用之前排队的每个传输报告都已处理、且其产生的每个通知都已投递之后完成。
    pub async fn flush(&self) -> Result<()> {
        let (response_tx, response_rx) = oneshot::channel();
        self.send(LifecycleCommand::Flush { response_tx }).await?;
        response_rx.await.map_err(|_| Error::ConnectionClosed)?;
        self.bus.flush().await
    }

    pub fn register_listener(&self, listener: Arc<dyn ConnectionListener>) -> ListenerHandle {
        self.bus.register(listener)
    }

    pub fn unregister_listener(&self, handle: ListenerHandle) -> bool {
        self.bus.unregister(handle)
    }

    /// The bus this connection publishes to.
    /// 此连接发布事件的总线。
    pub fn bus(&self) -> &DispatchBus {
        &self.bus
    }

    async fn send(&self, command: LifecycleCommand) -> Result<()> {
        self.command_tx
            .send(command)
            .await
            .map_err(|_| Error::ConnectionClosed)
    }
}
