//! Commands and directives exchanged with the lifecycle actor.
//!
//! 与生命周期 actor 交换的命令与指令。

use super::state::ConnectionState;
use crate::{error::Result, event::RemoteUri};
use std::time::Duration;
use tokio::sync::oneshot;

/// Snapshot of the manager's view of the connection.
///
/// 管理器对连接状态的快照。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionStatus {
    pub state: ConnectionState,
    /// Endpoint of the current link while connected, or of the lost link while
    /// interrupted.
    /// 已连接时为当前链路的端点，中断时为已丢失链路的端点。
    pub remote_uri: Option<RemoteUri>,
    /// Set once `close` was called or the connection failed.
    /// 调用 `close` 或连接失败后置位。
    pub closed: bool,
    pub generation: u64,
}

/// Commands sent from the public `Connection` handle to the actor.
///
/// 从公共 `Connection` 句柄发送到 actor 的命令。
#[derive(Debug)]
pub(crate) enum LifecycleCommand {
    Connect {
        response_tx: oneshot::Sender<Result<()>>,
    },
    Close {
        response_tx: oneshot::Sender<()>,
    },
    Status {
        response_tx: oneshot::Sender<ConnectionStatus>,
    },
    /// Process the transport reports already queued, then reply.
    /// 处理已排队的传输报告后回复。
    Flush {
        response_tx: oneshot::Sender<()>,
    },
}

/// Completions produced by the actor's own timer and attempt tasks.
///
/// 由 actor 自身的定时器与尝试任务产生的完成通知。
#[derive(Debug)]
pub(crate) enum AttemptSignal {
    /// The delay before attempt `generation` elapsed.
    /// 尝试 `generation` 之前的延迟已到。
    Due { generation: u64 },
    /// Attempt `generation` finished connecting to `remote_uri`.
    /// 尝试 `generation` 已完成对 `remote_uri` 的连接。
    Finished {
        generation: u64,
        remote_uri: RemoteUri,
        result: Result<()>,
    },
}

/// Side effects the lifecycle manager asks the actor to perform.
///
/// 生命周期管理器要求 actor 执行的副作用。
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Directive {
    /// Wait `delay`, then signal that attempt `generation` is due. Replaces
    /// (and cancels) any attempt in flight.
    /// 等待 `delay` 后发出尝试 `generation` 到期的信号。替换（并取消）任何进行中的尝试。
    ScheduleAttempt { generation: u64, delay: Duration },
    /// Run the transport connect for attempt `generation`.
    /// 为尝试 `generation` 执行传输连接。
    Connect {
        generation: u64,
        remote_uri: RemoteUri,
    },
    /// Cancel the attempt in flight and suppress anything it would produce.
    /// 取消进行中的尝试并抑制其可能产生的一切。
    CancelAttempt,
    /// Tear down the current physical link.
    /// 拆除当前物理链路。
    CloseTransport,
}
