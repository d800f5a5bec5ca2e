//! Defines the connection state machine for a logical connection.
//!
//! 定义逻辑连接的连接状态机。

use std::fmt;

/// The state of a logical connection.
/// 逻辑连接的状态。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// No physical link and no attempt in progress. Initial state, and the state
    /// after an explicit local close.
    /// 没有物理链路也没有进行中的尝试。初始状态，也是本地显式关闭后的状态。
    Disconnected,

    /// A connect attempt is scheduled or in flight.
    /// 连接尝试已调度或正在进行。
    Connecting,

    /// A physical link is up.
    /// 物理链路已建立。
    Connected,

    /// The link was lost and a reconnect is pending.
    /// 链路已丢失，等待重连。
    Interrupted,

    /// The connection failed permanently. Terminal.
    /// 连接永久失败。终止状态。
    ClosedFailed,
}

impl ConnectionState {
    /// Gets the string representation of the state (for logging).
    /// 获取状态的字符串表示（用于日志）。
    pub fn name(&self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "Disconnected",
            ConnectionState::Connecting => "Connecting",
            ConnectionState::Connected => "Connected",
            ConnectionState::Interrupted => "Interrupted",
            ConnectionState::ClosedFailed => "ClosedFailed",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
