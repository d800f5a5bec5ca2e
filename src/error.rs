//! 定义了库中所有可能的错误类型。
//! Defines all possible error types in the library.

use crate::event::Cause;
use thiserror::Error;

/// The primary error type for the connection lifecycle library.
/// 连接生命周期库的主要错误类型。
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum Error {
    /// The logical connection was closed locally or has already failed.
    /// 逻辑连接已在本地关闭或已经失败。
    #[error("Connection closed")]
    ConnectionClosed,

    /// A single connect attempt did not complete within `connect_timeout`.
    /// 单次连接尝试未在 `connect_timeout` 内完成。
    #[error("Connect attempt timed out")]
    ConnectTimeout,

    /// The reconnect policy gave up after the configured number of attempts.
    /// 重连策略在配置的尝试次数后放弃。
    #[error("Reconnect attempts exhausted after {attempts} attempts (last error: {last_error})")]
    ReconnectExhausted { attempts: u32, last_error: Cause },

    /// The transport reported an error for a connect attempt.
    /// 传输层报告了连接尝试的错误。
    #[error("Transport error: {0}")]
    Transport(Cause),

    /// A connection was created without any endpoint to connect to.
    /// 创建连接时没有提供任何可连接的端点。
    #[error("No endpoints configured")]
    NoEndpoints,

    /// An internal channel for communication between tasks was closed unexpectedly.
    /// 用于任务间通信的内部通道意外关闭。
    #[error("Internal channel is broken")]
    ChannelClosed,

    /// The state machine rejected a transition.
    /// 状态机拒绝了一次状态转换。
    #[error("Invalid state transition from {from} to {to}")]
    InvalidTransition {
        from: &'static str,
        to: &'static str,
    },
}

impl Error {
    /// Converts the error into the cause delivered to listeners on failure.
    ///
    /// 将错误转换为在失败时交付给监听器的原因。
    pub fn into_cause(self) -> Cause {
        match self {
            Error::Transport(cause) => cause,
            other => Cause::new(other.to_string()),
        }
    }
}

/// A specialized `Result` type for this library.
/// 本库专用的 `Result` 类型。
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_into_cause_keeps_transport_cause() {
        let cause = Cause::with_condition("broker gone", "amqp:connection:forced");
        assert_eq!(Error::Transport(cause.clone()).into_cause(), cause);
    }

    #[test]
    fn test_into_cause_describes_other_errors() {
        let cause = Error::ReconnectExhausted {
            attempts: 3,
            last_error: Error::ConnectTimeout.into_cause(),
        }
        .into_cause();
        assert_eq!(
            cause.message(),
            "Reconnect attempts exhausted after 3 attempts (last error: Connect attempt timed out)"
        );
        assert!(cause.condition().is_none());
    }
}
