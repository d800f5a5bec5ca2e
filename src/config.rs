//! 定义了连接生命周期与事件分发的可配置参数。
//! Defines configurable parameters for the connection lifecycle and event dispatch.

use std::time::Duration;

/// A structure containing all configurable parameters for a logical connection.
///
/// 包含逻辑连接所有可配置参数的结构体。
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Reconnect and failover policy.
    /// 重连与故障转移策略。
    pub reconnect: ReconnectConfig,

    /// Lifecycle manager queue sizing.
    /// 生命周期管理器队列大小。
    pub lifecycle: LifecycleConfig,
}

/// Reconnect and failover policy parameters.
///
/// The attempt counters and delays apply per outage: a successful link resets
/// both back to their initial values.
///
/// 重连与故障转移策略参数。
///
/// 尝试计数与延迟按每次中断计算：成功建立链路后两者都会重置为初始值。
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Delay before the first reconnect attempt after an interruption.
    /// 中断后第一次重连尝试之前的延迟。
    pub initial_reconnect_delay: Duration,
    /// Base delay between consecutive attempts.
    /// 连续尝试之间的基础延迟。
    pub reconnect_delay: Duration,
    /// Upper bound for the delay once back-off has grown it.
    /// 退避增长后延迟的上限。
    pub max_reconnect_delay: Duration,
    /// Whether the delay grows by `reconnect_back_off_multiplier` after each failure.
    /// 每次失败后延迟是否按 `reconnect_back_off_multiplier` 增长。
    pub use_reconnect_back_off: bool,
    /// Growth factor applied to the delay when back-off is enabled.
    /// 启用退避时应用于延迟的增长因子。
    pub reconnect_back_off_multiplier: f64,
    /// Maximum attempts to restore an interrupted connection. `None` retries forever.
    /// 恢复中断连接的最大尝试次数。`None` 表示无限重试。
    pub max_reconnect_attempts: Option<u32>,
    /// Maximum attempts for the initial connect. `None` falls back to
    /// `max_reconnect_attempts`.
    /// 初始连接的最大尝试次数。`None` 时使用 `max_reconnect_attempts`。
    pub startup_max_reconnect_attempts: Option<u32>,
    /// Emit a warning every this many failed attempts. Zero disables it.
    /// 每失败这么多次尝试就发出一次警告。为零时禁用。
    pub warn_after_reconnect_attempts: u32,
    /// Shuffle the endpoint list once when the connection is created.
    /// 在创建连接时对端点列表进行一次随机打乱。
    pub randomize: bool,
    /// Time allowed for a single transport connect attempt.
    /// 单次传输连接尝试允许的时间。
    pub connect_timeout: Duration,
}

impl ReconnectConfig {
    /// The attempt limit that applies depending on whether the connection was
    /// ever established.
    ///
    /// 根据连接是否曾经建立过而适用的尝试次数上限。
    pub fn attempt_limit(&self, established_once: bool) -> Option<u32> {
        if established_once {
            self.max_reconnect_attempts
        } else {
            self.startup_max_reconnect_attempts
                .or(self.max_reconnect_attempts)
        }
    }
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_reconnect_delay: Duration::ZERO,
            reconnect_delay: Duration::from_millis(10),
            max_reconnect_delay: Duration::from_secs(30),
            use_reconnect_back_off: true,
            reconnect_back_off_multiplier: 2.0,
            max_reconnect_attempts: None,
            startup_max_reconnect_attempts: None,
            warn_after_reconnect_attempts: 10,
            randomize: false,
            connect_timeout: Duration::from_secs(15),
        }
    }
}

/// Lifecycle manager parameters.
///
/// 生命周期管理器参数。
#[derive(Debug, Clone)]
pub struct LifecycleConfig {
    /// Capacity of the manager's command queue.
    /// 管理器命令队列的容量。
    pub command_queue_capacity: usize,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            command_queue_capacity: 1024,
        }
    }
}
