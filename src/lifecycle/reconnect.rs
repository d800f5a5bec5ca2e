//! Reconnect policy bookkeeping: attempt counting, back-off delays and endpoint
//! rotation.
//!
//! 重连策略记录：尝试计数、退避延迟与端点轮换。

use crate::{
    config::ReconnectConfig,
    error::{Error, Result},
    event::RemoteUri,
};
use rand::seq::SliceRandom;
use std::time::Duration;

/// Exponential back-off state for one outage.
///
/// 单次中断期间的指数退避状态。
#[derive(Debug, Clone, Default)]
pub struct ReconnectBackoff {
    attempts: u32,
    delay: Duration,
}

impl ReconnectBackoff {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Failed attempts since the last successful link.
    /// 自上次成功建立链路以来的失败尝试次数。
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Counts a failed attempt and returns the new total.
    /// 记录一次失败尝试并返回新的总数。
    pub fn record_failure(&mut self) -> u32 {
        self.attempts = self.attempts.saturating_add(1);
        self.attempts
    }

    pub fn is_exhausted(&self, limit: Option<u32>) -> bool {
        limit.is_some_and(|limit| self.attempts >= limit)
    }

    /// Returns the delay to wait before the next attempt, growing it for the
    /// one after when back-off is enabled.
    ///
    /// The first attempt of an outage waits `initial_reconnect_delay`; later
    /// ones start at `reconnect_delay` and never exceed `max_reconnect_delay`.
    ///
    /// 返回下一次尝试前需要等待的延迟；启用退避时为之后的尝试增大延迟。
    /// 每次中断的第一次尝试等待 `initial_reconnect_delay`；之后从 `reconnect_delay`
    /// 开始，且不超过 `max_reconnect_delay`。
    pub fn next_delay(&mut self, config: &ReconnectConfig) -> Duration {
        if self.attempts == 0 {
            return config.initial_reconnect_delay;
        }

        let next = if self.delay.is_zero() || !config.use_reconnect_back_off {
            config.reconnect_delay
        } else {
            Duration::try_from_secs_f64(
                self.delay.as_secs_f64() * config.reconnect_back_off_multiplier,
            )
            .unwrap_or(config.max_reconnect_delay)
        };
        self.delay = next.min(config.max_reconnect_delay);
        self.delay
    }
}

/// Cycles through the configured endpoints.
///
/// 在配置的端点之间循环。
#[derive(Debug, Clone)]
pub struct EndpointRotation {
    endpoints: Vec<RemoteUri>,
    cursor: usize,
}

impl EndpointRotation {
    /// Creates a rotation, shuffling the endpoints once when `randomize` is set.
    ///
    /// 创建轮换；设置 `randomize` 时对端点进行一次随机打乱。
    pub fn new(mut endpoints: Vec<RemoteUri>, randomize: bool) -> Result<Self> {
        if endpoints.is_empty() {
            return Err(Error::NoEndpoints);
        }
        if randomize {
            endpoints.shuffle(&mut rand::rng());
        }
        Ok(Self {
            endpoints,
            cursor: 0,
        })
    }

    pub fn current(&self) -> &RemoteUri {
        &self.endpoints[self.cursor]
    }

    /// Moves to the next endpoint, wrapping around.
    /// 移动到下一个端点，到末尾后回绕。
    pub fn advance(&mut self) -> &RemoteUri {
        self.cursor = (self.cursor + 1) % self.endpoints.len();
        self.current()
    }

    /// Positions the rotation on `remote_uri` if it is one of the endpoints, so
    /// that the next `advance` moves past it.
    ///
    /// 如果 `remote_uri` 是端点之一，则将轮换定位到它，使下一次 `advance` 越过它。
    pub fn mark_connected(&mut self, remote_uri: &RemoteUri) {
        if let Some(index) = self.endpoints.iter().position(|uri| uri == remote_uri) {
            self.cursor = index;
        }
    }

    pub fn endpoints(&self) -> &[RemoteUri] {
        &self.endpoints
    }
}
