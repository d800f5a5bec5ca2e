//! 连接状态转换逻辑模块
//! Connection State Transition Logic Module
//!
//! 该模块负责执行经过验证的状态转换并记录转换日志。
//!
//! This module executes validated state transitions and logs them.

use super::{state::ConnectionState, validation::StateValidator};
use crate::error::{Error, Result};
use tracing::{debug, warn};

/// 状态转换执行器，负责执行状态转换
/// State transition executor responsible for executing state transitions
#[derive(Debug, Default)]
pub struct StateTransitionExecutor {
    /// 已执行的转换次数（不含幂等转换）
    /// Number of transitions executed (idempotent ones excluded)
    transitions: u64,
}

impl StateTransitionExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// 执行状态转换
    /// Execute state transition
    pub fn execute_transition(
        &mut self,
        generation: u64,
        current_state: ConnectionState,
        new_state: ConnectionState,
    ) -> Result<ConnectionState> {
        if !StateValidator::is_valid_transition(current_state, new_state) {
            warn!(
                generation,
                current_state = %current_state,
                attempted_state = %new_state,
                "Invalid state transition attempted"
            );
            return Err(Error::InvalidTransition {
                from: current_state.name(),
                to: new_state.name(),
            });
        }

        if current_state != new_state {
            self.transitions += 1;
            debug!(
                generation,
                from = current_state.name(),
                to = new_state.name(),
                "State transition executed"
            );
        }

        Ok(new_state)
    }

    pub fn transitions(&self) -> u64 {
        self.transitions
    }
}
