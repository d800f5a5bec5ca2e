//! 连接状态验证逻辑模块
//! Connection State Validation Logic Module
//!
//! This module decides which state transitions are legal and answers the
//! permission checks the lifecycle manager makes before acting on an event.
//!
//! 该模块决定哪些状态转换是合法的，并回答生命周期管理器在处理事件前所做的权限检查。

use super::state::ConnectionState;

/// 状态验证器，负责所有状态相关的验证和检查逻辑
/// State validator responsible for all state-related validation and check logic
pub struct StateValidator;

impl StateValidator {
    /// 验证状态转换是否合法
    /// Validate if state transition is legal
    pub fn is_valid_transition(current_state: ConnectionState, new_state: ConnectionState) -> bool {
        use ConnectionState::*;

        match (current_state, new_state) {
            // 失败是终止状态
            // Failure is terminal
            (ClosedFailed, ClosedFailed) => true,
            (ClosedFailed, _) => false,

            // 本地关闭可从任何非终止状态进行
            // Local close is allowed from any non-terminal state
            (_, Disconnected) => true,

            (Disconnected, Connecting) => true,
            (Connecting, Connected) => true,
            (Connected, Interrupted) => true,
            (Interrupted, Connecting) => true,

            (Connecting | Connected | Interrupted, ClosedFailed) => true,

            // 同状态转换（幂等）
            // Same state transition (idempotent)
            (state1, state2) if state1 == state2 => true,

            _ => false,
        }
    }

    /// 检查状态是否为终止状态
    /// Check if the state is terminal
    pub fn is_terminal(state: ConnectionState) -> bool {
        matches!(state, ConnectionState::ClosedFailed)
    }

    /// 检查是否可以路由入站流量（消息与远端关闭）
    /// Check if inbound traffic (messages and remote closures) can be routed
    pub fn can_route_traffic(state: ConnectionState) -> bool {
        matches!(state, ConnectionState::Connected)
    }

    /// 检查连接尝试是否可以开始
    /// Check if a connect attempt may start
    pub fn can_begin_attempt(state: ConnectionState) -> bool {
        matches!(
            state,
            ConnectionState::Connecting | ConnectionState::Interrupted
        )
    }

    /// 检查连接是否处于活跃状态
    /// Check if connection is in active state
    pub fn is_active(state: ConnectionState) -> bool {
        matches!(
            state,
            ConnectionState::Connecting | ConnectionState::Connected | ConnectionState::Interrupted
        )
    }
}
