//! 连接生命周期管理模块
//! Connection Lifecycle Management Module
//!
//! 该模块提供逻辑连接生命周期的统一管理，包括状态验证、转换逻辑、重连策略、
//! 同步管理器以及驱动它的 actor。
//!
//! This module provides unified lifecycle management for a logical connection,
//! including state validation, transition logic, the reconnect policy, the
//! synchronous manager and the actor that drives it.

mod actor;
mod command;
mod handle;
mod manager;
mod reconnect;
mod state;
mod transitions;
mod validation;

pub use command::ConnectionStatus;
pub use handle::Connection;
pub use reconnect::{EndpointRotation, ReconnectBackoff};
pub use state::ConnectionState;
pub use transitions::StateTransitionExecutor;
pub use validation::StateValidator;
