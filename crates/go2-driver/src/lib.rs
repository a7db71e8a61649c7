//! 驱动层模块
//!
//! 本模块提供 Go2 遥操作核心的运行时基础设施，包括：
//! - 共享运行时状态（单锁访问器，守卫不外泄）
//! - 控制参数与预设（写入时钳位）
//! - 单线程事件循环协调器（连接句柄只在循环线程上）
//! - 连接生命周期：连接、初始化、有序断开、清理
//! - 遥测订阅与 ping 轮询
//!
//! # 使用场景
//!
//! 大多数用户应该使用 `go2-control` 提供的 `ControlSession`，
//! 本模块只在需要直接投递事件循环任务时使用。

mod coordinator;
mod error;
pub mod lifecycle;
pub mod mode;
pub mod settings;
pub mod state;
pub mod telemetry;

pub use coordinator::{Coordinator, CoordinatorConfig, LocalFuture, LoopContext};
pub use error::DriverError;
pub use mode::{AtomicConnectionPhase, ConnectionPhase, ControlSurface};
pub use settings::{ControlSettings, Preset, SettingsUpdate};
pub use state::*;
