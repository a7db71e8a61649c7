//! # Go2 Control
//!
//! 遥操作控制层：把手柄/键鼠输入变成机器人运动指令。
//!
//! ## 组成
//!
//! - `pipeline`: 运动指令管线（死区 → 灵敏度 → 限幅 → 加速度限制 → 零速度去重）
//! - `mode`: 控制模式状态机（控制面启用、Pose 模式、急停）
//! - `action`: 前端动作分发
//! - `session`: 对外入口 `ControlSession`
//!
//! ## 示例
//!
//! ```rust,ignore
//! use go2_control::{Command, ControlSession, ControlSurface};
//! use go2_transport::{ConnectionMethod, MockTransport};
//!
//! let session = ControlSession::<MockTransport>::new()?;
//! session.connect(&ConnectionMethod::LocalAp, MockTransport::new())?;
//! session.enable(ControlSurface::Gamepad, true)?;
//! let out = session.process_movement(&Command::gamepad(0.0, 0.5, 0.0, 0.0))?;
//! println!("vx = {:.2} m/s", out.vx);
//! ```

pub mod action;
pub mod command;
mod error;
pub mod mode;
pub mod pipeline;
pub mod session;

pub use action::ActionOutcome;
pub use command::{Command, OutboundVelocity};
pub use error::ControlError;
pub use mode::{ModeMachine, ModeOutcome, ModeState, ModeStatus, SequenceTimings};
pub use pipeline::{MovementPipeline, SlewState};
pub use session::ControlSession;

// 常用的下层类型
pub use go2_driver::{
    ControlFlags, ControlSettings, ControlSurface, CoordinatorConfig, Preset, SettingsUpdate,
    TelemetrySnapshot,
};
pub use go2_protocol::RobotAction;
