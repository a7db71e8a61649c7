//! 控制模式状态机
//!
//! 状态由共享运行时状态中的标志派生：
//!
//! ```text
//! Idle ──enable──> GamepadArmed / KeyboardArmed / BothArmed ──emergency_stop──> EmergencyStopped
//!   ^                                                                              │
//!   └────────────────────── enable（清除急停）/ clear_emergency ───────────────────┘
//! ```
//!
//! Pose 模式是与上述状态正交的标志。进入 Pose 模式必须先发零速度并等待稳定，
//! 退出只能通过 RecoveryStand，这是固件唯一提供的退出路径。

use crate::error::ControlError;
use crate::pipeline::MovementPipeline;
use go2_driver::{ControlFlags, ControlSurface, Coordinator, DriverError, RuntimeState};
use go2_protocol::api::sport;
use go2_protocol::{ApiRequest, Topic, WirelessControllerPayload};
use go2_transport::Transport;
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// 控制模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ModeState {
    Idle,
    GamepadArmed,
    KeyboardArmed,
    BothArmed,
    EmergencyStopped,
}

impl ModeState {
    pub fn from_flags(flags: &ControlFlags) -> Self {
        if flags.emergency_stop_active {
            return ModeState::EmergencyStopped;
        }
        match (flags.gamepad_enabled, flags.keyboard_mouse_enabled) {
            (false, false) => ModeState::Idle,
            (true, false) => ModeState::GamepadArmed,
            (false, true) => ModeState::KeyboardArmed,
            (true, true) => ModeState::BothArmed,
        }
    }
}

/// 模式与 Pose 标志
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ModeStatus {
    pub state: ModeState,
    pub pose_mode_active: bool,
}

/// 模式切换结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ModeOutcome {
    Applied,
    /// 已处于目标状态，没有发送任何指令
    NoOp,
}

/// 动作序列中的等待时间
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SequenceTimings {
    /// 进入 Pose 前，零速度指令之后的等待
    pub pose_enter_settle: Duration,
    /// RecoveryStand 之后的等待
    pub pose_exit_settle: Duration,
    /// StandUp 与 BalanceStand 之间的等待
    pub stand_up_settle: Duration,
}

impl Default for SequenceTimings {
    fn default() -> Self {
        Self {
            pose_enter_settle: Duration::from_millis(200),
            pose_exit_settle: Duration::from_secs(1),
            stand_up_settle: Duration::from_millis(1500),
        }
    }
}

/// 模式状态机
///
/// 只借用会话的组件，由 [`ControlSession::modes`](crate::ControlSession::modes) 构造。
pub struct ModeMachine<'a, T: Transport> {
    pub(crate) state: &'a Arc<RuntimeState>,
    pub(crate) coordinator: &'a Coordinator<T>,
    pub(crate) pipeline: &'a Mutex<MovementPipeline>,
    pub(crate) timings: SequenceTimings,
}

impl<T: Transport> ModeMachine<'_, T> {
    pub fn status(&self) -> ModeStatus {
        let flags = self.state.control_flags();
        ModeStatus {
            state: ModeState::from_flags(&flags),
            pose_mode_active: flags.pose_mode_active,
        }
    }

    /// 启用/禁用控制面
    ///
    /// 启用时清除急停并异步触发机器人初始化；禁用任一控制面都会把限速器归零。
    pub fn enable(&self, surface: ControlSurface, on: bool) -> Result<ControlFlags, ControlError> {
        if !self.state.is_connected() {
            return Err(ControlError::NotConnected);
        }

        let flags = self.state.set_surface_enabled(surface, on);
        if on {
            info!("{} control enabled", surface.as_str());
            self.coordinator.initialize_robot()?;
        } else {
            self.pipeline.lock().reset();
            info!("{} control disabled", surface.as_str());
        }
        Ok(flags)
    }

    /// 进入 Pose 模式：零速度 → 等待 → Pose
    ///
    /// 已在 Pose 模式或另一次切换尚未结束时返回 `NoOp`，不发送任何指令。
    pub fn enter_pose_mode(&self) -> Result<ModeOutcome, ControlError> {
        if !self.state.is_connected() {
            return Err(ControlError::NotConnected);
        }
        let Some(mut transition) = self.state.try_begin_pose_transition(true) else {
            warn!("Already in pose mode, ignoring enter request");
            return Ok(ModeOutcome::NoOp);
        };

        let settle = self.timings.pose_enter_settle;
        let timeout = self.coordinator.config().command_timeout + settle;
        self.coordinator
            .schedule_and_wait("enter_pose_mode", timeout, move |ctx| async move {
                ctx.publish(
                    Topic::WirelessController,
                    WirelessControllerPayload::zero().to_value(),
                )?;
                tokio_sleep(settle).await;
                ctx.request(Topic::SportMod, ApiRequest::new(sport::POSE).to_value())
                    .await?;
                transition.commit();
                Ok::<(), DriverError>(())
            })?;

        info!("Entered pose mode");
        Ok(ModeOutcome::Applied)
    }

    /// 退出 Pose 模式：RecoveryStand → 等待
    pub fn exit_pose_mode(&self) -> Result<ModeOutcome, ControlError> {
        if !self.state.is_connected() {
            return Err(ControlError::NotConnected);
        }
        let Some(mut transition) = self.state.try_begin_pose_transition(false) else {
            warn!("Not in pose mode, ignoring exit request");
            return Ok(ModeOutcome::NoOp);
        };

        let settle = self.timings.pose_exit_settle;
        let timeout = self.coordinator.config().command_timeout + settle;
        self.coordinator
            .schedule_and_wait("exit_pose_mode", timeout, move |ctx| async move {
                ctx.request(
                    Topic::SportMod,
                    ApiRequest::new(sport::RECOVERY_STAND).to_value(),
                )
                .await?;
                tokio_sleep(settle).await;
                transition.commit();
                Ok::<(), DriverError>(())
            })?;

        info!("Exited pose mode (RecoveryStand)");
        Ok(ModeOutcome::Applied)
    }

    /// 急停：置位急停标志、限速器归零、所有电机进入阻尼
    ///
    /// 标志在本地立即生效；未连接时不发送 Damp。
    pub fn emergency_stop(&self) -> Result<(), ControlError> {
        self.state.set_emergency_stop(true);
        self.pipeline.lock().reset();
        warn!("EMERGENCY STOP ACTIVATED");

        if self.state.is_connected() {
            self.coordinator.request(
                "emergency_stop",
                Topic::SportMod,
                ApiRequest::new(sport::DAMP).to_value(),
            )?;
        }
        Ok(())
    }

    pub fn clear_emergency(&self) {
        self.state.set_emergency_stop(false);
        info!("Emergency stop cleared");
    }
}

async fn tokio_sleep(duration: Duration) {
    if !duration.is_zero() {
        tokio::time::sleep(duration).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_state_from_flags() {
        let mut flags = ControlFlags::default();
        assert_eq!(ModeState::from_flags(&flags), ModeState::Idle);
        flags.gamepad_enabled = true;
        assert_eq!(ModeState::from_flags(&flags), ModeState::GamepadArmed);
        flags.keyboard_mouse_enabled = true;
        assert_eq!(ModeState::from_flags(&flags), ModeState::BothArmed);
        flags.gamepad_enabled = false;
        assert_eq!(ModeState::from_flags(&flags), ModeState::KeyboardArmed);
        flags.emergency_stop_active = true;
        assert_eq!(ModeState::from_flags(&flags), ModeState::EmergencyStopped);
    }

    #[test]
    fn test_default_timings() {
        let timings = SequenceTimings::default();
        assert_eq!(timings.pose_enter_settle, Duration::from_millis(200));
        assert_eq!(timings.pose_exit_settle, Duration::from_secs(1));
        assert_eq!(timings.stand_up_settle, Duration::from_millis(1500));
    }
}
