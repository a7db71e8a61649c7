//! 前端动作分发
//!
//! 对 [`RobotAction`] 做穷尽匹配。除急停、解除急停、EnableWalkMode 外，
//! 所有动作都要求已连接；本地状态（档位、开关）在投递前更新，
//! 机器人侧的请求由事件循环异步执行。

use crate::error::ControlError;
use crate::mode::ModeOutcome;
use crate::session::ControlSession;
use go2_driver::{DriverError, LoopContext, RobotSwitch};
use go2_protocol::api::sport;
use go2_protocol::{ApiRequest, RobotAction, Topic};
use go2_transport::Transport;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{error, info};

/// 动作执行结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionOutcome {
    /// 请求已投递到事件循环，不等待机器人应答
    Scheduled,
    /// 只涉及本地状态，已完成
    Done,
    /// Pose 模式切换（同步等待完成）
    Mode(ModeOutcome),
}

trait RobotActionExt {
    /// 是否要求已连接
    fn requires_connection(self) -> bool;
}

impl RobotActionExt for RobotAction {
    fn requires_connection(self) -> bool {
        !matches!(
            self,
            RobotAction::EmergencyStop | RobotAction::ClearEmergency | RobotAction::EnableWalkMode
        )
    }
}

fn speed_name(level: i8) -> &'static str {
    match level {
        l if l < 0 => "slow",
        0 => "normal",
        _ => "fast",
    }
}

const HEIGHT_NAMES: [&str; 3] = ["low", "middle", "high"];

impl<T: Transport> ControlSession<T> {
    /// 执行前端动作
    pub fn robot_action(&self, action: RobotAction) -> Result<ActionOutcome, ControlError> {
        if action.requires_connection() && !self.state().is_connected() {
            return Err(ControlError::NotConnected);
        }
        info!("Robot action: {}", action);

        match action {
            RobotAction::EmergencyStop => {
                self.modes().emergency_stop()?;
                Ok(ActionOutcome::Done)
            },
            RobotAction::ClearEmergency => {
                self.modes().clear_emergency();
                Ok(ActionOutcome::Done)
            },
            RobotAction::FreeWalk => self.sport_request("free_walk", ApiRequest::new(sport::FREE_WALK)),
            RobotAction::LeashMode => {
                self.sport_request("leash_mode", ApiRequest::new(sport::LEAD_FOLLOW))
            },
            RobotAction::StandUp => {
                let settle = self.timings().stand_up_settle;
                self.coordinator().schedule("stand_up", move |ctx| stand_up(ctx, settle))?;
                Ok(ActionOutcome::Scheduled)
            },
            RobotAction::Crouch => self.sport_request("crouch", ApiRequest::new(sport::STAND_DOWN)),
            RobotAction::SitDown => self.sport_request("sit_down", ApiRequest::new(sport::SIT)),
            RobotAction::ToggleHeight => {
                let (level, height) = self.state().cycle_body_height();
                info!(
                    "Body height -> {} ({:+.2} m)",
                    HEIGHT_NAMES[level as usize], height
                );
                self.sport_request("body_height", ApiRequest::body_height(height))
            },
            RobotAction::LidarSwitch => {
                let on = self.state().toggle(RobotSwitch::Lidar);
                info!("Toggling lidar to: {}", if on { "on" } else { "off" });
                self.coordinator().schedule("lidar_switch", move |ctx| lidar_switch(ctx, on))?;
                Ok(ActionOutcome::Scheduled)
            },
            RobotAction::StopMove => self.sport_request("stop_move", ApiRequest::new(sport::STOP_MOVE)),
            RobotAction::EnableWalkMode => {
                // AI 模式下 BalanceStand 已允许行走
                info!("Walk mode enabled");
                Ok(ActionOutcome::Done)
            },
            RobotAction::DisableWalkMode => {
                info!("Walk mode disabled, stopping movement");
                self.sport_request("disable_walk_mode", ApiRequest::move_zero())
            },
            RobotAction::SpeedLevelUp | RobotAction::SpeedLevelDown => {
                let delta = if action == RobotAction::SpeedLevelUp { 1 } else { -1 };
                let level = self.state().step_speed_level(delta);
                info!("Speed level set to: {} ({})", level, speed_name(level));
                self.sport_request("speed_level", ApiRequest::speed_level(level))
            },
            RobotAction::ToggleFreeBound => {
                self.toggle_sport_switch(RobotSwitch::FreeBound, sport::FREE_BOUND)
            },
            RobotAction::ToggleFreeJump => {
                self.toggle_sport_switch(RobotSwitch::FreeJump, sport::FREE_JUMP)
            },
            RobotAction::ToggleFreeAvoid => {
                self.toggle_sport_switch(RobotSwitch::FreeAvoid, sport::FREE_AVOID)
            },
            RobotAction::EnterPoseMode => Ok(ActionOutcome::Mode(self.enter_pose_mode()?)),
            RobotAction::ExitPoseMode => Ok(ActionOutcome::Mode(self.exit_pose_mode()?)),
            RobotAction::ToggleWalkPose => {
                self.sport_request("toggle_walk_pose", ApiRequest::new(sport::POSE))
            },
        }
    }

    /// 按前端的 snake_case 名称执行动作
    pub fn robot_action_named(&self, name: &str) -> Result<ActionOutcome, ControlError> {
        let action: RobotAction = name.parse()?;
        self.robot_action(action)
    }

    fn sport_request(
        &self,
        label: &'static str,
        request: ApiRequest,
    ) -> Result<ActionOutcome, ControlError> {
        self.coordinator()
            .request(label, Topic::SportMod, request.to_value())?;
        Ok(ActionOutcome::Scheduled)
    }

    fn toggle_sport_switch(
        &self,
        switch: RobotSwitch,
        api_id: u16,
    ) -> Result<ActionOutcome, ControlError> {
        let enabled = self.state().toggle(switch);
        info!(
            "{:?} mode: {}",
            switch,
            if enabled { "enabled" } else { "disabled" }
        );
        self.sport_request("sport_switch", ApiRequest::switch(api_id, enabled))
    }
}

async fn stand_up<T: Transport>(ctx: LoopContext<T>, settle: Duration) -> Result<(), DriverError> {
    ctx.request(Topic::SportMod, ApiRequest::new(sport::STAND_UP).to_value())
        .await?;
    if !settle.is_zero() {
        tokio::time::sleep(settle).await;
    }
    ctx.request(
        Topic::SportMod,
        ApiRequest::new(sport::BALANCE_STAND).to_value(),
    )
    .await?;
    Ok(())
}

/// 激光雷达开关：打开前先关闭省流模式，失败时回滚本地状态
async fn lidar_switch<T: Transport>(ctx: LoopContext<T>, on: bool) -> Result<(), DriverError> {
    let result = async {
        if on {
            ctx.transport()?.disable_traffic_saving(true).await?;
        }
        let value = Value::String(if on { "on" } else { "off" }.to_string());
        ctx.publish(Topic::UlidarSwitch, value)
    }
    .await;

    if let Err(e) = &result {
        error!("Error toggling lidar: {}", e);
        ctx.state().set_switch(RobotSwitch::Lidar, !on);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_gating() {
        let local_only = [
            RobotAction::EmergencyStop,
            RobotAction::ClearEmergency,
            RobotAction::EnableWalkMode,
        ];
        for action in RobotAction::ALL {
            assert_eq!(action.requires_connection(), !local_only.contains(&action));
        }
    }

    #[test]
    fn test_speed_names() {
        assert_eq!(speed_name(-1), "slow");
        assert_eq!(speed_name(0), "normal");
        assert_eq!(speed_name(1), "fast");
    }
}
