//! 前端动作定义
//!
//! 前端以 snake_case 字符串提交动作，这里解析为封闭枚举，
//! 分发端用穷尽匹配处理，新增动作必须在编译期补齐所有分支。

use crate::ProtocolError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 机器人动作
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RobotAction {
    EmergencyStop,
    ClearEmergency,
    FreeWalk,
    LeashMode,
    /// StandUp，等待 1.5s 后 BalanceStand
    StandUp,
    Crouch,
    SitDown,
    /// 循环切换低/中/高三档机身高度
    ToggleHeight,
    LidarSwitch,
    StopMove,
    EnableWalkMode,
    DisableWalkMode,
    SpeedLevelUp,
    SpeedLevelDown,
    ToggleFreeBound,
    ToggleFreeJump,
    ToggleFreeAvoid,
    EnterPoseMode,
    ExitPoseMode,
    /// 旧版前端的 Pose 切换（直接发送 Pose 请求）
    ToggleWalkPose,
}

impl RobotAction {
    /// 全部动作（CLI 列表与测试使用）
    pub const ALL: [RobotAction; 20] = [
        RobotAction::EmergencyStop,
        RobotAction::ClearEmergency,
        RobotAction::FreeWalk,
        RobotAction::LeashMode,
        RobotAction::StandUp,
        RobotAction::Crouch,
        RobotAction::SitDown,
        RobotAction::ToggleHeight,
        RobotAction::LidarSwitch,
        RobotAction::StopMove,
        RobotAction::EnableWalkMode,
        RobotAction::DisableWalkMode,
        RobotAction::SpeedLevelUp,
        RobotAction::SpeedLevelDown,
        RobotAction::ToggleFreeBound,
        RobotAction::ToggleFreeJump,
        RobotAction::ToggleFreeAvoid,
        RobotAction::EnterPoseMode,
        RobotAction::ExitPoseMode,
        RobotAction::ToggleWalkPose,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            RobotAction::EmergencyStop => "emergency_stop",
            RobotAction::ClearEmergency => "clear_emergency",
            RobotAction::FreeWalk => "free_walk",
            RobotAction::LeashMode => "leash_mode",
            RobotAction::StandUp => "stand_up",
            RobotAction::Crouch => "crouch",
            RobotAction::SitDown => "sit_down",
            RobotAction::ToggleHeight => "toggle_height",
            RobotAction::LidarSwitch => "lidar_switch",
            RobotAction::StopMove => "stop_move",
            RobotAction::EnableWalkMode => "enable_walk_mode",
            RobotAction::DisableWalkMode => "disable_walk_mode",
            RobotAction::SpeedLevelUp => "speed_level_up",
            RobotAction::SpeedLevelDown => "speed_level_down",
            RobotAction::ToggleFreeBound => "toggle_free_bound",
            RobotAction::ToggleFreeJump => "toggle_free_jump",
            RobotAction::ToggleFreeAvoid => "toggle_free_avoid",
            RobotAction::EnterPoseMode => "enter_pose_mode",
            RobotAction::ExitPoseMode => "exit_pose_mode",
            RobotAction::ToggleWalkPose => "toggle_walk_pose",
        }
    }
}

impl FromStr for RobotAction {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RobotAction::ALL
            .iter()
            .copied()
            .find(|action| action.as_str() == s)
            .ok_or_else(|| ProtocolError::UnknownAction(s.to_string()))
    }
}

impl fmt::Display for RobotAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_every_action_name() {
        for action in RobotAction::ALL {
            assert_eq!(action.as_str().parse::<RobotAction>().unwrap(), action);
        }
    }

    #[test]
    fn test_unknown_action() {
        let err = "moonwalk".parse::<RobotAction>().unwrap_err();
        assert!(matches!(err, ProtocolError::UnknownAction(name) if name == "moonwalk"));
    }

    #[test]
    fn test_serde_uses_snake_case() {
        let action: RobotAction = serde_json::from_str("\"toggle_free_avoid\"").unwrap();
        assert_eq!(action, RobotAction::ToggleFreeAvoid);
        assert_eq!(
            serde_json::to_string(&RobotAction::SitDown).unwrap(),
            "\"sit_down\""
        );
    }
}
