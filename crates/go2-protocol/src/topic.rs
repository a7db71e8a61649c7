//! 数据通道 Topic 定义

use std::fmt;

/// 数据通道 Topic
///
/// 只列出遥操作核心用到的 Topic。字符串取值与机器人固件一致。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    /// 摇杆仿真（高频运动指令，fire-and-forget）
    WirelessController,
    /// Sport 服务请求（站立、趴下、Pose 等）
    SportMod,
    /// 运动模式切换服务（查询/切换 ai 模式，也用于测量 ping）
    MotionSwitcher,
    /// 底层状态（电池、温度）
    LowState,
    /// 高层运动状态（步态、机身高度）
    LfSportModState,
    /// 避障服务
    ObstaclesAvoid,
    /// 激光雷达开关
    UlidarSwitch,
}

impl Topic {
    /// Topic 的线上名称
    pub const fn as_str(self) -> &'static str {
        match self {
            Topic::WirelessController => "rt/wirelesscontroller",
            Topic::SportMod => "rt/api/sport/request",
            Topic::MotionSwitcher => "rt/api/motion_switcher/request",
            Topic::LowState => "rt/lf/lowstate",
            Topic::LfSportModState => "rt/lf/sportmodestate",
            Topic::ObstaclesAvoid => "rt/api/obstacles_avoid/request",
            Topic::UlidarSwitch => "rt/utlidar/switch",
        }
    }

    /// 连接建立后订阅、断开前退订的遥测 Topic
    pub const TELEMETRY: [Topic; 2] = [Topic::LowState, Topic::LfSportModState];
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
