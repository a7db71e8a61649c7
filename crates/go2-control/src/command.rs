//! 输入样本与输出速度

use go2_driver::ControlSurface;
use go2_protocol::WirelessControllerPayload;
use serde::{Deserialize, Serialize};

/// 一次输入采样（来自手柄或键鼠）
///
/// 字段名与前端 JSON 保持一致，缺失字段取默认值。
/// `max_*` 与 `*_ramp_time` 为单次覆盖值，缺省时使用参数或内置默认值。
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Command {
    /// 横移（+右 / -左）
    pub lx: f64,
    /// 前后（+前 / -后）
    pub ly: f64,
    /// 转向
    pub rx: f64,
    /// 俯仰
    pub ry: f64,
    pub source: ControlSurface,

    pub max_linear: Option<f64>,
    pub max_strafe: Option<f64>,
    pub max_rotation: Option<f64>,
    pub max_pitch: Option<f64>,

    /// 从静止加速到最大速度所需时间（秒）
    pub linear_ramp_time: Option<f64>,
    pub strafe_ramp_time: Option<f64>,
    pub rotation_ramp_time: Option<f64>,
    pub pitch_ramp_time: Option<f64>,

    /// 跳过平滑，直接输出原始目标
    pub rage_mode: bool,
    /// 按 Pose 模式处理（轴值直通）
    pub pose_mode: bool,
}

impl Command {
    /// 手柄输入
    pub fn gamepad(lx: f64, ly: f64, rx: f64, ry: f64) -> Self {
        Self {
            lx,
            ly,
            rx,
            ry,
            ..Default::default()
        }
    }

    /// 键鼠输入
    pub fn keyboard(lx: f64, ly: f64, rx: f64, ry: f64) -> Self {
        Self {
            source: ControlSurface::KeyboardMouse,
            ..Self::gamepad(lx, ly, rx, ry)
        }
    }

    /// 全零输入
    pub fn idle(source: ControlSurface) -> Self {
        Self {
            source,
            ..Default::default()
        }
    }
}

/// 运动管线输出
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct OutboundVelocity {
    /// 前后速度（m/s）
    pub vx: f64,
    /// 横移速度（m/s）
    pub vy: f64,
    /// 转向角速度（rad/s）
    pub vyaw: f64,
    /// 俯仰角（rad）
    pub pitch: f64,

    /// 按硬件极限归一化后的摇杆值，[-1, 1]
    pub lx: f64,
    pub ly: f64,
    pub rx: f64,
    pub ry: f64,

    pub is_zero: bool,
    pub should_send: bool,
    /// Pose 模式直通输出（发送时保留 ry，且不参与零速度去重）
    pub pose: bool,
}

impl OutboundVelocity {
    /// 摇杆仿真负载
    pub fn to_payload(&self) -> WirelessControllerPayload {
        WirelessControllerPayload::new(self.lx, self.ly, self.rx, self.ry, self.pose)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_deserializes_with_defaults() {
        let cmd: Command = serde_json::from_str(
            r#"{"lx": 0.2, "ly": -0.4, "source": "keyboard_mouse", "max_linear": 0.9, "rage_mode": true}"#,
        )
        .unwrap();
        assert_eq!(cmd.lx, 0.2);
        assert_eq!(cmd.ry, 0.0);
        assert_eq!(cmd.source, ControlSurface::KeyboardMouse);
        assert_eq!(cmd.max_linear, Some(0.9));
        assert_eq!(cmd.linear_ramp_time, None);
        assert!(cmd.rage_mode);
        assert!(!cmd.pose_mode);
    }

    #[test]
    fn test_empty_object_is_idle_gamepad() {
        let cmd: Command = serde_json::from_str("{}").unwrap();
        assert_eq!(cmd, Command::idle(ControlSurface::Gamepad));
    }
}
