//! 请求负载构建
//!
//! 所有请求都序列化为 JSON，交给传输层发送。

use crate::api::{motion_switcher, sport};
use crate::round_to;
use serde::Serialize;
use serde_json::{Value, json};

/// 服务请求 `{"api_id": ..., "parameter": {...}}`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiRequest {
    pub api_id: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameter: Option<Value>,
}

impl ApiRequest {
    /// 不带参数的请求
    pub const fn new(api_id: u16) -> Self {
        Self {
            api_id,
            parameter: None,
        }
    }

    pub fn with_parameter(api_id: u16, parameter: Value) -> Self {
        Self {
            api_id,
            parameter: Some(parameter),
        }
    }

    /// `Move` 零速度（关闭行走模式时使用）
    pub fn move_zero() -> Self {
        Self::with_parameter(sport::MOVE, json!({ "x": 0.0, "y": 0.0, "z": 0.0 }))
    }

    /// 机身高度（米，相对默认高度）
    pub fn body_height(height: f64) -> Self {
        Self::with_parameter(sport::BODY_HEIGHT, json!({ "height": height }))
    }

    /// 速度档位（-1 慢 / 0 正常 / 1 快）
    pub fn speed_level(level: i8) -> Self {
        Self::with_parameter(sport::SPEED_LEVEL, json!({ "level": level }))
    }

    /// 开关类请求（FreeBound / FreeJump / FreeAvoid）
    pub fn switch(api_id: u16, enabled: bool) -> Self {
        Self::with_parameter(api_id, json!({ "data": enabled }))
    }

    /// 欧拉角姿态（相机云台 yaw）
    pub fn euler_yaw(yaw: f64) -> Self {
        Self::with_parameter(
            sport::EULER,
            json!({ "roll": 0.0, "pitch": 0.0, "yaw": yaw }),
        )
    }

    /// 切换到指定运动模式
    pub fn select_mode(name: &str) -> Self {
        Self::with_parameter(motion_switcher::SELECT_MODE, json!({ "name": name }))
    }

    /// 转换为 JSON 值
    pub fn to_value(&self) -> Value {
        // 字段均为基础类型，序列化不会失败
        serde_json::to_value(self).unwrap_or_else(|_| json!({ "api_id": self.api_id }))
    }
}

/// 摇杆仿真负载（`Topic::WirelessController`）
///
/// `ry` 只在 Pose 模式下生效；AI 模式下固件会把非零 `ry` 解释为 Euler 请求，
/// 导致退出 AI 模式，因此非 Pose 模式一律发送 0。
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WirelessControllerPayload {
    pub lx: f64,
    pub ly: f64,
    pub rx: f64,
    pub ry: f64,
    pub keys: u16,
}

impl WirelessControllerPayload {
    /// 构建负载
    ///
    /// # 参数
    ///
    /// - `lx`/`ly`/`rx`/`ry`: 已归一化到 [-1, 1] 的摇杆值
    /// - `pose_mode`: 是否处于 Pose 模式（决定 `ry` 是否下发）
    pub fn new(lx: f64, ly: f64, rx: f64, ry: f64, pose_mode: bool) -> Self {
        Self {
            lx: round_to(lx, 4),
            ly: round_to(ly, 4),
            rx: round_to(rx, 4),
            ry: if pose_mode { round_to(ry, 4) } else { 0.0 },
            keys: 0,
        }
    }

    /// 全零负载（停止）
    pub const fn zero() -> Self {
        Self {
            lx: 0.0,
            ly: 0.0,
            rx: 0.0,
            ry: 0.0,
            keys: 0,
        }
    }

    pub fn to_value(&self) -> Value {
        json!({
            "lx": self.lx,
            "ly": self.ly,
            "rx": self.rx,
            "ry": self.ry,
            "keys": self.keys,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_without_parameter_omits_field() {
        let value = ApiRequest::new(sport::DAMP).to_value();
        assert_eq!(value, json!({ "api_id": 1001 }));
    }

    #[test]
    fn test_switch_request() {
        let value = ApiRequest::switch(sport::FREE_JUMP, true).to_value();
        assert_eq!(value["api_id"], 1047);
        assert_eq!(value["parameter"]["data"], true);
    }

    #[test]
    fn test_euler_yaw_zeroes_roll_and_pitch() {
        let value = ApiRequest::euler_yaw(0.3).to_value();
        assert_eq!(value["parameter"]["roll"], 0.0);
        assert_eq!(value["parameter"]["pitch"], 0.0);
        assert_eq!(value["parameter"]["yaw"], 0.3);
    }

    #[test]
    fn test_wireless_payload_drops_ry_outside_pose_mode() {
        let payload = WirelessControllerPayload::new(0.1, 0.2, 0.3, 0.4, false);
        assert_eq!(payload.ry, 0.0);

        let payload = WirelessControllerPayload::new(0.1, 0.2, 0.3, 0.4, true);
        assert_eq!(payload.ry, 0.4);
    }

    #[test]
    fn test_wireless_payload_rounds_to_four_digits() {
        let payload = WirelessControllerPayload::new(0.123456, -0.987654, 0.0, 0.0, false);
        assert_eq!(payload.lx, 0.1235);
        assert_eq!(payload.ly, -0.9877);
        assert_eq!(payload.to_value()["keys"], 0);
    }
}
