//! # Go2 Protocol
//!
//! 机器狗数据通道协议定义（无 I/O 依赖）
//!
//! ## 模块
//!
//! - `topic`: 数据通道 Topic 定义
//! - `api`: Sport / MotionSwitcher / ObstaclesAvoid 的 API ID 常量
//! - `request`: 请求负载构建（`ApiRequest`、`WirelessControllerPayload`）
//! - `response`: 请求应答解析
//! - `telemetry`: LOW_STATE / LF_SPORT_MOD_STATE 遥测解析
//! - `action`: 前端动作的封闭枚举 `RobotAction`
//!
//! ## 编码
//!
//! 所有负载均为 JSON（`serde_json::Value`），线上编码由传输层负责。

pub mod action;
pub mod api;
mod error;
pub mod request;
pub mod response;
pub mod telemetry;
pub mod topic;

// 重新导出常用类型
pub use action::RobotAction;
pub use error::ProtocolError;
pub use request::{ApiRequest, WirelessControllerPayload};
pub use response::{parse_motion_mode, parse_obstacle_avoid_state};
pub use telemetry::{GaitType, LowStateSample, SportStateSample};
pub use topic::Topic;

/// 保留 `digits` 位小数
///
/// 与前端约定一致：发往摇杆仿真接口的数值统一保留 4 位小数。
#[inline]
pub fn round_to(value: f64, digits: i32) -> f64 {
    let scale = 10f64.powi(digits);
    (value * scale).round() / scale
}
