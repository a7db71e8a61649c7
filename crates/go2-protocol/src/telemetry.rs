//! 遥测消息解析
//!
//! 订阅回调收到的消息结构为 `{"topic": ..., "data": {...}}`，这里只解析 `data`。

use crate::ProtocolError;
use serde_json::Value;

/// 步态类型（LF_SPORT_MOD_STATE 的 `gait_type` 字段）
#[derive(Debug, Clone, Copy, PartialEq, Eq, num_enum::FromPrimitive)]
#[repr(u8)]
pub enum GaitType {
    Idle = 0,
    Trot = 1,
    ClimbStairs = 2,
    TrotObstacle = 3,
    #[num_enum(catch_all)]
    Other(u8),
}

impl GaitType {
    /// 从任意整数构造，超出 u8 范围的值归为 `Other(u8::MAX)`
    pub fn from_raw(raw: i64) -> Self {
        u8::try_from(raw)
            .map(GaitType::from)
            .unwrap_or(GaitType::Other(u8::MAX))
    }

    /// 前端展示用名称
    pub fn name(self) -> String {
        match self {
            GaitType::Idle => "idle".to_string(),
            GaitType::Trot => "trot".to_string(),
            GaitType::ClimbStairs => "climb_stairs".to_string(),
            GaitType::TrotObstacle => "trot_obstacle".to_string(),
            GaitType::Other(n) => format!("gait_{}", n),
        }
    }
}

/// LOW_STATE 采样
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LowStateSample {
    /// 电池电量百分比（`bms_state.soc`）
    pub battery_soc: Option<f64>,
    /// 所有温度传感器中的最大值（°C）
    pub max_temperature: Option<f64>,
    /// 参与统计的温度读数个数
    pub temperature_readings: usize,
}

/// 递归收集数值（标量或数组），其他类型忽略
fn collect_numbers(value: Option<&Value>, out: &mut Vec<f64>) {
    match value {
        Some(Value::Number(n)) => {
            if let Some(v) = n.as_f64() {
                out.push(v);
            }
        },
        Some(Value::Array(items)) => {
            for item in items {
                collect_numbers(Some(item), out);
            }
        },
        _ => {},
    }
}

impl LowStateSample {
    /// 解析 LOW_STATE 消息
    ///
    /// 温度来源：12 个电机的 `temperature`、`bms_state.bq_ntc`、`bms_state.mcu_ntc`
    /// 以及 `temperature_ntc1`。BMS 的 NTC 字段可能是标量也可能是数组。
    pub fn parse(message: &Value) -> Result<Self, ProtocolError> {
        let data = message
            .get("data")
            .ok_or(ProtocolError::MissingField("data"))?;

        let bms = data.get("bms_state");
        let battery_soc = bms.and_then(|b| b.get("soc")).and_then(Value::as_f64);

        let mut temps = Vec::with_capacity(16);
        if let Some(motors) = data.get("motor_state").and_then(Value::as_array) {
            for motor in motors.iter().filter(|m| m.is_object()) {
                collect_numbers(motor.get("temperature"), &mut temps);
            }
        }
        collect_numbers(bms.and_then(|b| b.get("bq_ntc")), &mut temps);
        collect_numbers(bms.and_then(|b| b.get("mcu_ntc")), &mut temps);
        collect_numbers(data.get("temperature_ntc1"), &mut temps);

        let max_temperature = temps.iter().copied().reduce(f64::max);

        Ok(Self {
            battery_soc,
            max_temperature,
            temperature_readings: temps.len(),
        })
    }
}

/// LF_SPORT_MOD_STATE 采样
#[derive(Debug, Clone, PartialEq)]
pub struct SportStateSample {
    pub mode: Option<i64>,
    pub gait: GaitType,
    pub body_height: f64,
    pub progress: f64,
}

impl SportStateSample {
    pub fn parse(message: &Value) -> Result<Self, ProtocolError> {
        let data = message
            .get("data")
            .ok_or(ProtocolError::MissingField("data"))?;
        Ok(Self {
            mode: data.get("mode").and_then(Value::as_i64),
            gait: GaitType::from_raw(data.get("gait_type").and_then(Value::as_i64).unwrap_or(0)),
            body_height: data.get("body_height").and_then(Value::as_f64).unwrap_or(0.0),
            progress: data.get("progress").and_then(Value::as_f64).unwrap_or(0.0),
        })
    }
}
