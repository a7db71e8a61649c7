//! 手柄控制参数
//!
//! 每个字段有独立的合法区间，写入时逐字段钳位；非有限值（NaN/∞）直接拒绝。
//! 预设是不可变的参数快照。

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;
use tracing::warn;

// ==================== 合法区间 ====================

pub const DEADZONE_RANGE: RangeInclusive<f64> = 0.0..=1.0;
pub const SENSITIVITY_RANGE: RangeInclusive<f64> = 0.1..=2.0;
/// 前后速度上限（m/s）
pub const MAX_LINEAR_RANGE: RangeInclusive<f64> = 0.1..=1.0;
/// 横移速度上限（m/s）
pub const MAX_STRAFE_RANGE: RangeInclusive<f64> = 0.1..=0.8;
/// 转向角速度上限（rad/s）
pub const MAX_ROTATION_RANGE: RangeInclusive<f64> = 0.1..=1.5;
pub const SPEED_MULTIPLIER_RANGE: RangeInclusive<f64> = 0.1..=2.0;

fn clamp_to(value: f64, range: &RangeInclusive<f64>) -> f64 {
    value.clamp(*range.start(), *range.end())
}

/// 控制参数
///
/// 序列化字段名与前端保持一致（`deadzone_left_stick` 等）。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlSettings {
    #[serde(rename = "deadzone_left_stick")]
    pub deadzone_left: f64,
    #[serde(rename = "deadzone_right_stick")]
    pub deadzone_right: f64,
    pub sensitivity_linear: f64,
    pub sensitivity_strafe: f64,
    pub sensitivity_rotation: f64,
    pub max_linear_velocity: f64,
    pub max_strafe_velocity: f64,
    pub max_rotation_velocity: f64,
    pub speed_multiplier: f64,
}

impl Default for ControlSettings {
    fn default() -> Self {
        Self {
            deadzone_left: 0.15,
            deadzone_right: 0.15,
            sensitivity_linear: 1.0,
            sensitivity_strafe: 1.0,
            sensitivity_rotation: 1.0,
            max_linear_velocity: 0.6,
            max_strafe_velocity: 0.4,
            max_rotation_velocity: 0.8,
            speed_multiplier: 1.0,
        }
    }
}

/// 部分更新（只写入 `Some` 的字段）
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettingsUpdate {
    #[serde(rename = "deadzone_left_stick")]
    pub deadzone_left: Option<f64>,
    #[serde(rename = "deadzone_right_stick")]
    pub deadzone_right: Option<f64>,
    pub sensitivity_linear: Option<f64>,
    pub sensitivity_strafe: Option<f64>,
    pub sensitivity_rotation: Option<f64>,
    pub max_linear_velocity: Option<f64>,
    pub max_strafe_velocity: Option<f64>,
    pub max_rotation_velocity: Option<f64>,
    pub speed_multiplier: Option<f64>,
}

/// 写入单个字段：非有限值拒绝，其余钳位
fn write_field(
    target: &mut f64,
    value: Option<f64>,
    range: &RangeInclusive<f64>,
    name: &str,
) -> bool {
    match value {
        Some(v) if v.is_finite() => {
            *target = clamp_to(v, range);
            true
        },
        Some(v) => {
            warn!("Rejected non-finite value for {}: {}", name, v);
            false
        },
        None => false,
    }
}

impl ControlSettings {
    /// 应用部分更新，返回实际写入的字段数
    pub fn apply(&mut self, update: &SettingsUpdate) -> usize {
        [
            write_field(&mut self.deadzone_left, update.deadzone_left, &DEADZONE_RANGE, "deadzone_left_stick"),
            write_field(&mut self.deadzone_right, update.deadzone_right, &DEADZONE_RANGE, "deadzone_right_stick"),
            write_field(&mut self.sensitivity_linear, update.sensitivity_linear, &SENSITIVITY_RANGE, "sensitivity_linear"),
            write_field(&mut self.sensitivity_strafe, update.sensitivity_strafe, &SENSITIVITY_RANGE, "sensitivity_strafe"),
            write_field(&mut self.sensitivity_rotation, update.sensitivity_rotation, &SENSITIVITY_RANGE, "sensitivity_rotation"),
            write_field(&mut self.max_linear_velocity, update.max_linear_velocity, &MAX_LINEAR_RANGE, "max_linear_velocity"),
            write_field(&mut self.max_strafe_velocity, update.max_strafe_velocity, &MAX_STRAFE_RANGE, "max_strafe_velocity"),
            write_field(&mut self.max_rotation_velocity, update.max_rotation_velocity, &MAX_ROTATION_RANGE, "max_rotation_velocity"),
            write_field(&mut self.speed_multiplier, update.speed_multiplier, &SPEED_MULTIPLIER_RANGE, "speed_multiplier"),
        ]
        .iter()
        .filter(|written| **written)
        .count()
    }

    /// 把整组参数钳位到合法区间（非有限字段回退到默认值）
    ///
    /// 用于外部来源（配置文件）的整组写入。
    pub fn sanitized(self) -> Self {
        let mut clean = Self::default();
        clean.apply(&SettingsUpdate::from(self));
        clean
    }
}

impl From<ControlSettings> for SettingsUpdate {
    fn from(s: ControlSettings) -> Self {
        Self {
            deadzone_left: Some(s.deadzone_left),
            deadzone_right: Some(s.deadzone_right),
            sensitivity_linear: Some(s.sensitivity_linear),
            sensitivity_strafe: Some(s.sensitivity_strafe),
            sensitivity_rotation: Some(s.sensitivity_rotation),
            max_linear_velocity: Some(s.max_linear_velocity),
            max_strafe_velocity: Some(s.max_strafe_velocity),
            max_rotation_velocity: Some(s.max_rotation_velocity),
            speed_multiplier: Some(s.speed_multiplier),
        }
    }
}

// ==================== 预设 ====================

/// 参数预设
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Preset {
    Beginner,
    Normal,
    Advanced,
    Sport,
}

impl Preset {
    pub const ALL: [Preset; 4] = [
        Preset::Beginner,
        Preset::Normal,
        Preset::Advanced,
        Preset::Sport,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Preset::Beginner => "beginner",
            Preset::Normal => "normal",
            Preset::Advanced => "advanced",
            Preset::Sport => "sport",
        }
    }

    /// 预设对应的参数
    ///
    /// 进阶与运动预设只提高死区精度、灵敏度和倍率，速度上限与 normal 相同。
    pub const fn settings(self) -> ControlSettings {
        let (deadzone, sensitivity, max_linear, max_strafe, max_rotation, multiplier) = match self {
            Preset::Beginner => (0.15, 0.7, 0.4, 0.3, 0.5, 0.7),
            Preset::Normal => (0.1, 1.0, 0.6, 0.4, 0.8, 1.0),
            Preset::Advanced => (0.05, 1.3, 0.6, 0.4, 0.8, 1.3),
            Preset::Sport => (0.05, 1.5, 0.6, 0.4, 0.8, 1.5),
        };
        ControlSettings {
            deadzone_left: deadzone,
            deadzone_right: deadzone,
            sensitivity_linear: sensitivity,
            sensitivity_strafe: sensitivity,
            sensitivity_rotation: sensitivity,
            max_linear_velocity: max_linear,
            max_strafe_velocity: max_strafe,
            max_rotation_velocity: max_rotation,
            speed_multiplier: multiplier,
        }
    }
}

impl FromStr for Preset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Preset::ALL
            .iter()
            .copied()
            .find(|p| p.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("Unknown preset: {}", s))
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_defaults_are_in_range() {
        let s = ControlSettings::default();
        assert_eq!(s, s.sanitized());
    }

    #[test]
    fn test_apply_clamps_each_field() {
        let mut s = ControlSettings::default();
        let written = s.apply(&SettingsUpdate {
            deadzone_left: Some(-0.5),
            sensitivity_linear: Some(5.0),
            max_strafe_velocity: Some(3.0),
            max_rotation_velocity: Some(0.0),
            ..Default::default()
        });
        assert_eq!(written, 4);
        assert_eq!(s.deadzone_left, 0.0);
        assert_eq!(s.sensitivity_linear, 2.0);
        assert_eq!(s.max_strafe_velocity, 0.8);
        assert_eq!(s.max_rotation_velocity, 0.1);
        // 未指定字段保持不变
        assert_eq!(s.deadzone_right, 0.15);
    }

    #[test]
    fn test_apply_rejects_non_finite() {
        let mut s = ControlSettings::default();
        let written = s.apply(&SettingsUpdate {
            speed_multiplier: Some(f64::NAN),
            max_linear_velocity: Some(f64::INFINITY),
            ..Default::default()
        });
        assert_eq!(written, 0);
        assert_eq!(s, ControlSettings::default());
    }

    #[test]
    fn test_presets_are_in_range() {
        for preset in Preset::ALL {
            let s = preset.settings();
            assert_eq!(s, s.sanitized(), "preset {} out of range", preset);
        }
        assert_eq!(Preset::Beginner.settings().max_strafe_velocity, 0.3);
        assert_eq!(Preset::Sport.settings().speed_multiplier, 1.5);
    }

    #[test]
    fn test_preset_from_str() {
        assert_eq!("Sport".parse::<Preset>().unwrap(), Preset::Sport);
        assert!("ludicrous".parse::<Preset>().is_err());
    }

    #[test]
    fn test_settings_json_uses_frontend_names() {
        let value = serde_json::to_value(ControlSettings::default()).unwrap();
        assert_eq!(value["deadzone_left_stick"], 0.15);
        let update: SettingsUpdate =
            serde_json::from_str(r#"{"deadzone_right_stick": 0.3}"#).unwrap();
        assert_eq!(update.deadzone_right, Some(0.3));
        assert_eq!(update.speed_multiplier, None);
    }

    proptest! {
        #[test]
        fn prop_any_update_stays_in_range(
            dz in proptest::num::f64::ANY,
            sens in proptest::num::f64::ANY,
            lin in proptest::num::f64::ANY,
            mult in proptest::num::f64::ANY,
        ) {
            let mut s = ControlSettings::default();
            s.apply(&SettingsUpdate {
                deadzone_left: Some(dz),
                sensitivity_rotation: Some(sens),
                max_linear_velocity: Some(lin),
                speed_multiplier: Some(mult),
                ..Default::default()
            });
            prop_assert!(DEADZONE_RANGE.contains(&s.deadzone_left));
            prop_assert!(SENSITIVITY_RANGE.contains(&s.sensitivity_rotation));
            prop_assert!(MAX_LINEAR_RANGE.contains(&s.max_linear_velocity));
            prop_assert!(SPEED_MULTIPLIER_RANGE.contains(&s.speed_multiplier));
        }
    }
}
