//! 运动指令管线
//!
//! 把原始摇杆/键鼠输入转换为有界、平滑的机器人速度，再按硬件极限归一化为摇杆仿真值。
//!
//! # 处理步骤
//!
//! 1. 门控：未连接、无控制面启用、急停 → 错误，不产生任何传输流量
//! 2. Pose 模式：轴值钳位后直通，跳过后续全部步骤
//! 3. 死区
//! 4. 灵敏度与速度倍率（仅手柄）
//! 5. 目标速度 = 轴值 × 速度上限
//! 6. 非对称限速：减速立即生效，加速按 `上限 / 爬升时间` 限制
//! 7. 最终钳位到 ±上限
//! 8. 零速度检测与去重
//! 9. 按硬件极限归一化
//!
//! # 归一化
//!
//! 归一化必须除以硬件极限而不是用户设置的上限：
//! `(输入 × 软上限) / 软上限 == 输入`，会让速度滑块完全失效。

use crate::command::{Command, OutboundVelocity};
use crate::error::ControlError;
use go2_driver::{ControlSnapshot, ControlSurface};
use go2_protocol::round_to;
use std::time::{Duration, Instant};
use tracing::{debug, trace, warn};

/// 机器人硬件极限（摇杆仿真接口满量程对应的物理值）
pub mod hardware {
    /// 前后（m/s）
    pub const LINEAR: f64 = 5.0;
    /// 横移（m/s）
    pub const STRAFE: f64 = 1.0;
    /// 转向（rad/s）
    pub const ROTATION: f64 = 3.0;
    /// 俯仰（rad）
    pub const PITCH: f64 = 0.35;
}

/// 默认俯仰上限（rad，约 20°）
pub const DEFAULT_MAX_PITCH: f64 = 0.35;

/// 默认爬升时间（秒）
pub const DEFAULT_LINEAR_RAMP: f64 = 1.0;
pub const DEFAULT_STRAFE_RAMP: f64 = 0.2;
pub const DEFAULT_ROTATION_RAMP: f64 = 0.9;
pub const DEFAULT_PITCH_RAMP: f64 = 0.8;

/// 爬升时间不超过该值视为瞬时响应
const INSTANT_RAMP_THRESHOLD: f64 = 0.01;
/// 瞬时响应时使用的加速度上限
const INSTANT_ACCEL: f64 = 1000.0;

/// 两次调用间隔超过该值时，改用回退步长
const STALE_DT: f64 = 0.1;
/// 回退步长（约 30Hz）
const FALLBACK_DT: f64 = 0.033;

const VELOCITY_EPSILON: f64 = 0.01;
const PITCH_EPSILON: f64 = 0.005;
const POSE_EPSILON: f64 = 0.001;

const SLOW_PROCESSING: Duration = Duration::from_millis(10);

/// 限速器记忆
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlewState {
    pub current_vx: f64,
    pub current_vy: f64,
    pub current_vyaw: f64,
    pub current_pitch: f64,
    pub last_update: Instant,
}

impl SlewState {
    pub fn new(now: Instant) -> Self {
        Self {
            current_vx: 0.0,
            current_vy: 0.0,
            current_vyaw: 0.0,
            current_pitch: 0.0,
            last_update: now,
        }
    }

    fn zero_velocities(&mut self) {
        self.current_vx = 0.0;
        self.current_vy = 0.0;
        self.current_vyaw = 0.0;
        self.current_pitch = 0.0;
    }
}

/// 非有限值按 0 处理
#[inline]
fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() { value } else { 0.0 }
}

/// 覆盖值：缺省、非有限或为负时使用默认值
#[inline]
fn override_or(value: Option<f64>, default: f64) -> f64 {
    value
        .filter(|v| v.is_finite() && *v >= 0.0)
        .unwrap_or(default)
}

#[inline]
fn apply_deadzone(value: f64, deadzone: f64) -> f64 {
    if value.abs() < deadzone { 0.0 } else { value }
}

/// 加速度上限 = 速度上限 / 爬升时间
#[inline]
fn accel_limit(max_velocity: f64, ramp_time: f64) -> f64 {
    if ramp_time > INSTANT_RAMP_THRESHOLD {
        max_velocity / ramp_time
    } else {
        INSTANT_ACCEL
    }
}

/// 单轴非对称限速：减速（目标更接近 0）立即生效，加速按步长限制
#[inline]
fn slew_axis(current: f64, target: f64, max_step: f64) -> f64 {
    if target.abs() < current.abs() {
        target
    } else {
        current + (target - current).clamp(-max_step, max_step)
    }
}

/// 单轴步长限制（不区分加减速）
#[inline]
fn step_toward(current: f64, target: f64, max_step: f64) -> f64 {
    current + (target - current).clamp(-max_step, max_step)
}

#[inline]
fn normalize(value: f64, hardware_limit: f64) -> f64 {
    round_to(value / hardware_limit, 4).clamp(-1.0, 1.0)
}

/// 运动指令管线
///
/// 唯一的可变状态是限速器记忆；每个会话持有一个实例。
#[derive(Debug, Clone)]
pub struct MovementPipeline {
    slew: SlewState,
}

impl Default for MovementPipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl MovementPipeline {
    pub fn new() -> Self {
        Self::starting_at(Instant::now())
    }

    /// 以给定时刻作为初始时间戳（测试使用）
    pub fn starting_at(now: Instant) -> Self {
        Self {
            slew: SlewState::new(now),
        }
    }

    pub fn slew_state(&self) -> SlewState {
        self.slew
    }

    /// 限速器归零（关闭控制面、急停时调用）
    pub fn reset(&mut self) {
        self.reset_at(Instant::now());
    }

    pub fn reset_at(&mut self, now: Instant) {
        self.slew = SlewState::new(now);
        debug!("Slew rate limiter reset to zero");
    }

    /// 处理一次输入
    pub fn process(
        &mut self,
        command: &Command,
        snapshot: &ControlSnapshot,
    ) -> Result<OutboundVelocity, ControlError> {
        self.process_at(command, snapshot, Instant::now())
    }

    /// 处理一次输入（显式给定当前时刻）
    pub fn process_at(
        &mut self,
        command: &Command,
        snapshot: &ControlSnapshot,
        now: Instant,
    ) -> Result<OutboundVelocity, ControlError> {
        let started = Instant::now();

        // 1. 门控
        if !snapshot.connected {
            return Err(ControlError::NotConnected);
        }
        if !snapshot.flags.any_surface_enabled() {
            return Err(ControlError::ControlInactive);
        }
        if snapshot.flags.emergency_stop_active {
            return Err(ControlError::EmergencyStopActive);
        }

        // 2. Pose 模式直通
        if command.pose_mode || snapshot.flags.pose_mode_active {
            return Ok(Self::pose_passthrough(command));
        }

        let out = self.velocity_mode(command, snapshot, now);

        let elapsed = started.elapsed();
        if elapsed > SLOW_PROCESSING {
            warn!("Slow command processing: {:?}", elapsed);
        }
        Ok(out)
    }

    fn pose_passthrough(command: &Command) -> OutboundVelocity {
        let lx = finite_or_zero(command.lx).clamp(-1.0, 1.0);
        let ly = finite_or_zero(command.ly).clamp(-1.0, 1.0);
        let rx = finite_or_zero(command.rx).clamp(-1.0, 1.0);
        let ry = finite_or_zero(command.ry).clamp(-1.0, 1.0);

        let is_zero = [lx, ly, rx, ry].iter().all(|v| v.abs() < POSE_EPSILON);
        if !is_zero {
            debug!(
                "Pose mode: roll={:.3} height={:.3} yaw={:.3} pitch={:.3}",
                lx, ly, rx, ry
            );
        }

        OutboundVelocity {
            lx,
            ly,
            rx,
            ry,
            is_zero,
            should_send: true,
            pose: true,
            ..Default::default()
        }
    }

    fn velocity_mode(
        &mut self,
        command: &Command,
        snapshot: &ControlSnapshot,
        now: Instant,
    ) -> OutboundVelocity {
        let settings = &snapshot.settings;
        let is_gamepad = command.source == ControlSurface::Gamepad;

        // 3. 死区
        let mut lx = apply_deadzone(finite_or_zero(command.lx), settings.deadzone_left);
        let mut ly = apply_deadzone(finite_or_zero(command.ly), settings.deadzone_left);
        let mut rx = apply_deadzone(finite_or_zero(command.rx), settings.deadzone_right);
        // 键鼠俯仰已由前端做过死区
        let ry = if is_gamepad {
            apply_deadzone(finite_or_zero(command.ry), settings.deadzone_right)
        } else {
            finite_or_zero(command.ry)
        };

        // 4. 灵敏度与速度倍率（键鼠输入已在前端整形）
        if is_gamepad {
            ly *= settings.sensitivity_linear * settings.speed_multiplier;
            lx *= settings.sensitivity_strafe * settings.speed_multiplier;
            rx *= settings.sensitivity_rotation * settings.speed_multiplier;
        }

        // 5. 目标速度
        let max_linear = override_or(command.max_linear, settings.max_linear_velocity);
        let max_strafe = override_or(command.max_strafe, settings.max_strafe_velocity);
        let max_rotation = override_or(command.max_rotation, settings.max_rotation_velocity);
        let max_pitch = override_or(command.max_pitch, DEFAULT_MAX_PITCH);

        let target_vx = ly * max_linear;
        let target_vy = -lx * max_strafe;
        let target_vyaw = -rx * max_rotation;
        let target_pitch = ry * max_pitch;

        let (vx, vy, vyaw, pitch) = if command.rage_mode {
            // 原始目标直出，不钳位
            trace!(
                "Rage mode: vx={:.3} vy={:.3} vyaw={:.3}",
                target_vx, target_vy, target_vyaw
            );
            (target_vx, target_vy, target_vyaw, target_pitch)
        } else {
            // 6. 非对称限速
            let linear_accel = accel_limit(
                max_linear,
                override_or(command.linear_ramp_time, DEFAULT_LINEAR_RAMP),
            );
            let strafe_accel = accel_limit(
                max_strafe,
                override_or(command.strafe_ramp_time, DEFAULT_STRAFE_RAMP),
            );
            let yaw_accel = accel_limit(
                max_rotation,
                override_or(command.rotation_ramp_time, DEFAULT_ROTATION_RAMP),
            );
            let pitch_accel = accel_limit(
                max_pitch,
                override_or(command.pitch_ramp_time, DEFAULT_PITCH_RAMP),
            );

            let mut dt = now.saturating_duration_since(self.slew.last_update).as_secs_f64();
            self.slew.last_update = now;
            if dt > STALE_DT {
                dt = FALLBACK_DT;
            }

            let slew = &mut self.slew;
            slew.current_vx = slew_axis(slew.current_vx, target_vx, linear_accel * dt);
            slew.current_vy = slew_axis(slew.current_vy, target_vy, strafe_accel * dt);
            slew.current_vyaw = slew_axis(slew.current_vyaw, target_vyaw, yaw_accel * dt);
            slew.current_pitch = if is_gamepad {
                step_toward(slew.current_pitch, target_pitch, pitch_accel * dt)
            } else {
                target_pitch
            };

            // 7. 最终钳位
            (
                slew.current_vx.clamp(-max_linear, max_linear),
                slew.current_vy.clamp(-max_strafe, max_strafe),
                slew.current_vyaw.clamp(-max_rotation, max_rotation),
                slew.current_pitch.clamp(-max_pitch, max_pitch),
            )
        };

        // 8. 零速度检测
        let is_zero = vx.abs() < VELOCITY_EPSILON
            && vy.abs() < VELOCITY_EPSILON
            && vyaw.abs() < VELOCITY_EPSILON
            && pitch.abs() < PITCH_EPSILON;
        // 只有目标也为零时才清空限速器；起步阶段的输出可能低于阈值
        let target_is_zero = target_vx.abs() < VELOCITY_EPSILON
            && target_vy.abs() < VELOCITY_EPSILON
            && target_vyaw.abs() < VELOCITY_EPSILON
            && target_pitch.abs() < PITCH_EPSILON;
        if is_zero && target_is_zero {
            self.slew.zero_velocities();
        }
        let should_send = !(is_zero && snapshot.zero_velocity_sent);

        // 9. 归一化
        OutboundVelocity {
            vx,
            vy,
            vyaw,
            pitch,
            lx: normalize(-vy, hardware::STRAFE),
            ly: normalize(vx, hardware::LINEAR),
            rx: normalize(-vyaw, hardware::ROTATION),
            ry: normalize(pitch, hardware::PITCH),
            is_zero,
            should_send,
            pose: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use go2_driver::{ControlFlags, ControlSettings};
    use proptest::prelude::*;

    const TICK: Duration = Duration::from_millis(33);

    fn snapshot() -> ControlSnapshot {
        ControlSnapshot {
            connected: true,
            flags: ControlFlags {
                gamepad_enabled: true,
                keyboard_mouse_enabled: true,
                ..Default::default()
            },
            settings: ControlSettings::default(),
            zero_velocity_sent: false,
        }
    }

    fn no_deadzone() -> ControlSnapshot {
        let mut snap = snapshot();
        snap.settings.deadzone_left = 0.0;
        snap.settings.deadzone_right = 0.0;
        snap
    }

    #[test]
    fn test_gate_errors() {
        let t0 = Instant::now();
        let mut pipeline = MovementPipeline::starting_at(t0);
        let cmd = Command::gamepad(0.0, 1.0, 0.0, 0.0);

        let mut snap = snapshot();
        snap.connected = false;
        assert!(matches!(
            pipeline.process_at(&cmd, &snap, t0),
            Err(ControlError::NotConnected)
        ));

        let mut snap = snapshot();
        snap.flags.gamepad_enabled = false;
        snap.flags.keyboard_mouse_enabled = false;
        assert!(matches!(
            pipeline.process_at(&cmd, &snap, t0),
            Err(ControlError::ControlInactive)
        ));

        let mut snap = snapshot();
        snap.flags.emergency_stop_active = true;
        assert!(matches!(
            pipeline.process_at(&cmd, &snap, t0),
            Err(ControlError::EmergencyStopActive)
        ));
        // 门控失败不改变限速器
        assert_eq!(pipeline.slew_state(), SlewState::new(t0));
    }

    #[test]
    fn test_pose_mode_passthrough() {
        let t0 = Instant::now();
        let mut pipeline = MovementPipeline::starting_at(t0);
        let mut snap = snapshot();
        snap.flags.pose_mode_active = true;

        let out = pipeline
            .process_at(&Command::gamepad(1.7, -0.3, 0.05, -2.0), &snap, t0 + TICK)
            .unwrap();
        assert_eq!((out.lx, out.ly, out.rx, out.ry), (1.0, -0.3, 0.05, -1.0));
        assert_eq!((out.vx, out.vy, out.vyaw, out.pitch), (0.0, 0.0, 0.0, 0.0));
        assert!(out.pose && out.should_send && !out.is_zero);
        assert_eq!(pipeline.slew_state(), SlewState::new(t0));

        let out = pipeline
            .process_at(&Command::gamepad(0.0005, 0.0, 0.0, 0.0), &snap, t0 + TICK)
            .unwrap();
        assert!(out.is_zero && out.should_send);
    }

    #[test]
    fn test_command_pose_flag_also_passes_through() {
        let t0 = Instant::now();
        let mut pipeline = MovementPipeline::starting_at(t0);
        let cmd = Command {
            pose_mode: true,
            ..Command::keyboard(0.0, 0.5, 0.0, 0.2)
        };
        let out = pipeline.process_at(&cmd, &snapshot(), t0).unwrap();
        assert!(out.pose);
        assert_eq!((out.ly, out.ry), (0.5, 0.2));
    }

    #[test]
    fn test_deadzone_zeroes_small_axes() {
        let t0 = Instant::now();
        let mut pipeline = MovementPipeline::starting_at(t0);
        let out = pipeline
            .process_at(&Command::gamepad(0.1, -0.14, 0.149, 0.1), &snapshot(), t0 + TICK)
            .unwrap();
        assert_eq!((out.vx, out.vy, out.vyaw, out.pitch), (0.0, 0.0, 0.0, 0.0));
        assert!(out.is_zero);
    }

    #[test]
    fn test_keyboard_pitch_skips_deadzone_and_ramp() {
        let t0 = Instant::now();
        let mut pipeline = MovementPipeline::starting_at(t0);
        let out = pipeline
            .process_at(&Command::keyboard(0.0, 0.0, 0.0, 0.1), &snapshot(), t0 + TICK)
            .unwrap();
        assert!((out.pitch - 0.1 * DEFAULT_MAX_PITCH).abs() < 1e-12);
        assert_eq!(out.ry, 0.1);
    }

    #[test]
    fn test_keyboard_is_not_rescaled() {
        let t0 = Instant::now();
        let mut snap = no_deadzone();
        snap.settings.sensitivity_linear = 2.0;
        snap.settings.speed_multiplier = 2.0;
        let cmd = Command {
            rage_mode: true,
            ..Command::keyboard(0.0, 0.5, 0.0, 0.0)
        };
        let mut pipeline = MovementPipeline::starting_at(t0);
        let out = pipeline.process_at(&cmd, &snap, t0 + TICK).unwrap();
        assert!((out.vx - 0.5 * 0.6).abs() < 1e-12);
    }

    #[test]
    fn test_sensitivity_scenario_is_clamped_to_max_linear() {
        // 原始目标 vx = 0.5 × 2.0 × 2.0 × 0.6 = 1.2，超过上限 0.6
        let t0 = Instant::now();
        let mut snap = no_deadzone();
        snap.settings.sensitivity_linear = 2.0;
        snap.settings.sensitivity_strafe = 2.0;
        snap.settings.speed_multiplier = 2.0;

        let mut pipeline = MovementPipeline::starting_at(t0);
        let mut now = t0;
        let mut out = OutboundVelocity::default();
        for _ in 0..100 {
            now += TICK;
            out = pipeline
                .process_at(&Command::gamepad(-1.0, 0.5, 0.0, 0.0), &snap, now)
                .unwrap();
        }
        assert_eq!(out.vx, 0.6);
        assert_eq!(out.vy, 0.4);
    }

    #[test]
    fn test_acceleration_is_rate_limited() {
        let t0 = Instant::now();
        let mut pipeline = MovementPipeline::starting_at(t0);
        let out = pipeline
            .process_at(&Command::gamepad(0.0, 1.0, 0.0, 0.0), &no_deadzone(), t0 + TICK)
            .unwrap();
        // 0.6 m/s / 1.0 s × 0.033 s
        assert!((out.vx - 0.6 * 0.033).abs() < 1e-9);
    }

    #[test]
    fn test_deceleration_is_instant() {
        let t0 = Instant::now();
        let mut pipeline = MovementPipeline::starting_at(t0);
        let snap = no_deadzone();
        let mut now = t0;
        for _ in 0..60 {
            now += TICK;
            pipeline
                .process_at(&Command::gamepad(0.0, 1.0, -1.0, 0.0), &snap, now)
                .unwrap();
        }
        now += TICK;
        let out = pipeline
            .process_at(&Command::gamepad(0.0, 0.25, -0.5, 0.0), &snap, now)
            .unwrap();
        assert!((out.vx - 0.25 * 0.6).abs() < 1e-12);
        assert!((out.vyaw - 0.5 * 0.8).abs() < 1e-12);
    }

    #[test]
    fn test_stale_dt_falls_back() {
        let t0 = Instant::now();
        let mut pipeline = MovementPipeline::starting_at(t0);
        let out = pipeline
            .process_at(
                &Command::gamepad(0.0, 1.0, 0.0, 0.0),
                &no_deadzone(),
                t0 + Duration::from_secs(3),
            )
            .unwrap();
        assert!((out.vx - 0.6 * FALLBACK_DT).abs() < 1e-9);
    }

    #[test]
    fn test_gamepad_pitch_is_step_limited() {
        let t0 = Instant::now();
        let mut pipeline = MovementPipeline::starting_at(t0);
        let out = pipeline
            .process_at(&Command::gamepad(0.0, 0.0, 0.0, 1.0), &no_deadzone(), t0 + TICK)
            .unwrap();
        let step = DEFAULT_MAX_PITCH / DEFAULT_PITCH_RAMP * 0.033;
        assert!((out.pitch - step).abs() < 1e-9);
    }

    #[test]
    fn test_zero_ramp_is_instant() {
        let t0 = Instant::now();
        let mut pipeline = MovementPipeline::starting_at(t0);
        let cmd = Command {
            linear_ramp_time: Some(0.0),
            ..Command::gamepad(0.0, 0.5, 0.0, 0.0)
        };
        let out = pipeline.process_at(&cmd, &no_deadzone(), t0 + TICK).unwrap();
        assert!((out.vx - 0.3).abs() < 1e-12);
    }

    #[test]
    fn test_rage_mode_is_raw_target() {
        let t0 = Instant::now();
        let mut snap = no_deadzone();
        snap.settings.sensitivity_linear = 2.0;
        let cmd = Command {
            rage_mode: true,
            ..Command::gamepad(0.0, 0.5, 0.0, 0.0)
        };
        let mut pipeline = MovementPipeline::starting_at(t0);
        let out = pipeline
            .process_at(&cmd, &snap, t0 + Duration::from_secs(10))
            .unwrap();
        assert!((out.vx - 0.5 * 2.0 * 0.6).abs() < 1e-12);

        // 超出上限也不钳位
        let cmd = Command {
            rage_mode: true,
            ..Command::gamepad(0.0, 1.0, 0.0, 0.0)
        };
        snap.settings.speed_multiplier = 2.0;
        let out = pipeline.process_at(&cmd, &snap, t0).unwrap();
        assert!((out.vx - 2.4).abs() < 1e-12);
    }

    #[test]
    fn test_zero_is_sent_once() {
        let t0 = Instant::now();
        let mut pipeline = MovementPipeline::starting_at(t0);
        let mut snap = snapshot();
        let idle = Command::idle(ControlSurface::Gamepad);

        let first = pipeline.process_at(&idle, &snap, t0 + TICK).unwrap();
        assert!(first.is_zero && first.should_send);

        snap.zero_velocity_sent = true;
        let second = pipeline.process_at(&idle, &snap, t0 + TICK * 2).unwrap();
        assert!(second.is_zero && !second.should_send);
    }

    #[test]
    fn test_zero_output_resets_slew() {
        let t0 = Instant::now();
        let mut pipeline = MovementPipeline::starting_at(t0);
        let snap = no_deadzone();
        pipeline
            .process_at(&Command::gamepad(0.5, 0.5, 0.5, 0.5), &snap, t0 + TICK)
            .unwrap();
        pipeline
            .process_at(&Command::idle(ControlSurface::Gamepad), &snap, t0 + TICK * 2)
            .unwrap();
        let slew = pipeline.slew_state();
        assert_eq!(
            (slew.current_vx, slew.current_vy, slew.current_vyaw, slew.current_pitch),
            (0.0, 0.0, 0.0, 0.0)
        );
    }

    /// 满杆前进 `ticks` 帧，返回每帧输出
    fn hold_forward(snap: &ControlSnapshot, tick: Duration, ticks: u32) -> Vec<OutboundVelocity> {
        let t0 = Instant::now();
        let mut pipeline = MovementPipeline::starting_at(t0);
        let mut now = t0;
        (0..ticks)
            .map(|_| {
                now += tick;
                pipeline
                    .process_at(&Command::gamepad(0.0, 1.0, 0.0, 0.0), snap, now)
                    .unwrap()
            })
            .collect()
    }

    #[test]
    fn test_small_first_step_still_ramps_up() {
        // beginner @ 60Hz：单步 0.4 / 1.0 / 60 ≈ 0.0067 < 0.01
        let mut snap = snapshot();
        snap.settings = go2_driver::Preset::Beginner.settings();
        let outputs = hold_forward(&snap, Duration::from_micros(16_667), 120);
        assert!(outputs[0].is_zero);
        assert!(outputs[0].vx > 0.0);
        assert!(!outputs[1].is_zero);
        let target = 0.7 * 0.7 * 0.4;
        assert!((outputs[119].vx - target).abs() < 1e-9);
    }

    #[test]
    fn test_min_max_linear_ramps_up_at_30hz() {
        let mut snap = snapshot();
        snap.settings.max_linear_velocity = 0.1;
        let outputs = hold_forward(&snap, TICK, 60);
        // 单步 0.1 × 0.033 = 0.0033，前三帧低于阈值
        assert!(outputs[..3].iter().all(|out| out.is_zero));
        assert!(outputs[2].vx > outputs[1].vx && outputs[1].vx > outputs[0].vx);
        assert!(!outputs[3].is_zero);
        assert!((outputs[59].vx - 0.1).abs() < 1e-9);
    }

    #[test]
    fn test_normalization_uses_hardware_limits() {
        let t0 = Instant::now();
        let mut pipeline = MovementPipeline::starting_at(t0);
        let cmd = Command {
            rage_mode: true,
            ..Command::gamepad(-1.0, 1.0, -1.0, 0.0)
        };
        let out = pipeline.process_at(&cmd, &no_deadzone(), t0).unwrap();
        // 软上限满量程：0.6 / 5.0, 0.4 / 1.0, 0.8 / 3.0
        assert_eq!(out.ly, 0.12);
        assert_eq!(out.lx, -0.4);
        assert_eq!(out.rx, -0.2667);
        assert!(out.ly.abs() < 1.0 && out.lx.abs() < 1.0 && out.rx.abs() < 1.0);
    }

    #[test]
    fn test_non_finite_input_degrades_to_zero() {
        let t0 = Instant::now();
        let mut pipeline = MovementPipeline::starting_at(t0);
        let cmd = Command {
            max_linear: Some(f64::NAN),
            linear_ramp_time: Some(f64::INFINITY),
            ..Command::gamepad(f64::NAN, f64::INFINITY, f64::NEG_INFINITY, f64::NAN)
        };
        let out = pipeline.process_at(&cmd, &snapshot(), t0 + TICK).unwrap();
        assert!(out.is_zero);
        assert!([out.lx, out.ly, out.rx, out.ry].iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_overrides_replace_settings() {
        let t0 = Instant::now();
        let mut pipeline = MovementPipeline::starting_at(t0);
        let cmd = Command {
            max_rotation: Some(1.5),
            rage_mode: true,
            ..Command::keyboard(0.0, 0.0, 1.0, 0.0)
        };
        let out = pipeline.process_at(&cmd, &no_deadzone(), t0).unwrap();
        assert_eq!(out.vyaw, -1.5);
        assert_eq!(out.rx, 0.5);
    }

    proptest! {
        #[test]
        fn prop_inputs_within_deadzone_give_zero(
            lx in -0.149f64..0.149,
            ly in -0.149f64..0.149,
            rx in -0.149f64..0.149,
            ry in -0.149f64..0.149,
        ) {
            let t0 = Instant::now();
            let mut pipeline = MovementPipeline::starting_at(t0);
            let out = pipeline
                .process_at(&Command::gamepad(lx, ly, rx, ry), &snapshot(), t0 + TICK)
                .unwrap();
            prop_assert_eq!(out.vx, 0.0);
            prop_assert_eq!(out.vy, 0.0);
            prop_assert_eq!(out.vyaw, 0.0);
            prop_assert_eq!(out.pitch, 0.0);
        }

        #[test]
        fn prop_slew_respects_accel_limit(
            targets in proptest::collection::vec(-1.0f64..1.0, 1..40),
            dt_ms in 1u64..100,
        ) {
            let t0 = Instant::now();
            let mut pipeline = MovementPipeline::starting_at(t0);
            let snap = no_deadzone();
            let dt = Duration::from_millis(dt_ms);
            let accel = 0.6 / DEFAULT_LINEAR_RAMP;
            let mut now = t0;
            let mut previous = 0.0f64;
            for ly in targets {
                now += dt;
                let out = pipeline
                    .process_at(&Command::gamepad(0.0, ly, 0.0, 0.0), &snap, now)
                    .unwrap();
                let target = ly * 0.6;
                if target.abs() < previous.abs() {
                    // 减速立即到位
                    prop_assert!((out.vx - target).abs() < 1e-12);
                } else {
                    prop_assert!((out.vx - previous).abs() <= accel * dt.as_secs_f64() + 1e-9);
                }
                previous = pipeline.slew_state().current_vx;
            }
        }

        #[test]
        fn prop_rage_mode_ignores_dt(
            ly in -1.0f64..1.0,
            gap_ms in 0u64..5000,
        ) {
            let t0 = Instant::now();
            let mut pipeline = MovementPipeline::starting_at(t0);
            let cmd = Command { rage_mode: true, ..Command::gamepad(0.0, ly, 0.0, 0.0) };
            let out = pipeline
                .process_at(&cmd, &no_deadzone(), t0 + Duration::from_millis(gap_ms))
                .unwrap();
            prop_assert_eq!(out.vx, ly * 0.6);
        }

        #[test]
        fn prop_normalized_axes_are_bounded(
            lx in proptest::num::f64::ANY,
            ly in proptest::num::f64::ANY,
            rx in proptest::num::f64::ANY,
            ry in proptest::num::f64::ANY,
            rage in proptest::bool::ANY,
        ) {
            let t0 = Instant::now();
            let mut pipeline = MovementPipeline::starting_at(t0);
            let cmd = Command { rage_mode: rage, ..Command::gamepad(lx, ly, rx, ry) };
            let out = pipeline.process_at(&cmd, &snapshot(), t0 + TICK).unwrap();
            for v in [out.lx, out.ly, out.rx, out.ry] {
                prop_assert!(v.is_finite() && (-1.0..=1.0).contains(&v));
            }
        }
    }
}
