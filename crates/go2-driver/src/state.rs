//! 共享运行时状态
//!
//! 整个会话唯一的可变状态容器，被请求线程、事件循环线程和订阅回调共同访问。
//!
//! # 锁纪律
//!
//! - 所有字段私有，锁和守卫永远不会离开本模块
//! - 每个公开方法至多获取一把内部锁，并在返回前释放
//! - 需要同时修改多个字段的操作（例如记录已发送速度）做成单个方法，避免撕裂读
//! - 读取返回副本，调用方只能通过 setter 修改共享状态
//!
//! 因此调用方不可能在持有锁的情况下再调用另一个访问器，重入死锁在结构上不存在。

use crate::mode::{AtomicConnectionPhase, ConnectionPhase, ControlSurface};
use crate::settings::{ControlSettings, Preset, SettingsUpdate};
use arc_swap::ArcSwap;
use go2_protocol::LowStateSample;
use go2_protocol::api::sport::BODY_HEIGHT_LEVELS;
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// 控制面与模式标志
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ControlFlags {
    pub gamepad_enabled: bool,
    pub keyboard_mouse_enabled: bool,
    pub pose_mode_active: bool,
    pub emergency_stop_active: bool,
}

impl ControlFlags {
    /// 至少有一个控制面已启用
    pub fn any_surface_enabled(&self) -> bool {
        self.gamepad_enabled || self.keyboard_mouse_enabled
    }

    pub fn surface_enabled(&self, surface: ControlSurface) -> bool {
        match surface {
            ControlSurface::Gamepad => self.gamepad_enabled,
            ControlSurface::KeyboardMouse => self.keyboard_mouse_enabled,
        }
    }
}

/// 最近一次发送的速度（物理单位）
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct VelocityTriple {
    pub vx: f64,
    pub vy: f64,
    pub vyaw: f64,
}

/// 运动管线单次处理所需的状态快照
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlSnapshot {
    pub connected: bool,
    pub flags: ControlFlags,
    pub settings: ControlSettings,
    /// 上一条发出的指令是否已是零速度
    pub zero_velocity_sent: bool,
}

/// 遥测快照
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetrySnapshot {
    /// 电池电量（%）
    pub battery_level: Option<f64>,
    /// 数据通道往返时间（ms）
    pub ping_ms: Option<u64>,
    /// 全部温度传感器最大值（°C）
    pub max_temperature: Option<f64>,
    /// 运动模式 / 步态名称
    pub current_mode: String,
    pub last_update: Option<Instant>,
}

impl Default for TelemetrySnapshot {
    fn default() -> Self {
        Self {
            battery_level: None,
            ping_ms: None,
            max_temperature: None,
            current_mode: "unknown".to_string(),
            last_update: None,
        }
    }
}

/// 机器人侧开关类状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RobotToggles {
    /// 机身高度档位：0 低 / 1 中 / 2 高
    pub body_height_level: u8,
    pub lidar_on: bool,
    /// 速度档位：-1 慢 / 0 正常 / 1 快
    pub speed_level: i8,
    pub free_bound: bool,
    pub free_jump: bool,
    pub free_avoid: bool,
    pub obstacle_avoid: bool,
}

impl Default for RobotToggles {
    fn default() -> Self {
        Self {
            body_height_level: 1,
            lidar_on: false,
            speed_level: 0,
            free_bound: false,
            free_jump: false,
            free_avoid: false,
            obstacle_avoid: false,
        }
    }
}

/// 可翻转的机器人模式开关
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RobotSwitch {
    Lidar,
    FreeBound,
    FreeJump,
    FreeAvoid,
    ObstacleAvoid,
}

impl RobotToggles {
    fn switch_mut(&mut self, switch: RobotSwitch) -> &mut bool {
        match switch {
            RobotSwitch::Lidar => &mut self.lidar_on,
            RobotSwitch::FreeBound => &mut self.free_bound,
            RobotSwitch::FreeJump => &mut self.free_jump,
            RobotSwitch::FreeAvoid => &mut self.free_avoid,
            RobotSwitch::ObstacleAvoid => &mut self.obstacle_avoid,
        }
    }
}

#[derive(Debug, Default)]
struct ControlState {
    flags: ControlFlags,
    last_sent: VelocityTriple,
    zero_velocity_sent: bool,
    /// Pose 模式切换进行中
    pose_transition: bool,
}

/// 共享运行时状态
///
/// 通过 `Arc<RuntimeState>` 在各组件间共享。连接句柄本身不在这里：
/// 它由事件循环线程独占，其他线程只能看到连接阶段。
pub struct RuntimeState {
    phase: AtomicConnectionPhase,
    control: Mutex<ControlState>,
    settings: ArcSwap<ControlSettings>,
    telemetry: RwLock<TelemetrySnapshot>,
    robot: Mutex<RobotToggles>,
}

impl Default for RuntimeState {
    fn default() -> Self {
        Self::new()
    }
}

impl RuntimeState {
    pub fn new() -> Self {
        Self::with_settings(ControlSettings::default())
    }

    pub fn with_settings(settings: ControlSettings) -> Self {
        Self {
            phase: AtomicConnectionPhase::new(ConnectionPhase::Disconnected),
            control: Mutex::new(ControlState::default()),
            settings: ArcSwap::from_pointee(settings.sanitized()),
            telemetry: RwLock::new(TelemetrySnapshot::default()),
            robot: Mutex::new(RobotToggles::default()),
        }
    }

    /// 恢复到刚构造时的状态（测试隔离、进程内重置）
    pub fn reset(&self) {
        self.phase.set(ConnectionPhase::Disconnected);
        *self.control.lock() = ControlState::default();
        self.settings.store(Arc::new(ControlSettings::default()));
        *self.telemetry.write() = TelemetrySnapshot::default();
        *self.robot.lock() = RobotToggles::default();
        debug!("Runtime state reset");
    }

    // ==================== 连接 ====================

    pub fn connection_phase(&self) -> ConnectionPhase {
        self.phase.get()
    }

    pub fn is_connected(&self) -> bool {
        self.phase.get().is_connected()
    }

    pub fn set_connection_phase(&self, phase: ConnectionPhase) {
        self.phase.set(phase);
    }

    /// 从 Disconnected 进入 Connecting；已在连接流程中则返回 false
    pub fn try_begin_connect(&self) -> bool {
        self.phase
            .compare_exchange(ConnectionPhase::Disconnected, ConnectionPhase::Connecting)
            .is_ok()
    }

    // ==================== 控制标志 ====================

    pub fn control_flags(&self) -> ControlFlags {
        self.control.lock().flags
    }

    /// 启用/禁用控制面
    ///
    /// 启用任一控制面时同时清除急停。返回更新后的标志。
    pub fn set_surface_enabled(&self, surface: ControlSurface, enabled: bool) -> ControlFlags {
        let mut control = self.control.lock();
        match surface {
            ControlSurface::Gamepad => control.flags.gamepad_enabled = enabled,
            ControlSurface::KeyboardMouse => control.flags.keyboard_mouse_enabled = enabled,
        }
        if enabled {
            control.flags.emergency_stop_active = false;
        }
        control.flags
    }

    /// 禁用所有控制面并清除急停（断开流程使用）
    pub fn disable_all_surfaces(&self) {
        let mut control = self.control.lock();
        control.flags.gamepad_enabled = false;
        control.flags.keyboard_mouse_enabled = false;
        control.flags.emergency_stop_active = false;
    }

    pub fn set_emergency_stop(&self, active: bool) {
        self.control.lock().flags.emergency_stop_active = active;
    }

    pub fn is_emergency_stop_active(&self) -> bool {
        self.control.lock().flags.emergency_stop_active
    }

    pub fn set_pose_mode(&self, active: bool) {
        self.control.lock().flags.pose_mode_active = active;
    }

    pub fn is_pose_mode_active(&self) -> bool {
        self.control.lock().flags.pose_mode_active
    }

    /// 占用一次 Pose 模式切换
    ///
    /// 已处于目标状态或另一次切换尚未结束时返回 `None`。
    /// 检查与占用在同一把锁内完成，多个请求线程中只有一个能拿到凭证。
    pub fn try_begin_pose_transition(self: &Arc<Self>, target: bool) -> Option<PoseTransition> {
        let mut control = self.control.lock();
        if control.pose_transition {
            debug!("Pose transition already in progress");
            return None;
        }
        if control.flags.pose_mode_active == target {
            return None;
        }
        control.pose_transition = true;
        Some(PoseTransition {
            state: Arc::clone(self),
            target,
            committed: false,
        })
    }

    // ==================== 速度跟踪 ====================

    /// 记录一次已处理的速度指令（三轴速度与零速度标志一次写入）
    pub fn record_sent_velocity(&self, velocity: VelocityTriple, is_zero: bool) {
        let mut control = self.control.lock();
        control.last_sent = velocity;
        control.zero_velocity_sent = is_zero;
    }

    pub fn last_sent_velocity(&self) -> VelocityTriple {
        self.control.lock().last_sent
    }

    pub fn zero_velocity_sent(&self) -> bool {
        self.control.lock().zero_velocity_sent
    }

    /// 运动管线的输入快照
    ///
    /// 控制标志与零速度标志在同一把锁内读取；参数是无锁快照。
    pub fn control_snapshot(&self) -> ControlSnapshot {
        let connected = self.is_connected();
        let (flags, zero_velocity_sent) = {
            let control = self.control.lock();
            (control.flags, control.zero_velocity_sent)
        };
        ControlSnapshot {
            connected,
            flags,
            settings: self.settings(),
            zero_velocity_sent,
        }
    }

    // ==================== 参数 ====================

    pub fn settings(&self) -> ControlSettings {
        **self.settings.load()
    }

    /// 部分更新参数，返回更新后的副本
    pub fn update_settings(&self, update: &SettingsUpdate) -> ControlSettings {
        let mut result = self.settings();
        self.settings.rcu(|current| {
            let mut next = **current;
            next.apply(update);
            result = next;
            next
        });
        info!("Control settings updated: {:?}", result);
        result
    }

    pub fn apply_preset(&self, preset: Preset) -> ControlSettings {
        let settings = preset.settings();
        self.settings.store(std::sync::Arc::new(settings));
        info!("Applied preset: {}", preset);
        settings
    }

    /// 整组替换（先钳位）
    pub fn replace_settings(&self, settings: ControlSettings) -> ControlSettings {
        let clean = settings.sanitized();
        self.settings.store(std::sync::Arc::new(clean));
        clean
    }

    // ==================== 遥测 ====================

    pub fn telemetry(&self) -> TelemetrySnapshot {
        self.telemetry.read().clone()
    }

    /// 合并一条 LOW_STATE 采样（缺失字段保持原值）
    pub fn apply_low_state(&self, sample: &LowStateSample) {
        let mut telemetry = self.telemetry.write();
        if let Some(soc) = sample.battery_soc {
            telemetry.battery_level = Some(soc);
            telemetry.last_update = Some(Instant::now());
        }
        if let Some(temp) = sample.max_temperature {
            telemetry.max_temperature = Some(temp);
        }
    }

    pub fn set_ping_ms(&self, ping_ms: u64) {
        self.telemetry.write().ping_ms = Some(ping_ms);
    }

    /// 更新模式名称，返回是否发生变化
    pub fn set_current_mode(&self, mode: &str) -> bool {
        let mut telemetry = self.telemetry.write();
        if telemetry.current_mode == mode {
            return false;
        }
        telemetry.current_mode = mode.to_string();
        true
    }

    /// 清除连接相关的遥测与开关（断开后调用）
    pub fn reset_telemetry(&self) {
        *self.telemetry.write() = TelemetrySnapshot::default();
        let mut robot = self.robot.lock();
        robot.lidar_on = false;
        robot.free_bound = false;
    }

    // ==================== 机器人开关 ====================

    pub fn robot_toggles(&self) -> RobotToggles {
        *self.robot.lock()
    }

    /// 翻转开关，返回新值
    pub fn toggle(&self, switch: RobotSwitch) -> bool {
        let mut robot = self.robot.lock();
        let slot = robot.switch_mut(switch);
        *slot = !*slot;
        *slot
    }

    pub fn set_switch(&self, switch: RobotSwitch, on: bool) {
        *self.robot.lock().switch_mut(switch) = on;
    }

    /// 机身高度切到下一档（低 → 中 → 高 → 低），返回 (档位, 高度)
    pub fn cycle_body_height(&self) -> (u8, f64) {
        let mut robot = self.robot.lock();
        let next = (robot.body_height_level + 1) % BODY_HEIGHT_LEVELS.len() as u8;
        robot.body_height_level = next;
        (next, BODY_HEIGHT_LEVELS[next as usize])
    }

    /// 调整速度档位（钳位到 [-1, 1]），返回新档位
    pub fn step_speed_level(&self, delta: i8) -> i8 {
        let mut robot = self.robot.lock();
        robot.speed_level = robot.speed_level.saturating_add(delta).clamp(-1, 1);
        robot.speed_level
    }
}

/// Pose 模式切换凭证
///
/// 释放时解除占用；调用过 [`commit`](Self::commit) 的凭证同时写入目标 Pose 标志。
pub struct PoseTransition {
    state: Arc<RuntimeState>,
    target: bool,
    committed: bool,
}

impl PoseTransition {
    pub fn target(&self) -> bool {
        self.target
    }

    /// 切换成功，释放时写入目标标志
    pub fn commit(&mut self) {
        self.committed = true;
    }
}

impl Drop for PoseTransition {
    fn drop(&mut self) {
        let mut control = self.state.control.lock();
        control.pose_transition = false;
        if self.committed {
            control.flags.pose_mode_active = self.target;
        }
    }
}
