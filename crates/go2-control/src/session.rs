//! 控制会话
//!
//! 前端调用的入口。会话持有共享状态、事件循环协调器和运动管线，
//! 所有方法都可以从任意请求线程调用。
//!
//! # 热路径
//!
//! ```text
//! process_movement
//!   ├─ 状态快照（不持有管线锁）
//!   ├─ 管线锁内处理输入
//!   ├─ 记录已发送速度
//!   └─ 投递 WirelessController 发布（不等待）
//! ```

use crate::command::{Command, OutboundVelocity};
use crate::error::ControlError;
use crate::mode::{ModeMachine, ModeOutcome, ModeStatus, SequenceTimings};
use crate::pipeline::{MovementPipeline, SlewState};
use go2_driver::{
    ControlFlags, ControlSettings, ControlSurface, Coordinator, CoordinatorConfig, Preset,
    RuntimeState, SettingsUpdate, TelemetrySnapshot, VelocityTriple,
};
use go2_protocol::{ApiRequest, Topic};
use go2_transport::{ConnectionMethod, Transport};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info};

/// 控制会话
pub struct ControlSession<T: Transport> {
    state: Arc<RuntimeState>,
    coordinator: Coordinator<T>,
    pipeline: Mutex<MovementPipeline>,
    timings: SequenceTimings,
}

impl<T: Transport> ControlSession<T> {
    /// 使用默认配置创建会话（启动事件循环线程）
    pub fn new() -> Result<Self, ControlError> {
        Self::with_config(CoordinatorConfig::default(), SequenceTimings::default())
    }

    pub fn with_config(
        config: CoordinatorConfig,
        timings: SequenceTimings,
    ) -> Result<Self, ControlError> {
        Self::with_state(Arc::new(RuntimeState::new()), config, timings)
    }

    /// 使用外部提供的共享状态创建会话
    pub fn with_state(
        state: Arc<RuntimeState>,
        config: CoordinatorConfig,
        timings: SequenceTimings,
    ) -> Result<Self, ControlError> {
        let coordinator = Coordinator::spawn(state.clone(), config)?;
        Ok(Self {
            state,
            coordinator,
            pipeline: Mutex::new(MovementPipeline::new()),
            timings,
        })
    }

    pub fn state(&self) -> &Arc<RuntimeState> {
        &self.state
    }

    pub(crate) fn coordinator(&self) -> &Coordinator<T> {
        &self.coordinator
    }

    pub(crate) fn timings(&self) -> SequenceTimings {
        self.timings
    }

    /// 模式状态机视图
    pub fn modes(&self) -> ModeMachine<'_, T> {
        ModeMachine {
            state: &self.state,
            coordinator: &self.coordinator,
            pipeline: &self.pipeline,
            timings: self.timings,
        }
    }

    // ==================== 连接 ====================

    /// 连接机器人（阻塞直到完成或超时）
    pub fn connect(&self, method: &ConnectionMethod, transport: T) -> Result<(), ControlError>
    where
        T: Send,
    {
        self.coordinator.connect(method, transport)?;
        self.pipeline.lock().reset();
        Ok(())
    }

    /// 断开连接（阻塞），限速器同时归零
    pub fn disconnect(&self) -> Result<(), ControlError> {
        let result = self.coordinator.disconnect();
        self.pipeline.lock().reset();
        result.map_err(ControlError::from)
    }

    pub fn is_connected(&self) -> bool {
        self.state.is_connected()
    }

    // ==================== 运动指令 ====================

    /// 处理一次输入并投递运动指令
    ///
    /// 门控失败时同步返回错误，不产生任何传输流量。
    /// 返回值中 `should_send == false` 表示这是重复的零速度，已被抑制。
    pub fn process_movement(&self, command: &Command) -> Result<OutboundVelocity, ControlError> {
        let snapshot = self.state.control_snapshot();
        let out = self.pipeline.lock().process(command, &snapshot)?;

        if !out.should_send {
            return Ok(out);
        }

        if !out.pose {
            self.state.record_sent_velocity(
                VelocityTriple {
                    vx: out.vx,
                    vy: out.vy,
                    vyaw: out.vyaw,
                },
                out.is_zero,
            );
        }

        self.coordinator.publish(
            "movement",
            Topic::WirelessController,
            out.to_payload().to_value(),
        )?;

        if out.is_zero && !out.pose {
            info!("Zero velocity command sent");
        } else {
            debug!(
                "Movement: vx={:.3} vy={:.3} vyaw={:.3} pitch={:.3}",
                out.vx, out.vy, out.vyaw, out.pitch
            );
        }
        Ok(out)
    }

    // ==================== 模式 ====================

    pub fn enable(&self, surface: ControlSurface, on: bool) -> Result<ControlFlags, ControlError> {
        self.modes().enable(surface, on)
    }

    pub fn enter_pose_mode(&self) -> Result<ModeOutcome, ControlError> {
        self.modes().enter_pose_mode()
    }

    pub fn exit_pose_mode(&self) -> Result<ModeOutcome, ControlError> {
        self.modes().exit_pose_mode()
    }

    pub fn emergency_stop(&self) -> Result<(), ControlError> {
        self.modes().emergency_stop()
    }

    pub fn clear_emergency(&self) {
        self.modes().clear_emergency()
    }

    pub fn mode_status(&self) -> ModeStatus {
        self.modes().status()
    }

    /// 限速器当前状态
    pub fn slew_state(&self) -> SlewState {
        self.pipeline.lock().slew_state()
    }

    // ==================== 相机 ====================

    /// 相机云台 yaw（通过机身 Euler 姿态实现），不等待应答
    pub fn camera_yaw(&self, yaw: f64) -> Result<(), ControlError> {
        if !self.state.is_connected() {
            return Err(ControlError::NotConnected);
        }
        let yaw = if yaw.is_finite() { yaw } else { 0.0 };
        self.coordinator.request(
            "camera_yaw",
            Topic::SportMod,
            ApiRequest::euler_yaw(yaw).to_value(),
        )?;
        Ok(())
    }

    // ==================== 参数与遥测 ====================

    pub fn settings(&self) -> ControlSettings {
        self.state.settings()
    }

    /// 部分更新参数（越界值钳位）
    pub fn update_settings(&self, update: &SettingsUpdate) -> ControlSettings {
        self.state.update_settings(update)
    }

    pub fn apply_preset(&self, preset: Preset) -> ControlSettings {
        self.state.apply_preset(preset)
    }

    pub fn telemetry(&self) -> TelemetrySnapshot {
        self.state.telemetry()
    }
}
