//! 连接阶段与控制面定义
//!
//! 连接阶段用原子量保存，请求线程、事件循环线程和后台轮询任务都能无锁读取。

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU8, Ordering};

/// 连接阶段
///
/// # 阶段说明
///
/// - **Disconnected**: 无连接（初始状态）
/// - **Connecting**: 连接任务已入队，尚未完成
/// - **Connected**: 连接可用，后台轮询运行中
/// - **Disconnecting**: 断开流程进行中；轮询任务看到非 Connected 后自行退出
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum ConnectionPhase {
    #[default]
    Disconnected = 0,
    Connecting = 1,
    Connected = 2,
    Disconnecting = 3,
}

impl ConnectionPhase {
    /// 从 u8 转换，无效值视为 Disconnected
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Connecting,
            2 => Self::Connected,
            3 => Self::Disconnecting,
            _ => Self::Disconnected,
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn is_connected(self) -> bool {
        self == Self::Connected
    }
}

/// 连接阶段（原子版本，用于线程间共享）
#[derive(Debug, Default)]
pub struct AtomicConnectionPhase {
    inner: AtomicU8,
}

impl AtomicConnectionPhase {
    pub fn new(phase: ConnectionPhase) -> Self {
        Self {
            inner: AtomicU8::new(phase.as_u8()),
        }
    }

    pub fn get(&self) -> ConnectionPhase {
        ConnectionPhase::from_u8(self.inner.load(Ordering::Acquire))
    }

    pub fn set(&self, phase: ConnectionPhase) {
        self.inner.store(phase.as_u8(), Ordering::Release);
    }

    /// 比较并交换
    ///
    /// 成功返回 `Ok(旧阶段)`，失败返回 `Err(当前阶段)`。
    pub fn compare_exchange(
        &self,
        current: ConnectionPhase,
        new: ConnectionPhase,
    ) -> Result<ConnectionPhase, ConnectionPhase> {
        self.inner
            .compare_exchange(
                current.as_u8(),
                new.as_u8(),
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .map(ConnectionPhase::from_u8)
            .map_err(ConnectionPhase::from_u8)
    }
}

/// 控制面（输入来源）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlSurface {
    /// 手柄：需要死区、灵敏度、速度倍率处理
    #[default]
    Gamepad,
    /// 键鼠：前端已做曲线整形，后端不再缩放
    KeyboardMouse,
}

impl ControlSurface {
    pub fn as_str(self) -> &'static str {
        match self {
            ControlSurface::Gamepad => "gamepad",
            ControlSurface::KeyboardMouse => "keyboard_mouse",
        }
    }
}
