//! 仿真脚本
//!
//! JSON 格式，按顺序执行：
//!
//! ```json
//! {
//!   "name": "forward-and-stop",
//!   "steps": [
//!     { "type": "enable", "surface": "gamepad" },
//!     { "type": "input", "ly": 1.0, "repeat": 30 },
//!     { "type": "input", "repeat": 10 },
//!     { "type": "action", "name": "stand_up" }
//!   ]
//! }
//! ```

use anyhow::{Context, Result};
use go2_control::{Command, ControlSurface, Preset, RobotAction};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// 脚本校验错误
#[derive(Error, Debug, PartialEq)]
pub enum ScriptError {
    #[error("Script has no steps")]
    Empty,
    #[error("Step {index}: unknown action '{name}'")]
    UnknownAction { index: usize, name: String },
    #[error("Step {index}: repeat must be at least 1")]
    ZeroRepeat { index: usize },
}

fn default_repeat() -> u32 {
    1
}

fn default_on() -> bool {
    true
}

/// 仿真脚本
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Script {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub description: String,

    pub steps: Vec<ScriptStep>,
}

/// 脚本步骤
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScriptStep {
    /// 启用/禁用控制面
    Enable {
        surface: ControlSurface,
        #[serde(default = "default_on")]
        on: bool,
    },

    /// 输入采样，按仿真频率重复 `repeat` 帧
    Input {
        #[serde(default)]
        lx: f64,
        #[serde(default)]
        ly: f64,
        #[serde(default)]
        rx: f64,
        #[serde(default)]
        ry: f64,
        #[serde(default)]
        source: ControlSurface,
        #[serde(default)]
        rage_mode: bool,
        #[serde(default = "default_repeat")]
        repeat: u32,
    },

    /// 前端动作（snake_case 名称）
    Action { name: String },

    /// 切换参数预设
    Preset { preset: Preset },

    /// 等待
    Wait { duration_ms: u64 },
}

impl ScriptStep {
    /// 输入步骤对应的指令
    pub fn command(&self) -> Option<Command> {
        match *self {
            ScriptStep::Input {
                lx,
                ly,
                rx,
                ry,
                source,
                rage_mode,
                ..
            } => Some(Command {
                source,
                rage_mode,
                ..Command::gamepad(lx, ly, rx, ry)
            }),
            _ => None,
        }
    }
}

impl Script {
    /// 加载并校验脚本文件
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path).context("Failed to read script file")?;
        let script: Script = serde_json::from_str(&content).context("Failed to parse script JSON")?;
        script.validate()?;
        Ok(script)
    }

    pub fn validate(&self) -> Result<(), ScriptError> {
        if self.steps.is_empty() {
            return Err(ScriptError::Empty);
        }
        for (index, step) in self.steps.iter().enumerate() {
            match step {
                ScriptStep::Action { name } if name.parse::<RobotAction>().is_err() => {
                    return Err(ScriptError::UnknownAction {
                        index,
                        name: name.clone(),
                    });
                },
                ScriptStep::Input { repeat: 0, .. } => {
                    return Err(ScriptError::ZeroRepeat { index });
                },
                _ => {},
            }
        }
        Ok(())
    }

    /// 内置场景：启用手柄，全速前进 `ticks` 帧，再松杆 `ticks / 2` 帧
    pub fn forward_and_release(ticks: u32) -> Self {
        let ticks = ticks.max(1);
        Self {
            name: "forward-and-release".to_string(),
            description: "Full forward stick, then release to idle".to_string(),
            steps: vec![
                ScriptStep::Enable {
                    surface: ControlSurface::Gamepad,
                    on: true,
                },
                ScriptStep::Input {
                    lx: 0.0,
                    ly: 1.0,
                    rx: 0.0,
                    ry: 0.0,
                    source: ControlSurface::Gamepad,
                    rage_mode: false,
                    repeat: ticks,
                },
                ScriptStep::Input {
                    lx: 0.0,
                    ly: 0.0,
                    rx: 0.0,
                    ry: 0.0,
                    source: ControlSurface::Gamepad,
                    rage_mode: false,
                    repeat: (ticks / 2).max(1),
                },
            ],
        }
    }

    /// 输入帧总数
    pub fn total_ticks(&self) -> u64 {
        self.steps
            .iter()
            .map(|step| match step {
                ScriptStep::Input { repeat, .. } => u64::from(*repeat),
                _ => 0,
            })
            .sum()
    }
}
