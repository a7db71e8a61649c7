//! 配置管理命令
//!
//! 配置文件为 TOML：
//!
//! ```toml
//! preset = "normal"
//! log_level = "info"
//!
//! [connection]
//! method = "LocalSTA"
//! ip = "192.168.123.161"
//! ```

use anyhow::{Context, Result, bail};
use clap::{Subcommand, ValueEnum};
use go2_control::Preset;
use go2_transport::ConnectionMethod;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::filter::LevelFilter;

/// 默认配置文件路径
fn default_config_file() -> Result<PathBuf> {
    let mut path =
        dirs::config_dir().ok_or_else(|| anyhow::anyhow!("Cannot determine config directory"))?;
    path.push("go2");
    path.push("config.toml");
    Ok(path)
}

fn resolve(path: Option<&Path>) -> Result<PathBuf> {
    match path {
        Some(p) => Ok(p.to_path_buf()),
        None => default_config_file(),
    }
}

fn default_connection() -> ConnectionMethod {
    ConnectionMethod::LocalAp
}

fn default_preset() -> Preset {
    Preset::Normal
}

/// CLI 配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CliConfig {
    /// 连接方式
    #[serde(default = "default_connection")]
    pub connection: ConnectionMethod,

    /// 仿真使用的参数预设
    #[serde(default = "default_preset")]
    pub preset: Preset,

    /// 日志级别（RUST_LOG 未设置时生效）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            connection: default_connection(),
            preset: default_preset(),
            log_level: None,
        }
    }
}

impl CliConfig {
    /// 加载配置，文件不存在时返回默认值
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = resolve(path)?;
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.connection.validate()?;
        Ok(config)
    }

    /// 保存配置（自动创建目录）
    pub fn save(&self, path: Option<&Path>) -> Result<PathBuf> {
        let path = resolve(path)?;
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).context("Failed to create config directory")?;
        }
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(&path, content).context("Failed to write config file")?;
        Ok(path)
    }
}

/// 连接方式（命令行取值）
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MethodArg {
    LocalAp,
    LocalSta,
    Remote,
}

/// 配置命令
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// 显示当前配置
    Show,

    /// 显示配置文件路径
    Path,

    /// 设置默认参数预设
    SetPreset {
        /// beginner / normal / advanced / sport
        preset: Preset,
    },

    /// 设置连接方式
    SetConnection {
        #[arg(long, value_enum)]
        method: MethodArg,

        /// 机器人 IP（LocalSTA）
        #[arg(long)]
        ip: Option<String>,

        /// 机器人序列号（LocalSTA / Remote）
        #[arg(long)]
        serial: Option<String>,

        /// 账号（Remote）
        #[arg(long)]
        username: Option<String>,

        /// 密码（Remote）
        #[arg(long)]
        password: Option<String>,
    },

    /// 设置日志级别
    SetLogLevel { level: String },
}

impl ConfigCommand {
    pub fn execute(self, path: Option<&Path>) -> Result<()> {
        match self {
            ConfigCommand::Show => {
                let config = CliConfig::load(path)?;
                println!("Config file: {}", resolve(path)?.display());
                println!("  connection: {:?}", config.connection);
                println!("  preset:     {}", config.preset);
                println!(
                    "  log_level:  {}",
                    config.log_level.as_deref().unwrap_or("info")
                );
                Ok(())
            },

            ConfigCommand::Path => {
                println!("{}", resolve(path)?.display());
                Ok(())
            },

            ConfigCommand::SetPreset { preset } => {
                let mut config = CliConfig::load(path)?;
                config.preset = preset;
                let saved = config.save(path)?;
                println!("✅ Default preset set to {} ({})", preset, saved.display());
                Ok(())
            },

            ConfigCommand::SetConnection {
                method,
                ip,
                serial,
                username,
                password,
            } => {
                let connection = match method {
                    MethodArg::LocalAp => ConnectionMethod::LocalAp,
                    MethodArg::LocalSta => ConnectionMethod::LocalSta {
                        ip,
                        serial_number: serial,
                    },
                    MethodArg::Remote => ConnectionMethod::Remote {
                        serial_number: serial.unwrap_or_default(),
                        username: username.unwrap_or_default(),
                        password: password.unwrap_or_default(),
                    },
                };
                connection.validate()?;

                let mut config = CliConfig::load(path)?;
                config.connection = connection;
                let saved = config.save(path)?;
                println!(
                    "✅ Connection set to {} ({})",
                    config.connection.name(),
                    saved.display()
                );
                Ok(())
            },

            ConfigCommand::SetLogLevel { level } => {
                if level.parse::<LevelFilter>().is_err() {
                    bail!("Unknown log level: {}", level);
                }
                let mut config = CliConfig::load(path)?;
                config.log_level = Some(level.to_ascii_lowercase());
                config.save(path)?;
                println!("✅ Log level set to {}", level.to_ascii_lowercase());
                Ok(())
            },
        }
    }
}
