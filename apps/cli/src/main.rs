//! # Go2 CLI
//!
//! Go2 遥操作核心的命令行工具。
//!
//! ```bash
//! # 查看参数预设
//! go2-cli presets
//!
//! # 配置默认预设
//! go2-cli config set-preset sport
//!
//! # 离线仿真（Mock 传输），打印每一帧的输出速度
//! go2-cli simulate --ticks 60 --rate 30
//! go2-cli simulate --script scenario.json --json
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod script;

use commands::{ConfigCommand, SimulateCommand};

/// Go2 CLI - 遥操作核心命令行工具
#[derive(Parser, Debug)]
#[command(name = "go2-cli")]
#[command(about = "Command-line tool for the Go2 teleop core", long_about = None)]
#[command(version)]
struct Cli {
    /// 配置文件路径（默认 ~/.config/go2/config.toml）
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 列出参数预设
    Presets,

    /// 列出前端动作名称
    Actions,

    /// 配置管理
    #[command(subcommand)]
    Config(ConfigCommand),

    /// 离线仿真：通过 Mock 传输驱动一次完整会话
    Simulate {
        #[command(flatten)]
        args: SimulateCommand,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = commands::config::CliConfig::load(cli.config.as_deref())?;

    // 初始化日志（RUST_LOG 优先，其次配置文件）
    let default_directive = format!("go2_cli={}", config.log_level.as_deref().unwrap_or("info"));
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(&default_directive))
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("go2_cli=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Presets => commands::presets::print_presets(config.preset),
        Commands::Actions => commands::presets::print_actions(),
        Commands::Config(cmd) => cmd.execute(cli.config.as_deref()),
        Commands::Simulate { args } => args.execute(&config),
    }
}
