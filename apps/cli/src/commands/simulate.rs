//! simulate 命令
//!
//! 用 Mock 传输驱动一次完整会话：连接 → 执行脚本 → 断开，
//! 逐帧打印运动管线的输出。Ctrl+C 会触发急停并提前结束。

use anyhow::{Context, Result};
use clap::Args;
use go2_control::{
    Command, ControlError, ControlSession, CoordinatorConfig, OutboundVelocity, RobotAction,
    SequenceTimings,
};
use go2_transport::MockTransport;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{info, warn};

use super::config::CliConfig;
use crate::script::{Script, ScriptStep};

/// 仿真命令参数
#[derive(Args, Debug)]
pub struct SimulateCommand {
    /// 脚本文件（JSON），缺省时运行内置的前进-松杆场景
    #[arg(short, long)]
    pub script: Option<PathBuf>,

    /// 内置场景的前进帧数
    #[arg(long, default_value_t = 30)]
    pub ticks: u32,

    /// 输入频率（Hz）
    #[arg(long, default_value_t = 30.0)]
    pub rate: f64,

    /// 覆盖配置文件中的预设
    #[arg(long)]
    pub preset: Option<go2_control::Preset>,

    /// 每帧输出一行 JSON
    #[arg(long)]
    pub json: bool,

    /// 步骤失败时继续执行
    #[arg(long)]
    pub continue_on_error: bool,
}

/// 仿真统计
#[derive(Debug, Default)]
struct Summary {
    ticks: u64,
    sent: u64,
    suppressed: u64,
    rejected: u64,
}

impl SimulateCommand {
    pub fn execute(&self, config: &CliConfig) -> Result<()> {
        if !(self.rate.is_finite() && self.rate > 0.0) {
            anyhow::bail!("Rate must be a positive number, got {}", self.rate);
        }
        let script = match &self.script {
            Some(path) => Script::load(path)?,
            None => Script::forward_and_release(self.ticks),
        };
        let period = Duration::from_secs_f64(1.0 / self.rate);

        let running = Arc::new(AtomicBool::new(true));
        let r = running.clone();
        ctrlc::set_handler(move || {
            r.store(false, Ordering::SeqCst);
            eprintln!("\nInterrupted, stopping simulation...");
        })
        .context("Failed to install Ctrl+C handler")?;

        let session: ControlSession<MockTransport> =
            ControlSession::with_config(CoordinatorConfig::default(), SequenceTimings::default())?;
        let mock = MockTransport::new();
        session
            .connect(&config.connection, mock.clone())
            .context("Simulated connect failed")?;
        session.apply_preset(self.preset.unwrap_or(config.preset));

        if !self.json {
            println!(
                "📜 {} ({} steps, {} ticks @ {:.0} Hz)",
                if script.name.is_empty() { "script" } else { &script.name },
                script.steps.len(),
                script.total_ticks(),
                self.rate
            );
            print_header();
        }

        let started = Instant::now();
        let mut summary = Summary::default();
        let result = self.run_steps(&session, &script, period, &running, &mut summary);

        if !running.load(Ordering::SeqCst) {
            session.emergency_stop()?;
        }

        // 等待事件循环发出最后的运动指令
        std::thread::sleep(Duration::from_millis(50));
        let published = mock.wireless_payloads().len();
        session.disconnect()?;
        result?;

        if !self.json {
            println!();
            println!("📊 Summary:");
            println!("  ticks:      {}", summary.ticks);
            println!("  sent:       {}", summary.sent);
            println!("  suppressed: {}", summary.suppressed);
            println!("  rejected:   {}", summary.rejected);
            println!("  published:  {}", published);
            println!("  elapsed:    {:.2} s", started.elapsed().as_secs_f64());
        }
        Ok(())
    }

    fn run_steps(
        &self,
        session: &ControlSession<MockTransport>,
        script: &Script,
        period: Duration,
        running: &AtomicBool,
        summary: &mut Summary,
    ) -> Result<()> {
        for (index, step) in script.steps.iter().enumerate() {
            if !running.load(Ordering::SeqCst) {
                break;
            }
            let result = match step {
                ScriptStep::Enable { surface, on } => {
                    session.enable(*surface, *on).map(|_| ()).map_err(anyhow::Error::from)
                },
                ScriptStep::Input { repeat, .. } => match step.command() {
                    Some(command) => {
                        self.run_input(session, &command, *repeat, period, running, summary);
                        Ok(())
                    },
                    None => Ok(()),
                },
                ScriptStep::Action { name } => name
                    .parse::<RobotAction>()
                    .map_err(ControlError::from)
                    .and_then(|action| session.robot_action(action))
                    .map(|outcome| info!("Action {} -> {:?}", name, outcome))
                    .map_err(anyhow::Error::from),
                ScriptStep::Preset { preset } => {
                    session.apply_preset(*preset);
                    Ok(())
                },
                ScriptStep::Wait { duration_ms } => {
                    std::thread::sleep(Duration::from_millis(*duration_ms));
                    Ok(())
                },
            };

            if let Err(e) = result {
                if self.continue_on_error {
                    warn!("Step {} failed: {}", index, e);
                } else {
                    return Err(e.context(format!("Step {} failed", index)));
                }
            }
        }
        Ok(())
    }

    fn run_input(
        &self,
        session: &ControlSession<MockTransport>,
        command: &Command,
        repeat: u32,
        period: Duration,
        running: &AtomicBool,
        summary: &mut Summary,
    ) {
        for _ in 0..repeat {
            if !running.load(Ordering::SeqCst) {
                return;
            }
            let tick_started = Instant::now();
            summary.ticks += 1;

            match session.process_movement(command) {
                Ok(out) => {
                    if out.should_send {
                        summary.sent += 1;
                    } else {
                        summary.suppressed += 1;
                    }
                    self.print_tick(summary.ticks, &out);
                },
                Err(e) => {
                    summary.rejected += 1;
                    warn!("Tick {} rejected: {}", summary.ticks, e);
                },
            }

            if let Some(remaining) = period.checked_sub(tick_started.elapsed()) {
                std::thread::sleep(remaining);
            }
        }
    }

    fn print_tick(&self, tick: u64, out: &OutboundVelocity) {
        if self.json {
            match serde_json::to_string(out) {
                Ok(line) => println!("{}", line),
                Err(e) => warn!("Failed to serialize tick {}: {}", tick, e),
            }
            return;
        }
        println!(
            "{:>5} {:>7.3} {:>7.3} {:>7.3} {:>7.3} {:>7.4} {:>7.4} {:>7.4} {:>7.4} {:>5}",
            tick,
            out.vx,
            out.vy,
            out.vyaw,
            out.pitch,
            out.lx,
            out.ly,
            out.rx,
            out.ry,
            if out.should_send { "send" } else { "-" }
        );
    }
}

fn print_header() {
    println!(
        "{:>5} {:>7} {:>7} {:>7} {:>7} {:>7} {:>7} {:>7} {:>7} {:>5}",
        "tick", "vx", "vy", "vyaw", "pitch", "lx", "ly", "rx", "ry", "out"
    );
}
