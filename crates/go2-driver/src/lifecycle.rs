//! 连接生命周期
//!
//! 以下函数都运行在事件循环线程上，由 [`Coordinator`](crate::Coordinator) 投递。

use crate::coordinator::LoopContext;
use crate::error::DriverError;
use crate::mode::ConnectionPhase;
use crate::state::RobotSwitch;
use crate::telemetry;
use go2_protocol::api::{motion_switcher, obstacles_avoid, sport};
use go2_protocol::{ApiRequest, Topic, parse_motion_mode, parse_obstacle_avoid_state};
use go2_transport::Transport;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// 连接流程中途失败或被取消（超时）时回滚到 Disconnected
struct ConnectGuard<'a, T: Transport> {
    ctx: &'a LoopContext<T>,
    armed: bool,
}

impl<T: Transport> Drop for ConnectGuard<'_, T> {
    fn drop(&mut self) {
        if self.armed {
            warn!("Connect did not complete, rolling back");
            cleanup(self.ctx);
        }
    }
}

/// 建立连接
///
/// 调用方已把阶段置为 Connecting。成功后：连接句柄在槽位中、阶段为 Connected、
/// 遥测已订阅、ping 轮询已启动、避障状态查询已发出。
pub async fn connect<T: Transport>(ctx: LoopContext<T>, transport: T) -> Result<(), DriverError> {
    let mut guard = ConnectGuard {
        ctx: &ctx,
        armed: true,
    };

    transport.connect().await?;
    let transport = ctx.install(transport);
    ctx.state().set_connection_phase(ConnectionPhase::Connected);
    info!("Connection established");

    telemetry::subscribe_all(&*transport, ctx.state())?;
    start_status_polling(&ctx);

    let query_ctx = ctx.clone();
    tokio::task::spawn_local(async move {
        query_obstacle_avoid(&query_ctx).await;
    });

    guard.armed = false;
    Ok(())
}

/// 断开连接
///
/// 每一步都是尽力而为：失败只记录日志，后续步骤照常执行。
pub async fn disconnect<T: Transport>(ctx: LoopContext<T>) -> Result<(), DriverError> {
    let Ok(transport) = ctx.transport() else {
        warn!("No active connection to disconnect");
        return Ok(());
    };
    let state = ctx.state();
    let config = ctx.config();

    info!("Disconnecting from robot");

    // 先置为非连接，后台轮询在下一轮检查时退出
    state.set_connection_phase(ConnectionPhase::Disconnecting);

    state.disable_all_surfaces();
    info!("All control surfaces disabled");

    tokio::time::sleep(config.disconnect_grace).await;

    match transport.stop_heartbeat() {
        Ok(()) => info!("Heartbeat stopped"),
        Err(e) => error!("Error stopping heartbeat: {}", e),
    }

    for topic in Topic::TELEMETRY {
        match transport.unsubscribe(topic) {
            Ok(()) => info!("Unsubscribed from {}", topic),
            Err(e) => error!("Error unsubscribing from {}: {}", topic, e),
        }
    }

    tokio::time::sleep(config.unsubscribe_settle).await;

    match transport.disconnect().await {
        Ok(()) => info!("Connection closed"),
        Err(e) => error!("Error closing connection: {}", e),
    }

    drop(transport);
    ctx.take_transport();
    state.set_connection_phase(ConnectionPhase::Disconnected);
    info!("Disconnect complete");
    Ok(())
}

/// 清理连接资源
///
/// 中止轮询、释放连接句柄、重置连接相关的遥测与开关，阶段回到 Disconnected。
pub fn cleanup<T: Transport>(ctx: &LoopContext<T>) {
    ctx.abort_polling();
    if ctx.take_transport().is_some() {
        debug!("Connection handle released");
    }
    ctx.state().reset_telemetry();
    ctx.state().set_connection_phase(ConnectionPhase::Disconnected);
}

/// 机器人初始化：切换到 AI 模式并进入 FreeWalk
pub async fn initialize_robot<T: Transport>(ctx: LoopContext<T>) -> Result<(), DriverError> {
    let config = ctx.config();
    info!("Initializing robot");

    let response = ctx
        .request(
            Topic::MotionSwitcher,
            ApiRequest::new(motion_switcher::CHECK_MODE).to_value(),
        )
        .await?;
    let mode = parse_motion_mode(&response)?;
    info!("Current motion mode: {}", mode);
    ctx.state().set_current_mode(&mode);

    if mode != motion_switcher::AI_MODE {
        info!("Switching from {} to AI mode", mode);
        ctx.request(
            Topic::MotionSwitcher,
            ApiRequest::select_mode(motion_switcher::AI_MODE).to_value(),
        )
        .await?;
        tokio::time::sleep(config.mode_switch_settle).await;
        ctx.state().set_current_mode(motion_switcher::AI_MODE);
        info!("Switched to AI mode");
    }

    ctx.request(Topic::SportMod, ApiRequest::new(sport::FREE_WALK).to_value())
        .await?;
    tokio::time::sleep(config.free_walk_settle).await;
    info!("Robot initialized (AI mode + FreeWalk)");

    query_obstacle_avoid(&ctx).await;

    // 机器人开机时激光雷达默认开启
    ctx.state().set_switch(RobotSwitch::Lidar, true);
    Ok(())
}

/// 查询避障开关状态并写入共享状态；任何失败都按关闭处理
pub async fn query_obstacle_avoid<T: Transport>(ctx: &LoopContext<T>) -> bool {
    let result = async {
        let response = ctx
            .request(
                Topic::ObstaclesAvoid,
                ApiRequest::new(obstacles_avoid::SWITCH_GET).to_value(),
            )
            .await?;
        Ok::<_, DriverError>(parse_obstacle_avoid_state(&response)?)
    }
    .await;

    let enabled = match result {
        Ok(enabled) => {
            info!(
                "Obstacle avoidance: {}",
                if enabled { "enabled" } else { "disabled" }
            );
            enabled
        },
        Err(e) => {
            warn!("Failed to query obstacle avoidance state: {}", e);
            false
        },
    };
    ctx.state().set_switch(RobotSwitch::ObstacleAvoid, enabled);
    enabled
}

fn start_status_polling<T: Transport>(ctx: &LoopContext<T>) {
    let handle = tokio::task::spawn_local(poll_status(ctx.clone()));
    ctx.set_polling(handle);
    info!("Started periodic ping measurement");
}

/// 周期性测量往返时间
///
/// 每轮开头检查连接阶段，离开 Connected 后自行退出。
async fn poll_status<T: Transport>(ctx: LoopContext<T>) {
    let interval = ctx.config().ping_interval;
    while ctx.state().is_connected() {
        let start = Instant::now();
        match ctx
            .request(
                Topic::MotionSwitcher,
                ApiRequest::new(motion_switcher::CHECK_MODE).to_value(),
            )
            .await
        {
            Ok(_) => {
                let ping_ms = start.elapsed().as_millis() as u64;
                ctx.state().set_ping_ms(ping_ms);
                debug!("Ping: {}ms", ping_ms);
            },
            Err(e) => error!("Error measuring ping: {}", e),
        }
        tokio::time::sleep(interval).await;
    }
    debug!("Status polling exited");
}
