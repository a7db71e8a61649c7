//! 单线程事件循环协调器
//!
//! 连接句柄只存在于一个专用 OS 线程上：该线程运行 tokio current-thread 运行时和
//! `LocalSet`，通过无界 mpsc 通道接收任务。其他线程从不接触连接，只投递闭包。
//!
//! # 两种投递方式
//!
//! - [`Coordinator::schedule`]：入队即返回，任务错误只记日志（热路径）
//! - [`Coordinator::schedule_and_wait`]：阻塞等待结果，带超时（连接、断开、模式切换）
//!
//! 在事件循环线程上调用 `schedule_and_wait` 会返回 [`DriverError::ReentrantWait`]，
//! 而不是永久阻塞。

use crate::error::DriverError;
use crate::lifecycle;
use crate::state::RuntimeState;
use go2_protocol::Topic;
use go2_transport::{ConnectionMethod, Transport};
use serde_json::Value;
use std::cell::RefCell;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::sync::Arc;
use std::thread::{JoinHandle, ThreadId, spawn};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::task::LocalSet;
use tracing::{debug, error, info, trace, warn};

/// 事件循环线程上的 Future（不要求 `Send`）
pub type LocalFuture<T> = Pin<Box<dyn Future<Output = T>>>;

type Job<T> = Box<dyn FnOnce(LoopContext<T>) -> LocalFuture<()> + Send>;

enum LoopMessage<T> {
    Run { label: &'static str, job: Job<T> },
    Shutdown,
}

/// 调用方等待时在任务超时之外额外留出的余量
const WAIT_MARGIN: Duration = Duration::from_millis(250);

/// 协调器配置
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordinatorConfig {
    /// 连接超时
    pub connect_timeout: Duration,
    /// 断开超时
    pub disconnect_timeout: Duration,
    /// 单条指令超时
    pub command_timeout: Duration,
    /// 断开时关闭控制后等待后台任务退出的时间
    pub disconnect_grace: Duration,
    /// 取消订阅后等待消息发出的时间
    pub unsubscribe_settle: Duration,
    /// ping 轮询间隔
    pub ping_interval: Duration,
    /// 切换到 AI 模式后的等待时间
    pub mode_switch_settle: Duration,
    /// FreeWalk 之后的等待时间
    pub free_walk_settle: Duration,
    /// Drop 时等待事件循环线程退出的时间
    pub shutdown_timeout: Duration,
    /// 事件循环线程启动握手超时
    pub startup_timeout: Duration,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(30),
            disconnect_timeout: Duration::from_secs(10),
            command_timeout: Duration::from_secs(5),
            disconnect_grace: Duration::from_millis(500),
            unsubscribe_settle: Duration::from_millis(200),
            ping_interval: Duration::from_secs(3),
            mode_switch_settle: Duration::from_secs(5),
            free_walk_settle: Duration::from_secs(1),
            shutdown_timeout: Duration::from_secs(2),
            startup_timeout: Duration::from_secs(2),
        }
    }
}

/// 任务在事件循环线程上拿到的上下文
///
/// 持有连接槽位（线程本地，`Rc<RefCell<..>>`）和共享状态。
/// `RefCell` 借用从不跨越 `.await`：访问器只克隆出 `Rc` 后立即释放。
pub struct LoopContext<T> {
    slot: Rc<RefCell<Option<Rc<T>>>>,
    polling: Rc<RefCell<Option<tokio::task::JoinHandle<()>>>>,
    state: Arc<RuntimeState>,
    config: CoordinatorConfig,
}

impl<T> Clone for LoopContext<T> {
    fn clone(&self) -> Self {
        Self {
            slot: self.slot.clone(),
            polling: self.polling.clone(),
            state: self.state.clone(),
            config: self.config,
        }
    }
}

impl<T: Transport> LoopContext<T> {
    fn new(state: Arc<RuntimeState>, config: CoordinatorConfig) -> Self {
        Self {
            slot: Rc::new(RefCell::new(None)),
            polling: Rc::new(RefCell::new(None)),
            state,
            config,
        }
    }

    /// 当前连接；没有连接时返回 `NotConnected`
    pub fn transport(&self) -> Result<Rc<T>, DriverError> {
        self.slot.borrow().clone().ok_or(DriverError::NotConnected)
    }

    pub fn has_transport(&self) -> bool {
        self.slot.borrow().is_some()
    }

    /// 放入新连接（替换旧连接）
    pub fn install(&self, transport: T) -> Rc<T> {
        let transport = Rc::new(transport);
        *self.slot.borrow_mut() = Some(transport.clone());
        transport
    }

    /// 取出连接，槽位清空
    pub fn take_transport(&self) -> Option<Rc<T>> {
        self.slot.borrow_mut().take()
    }

    /// 登记后台轮询任务（旧任务会被中止）
    pub fn set_polling(&self, handle: tokio::task::JoinHandle<()>) {
        if let Some(old) = self.polling.borrow_mut().replace(handle) {
            old.abort();
        }
    }

    /// 中止后台轮询任务
    pub fn abort_polling(&self) {
        if let Some(handle) = self.polling.borrow_mut().take() {
            handle.abort();
            debug!("Status polling task aborted");
        }
    }

    pub fn state(&self) -> &Arc<RuntimeState> {
        &self.state
    }

    pub fn config(&self) -> CoordinatorConfig {
        self.config
    }

    /// 发送请求并等待应答
    pub async fn request(&self, topic: Topic, payload: Value) -> Result<Value, DriverError> {
        let transport = self.transport()?;
        Ok(transport.publish_request(topic, payload).await?)
    }

    /// 发布消息，不等待应答
    pub fn publish(&self, topic: Topic, payload: Value) -> Result<(), DriverError> {
        let transport = self.transport()?;
        Ok(transport.publish_fire_and_forget(topic, payload)?)
    }
}

/// 等待线程退出（带超时）
trait JoinTimeout {
    fn join_timeout(self, timeout: Duration) -> std::thread::Result<()>;
}

impl<T: Send + 'static> JoinTimeout for JoinHandle<T> {
    fn join_timeout(self, timeout: Duration) -> std::thread::Result<()> {
        let (tx, rx) = crossbeam_channel::bounded(1);

        // 看门狗线程代为 join，超时后它会继续运行直到目标线程退出
        spawn(move || {
            let _ = tx.send(self.join().map(|_| ()));
        });

        match rx.recv_timeout(timeout) {
            Ok(join_result) => join_result,
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => Err(Box::new(
                std::io::Error::new(std::io::ErrorKind::TimedOut, "Thread join timeout"),
            )),
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => {
                Err(Box::new(std::io::Error::new(
                    std::io::ErrorKind::ConnectionReset,
                    "Thread panicked during join",
                )))
            },
        }
    }
}

/// 事件循环协调器
///
/// 无论 `T` 是否 `Send`，协调器本身都是 `Send + Sync`：连接实例只在事件循环线程上创建
/// 引用，跨线程传递的只有闭包。
pub struct Coordinator<T: Transport> {
    sender: mpsc::UnboundedSender<LoopMessage<T>>,
    state: Arc<RuntimeState>,
    config: CoordinatorConfig,
    loop_thread: Option<JoinHandle<()>>,
    loop_thread_id: ThreadId,
}

impl<T: Transport> Coordinator<T> {
    /// 启动事件循环线程
    ///
    /// 等待线程内的运行时构建完成后才返回。
    pub fn spawn(state: Arc<RuntimeState>, config: CoordinatorConfig) -> Result<Self, DriverError> {
        let (sender, receiver) = mpsc::unbounded_channel();
        let (ready_tx, ready_rx) = crossbeam_channel::bounded(1);

        let loop_state = state.clone();
        let handle = std::thread::Builder::new()
            .name("go2-event-loop".to_string())
            .spawn(move || run_event_loop::<T>(receiver, loop_state, config, ready_tx))
            .map_err(|e| DriverError::EventLoop(format!("Failed to spawn event loop: {}", e)))?;

        match ready_rx.recv_timeout(config.startup_timeout) {
            Ok(Ok(())) => {},
            Ok(Err(msg)) => return Err(DriverError::EventLoop(msg)),
            Err(_) => {
                return Err(DriverError::EventLoop(
                    "Event loop did not start in time".to_string(),
                ));
            },
        }

        let loop_thread_id = handle.thread().id();
        info!("Event loop thread started");

        Ok(Self {
            sender,
            state,
            config,
            loop_thread: Some(handle),
            loop_thread_id,
        })
    }

    pub fn state(&self) -> &Arc<RuntimeState> {
        &self.state
    }

    pub fn config(&self) -> CoordinatorConfig {
        self.config
    }

    /// 当前线程是否就是事件循环线程
    pub fn on_loop_thread(&self) -> bool {
        std::thread::current().id() == self.loop_thread_id
    }

    /// 投递任务，入队即返回
    ///
    /// 任务的错误以 `warn!` 记录，不会返回给调用方。
    pub fn schedule<F, Fut>(&self, label: &'static str, job: F) -> Result<(), DriverError>
    where
        F: FnOnce(LoopContext<T>) -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), DriverError>> + 'static,
    {
        let job: Job<T> = Box::new(move |ctx| -> LocalFuture<()> {
            Box::pin(async move {
                if let Err(e) = job(ctx).await {
                    warn!("Job '{}' failed: {}", label, e);
                }
            })
        });
        self.sender
            .send(LoopMessage::Run { label, job })
            .map_err(|_| DriverError::LoopClosed)
    }

    /// 投递任务并阻塞等待结果
    ///
    /// 任务在循环侧同样受 `timeout` 约束，超时后被取消。
    pub fn schedule_and_wait<F, Fut, R>(
        &self,
        label: &'static str,
        timeout: Duration,
        job: F,
    ) -> Result<R, DriverError>
    where
        F: FnOnce(LoopContext<T>) -> Fut + Send + 'static,
        Fut: Future<Output = Result<R, DriverError>> + 'static,
        R: Send + 'static,
    {
        if self.on_loop_thread() {
            error!("Blocking wait for '{}' on the event loop thread", label);
            return Err(DriverError::ReentrantWait(label));
        }

        let (reply_tx, reply_rx) = crossbeam_channel::bounded(1);
        let job: Job<T> = Box::new(move |ctx| -> LocalFuture<()> {
            Box::pin(async move {
                let result = match tokio::time::timeout(timeout, job(ctx)).await {
                    Ok(result) => result,
                    Err(_) => {
                        warn!("Job '{}' timed out after {:?}", label, timeout);
                        Err(DriverError::Timeout)
                    },
                };
                // 调用方可能已超时放弃
                let _ = reply_tx.send(result);
            })
        });
        self.sender
            .send(LoopMessage::Run { label, job })
            .map_err(|_| DriverError::LoopClosed)?;

        match reply_rx.recv_timeout(timeout + WAIT_MARGIN) {
            Ok(result) => result,
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => Err(DriverError::Timeout),
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => Err(DriverError::LoopClosed),
        }
    }

    // ==================== 常用操作 ====================

    /// 建立连接（阻塞，默认 30 s 超时）
    pub fn connect(&self, method: &ConnectionMethod, transport: T) -> Result<(), DriverError>
    where
        T: Send,
    {
        method.validate()?;
        if !self.state.try_begin_connect() {
            return Err(DriverError::AlreadyConnected);
        }
        info!("Connecting via {}", method.name());

        let started = Instant::now();
        let result = self.schedule_and_wait("connect", self.config.connect_timeout, move |ctx| {
            lifecycle::connect(ctx, transport)
        });
        match &result {
            Ok(()) => info!("Connected in {:?}", started.elapsed()),
            Err(DriverError::LoopClosed) => {
                self.state
                    .set_connection_phase(crate::mode::ConnectionPhase::Disconnected);
            },
            Err(e) => error!("Connect failed: {}", e),
        }
        result
    }

    /// 断开连接（阻塞，默认 10 s 超时），随后清理连接相关状态
    pub fn disconnect(&self) -> Result<(), DriverError> {
        let result = self.schedule_and_wait(
            "disconnect",
            self.config.disconnect_timeout,
            lifecycle::disconnect,
        );
        if let Err(e) = &result {
            error!("Disconnect failed: {}", e);
        }
        let cleanup = self.cleanup();
        result.and(cleanup)
    }

    /// 清理连接资源（中止轮询、释放连接、重置遥测）
    pub fn cleanup(&self) -> Result<(), DriverError> {
        self.schedule_and_wait("cleanup", self.config.command_timeout, |ctx| async move {
            lifecycle::cleanup(&ctx);
            Ok(())
        })
    }

    /// 机器人初始化（AI 模式 + FreeWalk），不等待完成
    pub fn initialize_robot(&self) -> Result<(), DriverError> {
        self.schedule("initialize_robot", lifecycle::initialize_robot)
    }

    /// 发送请求，不等待应答
    pub fn request(&self, label: &'static str, topic: Topic, payload: Value) -> Result<(), DriverError> {
        self.schedule(label, move |ctx| async move {
            ctx.request(topic, payload).await.map(|_| ())
        })
    }

    /// 发送请求并等待应答（单条指令超时）
    pub fn request_and_wait(
        &self,
        label: &'static str,
        topic: Topic,
        payload: Value,
    ) -> Result<Value, DriverError> {
        self.schedule_and_wait(label, self.config.command_timeout, move |ctx| async move {
            ctx.request(topic, payload).await
        })
    }

    /// 无回执发布（热路径）
    pub fn publish(&self, label: &'static str, topic: Topic, payload: Value) -> Result<(), DriverError> {
        self.schedule(label, move |ctx| async move { ctx.publish(topic, payload) })
    }
}

impl<T: Transport> Drop for Coordinator<T> {
    fn drop(&mut self) {
        // 通道关闭同样会让循环退出，显式发送 Shutdown 使退出不依赖 Sender 的释放顺序
        let _ = self.sender.send(LoopMessage::Shutdown);

        let join_timeout = self.config.shutdown_timeout;
        if let Some(handle) = self.loop_thread.take()
            && let Err(_e) = handle.join_timeout(join_timeout)
        {
            error!(
                "Event loop thread panicked or failed to shut down within {:?}",
                join_timeout
            );
        }
    }
}

/// 事件循环线程主函数
fn run_event_loop<T: Transport>(
    mut receiver: mpsc::UnboundedReceiver<LoopMessage<T>>,
    state: Arc<RuntimeState>,
    config: CoordinatorConfig,
    ready: crossbeam_channel::Sender<Result<(), String>>,
) {
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_time().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            let _ = ready.send(Err(format!("Failed to build runtime: {}", e)));
            return;
        },
    };
    let local = LocalSet::new();
    let ctx = LoopContext::<T>::new(state, config);
    let _ = ready.send(Ok(()));

    local.block_on(&runtime, async move {
        while let Some(message) = receiver.recv().await {
            match message {
                LoopMessage::Run { label, job } => {
                    trace!("Running job '{}'", label);
                    tokio::task::spawn_local(job(ctx.clone()));
                },
                LoopMessage::Shutdown => break,
            }
        }
        ctx.abort_polling();
        if ctx.take_transport().is_some() {
            warn!("Event loop shut down with an open connection");
        }
    });

    debug!("Event loop exited");
}

#[cfg(test)]
mod tests {
    use super::*;
    use go2_transport::MockTransport;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn coordinator() -> Coordinator<MockTransport> {
        Coordinator::spawn(Arc::new(RuntimeState::new()), CoordinatorConfig::default()).unwrap()
    }

    #[test]
    fn test_coordinator_is_send_sync() {
        fn assert_send_sync<S: Send + Sync>() {}
        assert_send_sync::<Coordinator<MockTransport>>();
    }

    #[test]
    fn test_jobs_run_on_loop_thread() {
        let coordinator = coordinator();
        let caller = std::thread::current().id();
        let loop_id = coordinator
            .schedule_and_wait("thread_id", Duration::from_secs(1), |_ctx| async move {
                Ok(std::thread::current().id())
            })
            .unwrap();
        assert_ne!(loop_id, caller);
        assert!(!coordinator.on_loop_thread());
    }

    #[test]
    fn test_jobs_run_in_submission_order() {
        let coordinator = coordinator();
        let counter = Arc::new(AtomicUsize::new(0));
        let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
        for i in 0..10 {
            let counter = counter.clone();
            let seen = seen.clone();
            coordinator
                .schedule("count", move |_ctx| async move {
                    seen.lock().push(i);
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                })
                .unwrap();
        }
        // 阻塞任务排在所有已入队任务之后
        coordinator
            .schedule_and_wait("barrier", Duration::from_secs(1), |_ctx| async move { Ok(()) })
            .unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 10);
        assert_eq!(*seen.lock(), (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn test_schedule_and_wait_times_out() {
        let coordinator = coordinator();
        let result: Result<(), _> =
            coordinator.schedule_and_wait("stall", Duration::from_millis(50), |_ctx| async move {
                tokio::time::sleep(Duration::from_secs(10)).await;
                Ok(())
            });
        assert!(matches!(result, Err(DriverError::Timeout)));

        // 超时的任务被取消，循环仍然可用
        let value = coordinator
            .schedule_and_wait("after", Duration::from_secs(1), |_ctx| async move { Ok(7) })
            .unwrap();
        assert_eq!(value, 7);
    }

    #[test]
    fn test_job_error_is_returned_to_waiter() {
        let coordinator = coordinator();
        let result: Result<(), _> =
            coordinator.schedule_and_wait("no_transport", Duration::from_secs(1), |ctx| async move {
                ctx.transport().map(|_| ())
            });
        assert!(matches!(result, Err(DriverError::NotConnected)));
    }

    #[test]
    fn test_scheduled_job_error_is_swallowed() {
        let coordinator = coordinator();
        coordinator
            .schedule("fails", |_ctx| async move { Err(DriverError::Timeout) })
            .unwrap();
        coordinator
            .schedule_and_wait("barrier", Duration::from_secs(1), |_ctx| async move { Ok(()) })
            .unwrap();
    }

    #[test]
    fn test_drop_joins_loop_thread() {
        let coordinator = coordinator();
        let start = Instant::now();
        drop(coordinator);
        assert!(start.elapsed() < Duration::from_secs(2));
    }
}
