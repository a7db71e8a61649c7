//! # Go2 Transport Layer
//!
//! 传输层抽象。真实实现（WebRTC 数据通道）不在本仓库内，
//! 上层只通过 [`Transport`] trait 访问连接。
//!
//! # 线程模型
//!
//! `Transport` 的所有方法只会在协调器的事件循环线程上调用，
//! 因此 trait 本身不要求 `Send`/`Sync`；返回的 Future 也不要求 `Send`。
//! 只有把实例移交给事件循环时需要 `Send`。

use go2_protocol::{ProtocolError, Topic};
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;

mod method;
#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use method::ConnectionMethod;
#[cfg(any(test, feature = "mock"))]
pub use mock::{MockFailure, MockTransport, PublishKind, Published};

/// 订阅回调
///
/// 回调在传输层的接收上下文中执行，必须快速返回，不得阻塞。
pub type MessageHandler = Arc<dyn Fn(&Value) + Send + Sync>;

/// 传输层统一错误类型
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Transport not connected")]
    NotConnected,
    #[error("Invalid connection config: {0}")]
    InvalidConfig(String),
    #[error("Connect failed: {0}")]
    Connect(String),
    #[error("Request on {topic} failed: {message}")]
    Request { topic: Topic, message: String },
    #[error("Publish on {topic} failed: {message}")]
    Publish { topic: Topic, message: String },
    #[error("Subscription on {topic} failed: {message}")]
    Subscription { topic: Topic, message: String },
    #[error("Heartbeat error: {0}")]
    Heartbeat(String),
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}

/// 与机器人的连接
///
/// 对应外部传输库暴露的窄接口：连接/断开、请求-应答、无回执发布、订阅。
pub trait Transport: 'static {
    /// 建立连接
    fn connect(&self) -> impl Future<Output = Result<(), TransportError>>;

    /// 关闭连接
    fn disconnect(&self) -> impl Future<Output = Result<(), TransportError>>;

    /// 发送请求并等待应答
    ///
    /// 用于模式切换、查询等低频操作。
    fn publish_request(
        &self,
        topic: Topic,
        payload: Value,
    ) -> impl Future<Output = Result<Value, TransportError>>;

    /// 发布消息，不等待应答
    ///
    /// 用于 30-60Hz 的运动指令热路径。
    fn publish_fire_and_forget(&self, topic: Topic, payload: Value) -> Result<(), TransportError>;

    /// 订阅 Topic，同一 Topic 重复订阅会替换旧回调
    fn subscribe(&self, topic: Topic, handler: MessageHandler) -> Result<(), TransportError>;

    fn unsubscribe(&self, topic: Topic) -> Result<(), TransportError>;

    /// 停止保活心跳（没有心跳机制的传输可以不实现）
    fn stop_heartbeat(&self) -> Result<(), TransportError> {
        Ok(())
    }

    /// 关闭省流模式（打开激光雷达前需要）
    fn disable_traffic_saving(
        &self,
        _disable: bool,
    ) -> impl Future<Output = Result<(), TransportError>> {
        async { Ok(()) }
    }
}
