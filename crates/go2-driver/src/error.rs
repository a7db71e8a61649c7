//! 驱动层错误类型定义

use go2_protocol::ProtocolError;
use go2_transport::TransportError;
use thiserror::Error;

/// 驱动层错误类型
#[derive(Error, Debug)]
pub enum DriverError {
    /// 传输层错误
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// 协议解析错误
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// 没有活动连接
    #[error("Robot not connected")]
    NotConnected,

    /// 已连接或正在连接
    #[error("Robot already connected")]
    AlreadyConnected,

    /// 事件循环已退出，任务无法入队
    #[error("Event loop closed")]
    LoopClosed,

    /// 事件循环线程错误（启动失败等）
    #[error("Event loop error: {0}")]
    EventLoop(String),

    /// 在事件循环线程上调用了阻塞等待接口
    ///
    /// 阻塞等待会让事件循环永远无法执行被等待的任务，直接拒绝。
    #[error("Blocking wait for '{0}' called from the event loop thread")]
    ReentrantWait(&'static str),

    /// 操作超时
    #[error("Operation timeout")]
    Timeout,

    /// 无效输入
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

#[cfg(test)]
mod tests {
    use super::DriverError;
    use go2_protocol::{ProtocolError, Topic};
    use go2_transport::TransportError;

    #[test]
    fn test_driver_error_display() {
        let driver_error = DriverError::Transport(TransportError::NotConnected);
        let msg = format!("{}", driver_error);
        assert!(msg.contains("Transport error"), "Transport error message: {}", msg);

        let driver_error = DriverError::LoopClosed;
        assert_eq!(format!("{}", driver_error), "Event loop closed");

        let driver_error = DriverError::Timeout;
        assert_eq!(format!("{}", driver_error), "Operation timeout");

        let driver_error = DriverError::ReentrantWait("connect");
        let msg = format!("{}", driver_error);
        assert!(msg.contains("connect") && msg.contains("event loop thread"));

        let driver_error = DriverError::EventLoop("runtime build failed".to_string());
        assert!(format!("{}", driver_error).contains("runtime build failed"));
    }

    #[test]
    fn test_from_transport_error() {
        let err: DriverError = TransportError::Request {
            topic: Topic::SportMod,
            message: "boom".to_string(),
        }
        .into();
        match err {
            DriverError::Transport(TransportError::Request { topic, .. }) => {
                assert_eq!(topic, Topic::SportMod)
            },
            _ => panic!("Expected Transport variant"),
        }
    }

    #[test]
    fn test_from_protocol_error() {
        let err: DriverError = ProtocolError::StatusCode(3203).into();
        assert!(matches!(
            err,
            DriverError::Protocol(ProtocolError::StatusCode(3203))
        ));
    }
}
