//! 控制层错误类型

use go2_driver::DriverError;
use go2_protocol::ProtocolError;
use thiserror::Error;

/// 控制层错误
///
/// 前三个变体是前置条件检查失败，同步返回，不会产生任何传输流量。
#[derive(Error, Debug)]
pub enum ControlError {
    #[error("Robot not connected")]
    NotConnected,

    /// 没有启用任何控制面
    #[error("No control surface enabled")]
    ControlInactive,

    #[error("Emergency stop active")]
    EmergencyStopActive,

    #[error("Unknown action: {0}")]
    UnknownAction(String),

    #[error("Driver error: {0}")]
    Driver(#[from] DriverError),

    #[error("Protocol error: {0}")]
    Protocol(ProtocolError),
}

impl From<ProtocolError> for ControlError {
    fn from(err: ProtocolError) -> Self {
        match err {
            ProtocolError::UnknownAction(name) => ControlError::UnknownAction(name),
            other => ControlError::Protocol(other),
        }
    }
}
