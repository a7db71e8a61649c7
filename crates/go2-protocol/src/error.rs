//! 协议层错误类型定义

use thiserror::Error;

/// 协议层错误类型
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// 应答或遥测消息缺少必需字段
    #[error("Missing field: {0}")]
    MissingField(&'static str),

    /// 字段类型不符
    #[error("Unexpected type for field {field}: expected {expected}")]
    UnexpectedType {
        field: &'static str,
        expected: &'static str,
    },

    /// 嵌套 JSON 字符串解析失败
    #[error("Invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// 机器人返回非零状态码
    #[error("Robot returned status code {0}")]
    StatusCode(i64),

    /// 未知的动作名称
    #[error("Unknown action: {0}")]
    UnknownAction(String),
}
