//! 连接方式定义

use crate::TransportError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 连接方式
///
/// - `LocalAp`: 直连机器人热点
/// - `LocalSta`: 同一局域网，需要 IP 或序列号之一
/// - `Remote`: 经云端中转，需要序列号、用户名、密码
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method")]
pub enum ConnectionMethod {
    #[serde(rename = "LocalAP")]
    LocalAp,
    #[serde(rename = "LocalSTA")]
    LocalSta {
        #[serde(default)]
        ip: Option<String>,
        #[serde(default)]
        serial_number: Option<String>,
    },
    #[serde(rename = "Remote")]
    Remote {
        serial_number: String,
        username: String,
        password: String,
    },
}

fn non_empty(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.trim().is_empty())
}

impl ConnectionMethod {
    /// 校验必需参数
    ///
    /// # 错误
    ///
    /// 缺少参数时返回 `TransportError::InvalidConfig`。
    pub fn validate(&self) -> Result<(), TransportError> {
        match self {
            ConnectionMethod::LocalAp => Ok(()),
            ConnectionMethod::LocalSta { ip, serial_number } => {
                if non_empty(ip) || non_empty(serial_number) {
                    Ok(())
                } else {
                    Err(TransportError::InvalidConfig(
                        "IP or serial number required for LocalSTA".to_string(),
                    ))
                }
            },
            ConnectionMethod::Remote {
                serial_number,
                username,
                password,
            } => {
                if [serial_number, username, password]
                    .iter()
                    .any(|v| v.trim().is_empty())
                {
                    Err(TransportError::InvalidConfig(
                        "Serial number, username and password required for Remote".to_string(),
                    ))
                } else {
                    Ok(())
                }
            },
        }
    }

    /// 连接方式名称（日志与前端展示）
    pub fn name(&self) -> &'static str {
        match self {
            ConnectionMethod::LocalAp => "LocalAP",
            ConnectionMethod::LocalSta { .. } => "LocalSTA",
            ConnectionMethod::Remote { .. } => "Remote",
        }
    }
}

// 手动实现，避免密码进入日志
impl fmt::Debug for ConnectionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionMethod::LocalAp => f.write_str("LocalAp"),
            ConnectionMethod::LocalSta { ip, serial_number } => f
                .debug_struct("LocalSta")
                .field("ip", ip)
                .field("serial_number", serial_number)
                .finish(),
            ConnectionMethod::Remote {
                serial_number,
                username,
                ..
            } => f
                .debug_struct("Remote")
                .field("serial_number", serial_number)
                .field("username", username)
                .field("password", &"***")
                .finish(),
        }
    }
}
