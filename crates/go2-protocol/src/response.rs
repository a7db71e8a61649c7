//! 请求应答解析
//!
//! 应答结构：`{"data": {"header": {"status": {"code": 0}}, "data": "<json string>"}}`，
//! 其中内层 `data` 是再次编码的 JSON 字符串。

use crate::ProtocolError;
use serde_json::Value;

/// 取出应答中再次编码的 `data.data` 字段并解析
fn inner_payload(response: &Value) -> Result<Value, ProtocolError> {
    let data = response
        .get("data")
        .ok_or(ProtocolError::MissingField("data"))?;
    let raw = data
        .get("data")
        .ok_or(ProtocolError::MissingField("data.data"))?;
    match raw {
        Value::String(text) => Ok(serde_json::from_str(text)?),
        // 部分固件直接返回对象
        Value::Object(_) => Ok(raw.clone()),
        _ => Err(ProtocolError::UnexpectedType {
            field: "data.data",
            expected: "string",
        }),
    }
}

/// 读取应答头中的状态码，缺失时视为成功
fn status_code(response: &Value) -> i64 {
    response
        .pointer("/data/header/status/code")
        .and_then(Value::as_i64)
        .unwrap_or(0)
}

/// 解析 MotionSwitcher `CHECK_MODE` 应答，返回当前模式名
///
/// 应答中没有 `name` 字段时返回 `"unknown"`。
pub fn parse_motion_mode(response: &Value) -> Result<String, ProtocolError> {
    let code = status_code(response);
    if code != 0 {
        return Err(ProtocolError::StatusCode(code));
    }
    let payload = inner_payload(response)?;
    Ok(payload
        .get("name")
        .and_then(Value::as_str)
        .unwrap_or("unknown")
        .to_string())
}

/// 解析避障 `SWITCH_GET` 应答
///
/// # 错误
///
/// - 状态码非零：`ProtocolError::StatusCode`
/// - 缺少 `data.data`：`ProtocolError::MissingField`
///
/// 调用方在出错时应把避障状态视为关闭。
pub fn parse_obstacle_avoid_state(response: &Value) -> Result<bool, ProtocolError> {
    if response.get("data").is_none() {
        return Err(ProtocolError::MissingField("data"));
    }
    // 避障服务要求状态头存在
    let code = response
        .pointer("/data/header/status/code")
        .and_then(Value::as_i64)
        .unwrap_or(-1);
    if code != 0 {
        return Err(ProtocolError::StatusCode(code));
    }
    let payload = inner_payload(response)?;
    Ok(payload
        .get("enable")
        .and_then(Value::as_bool)
        .unwrap_or(false))
}
