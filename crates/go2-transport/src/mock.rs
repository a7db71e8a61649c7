//! Mock 传输
//!
//! 模拟一台已处于 AI 模式、避障开启的机器人：记录所有发布的消息，
//! 允许测试注入应答、延迟和故障，并手动触发订阅回调。

use crate::{MessageHandler, Transport, TransportError};
use go2_protocol::Topic;
use go2_protocol::api::{motion_switcher, obstacles_avoid};
use parking_lot::Mutex;
use serde_json::{Value, json};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, trace};

/// 发布类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishKind {
    Request,
    FireAndForget,
}

/// 一条已发布的消息
#[derive(Debug, Clone, PartialEq)]
pub struct Published {
    pub topic: Topic,
    pub payload: Value,
    pub kind: PublishKind,
}

impl Published {
    /// 请求负载中的 `api_id`
    pub fn api_id(&self) -> Option<u16> {
        self.payload
            .get("api_id")
            .and_then(Value::as_u64)
            .and_then(|id| u16::try_from(id).ok())
    }
}

/// 可注入的故障点
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockFailure {
    Connect,
    Disconnect,
    Request,
    Publish,
    Unsubscribe,
    Heartbeat,
    TrafficSaving,
}

#[derive(Default)]
struct MockInner {
    connected: AtomicBool,
    heartbeat_stopped: AtomicBool,
    traffic_saving_disabled: AtomicBool,
    published: Mutex<Vec<Published>>,
    /// 调用顺序日志（断开流程的顺序断言使用）
    events: Mutex<Vec<String>>,
    handlers: Mutex<HashMap<Topic, MessageHandler>>,
    responses: Mutex<HashMap<(Topic, u16), Value>>,
    failures: Mutex<HashSet<MockFailure>>,
    request_delay: Mutex<Duration>,
}

/// Mock 传输（可克隆，克隆体共享同一份记录）
#[derive(Clone)]
pub struct MockTransport {
    inner: Arc<MockInner>,
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

/// 构造 `{"data": {"header": {"status": {"code": 0}}, "data": "<json>"}}` 形式的应答
pub fn ok_response(inner: Value) -> Value {
    json!({
        "data": {
            "header": { "status": { "code": 0 } },
            "data": inner.to_string(),
        }
    })
}

impl MockTransport {
    pub fn new() -> Self {
        let mock = Self {
            inner: Arc::new(MockInner::default()),
        };
        mock.set_response(
            Topic::MotionSwitcher,
            motion_switcher::CHECK_MODE,
            ok_response(json!({ "name": motion_switcher::AI_MODE })),
        );
        mock.set_response(
            Topic::ObstaclesAvoid,
            obstacles_avoid::SWITCH_GET,
            ok_response(json!({ "enable": true })),
        );
        mock
    }

    /// 设置某个请求的应答
    pub fn set_response(&self, topic: Topic, api_id: u16, response: Value) {
        self.inner.responses.lock().insert((topic, api_id), response);
    }

    /// 设置请求应答延迟（模拟网络往返）
    pub fn set_request_delay(&self, delay: Duration) {
        *self.inner.request_delay.lock() = delay;
    }

    pub fn fail_on(&self, failure: MockFailure) {
        self.inner.failures.lock().insert(failure);
    }

    pub fn clear_failures(&self) {
        self.inner.failures.lock().clear();
    }

    fn should_fail(&self, failure: MockFailure) -> bool {
        let fail = self.inner.failures.lock().contains(&failure);
        if fail {
            debug!("Mock transport injecting {:?} failure", failure);
        }
        fail
    }

    fn record_event(&self, event: impl Into<String>) {
        let event = event.into();
        trace!("Mock transport event: {}", event);
        self.inner.events.lock().push(event);
    }

    // ==================== 查询接口 ====================

    pub fn is_connected(&self) -> bool {
        self.inner.connected.load(Ordering::Acquire)
    }

    pub fn heartbeat_stopped(&self) -> bool {
        self.inner.heartbeat_stopped.load(Ordering::Acquire)
    }

    pub fn traffic_saving_disabled(&self) -> bool {
        self.inner.traffic_saving_disabled.load(Ordering::Acquire)
    }

    /// 所有已发布消息的快照
    pub fn published(&self) -> Vec<Published> {
        self.inner.published.lock().clone()
    }

    /// 发往某个 Topic 的请求 `api_id` 序列
    pub fn api_ids(&self, topic: Topic) -> Vec<u16> {
        self.published()
            .iter()
            .filter(|p| p.topic == topic && p.kind == PublishKind::Request)
            .filter_map(Published::api_id)
            .collect()
    }

    /// 摇杆仿真负载序列
    pub fn wireless_payloads(&self) -> Vec<Value> {
        self.published()
            .into_iter()
            .filter(|p| p.topic == Topic::WirelessController)
            .map(|p| p.payload)
            .collect()
    }

    pub fn events(&self) -> Vec<String> {
        self.inner.events.lock().clone()
    }

    pub fn is_subscribed(&self, topic: Topic) -> bool {
        self.inner.handlers.lock().contains_key(&topic)
    }

    pub fn clear_published(&self) {
        self.inner.published.lock().clear();
    }

    /// 向订阅者投递一条消息，返回是否存在订阅者
    ///
    /// 回调在锁外执行，回调内部可以再次访问 mock。
    pub fn emit(&self, topic: Topic, message: &Value) -> bool {
        let handler = self.inner.handlers.lock().get(&topic).cloned();
        match handler {
            Some(handler) => {
                handler(message);
                true
            },
            None => false,
        }
    }
}

impl Transport for MockTransport {
    async fn connect(&self) -> Result<(), TransportError> {
        self.record_event("connect");
        if self.should_fail(MockFailure::Connect) {
            return Err(TransportError::Connect("mock connect failure".to_string()));
        }
        self.inner.connected.store(true, Ordering::Release);
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        self.record_event("disconnect");
        self.inner.connected.store(false, Ordering::Release);
        if self.should_fail(MockFailure::Disconnect) {
            return Err(TransportError::Connect("mock disconnect failure".to_string()));
        }
        Ok(())
    }

    async fn publish_request(&self, topic: Topic, payload: Value) -> Result<Value, TransportError> {
        if !self.is_connected() {
            return Err(TransportError::NotConnected);
        }
        let entry = Published {
            topic,
            payload,
            kind: PublishKind::Request,
        };
        let api_id = entry.api_id().unwrap_or(0);
        self.record_event(format!("request:{}:{}", topic, api_id));
        self.inner.published.lock().push(entry);

        let delay = *self.inner.request_delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        if self.should_fail(MockFailure::Request) {
            return Err(TransportError::Request {
                topic,
                message: "mock request failure".to_string(),
            });
        }

        let response = self.inner.responses.lock().get(&(topic, api_id)).cloned();
        Ok(response.unwrap_or_else(|| ok_response(json!({}))))
    }

    fn publish_fire_and_forget(&self, topic: Topic, payload: Value) -> Result<(), TransportError> {
        if !self.is_connected() {
            return Err(TransportError::NotConnected);
        }
        if self.should_fail(MockFailure::Publish) {
            return Err(TransportError::Publish {
                topic,
                message: "mock publish failure".to_string(),
            });
        }
        self.inner.published.lock().push(Published {
            topic,
            payload,
            kind: PublishKind::FireAndForget,
        });
        Ok(())
    }

    fn subscribe(&self, topic: Topic, handler: MessageHandler) -> Result<(), TransportError> {
        self.record_event(format!("subscribe:{}", topic));
        self.inner.handlers.lock().insert(topic, handler);
        Ok(())
    }

    fn unsubscribe(&self, topic: Topic) -> Result<(), TransportError> {
        self.record_event(format!("unsubscribe:{}", topic));
        if self.should_fail(MockFailure::Unsubscribe) {
            return Err(TransportError::Subscription {
                topic,
                message: "mock unsubscribe failure".to_string(),
            });
        }
        self.inner.handlers.lock().remove(&topic);
        Ok(())
    }

    fn stop_heartbeat(&self) -> Result<(), TransportError> {
        self.record_event("stop_heartbeat");
        if self.should_fail(MockFailure::Heartbeat) {
            return Err(TransportError::Heartbeat("mock heartbeat failure".to_string()));
        }
        self.inner.heartbeat_stopped.store(true, Ordering::Release);
        Ok(())
    }

    async fn disable_traffic_saving(&self, disable: bool) -> Result<(), TransportError> {
        self.record_event("disable_traffic_saving");
        if self.should_fail(MockFailure::TrafficSaving) {
            return Err(TransportError::Publish {
                topic: Topic::UlidarSwitch,
                message: "mock traffic saving failure".to_string(),
            });
        }
        self.inner
            .traffic_saving_disabled
            .store(disable, Ordering::Release);
        Ok(())
    }
}
