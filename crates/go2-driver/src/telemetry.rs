//! 遥测订阅回调
//!
//! 回调由传输层在接收上下文中调用，只做解析和一次状态写入，不阻塞。

use crate::state::RuntimeState;
use go2_protocol::{LowStateSample, SportStateSample, Topic};
use go2_transport::{MessageHandler, Transport, TransportError};
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error, info, trace, warn};

/// 机身高度变化超过该值才视为状态变化（米）
const BODY_HEIGHT_EPSILON: f64 = 0.01;

/// LOW_STATE：电量与最高温度
pub fn low_state_handler(state: Arc<RuntimeState>) -> MessageHandler {
    Arc::new(move |message: &Value| match LowStateSample::parse(message) {
        Ok(sample) => {
            if sample.temperature_readings == 0 {
                warn!("No temperature data found in LOW_STATE message");
            }
            state.apply_low_state(&sample);
            trace!(
                "LOW_STATE: battery={:?} max_temperature={:?}",
                sample.battery_soc, sample.max_temperature
            );
        },
        Err(e) => error!("Error processing LOW_STATE data: {}", e),
    })
}

/// LF_SPORT_MOD_STATE：步态名称，状态变化时记录日志
pub fn sport_state_handler(state: Arc<RuntimeState>) -> MessageHandler {
    let previous: Mutex<Option<SportStateSample>> = Mutex::new(None);

    Arc::new(move |message: &Value| {
        let sample = match SportStateSample::parse(message) {
            Ok(sample) => sample,
            Err(e) => {
                error!("Error processing LF_SPORT_MOD_STATE data: {}", e);
                return;
            },
        };

        let changed = {
            let mut previous = previous.lock();
            let changed = match previous.as_ref() {
                None => true,
                Some(prev) => {
                    prev.mode != sample.mode
                        || prev.gait != sample.gait
                        || prev.progress != sample.progress
                        || (prev.body_height - sample.body_height).abs() > BODY_HEIGHT_EPSILON
                },
            };
            *previous = Some(sample.clone());
            changed
        };

        let gait_name = sample.gait.name();
        if changed {
            info!(
                "Sport state: mode={:?} gait={} body_height={:.3} progress={}",
                sample.mode, gait_name, sample.body_height, sample.progress
            );
        }
        if state.set_current_mode(&gait_name) {
            debug!("Current mode set to {}", gait_name);
        }
    })
}

/// 订阅全部遥测 Topic
pub fn subscribe_all<T: Transport>(
    transport: &T,
    state: &Arc<RuntimeState>,
) -> Result<(), TransportError> {
    transport.subscribe(Topic::LowState, low_state_handler(state.clone()))?;
    info!("Subscribed to {}", Topic::LowState);
    transport.subscribe(Topic::LfSportModState, sport_state_handler(state.clone()))?;
    info!("Subscribed to {}", Topic::LfSportModState);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_low_state_handler_updates_battery_and_temperature() {
        let state = Arc::new(RuntimeState::new());
        let handler = low_state_handler(state.clone());
        handler(&json!({
            "data": {
                "bms_state": { "soc": 87, "bq_ntc": [30, 31], "mcu_ntc": 29 },
                "motor_state": [{ "temperature": 41 }, { "temperature": 55 }],
                "temperature_ntc1": 38
            }
        }));
        let telemetry = state.telemetry();
        assert_eq!(telemetry.battery_level, Some(87.0));
        assert_eq!(telemetry.max_temperature, Some(55.0));
        assert!(telemetry.last_update.is_some());
    }

    #[test]
    fn test_low_state_handler_ignores_malformed_message() {
        let state = Arc::new(RuntimeState::new());
        let handler = low_state_handler(state.clone());
        handler(&json!({ "unexpected": true }));
        assert_eq!(state.telemetry().battery_level, None);
    }

    #[test]
    fn test_sport_state_handler_sets_gait_name() {
        let state = Arc::new(RuntimeState::new());
        let handler = sport_state_handler(state.clone());
        handler(&json!({ "data": { "mode": 1, "gait_type": 1, "body_height": 0.32 } }));
        assert_eq!(state.telemetry().current_mode, "trot");
        handler(&json!({ "data": { "mode": 1, "gait_type": 7 } }));
        assert_eq!(state.telemetry().current_mode, "gait_7");
    }
}
