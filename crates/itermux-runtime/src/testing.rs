//! Scripted `AutomationBridge` for dispatcher and monitor tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use serde_json::Value;

use itermux_bridge::{AutomationBridge, BridgeError, Payload, Step};

/// Records every step list and replays queued replies in order. Once the
/// queue is drained each call succeeds with an empty payload.
#[derive(Default)]
pub struct ScriptedBridge {
    calls: Mutex<Vec<Vec<Step>>>,
    replies: Mutex<VecDeque<Result<Payload, BridgeError>>>,
}

impl ScriptedBridge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(self, value: Value) -> Self {
        let payload = match value {
            Value::Object(map) => map,
            other => panic!("scripted reply must be an object, got {other}"),
        };
        self.replies.lock().unwrap().push_back(Ok(payload));
        self
    }

    pub fn fail(self, error: BridgeError) -> Self {
        self.replies.lock().unwrap().push_back(Err(error));
        self
    }

    pub fn calls(&self) -> Vec<Vec<Step>> {
        self.calls.lock().unwrap().clone()
    }
}

impl AutomationBridge for ScriptedBridge {
    async fn execute(&self, steps: &[Step]) -> Result<Payload, BridgeError> {
        self.calls.lock().unwrap().push(steps.to_vec());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Payload::new()))
    }
}
