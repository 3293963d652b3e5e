#![allow(dead_code)]

use meguri::{
    BoxError, Handler, Hook, HookResult, Invocation, Meta, Sender, Target, testing::RecordingHook,
};
use serde_json::json;
use std::sync::{Arc, Mutex};

// ============================================================================
// Events
// ============================================================================

pub fn group_message(group: i64, user: i64, text: &str) -> Meta {
    Meta::from_json(
        &json!({
            "post_type": "message",
            "message_type": "group",
            "sub_type": "normal",
            "group_id": group,
            "user_id": user,
            "message": text,
        })
        .to_string(),
    )
    .unwrap()
}

pub fn private_message(user: i64, text: &str) -> Meta {
    Meta::from_json(
        &json!({
            "post_type": "message",
            "message_type": "private",
            "sub_type": "friend",
            "user_id": user,
            "message": text,
        })
        .to_string(),
    )
    .unwrap()
}

pub fn heartbeat() -> Meta {
    Meta::from_json(r#"{ "post_type": "meta_event", "meta_event_type": "heartbeat" }"#).unwrap()
}

pub fn recorder() -> RecordingHook<Arc<Meta>> {
    RecordingHook::new()
}

// ============================================================================
// Collaborators
// ============================================================================

#[derive(Clone, Default)]
pub struct RecordingSender {
    pub sent: Arc<Mutex<Vec<(Target, String)>>>,
}

impl RecordingSender {
    pub fn messages(&self) -> Vec<(Target, String)> {
        self.sent.lock().unwrap().clone()
    }
}

impl Sender for RecordingSender {
    async fn send(&self, target: Target, message: &str) -> Result<(), BoxError> {
        self.sent.lock().unwrap().push((target, message.to_string()));
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct RecordingAction {
    pub calls: Arc<Mutex<Vec<Invocation>>>,
}

impl RecordingAction {
    pub fn calls(&self) -> Vec<Invocation> {
        self.calls.lock().unwrap().clone()
    }
}

impl Handler<Invocation> for RecordingAction {
    type Output = Result<(), BoxError>;

    async fn call(&self, input: Invocation) -> Self::Output {
        self.calls.lock().unwrap().push(input);
        Ok(())
    }
}

pub struct OrderHook {
    pub id: usize,
    pub order: Arc<Mutex<Vec<usize>>>,
    pub result: HookResult,
}

impl Hook<Arc<Meta>> for OrderHook {
    async fn on_event(&self, _event: &Arc<Meta>) -> Result<HookResult, BoxError> {
        self.order.lock().unwrap().push(self.id);
        Ok(self.result)
    }
}
