//! Inbound platform events.

use crate::sender::{SharedSender, Target};
use meguri_core::{MeguriError, Message, path::normalize};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// One inbound platform event.
///
/// The payload fields mirror the platform's webhook body; anything the
/// engine does not model lands in [`Meta::extra`]. Two fields are assigned
/// by the engine rather than the platform: the canonical event path and
/// the bound reply sender.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Meta {
    /// `message`, `notice`, `request` or `meta_event`.
    pub post_type: String,
    /// `private`, `group` or `discuss` for messages.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_type: Option<String>,
    /// Notice category, e.g. `group_increase`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice_type: Option<String>,
    /// Request category, `friend` or `group`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_type: Option<String>,
    /// Meta event category, e.g. `heartbeat`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta_event_type: Option<String>,
    /// Optional trailing subtype, e.g. `normal` or `invite`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_type: Option<String>,
    /// The bot account that received the event.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub self_id: Option<i64>,
    /// The user who triggered the event.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
    /// Group the event happened in.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_id: Option<i64>,
    /// Discussion the event happened in.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discuss_id: Option<i64>,
    /// Platform id of the message, used for replies and recalls.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<i64>,
    /// Message content, either a string or an array of segments.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<Value>,
    /// Message content as plain text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_message: Option<String>,
    /// Fields not modelled above.
    #[serde(flatten)]
    pub extra: Map<String, Value>,

    #[serde(skip)]
    path: String,
    #[serde(skip)]
    sender: Option<SharedSender>,
}

impl Message for Meta {}

impl fmt::Debug for Meta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Meta")
            .field("path", &self.path)
            .field("post_type", &self.post_type)
            .field("user_id", &self.user_id)
            .field("group_id", &self.group_id)
            .field("discuss_id", &self.discuss_id)
            .field("message", &self.message)
            .field("bound", &self.sender.is_some())
            .finish_non_exhaustive()
    }
}

impl Meta {
    /// Parse a webhook body.
    pub fn from_json(source: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(source)
    }

    /// The canonical event path, empty until one is assigned.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Assign the event path, normalized to end with `/`.
    ///
    /// An empty path stays empty so the canonical path can be computed later.
    pub fn set_path(&mut self, path: impl Into<String>) {
        let path = path.into();
        self.path = if path.is_empty() { path } else { normalize(&path) };
    }

    /// Builder-style [`Meta::set_path`].
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.set_path(path);
        self
    }

    /// Compute the path this event is addressed to from its payload.
    ///
    /// The path starts with the entity the event belongs to (group, then
    /// discuss, then user), followed by the post type, its category and the
    /// optional subtype, each segment terminated by `/`:
    ///
    /// ```
    /// use meguri::Meta;
    ///
    /// let meta = Meta::from_json(r#"{
    ///     "post_type": "message", "message_type": "group", "sub_type": "normal",
    ///     "group_id": 123, "user_id": 7, "message": "hi"
    /// }"#).unwrap();
    /// assert_eq!(meta.canonical_path(), "/group/123/message/normal/");
    /// ```
    pub fn canonical_path(&self) -> String {
        let mut path = String::from("/");
        if let Some(target) = self.reply_target() {
            let entity = match target {
                Target::Group(id) => format!("group/{id}/"),
                Target::Discuss(id) => format!("discuss/{id}/"),
                Target::User(id) => format!("user/{id}/"),
            };
            path.push_str(&entity);
        }
        if self.post_type.is_empty() {
            return path;
        }
        path.push_str(&self.post_type);
        path.push('/');

        let category = match self.post_type.as_str() {
            "notice" => self.notice_type.as_deref(),
            "request" => self.request_type.as_deref(),
            "meta_event" => self.meta_event_type.as_deref(),
            _ => None,
        };
        for segment in category.into_iter().chain(self.sub_type.as_deref()) {
            path.push_str(segment);
            path.push('/');
        }
        path
    }

    /// The conversation a reply to this event should go to.
    pub fn reply_target(&self) -> Option<Target> {
        self.group_id
            .map(Target::Group)
            .or(self.discuss_id.map(Target::Discuss))
            .or(self.user_id.map(Target::User))
    }

    /// Whether this is a chat message.
    pub fn is_message(&self) -> bool {
        self.post_type == "message"
    }

    /// Plain text of the message, if it has any.
    pub fn text(&self) -> Option<&str> {
        self.raw_message
            .as_deref()
            .or_else(|| self.message.as_ref().and_then(Value::as_str))
    }

    /// Bind the sender replies are delivered through.
    pub fn bind_sender(&mut self, sender: SharedSender) {
        self.sender = Some(sender);
    }

    /// The bound reply sender.
    pub fn sender(&self) -> Option<SharedSender> {
        self.sender.clone()
    }

    /// Reply to the conversation this event came from.
    pub async fn send(&self, message: &str) -> Result<(), MeguriError> {
        let sender = self
            .sender
            .as_ref()
            .ok_or_else(|| MeguriError::Send("no sender bound to event".into()))?;
        let target = self
            .reply_target()
            .ok_or_else(|| MeguriError::Send(format!("event at {} has no reply target", self.path).into()))?;
        tracing::debug!(%target, path = %self.path, "sending reply");
        sender
            .send_dyn(target, message)
            .await
            .map_err(MeguriError::Send)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> Meta {
        Meta::from_json(source).unwrap()
    }

    #[test]
    fn private_message_path() {
        let meta = parse(
            r#"{ "post_type": "message", "message_type": "private",
                 "sub_type": "friend", "user_id": 10, "message": "hello" }"#,
        );
        assert_eq!(meta.canonical_path(), "/user/10/message/friend/");
        assert_eq!(meta.reply_target(), Some(Target::User(10)));
        assert_eq!(meta.text(), Some("hello"));
    }

    #[test]
    fn notice_and_request_paths() {
        let notice = parse(
            r#"{ "post_type": "notice", "notice_type": "group_increase",
                 "sub_type": "approve", "group_id": 5, "user_id": 9 }"#,
        );
        assert_eq!(
            notice.canonical_path(),
            "/group/5/notice/group_increase/approve/"
        );

        let request = parse(
            r#"{ "post_type": "request", "request_type": "friend", "user_id": 3 }"#,
        );
        assert_eq!(request.canonical_path(), "/user/3/request/friend/");
    }

    #[test]
    fn meta_event_has_no_entity_prefix() {
        let meta = parse(r#"{ "post_type": "meta_event", "meta_event_type": "heartbeat" }"#);
        assert_eq!(meta.canonical_path(), "/meta_event/heartbeat/");
        assert_eq!(meta.reply_target(), None);
    }

    #[test]
    fn unknown_fields_are_kept() {
        let meta = parse(r#"{ "post_type": "message", "user_id": 1, "font": 42 }"#);
        assert_eq!(meta.extra.get("font"), Some(&Value::from(42)));
    }

    #[test]
    fn segment_messages_fall_back_to_raw_text() {
        let meta = parse(
            r#"{ "post_type": "message", "user_id": 1,
                 "message": [{ "type": "text", "data": { "text": "hi" } }],
                 "raw_message": "hi" }"#,
        );
        assert_eq!(meta.text(), Some("hi"));
    }

    #[test]
    fn assigned_paths_end_with_a_slash() {
        let meta = parse(r#"{ "post_type": "message", "group_id": 1 }"#)
            .with_path("/group/1/message");
        assert_eq!(meta.path(), "/group/1/message/");

        let mut unassigned = Meta::default();
        unassigned.set_path("");
        assert_eq!(unassigned.path(), "");
    }

    #[tokio::test]
    async fn send_without_sender_fails() {
        let meta = Meta {
            user_id: Some(1),
            ..Meta::default()
        };
        let err = meta.send("hi").await.unwrap_err();
        assert!(matches!(err, MeguriError::Send(_)));
    }
}
