//! Messages delivered to the update handler
//!
//! A [`Message`] is a payload plus a [`MessageHeaders`] map. Both serialize
//! with serde, which is how the default parameter source sees them: the
//! payload under `payload` and each header under `headers[<key>]`.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{ser::SerializeMap, Serialize, Serializer};
use serde_json::Value as JsonValue;
use uuid::Uuid;

/// Header holding the message's unique id
pub const ID: &str = "id";

/// Header holding the message's creation time, in milliseconds since the epoch
pub const TIMESTAMP: &str = "timestamp";

/// Key-value metadata attached to a message
///
/// Keys are unique and compared case-insensitively; insertion order is kept.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MessageHeaders {
    entries: Vec<(String, JsonValue)>,
}

impl MessageHeaders {
    /// Create an empty header map
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a header, replacing any existing header whose key matches ignoring case
    ///
    /// Returns the previous value, if any.
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        value: impl Into<JsonValue>,
    ) -> Option<JsonValue> {
        let key = key.into();
        let value = value.into();
        match self.position(&key) {
            Some(idx) => {
                let (_, previous) = std::mem::replace(&mut self.entries[idx], (key, value));
                Some(previous)
            }
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    /// Look up a header ignoring case
    pub fn get(&self, key: &str) -> Option<&JsonValue> {
        self.position(key).map(|idx| &self.entries[idx].1)
    }

    /// Check whether a header is present, ignoring case
    pub fn contains_key(&self, key: &str) -> bool {
        self.position(key).is_some()
    }

    /// Remove a header, ignoring case
    pub fn remove(&mut self, key: &str) -> Option<JsonValue> {
        self.position(key).map(|idx| self.entries.remove(idx).1)
    }

    /// The message id header
    pub fn id(&self) -> Option<&JsonValue> {
        self.get(ID)
    }

    /// The message timestamp header
    pub fn timestamp(&self) -> Option<i64> {
        self.get(TIMESTAMP).and_then(JsonValue::as_i64)
    }

    /// Iterate over headers in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &JsonValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of headers
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if there are no headers
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn position(&self, key: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|(k, _)| k.eq_ignore_ascii_case(key))
    }
}

impl Serialize for MessageHeaders {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// A payload together with its headers
///
/// # Example
///
/// ```
/// use d1_update_handler::Message;
///
/// let message = Message::new("hello").with_header("id", 42);
/// assert_eq!(message.headers().id(), Some(&serde_json::json!(42)));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Message<T> {
    payload: T,
    headers: MessageHeaders,
}

impl<T> Message<T> {
    /// Create a message with a fresh `id` (UUID v4) and `timestamp` header
    pub fn new(payload: T) -> Self {
        let mut headers = MessageHeaders::new();
        headers.insert(ID, Uuid::new_v4().to_string());
        headers.insert(TIMESTAMP, now_millis());
        Self { payload, headers }
    }

    /// Create a message with exactly the given headers
    pub fn with_headers(payload: T, headers: MessageHeaders) -> Self {
        Self { payload, headers }
    }

    /// Set a header, replacing the existing one if present
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.headers.insert(key, value);
        self
    }

    /// The message payload
    pub fn payload(&self) -> &T {
        &self.payload
    }

    /// The message headers
    pub fn headers(&self) -> &MessageHeaders {
        &self.headers
    }

    /// Split the message into payload and headers
    pub fn into_parts(self) -> (T, MessageHeaders) {
        (self.payload, self.headers)
    }
}

fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_new_message_has_id_and_timestamp() {
        let message = Message::new("hello");
        assert!(message.headers().id().and_then(JsonValue::as_str).is_some());
        assert!(message.headers().timestamp().unwrap() > 0);
    }

    #[test]
    fn test_message_ids_are_unique() {
        let a = Message::new(1);
        let b = Message::new(1);
        assert_ne!(a.headers().id(), b.headers().id());
    }

    #[test]
    fn test_headers_are_case_insensitive() {
        let mut headers = MessageHeaders::new();
        headers.insert("Content-Type", "text/plain");
        assert_eq!(headers.get("content-type"), Some(&json!("text/plain")));
        assert!(headers.contains_key("CONTENT-TYPE"));
    }

    #[test]
    fn test_insert_replaces_ignoring_case() {
        let mut headers = MessageHeaders::new();
        assert!(headers.insert("Priority", 1).is_none());
        assert_eq!(headers.insert("priority", 2), Some(json!(1)));
        assert_eq!(headers.len(), 1);
        assert_eq!(headers.iter().next(), Some(("priority", &json!(2))));
    }

    #[test]
    fn test_with_header_overrides_generated_id() {
        let message = Message::new("hello").with_header("ID", 42);
        assert_eq!(message.headers().id(), Some(&json!(42)));
        assert_eq!(message.headers().len(), 2);
    }

    #[test]
    fn test_remove_header() {
        let mut headers = MessageHeaders::new();
        headers.insert("a", 1);
        assert_eq!(headers.remove("A"), Some(json!(1)));
        assert!(headers.is_empty());
    }

    #[test]
    fn test_message_serializes_payload_and_headers() {
        let mut headers = MessageHeaders::new();
        headers.insert("id", 42);
        headers.insert("business.id", "b-1");
        let message = Message::with_headers("hello", headers);

        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(
            value,
            json!({"payload": "hello", "headers": {"id": 42, "business.id": "b-1"}})
        );
    }
}
