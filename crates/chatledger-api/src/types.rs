//! Typed records for the remote group-chat API.
//!
//! The remote service returns loosely structured JSON. Everything is
//! parsed into a typed record at this boundary; nothing untyped leaves
//! the fetcher. Message and group records additionally retain the
//! complete original JSON object in their `raw` field, for forward
//! compatibility with fields the typed shape does not know about.

use serde::Deserialize;
use serde_json::Value;

use crate::error::{Error, Result};

/// Opaque bearer token authorizing remote API calls on a user's behalf.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    /// Wrap a raw token string.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The raw token value, for use as a request parameter.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// Tokens must never end up in logs.
impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AccessToken(..)")
    }
}

/// Remote group identifier. Assigned by the remote service, immutable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupId(String);

impl GroupId {
    /// Wrap a remote group id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for GroupId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One message record as returned by the remote API.
#[derive(Debug, Clone, PartialEq)]
pub struct RawMessage {
    /// Remote message id, unique across the service.
    pub id: String,
    /// Id of the group the message belongs to.
    pub group_id: String,
    /// Id of the sending user.
    pub user_id: String,
    /// Sender display name at the time the message was sent.
    pub name: String,
    /// Sender avatar image URL.
    pub avatar_url: Option<String>,
    /// Message body text. Absent for attachment-only messages.
    pub text: Option<String>,
    /// User ids who favorited the message.
    pub favorited_by: Vec<String>,
    /// Structured attachments blob, passed through untouched.
    pub attachments: Value,
    /// Creation time as epoch seconds, authoritative for ordering.
    pub created_at: i64,
    /// Complete original JSON object.
    pub raw: Value,
}

impl RawMessage {
    /// Parse one message record out of a response array element.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingField`] if a required field is absent or
    /// has the wrong type.
    pub fn from_value(value: &Value) -> Result<Self> {
        Ok(Self {
            id: required_str(value, "id")?,
            group_id: required_str(value, "group_id")?,
            user_id: required_str(value, "user_id")?,
            name: required_str(value, "name")?,
            avatar_url: optional_str(value, "avatar_url"),
            text: optional_str(value, "text"),
            favorited_by: string_list(value, "favorited_by"),
            attachments: value.get("attachments").cloned().unwrap_or(Value::Null),
            created_at: value
                .get("created_at")
                .and_then(Value::as_i64)
                .ok_or(Error::MissingField { field: "created_at" })?,
            raw: value.clone(),
        })
    }
}

/// One group record as returned by the remote API.
#[derive(Debug, Clone, PartialEq)]
pub struct RawGroup {
    /// Remote group id.
    pub id: String,
    /// Group display name.
    pub name: String,
    /// Group image URL.
    pub image_url: Option<String>,
    /// Creation time as epoch seconds.
    pub created_at: i64,
    /// Last remote update time as epoch seconds.
    pub updated_at: i64,
    /// Complete original JSON object.
    pub raw: Value,
}

impl RawGroup {
    /// Parse one group record out of a response array element.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingField`] if a required field is absent or
    /// has the wrong type.
    pub fn from_value(value: &Value) -> Result<Self> {
        Ok(Self {
            id: required_str(value, "id")?,
            name: required_str(value, "name")?,
            image_url: optional_str(value, "image_url"),
            created_at: value
                .get("created_at")
                .and_then(Value::as_i64)
                .ok_or(Error::MissingField { field: "created_at" })?,
            updated_at: value
                .get("updated_at")
                .and_then(Value::as_i64)
                .ok_or(Error::MissingField { field: "updated_at" })?,
            raw: value.clone(),
        })
    }
}

/// The authenticated user, from the `users/me` endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RawUser {
    /// Remote user id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Account email address.
    pub email: String,
    /// Avatar image URL.
    pub image_url: Option<String>,
}

fn required_str(value: &Value, field: &'static str) -> Result<String> {
    value
        .get(field)
        .and_then(Value::as_str)
        .map(str::to_owned)
        .ok_or(Error::MissingField { field })
}

fn optional_str(value: &Value, field: &str) -> Option<String> {
    value.get(field).and_then(Value::as_str).map(str::to_owned)
}

fn string_list(value: &Value, field: &str) -> Vec<String> {
    value
        .get(field)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_owned)
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_full_message_record() {
        let value = json!({
            "id": "123",
            "group_id": "g1",
            "user_id": "u1",
            "name": "Alice",
            "avatar_url": "https://i.example/a.png",
            "text": "hello",
            "favorited_by": ["u2", "u3"],
            "attachments": [{"type": "image", "url": "https://i.example/p.png"}],
            "created_at": 1_593_500_000,
            "source_guid": "abc"
        });

        let message = RawMessage::from_value(&value).unwrap();
        assert_eq!(message.id, "123");
        assert_eq!(message.group_id, "g1");
        assert_eq!(message.name, "Alice");
        assert_eq!(message.text.as_deref(), Some("hello"));
        assert_eq!(message.favorited_by, vec!["u2", "u3"]);
        assert_eq!(message.created_at, 1_593_500_000);
        // Unknown fields survive in the retained payload.
        assert_eq!(message.raw["source_guid"], "abc");
    }

    #[test]
    fn message_defaults_for_absent_optional_fields() {
        let value = json!({
            "id": "1",
            "group_id": "g1",
            "user_id": "u1",
            "name": "Bob",
            "created_at": 1
        });

        let message = RawMessage::from_value(&value).unwrap();
        assert!(message.text.is_none());
        assert!(message.avatar_url.is_none());
        assert!(message.favorited_by.is_empty());
        assert_eq!(message.attachments, Value::Null);
    }

    #[test]
    fn message_missing_id_is_an_error() {
        let value = json!({ "group_id": "g1", "user_id": "u1", "name": "x", "created_at": 1 });
        let err = RawMessage::from_value(&value).unwrap_err();
        assert!(matches!(err, Error::MissingField { field: "id" }));
    }

    #[test]
    fn parses_group_record() {
        let value = json!({
            "id": "g1",
            "name": "Climbing",
            "image_url": null,
            "created_at": 100,
            "updated_at": 200
        });

        let group = RawGroup::from_value(&value).unwrap();
        assert_eq!(group.id, "g1");
        assert_eq!(group.name, "Climbing");
        assert!(group.image_url.is_none());
        assert_eq!(group.updated_at, 200);
    }

    #[test]
    fn access_token_debug_is_redacted() {
        let token = AccessToken::new("super-secret");
        assert_eq!(format!("{token:?}"), "AccessToken(..)");
    }
}
