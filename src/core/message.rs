use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::ChatMessage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// Role vocabulary used by the upstream provider, indexed by [`Role`]
/// discriminant. Assistant history entries replay as `model` turns.
const PROVIDER_ROLES: [&str; 2] = ["user", "model"];

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }

    /// Map the role into the upstream vocabulary. Total over both variants.
    pub fn provider_role(self) -> &'static str {
        PROVIDER_ROLES[self as usize]
    }

    pub fn from_wire(role: &str) -> Option<Self> {
        match role {
            "user" => Some(Role::User),
            "assistant" => Some(Role::Assistant),
            _ => None,
        }
    }
}

/// One entry of a conversation, immutable once appended. An in-progress
/// assistant reply lives in the stream accumulator, not as a `Message`, until
/// the stream completes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Message {
            id: Uuid::new_v4(),
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    /// Project the message onto the relay wire shape; ids and timestamps are
    /// client-held state and never cross the relay boundary.
    pub fn to_wire(&self) -> ChatMessage {
        ChatMessage {
            role: self.role.as_str().to_string(),
            content: self.content.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles_serialize_lowercase() {
        assert_eq!(serde_json::to_string(&Role::User).unwrap(), "\"user\"");
        assert_eq!(
            serde_json::to_string(&Role::Assistant).unwrap(),
            "\"assistant\""
        );
    }

    #[test]
    fn provider_role_lookup_covers_both_variants() {
        assert_eq!(Role::User.provider_role(), "user");
        assert_eq!(Role::Assistant.provider_role(), "model");
    }

    #[test]
    fn from_wire_rejects_unknown_roles() {
        assert_eq!(Role::from_wire("user"), Some(Role::User));
        assert_eq!(Role::from_wire("assistant"), Some(Role::Assistant));
        assert_eq!(Role::from_wire("system"), None);
    }

    #[test]
    fn to_wire_drops_id_and_timestamp() {
        let message = Message::new(Role::Assistant, "hello");
        let wire = message.to_wire();

        assert_eq!(wire.role, "assistant");
        assert_eq!(wire.content, "hello");

        let json = serde_json::to_value(&wire).unwrap();
        assert!(json.get("id").is_none());
        assert!(json.get("timestamp").is_none());
    }
}
