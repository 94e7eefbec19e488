use chrono::{ DateTime, Utc };
use serde::{ Serialize, Deserialize };
use serde_json::Value as JsonValue;
use uuid::Uuid;

/// Content of the placeholder appended when the backend call fails.
pub const FAILURE_REPLY: &str =
    "Sorry, there was an error processing your request. Please try again.";

const CHAT_TITLE_LEN: usize = 30;
const DEFAULT_CHAT_TITLE: &str = "New Chat";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// Citation and timing data attached to a backend answer.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<JsonValue>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processing_time: Option<f64>,
}

/// One turn of the conversation, in the shape stored in the durable slot.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub content: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<MessageMetadata>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<bool>,
}

impl Message {
    fn new(role: Role, content: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            content,
            role,
            created_at: Utc::now(),
            metadata: None,
            error: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content.into())
    }

    pub fn assistant(content: impl Into<String>, metadata: MessageMetadata) -> Self {
        let mut message = Self::new(Role::Assistant, content.into());
        message.metadata = Some(metadata);
        message
    }

    /// Assistant placeholder standing in for a failed backend call.
    pub fn failure() -> Self {
        let mut message = Self::new(Role::Assistant, FAILURE_REPLY.to_string());
        message.error = Some(true);
        message
    }

    pub fn is_error(&self) -> bool {
        self.error.unwrap_or(false)
    }
}

/// Sidebar summary of a conversation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chat {
    pub id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
}

impl Chat {
    /// Titles a new chat after the opening message.
    pub fn from_first_message(content: &str) -> Self {
        let title: String = content.trim().chars().take(CHAT_TITLE_LEN).collect();
        Self {
            id: Uuid::new_v4().to_string(),
            title: if title.is_empty() { DEFAULT_CHAT_TITLE.to_string() } else { title },
            created_at: Utc::now(),
        }
    }
}
