//! Type definitions for the upstream Messages API.
//!
//! Requests are built by us and only serialized; responses come from the upstream and
//! are only deserialized, so every response field is optional or defaulted. A response
//! field of the wrong shape reads as absent; an untyped content block is dropped.

use serde::{Deserialize, Serialize};

use super::lenient::{or_none, readable_array};

// ---------------------------------------------------------------------------
// Request types (what we send TO the upstream)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagesRequest {
    pub model: String,
    pub max_tokens: u64,
    pub messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_sequences: Option<Vec<String>>,
    /// Always `false`: streamed answers are replayed locally.
    pub stream: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: Vec<ContentBlock>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "image")]
    Image { source: ImageSource },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageSource {
    #[serde(rename = "type")]
    pub source_type: String, // "base64"
    pub media_type: String,
    pub data: String,
}

// ---------------------------------------------------------------------------
// Response types (what the upstream sends BACK)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessagesResponse {
    #[serde(default, deserialize_with = "or_none")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "or_none")]
    pub model: Option<String>,
    #[serde(default, deserialize_with = "readable_array")]
    pub content: Option<Vec<ResponseContentBlock>>,
    #[serde(default, deserialize_with = "or_none")]
    pub stop_reason: Option<String>,
    #[serde(default, deserialize_with = "or_none")]
    pub usage: Option<Usage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ResponseContentBlock {
    #[serde(rename = "text")]
    Text {
        #[serde(default, deserialize_with = "or_none")]
        text: Option<String>,
    },
    /// `tool_use`, `thinking` and anything newer; carries nothing we forward.
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Usage {
    #[serde(default, deserialize_with = "or_none")]
    pub input_tokens: Option<u64>,
    #[serde(default, deserialize_with = "or_none")]
    pub output_tokens: Option<u64>,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

impl ContentBlock {
    pub fn text(text: impl Into<String>) -> Self {
        ContentBlock::Text { text: text.into() }
    }

    pub fn base64_image(media_type: impl Into<String>, data: impl Into<String>) -> Self {
        ContentBlock::Image {
            source: ImageSource {
                source_type: "base64".to_string(),
                media_type: media_type.into(),
                data: data.into(),
            },
        }
    }
}

impl Role {
    /// Anything other than exactly `"assistant"` speaks as the user.
    #[must_use]
    pub fn from_source(role: &str) -> Self {
        if role == "assistant" {
            Role::Assistant
        } else {
            Role::User
        }
    }
}
