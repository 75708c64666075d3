use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Ordered list of messages comprising one conversation.
pub type Transcript = Vec<Message>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One typed unit of message content. A `ToolCall` is identified solely by
/// its `tool_call_id`; a later result mutates the existing part in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ContentPart {
    Text {
        text: String,
    },
    Image {
        image: String,
    },
    #[serde(rename_all = "camelCase")]
    File {
        mime_type: String,
        data: String,
    },
    Reasoning {
        text: String,
    },
    RedactedReasoning {
        data: String,
    },
    #[serde(rename_all = "camelCase")]
    ToolCall {
        tool_call_id: String,
        tool_name: String,
        args: Value,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        result: Option<Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        is_error: Option<bool>,
    },
}

impl ContentPart {
    pub fn is_tool_call(&self, id: &str) -> bool {
        matches!(self, ContentPart::ToolCall { tool_call_id, .. } if tool_call_id == id)
    }
}

/// Message content is either a plain string or an ordered part sequence.
/// Promotion is one-directional: string form becomes part form the moment a
/// non-text part must be appended, never the other way around.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

impl MessageContent {
    /// Convert string form to part form (a non-empty string becomes a leading
    /// `Text` part) and return the part list for mutation.
    pub fn promote(&mut self) -> &mut Vec<ContentPart> {
        if let MessageContent::Text(text) = self {
            let existing = std::mem::take(text);
            let mut parts = Vec::new();
            if !existing.is_empty() {
                parts.push(ContentPart::Text { text: existing });
            }
            *self = MessageContent::Parts(parts);
        }
        match self {
            MessageContent::Parts(parts) => parts,
            MessageContent::Text(_) => unreachable!("string content was promoted above"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StopReason {
    Stop,
    Length,
    ContentFilter,
    Cancelled,
    Error,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MessageStatus {
    Running,
    Complete,
    Incomplete { reason: StopReason },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub role: Role,
    pub content: MessageContent,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<MessageStatus>,
}

impl Message {
    pub fn new(role: Role, content: MessageContent) -> Self {
        Self {
            id: Uuid::new_v4(),
            role,
            content,
            status: None,
        }
    }

    /// A fresh assistant message accepting streamed content.
    pub fn running_assistant() -> Self {
        let mut message = Message::new(Role::Assistant, MessageContent::Parts(Vec::new()));
        message.status = Some(MessageStatus::Running);
        message
    }

    /// An assistant message is open while its turn is still streaming.
    pub fn is_open_assistant(&self) -> bool {
        self.role == Role::Assistant && self.status == Some(MessageStatus::Running)
    }
}
