//! Shapes exchanged with the remote agent service: the core-message dialect
//! sent on requests and returned from thread history, the typed stream
//! events, and the thread metadata records.

use crate::config::StreamOptions;
use crate::types::message::{MessageStatus, StopReason};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceRole {
    System,
    User,
    Assistant,
    /// Transport artifact of persisted histories. Folded into the owning
    /// assistant message before anything downstream sees it.
    Tool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServicePart {
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
        #[serde(default)]
        args: Value,
    },
    #[serde(rename_all = "camelCase")]
    ToolResult {
        tool_call_id: String,
        #[serde(default)]
        tool_name: String,
        result: Value,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        is_error: Option<bool>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ServiceContent {
    Text(String),
    Parts(Vec<ServicePart>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceMessage {
    pub role: ServiceRole,
    pub content: ServiceContent,
}

/// One decoded frame of the service's response stream. Kinds the engine does
/// not merge (step boundaries, annotations, argument deltas) are still typed
/// so they decode cleanly and fold as no-ops.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    TextDelta {
        text: String,
    },
    ReasoningDelta {
        text: String,
    },
    RedactedReasoningDelta {
        data: String,
    },
    ReasoningSignature {
        signature: String,
    },
    ToolCallStreamingStart {
        tool_call_id: String,
        tool_name: String,
    },
    ToolCall {
        tool_call_id: String,
        tool_name: String,
        args: Value,
    },
    ToolCallDelta {
        tool_call_id: String,
        args_text_delta: String,
    },
    ToolResult {
        tool_call_id: String,
        result: Value,
        is_error: Option<bool>,
    },
    File {
        mime_type: String,
        data: String,
    },
    /// No wire code maps here; constructed directly by callers that replay
    /// image content through the fold.
    Image {
        image: String,
    },
    Source {
        value: Value,
    },
    Data {
        value: Value,
    },
    MessageAnnotations {
        value: Value,
    },
    StartStep {
        message_id: String,
    },
    FinishStep {
        finish_reason: FinishReason,
        is_continued: bool,
    },
    FinishMessage {
        finish_reason: FinishReason,
    },
    Error {
        message: String,
    },
    Unknown,
}

/// Finish reason as the service spells it. Unrecognized spellings degrade to
/// `Unknown` rather than failing the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishReason {
    Stop,
    Length,
    ContentFilter,
    ToolCalls,
    Error,
    Other,
    Unknown,
}

impl FinishReason {
    pub fn from_wire(value: &str) -> Self {
        match value {
            "stop" => FinishReason::Stop,
            "length" => FinishReason::Length,
            "content-filter" => FinishReason::ContentFilter,
            "tool-calls" => FinishReason::ToolCalls,
            "error" => FinishReason::Error,
            "other" => FinishReason::Other,
            _ => FinishReason::Unknown,
        }
    }

    /// Terminal status the open assistant message takes when this reason
    /// seals the turn.
    pub fn seal_status(self) -> MessageStatus {
        match self {
            FinishReason::Stop | FinishReason::ToolCalls => MessageStatus::Complete,
            FinishReason::Length => MessageStatus::Incomplete {
                reason: StopReason::Length,
            },
            FinishReason::ContentFilter => MessageStatus::Incomplete {
                reason: StopReason::ContentFilter,
            },
            FinishReason::Error => MessageStatus::Incomplete {
                reason: StopReason::Error,
            },
            FinishReason::Other | FinishReason::Unknown => MessageStatus::Incomplete {
                reason: StopReason::Other,
            },
        }
    }
}

/// Body of `POST /api/agents/{agentId}/stream`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamRequest {
    pub messages: Vec<ServiceMessage>,
    pub thread_id: String,
    pub resource_id: String,
    #[serde(flatten)]
    pub options: StreamOptions,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadRecord {
    pub id: String,
    #[serde(default)]
    pub title: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub metadata: Value,
}

impl ThreadRecord {
    pub fn is_archived(&self) -> bool {
        self.metadata
            .get("isArchived")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }
}
