//! Inbound conversion: a transcript message into the shape the renderer
//! consumes. Stateless projection; a `Running` message projects its partial
//! content as-is, which is what makes mid-stream rendering possible.

use crate::types::message::{ContentPart, Message, MessageContent, MessageStatus, Role};
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderMessage {
    pub id: Uuid,
    pub role: Role,
    pub content: Vec<RenderPart>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<MessageStatus>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum RenderPart {
    Text {
        text: String,
    },
    Reasoning {
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
    #[serde(rename_all = "camelCase")]
    ToolCall {
        tool_call_id: String,
        tool_name: String,
        args: Value,
        /// Serialized `args`, presentation-only. Never fed back into folding.
        args_text: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        result: Option<Value>,
        #[serde(skip_serializing_if = "Option::is_none")]
        is_error: Option<bool>,
    },
}

pub fn to_render_message(message: &Message) -> RenderMessage {
    let content = match &message.content {
        MessageContent::Text(text) => vec![RenderPart::Text { text: text.clone() }],
        MessageContent::Parts(parts) => parts.iter().map(render_part).collect(),
    };
    RenderMessage {
        id: message.id,
        role: message.role,
        content,
        status: message.status,
    }
}

fn render_part(part: &ContentPart) -> RenderPart {
    match part {
        ContentPart::Text { text } => RenderPart::Text { text: text.clone() },
        ContentPart::Reasoning { text } => RenderPart::Reasoning { text: text.clone() },
        // Redacted reasoning renders as reasoning; the opaque data is all
        // there is to show.
        ContentPart::RedactedReasoning { data } => RenderPart::Reasoning { text: data.clone() },
        ContentPart::Image { image } => RenderPart::Image {
            image: image.clone(),
        },
        ContentPart::File { mime_type, data } => RenderPart::File {
            mime_type: mime_type.clone(),
            data: data.clone(),
        },
        ContentPart::ToolCall {
            tool_call_id,
            tool_name,
            args,
            result,
            is_error,
        } => RenderPart::ToolCall {
            tool_call_id: tool_call_id.clone(),
            tool_name: tool_name.clone(),
            args: args.clone(),
            args_text: args_to_text(args),
            result: result.clone(),
            is_error: *is_error,
        },
    }
}

fn args_to_text(args: &Value) -> String {
    serde_json::to_string(args).unwrap_or_else(|_| "{}".to_string())
}
