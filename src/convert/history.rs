//! Normalization of persisted service histories into the transcript model.
//!
//! Histories arrive in the service's core-message dialect, where a tool
//! outcome may ride in a standalone `tool` role message or as a
//! `tool-result` part trailing the assistant's own content. Neither shape is
//! representable in the transcript: results live on the owning `ToolCall`
//! part. This pass attaches every result to its call (searching the full
//! transcript, newest assistant turn first) and drops the carrier, so
//! downstream converters never see a `tool` role.

use crate::error::FoldWarning;
use crate::types::message::{ContentPart, Message, MessageContent, Role, Transcript};
use crate::types::wire::{ServiceContent, ServiceMessage, ServicePart, ServiceRole};
use serde_json::Value;

pub fn transcript_from_history(history: &[ServiceMessage]) -> (Transcript, Vec<FoldWarning>) {
    let mut transcript = Vec::new();
    let mut warnings = Vec::new();
    for message in history {
        fold_history_message(&mut transcript, message, &mut warnings);
    }
    (transcript, warnings)
}

/// Convert one non-tool service message in isolation. Returns `None` for a
/// `tool` role message, which carries nothing without a transcript to attach
/// to. Orphaned results inside the message are dropped with a warning log.
pub fn message_from_service(message: &ServiceMessage) -> Option<Message> {
    let mut scratch = Vec::new();
    let mut warnings = Vec::new();
    fold_history_message(&mut scratch, message, &mut warnings);
    for warning in &warnings {
        tracing::warn!(%warning, "history conversion");
    }
    scratch.pop()
}

fn fold_history_message(
    transcript: &mut Transcript,
    message: &ServiceMessage,
    warnings: &mut Vec<FoldWarning>,
) {
    match message.role {
        ServiceRole::System => {
            let text = match &message.content {
                ServiceContent::Text(text) => text.clone(),
                ServiceContent::Parts(parts) => parts
                    .iter()
                    .filter_map(|part| match part {
                        ServicePart::Text { text } => Some(text.as_str()),
                        _ => None,
                    })
                    .collect::<Vec<_>>()
                    .join("\n"),
            };
            transcript.push(Message::new(Role::System, MessageContent::Text(text)));
        }
        ServiceRole::Tool => {
            if let ServiceContent::Parts(parts) = &message.content {
                for part in parts {
                    if let ServicePart::ToolResult {
                        tool_call_id,
                        result,
                        is_error,
                        ..
                    } = part
                    {
                        attach_result(transcript, tool_call_id, result, *is_error, warnings);
                    }
                }
            }
        }
        ServiceRole::User | ServiceRole::Assistant => {
            let role = if message.role == ServiceRole::User {
                Role::User
            } else {
                Role::Assistant
            };
            match &message.content {
                ServiceContent::Text(text) => {
                    transcript.push(Message::new(role, MessageContent::Text(text.clone())));
                }
                ServiceContent::Parts(service_parts) => {
                    let mut parts: Vec<ContentPart> = Vec::new();
                    let mut carried_results = false;
                    for part in service_parts {
                        match part {
                            ServicePart::ToolResult {
                                tool_call_id,
                                result,
                                is_error,
                                ..
                            } => {
                                carried_results = true;
                                if !attach_in_parts(&mut parts, tool_call_id, result, *is_error) {
                                    attach_result(
                                        transcript,
                                        tool_call_id,
                                        result,
                                        *is_error,
                                        warnings,
                                    );
                                }
                            }
                            other => parts.push(convert_part(other)),
                        }
                    }
                    // A message that only ferried results has no content left.
                    if parts.is_empty() && carried_results {
                        return;
                    }
                    transcript.push(Message::new(role, MessageContent::Parts(parts)));
                }
            }
        }
    }
}

fn convert_part(part: &ServicePart) -> ContentPart {
    match part {
        ServicePart::Text { text } => ContentPart::Text { text: text.clone() },
        ServicePart::Image { image } => ContentPart::Image {
            image: image.clone(),
        },
        ServicePart::File { mime_type, data } => ContentPart::File {
            mime_type: mime_type.clone(),
            data: data.clone(),
        },
        ServicePart::Reasoning { text } => ContentPart::Reasoning { text: text.clone() },
        ServicePart::RedactedReasoning { data } => ContentPart::RedactedReasoning {
            data: data.clone(),
        },
        ServicePart::ToolCall {
            tool_call_id,
            tool_name,
            args,
        } => ContentPart::ToolCall {
            tool_call_id: tool_call_id.clone(),
            tool_name: tool_name.clone(),
            args: args.clone(),
            result: None,
            is_error: None,
        },
        ServicePart::ToolResult { .. } => {
            unreachable!("tool results are attached, never converted directly")
        }
    }
}

fn attach_result(
    transcript: &mut Transcript,
    tool_call_id: &str,
    result: &Value,
    is_error: Option<bool>,
    warnings: &mut Vec<FoldWarning>,
) {
    for message in transcript.iter_mut().rev() {
        if message.role != Role::Assistant {
            continue;
        }
        if let MessageContent::Parts(parts) = &mut message.content {
            if attach_in_parts(parts, tool_call_id, result, is_error) {
                return;
            }
        }
    }
    warnings.push(FoldWarning::OrphanResult {
        tool_call_id: tool_call_id.to_string(),
    });
}

fn attach_in_parts(
    parts: &mut [ContentPart],
    tool_call_id: &str,
    result: &Value,
    is_error: Option<bool>,
) -> bool {
    for part in parts.iter_mut() {
        if let ContentPart::ToolCall {
            tool_call_id: id,
            result: result_slot,
            is_error: error_slot,
            ..
        } = part
        {
            if id == tool_call_id {
                *result_slot = Some(result.clone());
                *error_slot = is_error;
                return true;
            }
        }
    }
    false
}
