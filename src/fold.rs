//! Transcript folding: incorporate one stream event into the conversation.
//!
//! `fold` is a pure reducer over the transcript value. The caller owns the
//! transcript's identity; the function takes the current value, applies one
//! event, and hands back the next value plus any non-fatal warnings, so the
//! session controller can publish each snapshot atomically.
//!
//! Turn state lives entirely in the transcript itself: the last message is
//! the open assistant message iff its status is `Running`. Content-bearing
//! events open one lazily, `finish-message` (or an error) seals it, and the
//! next content-bearing event after a seal starts a fresh message.

use crate::error::FoldWarning;
use crate::types::message::{
    ContentPart, Message, MessageContent, MessageStatus, StopReason, Transcript,
};
use crate::types::wire::StreamEvent;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub struct FoldOutcome {
    pub transcript: Transcript,
    pub warnings: Vec<FoldWarning>,
}

pub fn fold(transcript: Transcript, event: &StreamEvent) -> FoldOutcome {
    let mut fold = Fold {
        transcript,
        warnings: Vec::new(),
    };
    fold.apply(event);
    FoldOutcome {
        transcript: fold.transcript,
        warnings: fold.warnings,
    }
}

/// Seal the open assistant message, if any, with the given terminal status.
/// Covers turn boundaries the stream itself does not mark: cancellation and
/// end-of-stream without a finish frame. Returns whether a message was
/// sealed.
pub fn seal_open_message(transcript: &mut Transcript, status: MessageStatus) -> bool {
    match transcript.last_mut() {
        Some(message) if message.is_open_assistant() => {
            message.status = Some(status);
            true
        }
        _ => false,
    }
}

struct Fold {
    transcript: Transcript,
    warnings: Vec<FoldWarning>,
}

impl Fold {
    fn apply(&mut self, event: &StreamEvent) {
        match event {
            StreamEvent::TextDelta { text } => self.append_text(text),
            StreamEvent::ReasoningDelta { text } => self.append_reasoning(text),
            StreamEvent::RedactedReasoningDelta { data } => self.append_redacted_reasoning(data),
            StreamEvent::ToolCall {
                tool_call_id,
                tool_name,
                args,
            } => self.announce_tool_call(tool_call_id, tool_name, args),
            StreamEvent::ToolResult {
                tool_call_id,
                result,
                is_error,
            } => self.attach_tool_result(tool_call_id, result, *is_error),
            StreamEvent::File { mime_type, data } => self.append_part(ContentPart::File {
                mime_type: mime_type.clone(),
                data: data.clone(),
            }),
            StreamEvent::Image { image } => self.append_part(ContentPart::Image {
                image: image.clone(),
            }),
            StreamEvent::FinishMessage { finish_reason } => {
                seal_open_message(&mut self.transcript, finish_reason.seal_status());
            }
            StreamEvent::Error { message } => {
                seal_open_message(
                    &mut self.transcript,
                    MessageStatus::Incomplete {
                        reason: StopReason::Error,
                    },
                );
                self.warnings.push(FoldWarning::StreamError {
                    message: message.clone(),
                });
            }
            // Step boundaries, argument deltas, annotations, sources and
            // unrecognized kinds carry no transcript content. The complete
            // tool-call frame always follows its deltas, so nothing is lost.
            StreamEvent::ToolCallStreamingStart { .. }
            | StreamEvent::ToolCallDelta { .. }
            | StreamEvent::ReasoningSignature { .. }
            | StreamEvent::Source { .. }
            | StreamEvent::Data { .. }
            | StreamEvent::MessageAnnotations { .. }
            | StreamEvent::StartStep { .. }
            | StreamEvent::FinishStep { .. }
            | StreamEvent::Unknown => {}
        }
    }

    /// The open assistant message, creating one if the last message is not
    /// open (first content of a turn, or the previous turn was sealed).
    fn open_assistant(&mut self) -> &mut Message {
        let has_open = self
            .transcript
            .last()
            .is_some_and(Message::is_open_assistant);
        if !has_open {
            self.transcript.push(Message::running_assistant());
        }
        self.transcript
            .last_mut()
            .expect("transcript holds an open assistant message")
    }

    fn append_text(&mut self, delta: &str) {
        let message = self.open_assistant();
        match &mut message.content {
            // String-form messages grow by plain concatenation.
            MessageContent::Text(text) => text.push_str(delta),
            MessageContent::Parts(parts) => match parts.last_mut() {
                Some(ContentPart::Text { text }) => text.push_str(delta),
                _ => parts.push(ContentPart::Text {
                    text: delta.to_string(),
                }),
            },
        }
    }

    fn append_reasoning(&mut self, delta: &str) {
        let parts = self.open_assistant().content.promote();
        match parts.last_mut() {
            Some(ContentPart::Reasoning { text }) => text.push_str(delta),
            _ => parts.push(ContentPart::Reasoning {
                text: delta.to_string(),
            }),
        }
    }

    fn append_redacted_reasoning(&mut self, delta: &str) {
        let parts = self.open_assistant().content.promote();
        match parts.last_mut() {
            Some(ContentPart::RedactedReasoning { data }) => data.push_str(delta),
            _ => parts.push(ContentPart::RedactedReasoning {
                data: delta.to_string(),
            }),
        }
    }

    fn announce_tool_call(&mut self, tool_call_id: &str, tool_name: &str, args: &Value) {
        let parts = self.open_assistant().content.promote();
        for part in parts.iter_mut() {
            if let ContentPart::ToolCall {
                tool_call_id: id,
                tool_name: name,
                args: existing_args,
                ..
            } = part
            {
                if id == tool_call_id {
                    // Duplicate announcement is a retransmission: refresh the
                    // call in place, keep its position and any result.
                    *name = tool_name.to_string();
                    *existing_args = args.clone();
                    return;
                }
            }
        }
        parts.push(ContentPart::ToolCall {
            tool_call_id: tool_call_id.to_string(),
            tool_name: tool_name.to_string(),
            args: args.clone(),
            result: None,
            is_error: None,
        });
    }

    fn attach_tool_result(&mut self, tool_call_id: &str, result: &Value, is_error: Option<bool>) {
        let attached = match self.transcript.last_mut() {
            Some(message) if message.is_open_assistant() => match &mut message.content {
                MessageContent::Parts(parts) => {
                    attach_in_open_message(parts, tool_call_id, result, is_error)
                }
                MessageContent::Text(_) => false,
            },
            _ => false,
        };

        if !attached {
            self.warnings.push(FoldWarning::OrphanResult {
                tool_call_id: tool_call_id.to_string(),
            });
        }
    }

    fn append_part(&mut self, part: ContentPart) {
        self.open_assistant().content.promote().push(part);
    }
}

/// Search the whole part sequence, not just the tail: a text or reasoning
/// part may have intervened since the call was announced.
fn attach_in_open_message(
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
