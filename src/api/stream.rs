//! Incremental decoder for the service's response stream.
//!
//! The wire format is newline-delimited frames of the form `<code>:<json>`.
//! Chunks may split a frame anywhere; the parser buffers partial lines across
//! `process` calls and only emits complete frames. Malformed frames are
//! skipped with a warning, and unrecognized codes decode to
//! `StreamEvent::Unknown` so new server-side kinds never break the client.

use crate::types::wire::{FinishReason, StreamEvent};
use serde::Deserialize;
use serde_json::Value;

#[derive(Default)]
pub struct StreamParser {
    buffer: String,
}

impl StreamParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn process(&mut self, chunk: &[u8]) -> Vec<StreamEvent> {
        self.buffer.push_str(&String::from_utf8_lossy(chunk));
        let mut events = Vec::new();

        while let Some(newline) = self.buffer.find('\n') {
            let line: String = self.buffer.drain(..=newline).collect();
            let line = line.trim_end_matches(['\r', '\n']);
            if line.is_empty() {
                continue;
            }

            match decode_frame(line) {
                Ok(event) => events.push(event),
                Err(error) => {
                    tracing::warn!(%error, frame = line, "skipping malformed stream frame");
                }
            }
        }

        events
    }

    /// Remaining unframed input, surrendered. Useful for diagnostics after a
    /// stream ends mid-frame.
    pub fn flush(&mut self) -> String {
        std::mem::take(&mut self.buffer)
    }
}

#[derive(Debug, thiserror::Error)]
enum FrameError {
    #[error("missing ':' separator")]
    MissingSeparator,
    #[error("{0}")]
    Payload(#[from] serde_json::Error),
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ToolCallFrame {
    tool_call_id: String,
    tool_name: String,
    #[serde(default)]
    args: Value,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ToolResultFrame {
    tool_call_id: String,
    result: Value,
    #[serde(default)]
    is_error: Option<bool>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ToolCallStartFrame {
    tool_call_id: String,
    tool_name: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ToolCallDeltaFrame {
    tool_call_id: String,
    args_text_delta: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FinishMessageFrame {
    finish_reason: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FinishStepFrame {
    finish_reason: String,
    #[serde(default)]
    is_continued: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StartStepFrame {
    message_id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileFrame {
    data: String,
    mime_type: String,
}

#[derive(Deserialize)]
struct RedactedReasoningFrame {
    data: String,
}

#[derive(Deserialize)]
struct ReasoningSignatureFrame {
    signature: String,
}

fn decode_frame(line: &str) -> Result<StreamEvent, FrameError> {
    let (code, payload) = line.split_once(':').ok_or(FrameError::MissingSeparator)?;

    let event = match code {
        "0" => StreamEvent::TextDelta {
            text: serde_json::from_str(payload)?,
        },
        "2" => StreamEvent::Data {
            value: serde_json::from_str(payload)?,
        },
        "3" => StreamEvent::Error {
            message: serde_json::from_str(payload)?,
        },
        "8" => StreamEvent::MessageAnnotations {
            value: serde_json::from_str(payload)?,
        },
        "9" => {
            let frame: ToolCallFrame = serde_json::from_str(payload)?;
            StreamEvent::ToolCall {
                tool_call_id: frame.tool_call_id,
                tool_name: frame.tool_name,
                args: frame.args,
            }
        }
        "a" => {
            let frame: ToolResultFrame = serde_json::from_str(payload)?;
            StreamEvent::ToolResult {
                tool_call_id: frame.tool_call_id,
                result: frame.result,
                is_error: frame.is_error,
            }
        }
        "b" => {
            let frame: ToolCallStartFrame = serde_json::from_str(payload)?;
            StreamEvent::ToolCallStreamingStart {
                tool_call_id: frame.tool_call_id,
                tool_name: frame.tool_name,
            }
        }
        "c" => {
            let frame: ToolCallDeltaFrame = serde_json::from_str(payload)?;
            StreamEvent::ToolCallDelta {
                tool_call_id: frame.tool_call_id,
                args_text_delta: frame.args_text_delta,
            }
        }
        "d" => {
            let frame: FinishMessageFrame = serde_json::from_str(payload)?;
            StreamEvent::FinishMessage {
                finish_reason: FinishReason::from_wire(&frame.finish_reason),
            }
        }
        "e" => {
            let frame: FinishStepFrame = serde_json::from_str(payload)?;
            StreamEvent::FinishStep {
                finish_reason: FinishReason::from_wire(&frame.finish_reason),
                is_continued: frame.is_continued,
            }
        }
        "f" => {
            let frame: StartStepFrame = serde_json::from_str(payload)?;
            StreamEvent::StartStep {
                message_id: frame.message_id,
            }
        }
        "g" => StreamEvent::ReasoningDelta {
            text: serde_json::from_str(payload)?,
        },
        "h" => StreamEvent::Source {
            value: serde_json::from_str(payload)?,
        },
        "i" => {
            let frame: RedactedReasoningFrame = serde_json::from_str(payload)?;
            StreamEvent::RedactedReasoningDelta { data: frame.data }
        }
        "j" => {
            let frame: ReasoningSignatureFrame = serde_json::from_str(payload)?;
            StreamEvent::ReasoningSignature {
                signature: frame.signature,
            }
        }
        "k" => {
            let frame: FileFrame = serde_json::from_str(payload)?;
            StreamEvent::File {
                mime_type: frame.mime_type,
                data: frame.data,
            }
        }
        _ => StreamEvent::Unknown,
    };

    Ok(event)
}
