//! Outbound conversion: the UI's append shape into the service's request
//! shape. Pure and deterministic; failures surface before any stream opens.

use crate::error::ConvertError;
use crate::types::message::Role;
use crate::types::wire::{ServiceContent, ServiceMessage, ServicePart, ServiceRole};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A message as submitted by the UI's composer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppendMessage {
    pub role: Role,
    pub content: Vec<AppendPart>,
}

impl AppendMessage {
    pub fn user_text(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: vec![AppendPart::Text { text: text.into() }],
        }
    }
}

/// Content parts the UI composer can produce. `Audio` exists in the UI
/// library's append type but has no service-side representation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum AppendPart {
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
    #[serde(rename_all = "camelCase")]
    ToolCall {
        tool_call_id: String,
        tool_name: String,
        args: Value,
    },
    Audio {
        data: String,
        format: String,
    },
}

pub fn to_service_message(message: &AppendMessage) -> Result<ServiceMessage, ConvertError> {
    match message.role {
        Role::System => match message.content.as_slice() {
            [AppendPart::Text { text }] => Ok(ServiceMessage {
                role: ServiceRole::System,
                content: ServiceContent::Text(text.clone()),
            }),
            _ => Err(ConvertError::Format(
                "system message must contain exactly one text part".to_string(),
            )),
        },
        Role::User => Ok(ServiceMessage {
            role: ServiceRole::User,
            content: ServiceContent::Parts(convert_parts(&message.content)?),
        }),
        Role::Assistant => Ok(ServiceMessage {
            role: ServiceRole::Assistant,
            content: ServiceContent::Parts(convert_parts(&message.content)?),
        }),
    }
}

fn convert_parts(parts: &[AppendPart]) -> Result<Vec<ServicePart>, ConvertError> {
    parts
        .iter()
        .map(|part| match part {
            AppendPart::Text { text } => Ok(ServicePart::Text { text: text.clone() }),
            AppendPart::Image { image } => Ok(ServicePart::Image {
                image: image.clone(),
            }),
            AppendPart::File { mime_type, data } => Ok(ServicePart::File {
                mime_type: mime_type.clone(),
                data: data.clone(),
            }),
            AppendPart::Reasoning { text } => Ok(ServicePart::Reasoning { text: text.clone() }),
            AppendPart::ToolCall {
                tool_call_id,
                tool_name,
                args,
            } => Ok(ServicePart::ToolCall {
                tool_call_id: tool_call_id.clone(),
                tool_name: tool_name.clone(),
                args: args.clone(),
            }),
            AppendPart::Audio { .. } => Err(ConvertError::UnsupportedPart("audio")),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_system_message_flattens_single_text_part() {
        let message = AppendMessage {
            role: Role::System,
            content: vec![AppendPart::Text {
                text: "You are terse.".to_string(),
            }],
        };
        let converted = to_service_message(&message).unwrap();
        assert_eq!(converted.role, ServiceRole::System);
        assert_eq!(
            converted.content,
            ServiceContent::Text("You are terse.".to_string())
        );
    }

    #[test]
    fn test_system_message_with_two_text_parts_is_rejected() {
        let message = AppendMessage {
            role: Role::System,
            content: vec![
                AppendPart::Text {
                    text: "a".to_string(),
                },
                AppendPart::Text {
                    text: "b".to_string(),
                },
            ],
        };
        assert!(matches!(
            to_service_message(&message),
            Err(ConvertError::Format(_))
        ));
    }

    #[test]
    fn test_user_parts_map_one_to_one() {
        let message = AppendMessage {
            role: Role::User,
            content: vec![
                AppendPart::Text {
                    text: "look at this".to_string(),
                },
                AppendPart::Image {
                    image: "https://example.com/p.png".to_string(),
                },
            ],
        };
        let converted = to_service_message(&message).unwrap();
        match converted.content {
            ServiceContent::Parts(parts) => {
                assert_eq!(parts.len(), 2);
                assert_eq!(
                    parts[1],
                    ServicePart::Image {
                        image: "https://example.com/p.png".to_string()
                    }
                );
            }
            other => panic!("unexpected content: {other:?}"),
        }
    }

    #[test]
    fn test_audio_part_is_unsupported() {
        let message = AppendMessage {
            role: Role::User,
            content: vec![AppendPart::Audio {
                data: "UklGRg==".to_string(),
                format: "wav".to_string(),
            }],
        };
        assert!(matches!(
            to_service_message(&message),
            Err(ConvertError::UnsupportedPart("audio"))
        ));
    }

    #[test]
    fn test_conversion_is_deterministic() {
        let message = AppendMessage {
            role: Role::Assistant,
            content: vec![AppendPart::ToolCall {
                tool_call_id: "t1".to_string(),
                tool_name: "getWeather".to_string(),
                args: json!({"location": "SF"}),
            }],
        };
        let first = to_service_message(&message).unwrap();
        let second = to_service_message(&message).unwrap();
        assert_eq!(first, second);
    }
}
