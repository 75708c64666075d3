use super::*;
use crate::api::client::AgentClient;
use crate::api::mock_client::{MockAgentService, MockTurn};
use crate::config::SessionConfig;
use crate::convert::outbound::AppendMessage;
use crate::error::{FoldWarning, SessionError};
use crate::types::message::{ContentPart, MessageContent, MessageStatus, Role, StopReason};
use crate::types::wire::StreamEvent;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

fn session_with_turns(turns: Vec<MockTurn>) -> Session {
    let client = AgentClient::new_mock(Arc::new(MockAgentService::new(turns)));
    Session::new(client, SessionConfig::new("weatherAgent", "res_1", "th_1"))
}

fn text_turn(deltas: &[&str]) -> MockTurn {
    let mut chunks: Vec<String> = deltas
        .iter()
        .map(|delta| format!("0:{}", serde_json::to_string(delta).unwrap()))
        .collect();
    chunks.push(r#"d:{"finishReason":"stop"}"#.to_string());
    MockTurn::Chunks(chunks)
}

fn assistant_parts(session: &Session) -> &[ContentPart] {
    let assistant = session
        .messages()
        .iter()
        .rev()
        .find(|message| message.role == Role::Assistant)
        .expect("transcript has an assistant message");
    match &assistant.content {
        MessageContent::Parts(parts) => parts,
        other => panic!("expected part content, got {other:?}"),
    }
}

#[tokio::test]
async fn test_text_turn_coalesces_and_seals_complete() {
    let mut session = session_with_turns(vec![text_turn(&["Hel", "lo"])]);

    session
        .send_message(&AppendMessage::user_text("hi"), None)
        .await
        .expect("turn should complete");

    assert!(!session.is_running());
    assert_eq!(session.messages().len(), 2);
    assert_eq!(session.messages()[0].role, Role::User);

    let assistant = &session.messages()[1];
    assert_eq!(assistant.status, Some(MessageStatus::Complete));
    assert_eq!(
        assistant_parts(&session),
        &[ContentPart::Text {
            text: "Hello".to_string()
        }]
    );
}

#[tokio::test]
async fn test_tool_call_and_result_pair_in_place() -> anyhow::Result<()> {
    let mut session = session_with_turns(vec![MockTurn::Chunks(vec![
        r#"0:"Checking the weather. ""#.to_string(),
        r#"9:{"toolCallId":"t1","toolName":"getWeather","args":{"location":"SF"}}"#.to_string(),
        r#"a:{"toolCallId":"t1","result":"sunny"}"#.to_string(),
        r#"e:{"finishReason":"tool-calls","isContinued":false}"#.to_string(),
        r#"0:"It is sunny.""#.to_string(),
        r#"d:{"finishReason":"stop"}"#.to_string(),
    ])]);

    session
        .send_message(&AppendMessage::user_text("weather in SF?"), None)
        .await?;

    let parts = assistant_parts(&session);
    assert_eq!(parts.len(), 3);
    match &parts[1] {
        ContentPart::ToolCall {
            tool_call_id,
            tool_name,
            args,
            result,
            ..
        } => {
            assert_eq!(tool_call_id, "t1");
            assert_eq!(tool_name, "getWeather");
            assert_eq!(args, &json!({"location": "SF"}));
            assert_eq!(result.as_ref(), Some(&json!("sunny")));
        }
        other => panic!("unexpected part: {other:?}"),
    }
    assert_eq!(
        parts[2],
        ContentPart::Text {
            text: "It is sunny.".to_string()
        }
    );
    Ok(())
}

#[tokio::test]
async fn test_orphan_result_warns_and_leaves_structure_alone() {
    let mut session = session_with_turns(vec![MockTurn::Chunks(vec![
        r#"a:{"toolCallId":"t9","result":"lost"}"#.to_string(),
        r#"0:"no tool ran""#.to_string(),
        r#"d:{"finishReason":"stop"}"#.to_string(),
    ])]);
    let (tx, mut rx) = mpsc::unbounded_channel();

    session
        .send_message(&AppendMessage::user_text("hi"), Some(&tx))
        .await
        .expect("turn should complete");

    let mut orphans = 0;
    while let Ok(update) = rx.try_recv() {
        if let SessionUpdate::Warning(FoldWarning::OrphanResult { tool_call_id }) = update {
            assert_eq!(tool_call_id, "t9");
            orphans += 1;
        }
    }
    assert_eq!(orphans, 1);
    assert_eq!(
        assistant_parts(&session),
        &[ContentPart::Text {
            text: "no tool ran".to_string()
        }]
    );
}

#[tokio::test]
async fn test_convert_failure_leaves_transcript_untouched() {
    let mut session = session_with_turns(vec![]);
    let message = AppendMessage {
        role: Role::System,
        content: vec![
            crate::convert::outbound::AppendPart::Text {
                text: "a".to_string(),
            },
            crate::convert::outbound::AppendPart::Text {
                text: "b".to_string(),
            },
        ],
    };

    let result = session.send_message(&message, None).await;
    assert!(matches!(result, Err(SessionError::Convert(_))));
    assert!(session.messages().is_empty());
    assert!(!session.is_running());
}

#[tokio::test]
async fn test_second_send_while_running_is_rejected() {
    let mut session = session_with_turns(vec![]);
    session.running = true;

    let result = session
        .send_message(&AppendMessage::user_text("again"), None)
        .await;
    assert!(matches!(result, Err(SessionError::Busy)));
    assert!(session.messages().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_cancel_mid_stream_seals_cancelled() {
    let mut session = session_with_turns(vec![MockTurn::ChunksThenPending(vec![
        r#"0:"partial answer""#.to_string(),
    ])]);

    let handle = session.cancel_handle();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        handle.cancel();
    });

    session
        .send_message(&AppendMessage::user_text("hi"), None)
        .await
        .expect("cancellation is a normal exit");

    assert!(!session.is_running());
    let assistant = &session.messages()[1];
    assert_eq!(
        assistant.status,
        Some(MessageStatus::Incomplete {
            reason: StopReason::Cancelled
        })
    );
    assert_eq!(
        assistant_parts(&session),
        &[ContentPart::Text {
            text: "partial answer".to_string()
        }]
    );
}

#[tokio::test]
async fn test_events_after_seal_are_discarded() {
    let mut session = session_with_turns(vec![text_turn(&["done"])]);
    session
        .send_message(&AppendMessage::user_text("hi"), None)
        .await
        .expect("turn should complete");

    let sealed = session.messages().to_vec();
    session.ingest(
        &StreamEvent::TextDelta {
            text: "late".to_string(),
        },
        None,
    );
    assert_eq!(session.messages(), sealed.as_slice());
}

#[tokio::test]
async fn test_stream_open_failure_leaves_no_dangling_message() {
    let mut session = session_with_turns(vec![MockTurn::FailOpen]);

    let result = session
        .send_message(&AppendMessage::user_text("hi"), None)
        .await;

    assert!(matches!(result, Err(SessionError::Transport(_))));
    assert!(!session.is_running());
    // The user message stays; no assistant message was ever created.
    assert_eq!(session.messages().len(), 1);
    assert_eq!(session.messages()[0].role, Role::User);
}

#[tokio::test]
async fn test_stream_error_event_seals_incomplete_error() {
    let mut session = session_with_turns(vec![MockTurn::Chunks(vec![
        r#"0:"partial""#.to_string(),
        r#"3:"model overloaded""#.to_string(),
    ])]);
    let (tx, mut rx) = mpsc::unbounded_channel();

    session
        .send_message(&AppendMessage::user_text("hi"), Some(&tx))
        .await
        .expect("protocol-level errors are not transport failures");

    assert!(!session.is_running());
    assert_eq!(
        session.messages()[1].status,
        Some(MessageStatus::Incomplete {
            reason: StopReason::Error
        })
    );

    let mut failed = false;
    while let Ok(update) = rx.try_recv() {
        if let SessionUpdate::TurnFailed { message } = update {
            assert_eq!(message, "model overloaded");
            failed = true;
        }
    }
    assert!(failed);
}

#[tokio::test]
async fn test_eof_without_finish_frame_seals_incomplete() {
    let mut session =
        session_with_turns(vec![MockTurn::Chunks(vec![r#"0:"trailing""#.to_string()])]);

    session
        .send_message(&AppendMessage::user_text("hi"), None)
        .await
        .expect("EOF is a normal exit");

    assert_eq!(
        session.messages()[1].status,
        Some(MessageStatus::Incomplete {
            reason: StopReason::Other
        })
    );
}

#[tokio::test]
async fn test_next_turn_opens_a_fresh_assistant_message() -> anyhow::Result<()> {
    let mut session = session_with_turns(vec![text_turn(&["first"]), text_turn(&["second"])]);

    session
        .send_message(&AppendMessage::user_text("one"), None)
        .await?;
    session
        .send_message(&AppendMessage::user_text("two"), None)
        .await?;

    assert_eq!(session.messages().len(), 4);
    assert_ne!(session.messages()[1].id, session.messages()[3].id);
    assert_eq!(session.messages()[1].status, Some(MessageStatus::Complete));
    assert_eq!(session.messages()[3].status, Some(MessageStatus::Complete));
    Ok(())
}

#[tokio::test]
async fn test_updates_publish_snapshots_and_completion() {
    let mut session = session_with_turns(vec![text_turn(&["Hi"])]);
    let (tx, mut rx) = mpsc::unbounded_channel();

    session
        .send_message(&AppendMessage::user_text("hello"), Some(&tx))
        .await
        .expect("turn should complete");

    let mut snapshots = Vec::new();
    let mut completed = false;
    while let Ok(update) = rx.try_recv() {
        match update {
            SessionUpdate::Transcript(snapshot) => snapshots.push(snapshot),
            SessionUpdate::TurnComplete => completed = true,
            other => panic!("unexpected update: {other:?}"),
        }
    }

    assert!(completed);
    // First snapshot carries just the user message; the last one matches the
    // session's final transcript.
    assert_eq!(snapshots.first().map(Vec::len), Some(1));
    assert_eq!(
        snapshots.last().map(Vec::as_slice),
        Some(session.messages())
    );
}

#[tokio::test]
async fn test_add_tool_result_attaches_to_last_assistant() {
    let mut session = session_with_turns(vec![MockTurn::Chunks(vec![
        r#"9:{"toolCallId":"t1","toolName":"confirmPlan","args":{"plan":"go"}}"#.to_string(),
        r#"d:{"finishReason":"tool-calls"}"#.to_string(),
    ])]);

    session
        .send_message(&AppendMessage::user_text("plan it"), None)
        .await
        .expect("turn should complete");

    assert!(session.add_tool_result("t1", json!({"approved": true}), None));
    assert!(!session.add_tool_result("t404", json!(null), None));

    match &assistant_parts(&session)[0] {
        ContentPart::ToolCall { result, .. } => {
            assert_eq!(result.as_ref(), Some(&json!({"approved": true})));
        }
        other => panic!("unexpected part: {other:?}"),
    }
}

#[tokio::test]
async fn test_edit_truncates_and_resends() {
    let mut session = session_with_turns(vec![text_turn(&["first answer"]), text_turn(&["redone"])]);

    session
        .send_message(&AppendMessage::user_text("original"), None)
        .await
        .expect("first turn");
    let edited_id = session.messages()[0].id;

    session
        .edit(edited_id, &AppendMessage::user_text("revised"), None)
        .await
        .expect("edit resends");

    assert_eq!(session.messages().len(), 2);
    match &session.messages()[0].content {
        MessageContent::Parts(parts) => {
            assert_eq!(
                parts,
                &vec![ContentPart::Text {
                    text: "revised".to_string()
                }]
            );
        }
        other => panic!("unexpected content: {other:?}"),
    }
    assert_eq!(
        assistant_parts(&session),
        &[ContentPart::Text {
            text: "redone".to_string()
        }]
    );
}

#[tokio::test]
async fn test_edit_unknown_message_is_an_error() {
    let mut session = session_with_turns(vec![]);
    let result = session
        .edit(
            uuid::Uuid::new_v4(),
            &AppendMessage::user_text("revised"),
            None,
        )
        .await;
    assert!(matches!(result, Err(SessionError::UnknownMessage(_))));
    assert!(session.messages().is_empty());
}
