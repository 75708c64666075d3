//! The session controller: owns the transcript identity and the
//! one-in-flight-send-at-a-time contract.
//!
//! A turn runs entirely on the caller's task: convert the submitted message,
//! append it, open the stream, fold each decoded event, publish the updated
//! transcript, and seal the assistant message on every exit path so nothing
//! is ever left `Running`. Between stream events no other transcript
//! mutation can interleave; the `&mut self` receiver is the lock.

use crate::api::client::{AgentClient, ByteStream};
use crate::api::stream::StreamParser;
use crate::config::SessionConfig;
use crate::convert::history::{message_from_service, transcript_from_history};
use crate::convert::outbound::{to_service_message, AppendMessage};
use crate::error::{FoldWarning, SessionError};
use crate::fold::{fold, seal_open_message};
use crate::types::message::{
    ContentPart, Message, MessageContent, MessageStatus, Role, StopReason, Transcript,
};
use crate::types::wire::{StreamEvent, StreamRequest};
use futures::StreamExt;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Published to observers as a turn progresses. `Transcript` carries a full
/// snapshot; the renderer replaces its copy wholesale rather than patching.
#[derive(Debug, Clone)]
pub enum SessionUpdate {
    Transcript(Transcript),
    Warning(FoldWarning),
    TurnComplete,
    TurnFailed { message: String },
}

pub struct Session {
    pub(super) client: Arc<AgentClient>,
    pub(super) config: SessionConfig,
    pub(super) transcript: Transcript,
    pub(super) running: bool,
    pub(super) cancel: CancellationToken,
}

impl Session {
    pub fn new(client: AgentClient, config: SessionConfig) -> Self {
        Self {
            client: Arc::new(client),
            config,
            transcript: Vec::new(),
            running: false,
            cancel: CancellationToken::new(),
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.transcript
    }

    pub fn set_messages(&mut self, messages: Transcript) {
        self.transcript = messages;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Handle for cancelling the in-flight turn from another task. Handles
    /// stay valid across turns until one is used; a consumed token is
    /// replaced at the next send.
    pub fn cancel_handle(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Cooperative: asks the stream to stop. The open assistant message
    /// seals `incomplete/cancelled`; events already in flight are discarded
    /// once the seal lands.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Replace the transcript with the thread's persisted messages,
    /// normalized so no tool-role carrier survives.
    pub async fn load_history(&mut self) -> Result<(), SessionError> {
        let history = self
            .client
            .thread_messages(&self.config.thread_id, &self.config.agent_id)
            .await?;
        let (transcript, warnings) = transcript_from_history(&history);
        for warning in &warnings {
            tracing::warn!(%warning, "history normalization");
        }
        self.transcript = transcript;
        Ok(())
    }

    /// Submit one user message and drive the response stream to completion.
    /// Rejects with `SessionError::Busy` while a turn is in flight.
    pub async fn send_message(
        &mut self,
        message: &AppendMessage,
        update_tx: Option<&mpsc::UnboundedSender<SessionUpdate>>,
    ) -> Result<(), SessionError> {
        if self.running {
            return Err(SessionError::Busy);
        }

        // Conversion failures surface here, before any transcript mutation.
        let service_message = to_service_message(message)?;
        let user_message = message_from_service(&service_message)
            .expect("append messages never carry the tool role");

        self.transcript.push(user_message);
        self.running = true;
        if self.cancel.is_cancelled() {
            self.cancel = CancellationToken::new();
        }
        self.publish(update_tx);

        let request = StreamRequest {
            messages: vec![service_message],
            thread_id: self.config.thread_id.clone(),
            resource_id: self.config.resource_id.clone(),
            options: self.config.options.clone(),
        };

        let stream = match self.client.stream(&self.config.agent_id, &request).await {
            Ok(stream) => stream,
            Err(error) => {
                // Setup failure: no assistant message exists yet, so the
                // transcript stays at its last-known-good state.
                self.running = false;
                self.emit(
                    update_tx,
                    SessionUpdate::TurnFailed {
                        message: error.to_string(),
                    },
                );
                return Err(error.into());
            }
        };

        self.run_stream(stream, update_tx).await
    }

    /// Attach a client-side tool result (the UI's add-tool-result callback)
    /// to the matching call in the most recent assistant message. Returns
    /// false when no call matches.
    pub fn add_tool_result(
        &mut self,
        tool_call_id: &str,
        result: Value,
        is_error: Option<bool>,
    ) -> bool {
        let slot = self
            .transcript
            .iter_mut()
            .rev()
            .find(|message| message.role == Role::Assistant)
            .and_then(|message| match &mut message.content {
                MessageContent::Parts(parts) => parts.iter_mut().find_map(|part| match part {
                    ContentPart::ToolCall {
                        tool_call_id: id,
                        result: result_slot,
                        is_error: error_slot,
                        ..
                    } if id == tool_call_id => Some((result_slot, error_slot)),
                    _ => None,
                }),
                MessageContent::Text(_) => None,
            });

        match slot {
            Some((result_slot, error_slot)) => {
                *result_slot = Some(result);
                *error_slot = is_error;
                true
            }
            None => {
                tracing::warn!(tool_call_id, "no matching tool call for client-side result");
                false
            }
        }
    }

    /// Replace a message and resend from that point: the transcript is
    /// truncated at the edited message and the replacement goes through the
    /// normal send path. Idle-only.
    pub async fn edit(
        &mut self,
        message_id: Uuid,
        replacement: &AppendMessage,
        update_tx: Option<&mpsc::UnboundedSender<SessionUpdate>>,
    ) -> Result<(), SessionError> {
        if self.running {
            return Err(SessionError::Busy);
        }
        // Surface conversion errors before truncating anything.
        to_service_message(replacement)?;

        let index = self
            .transcript
            .iter()
            .position(|message| message.id == message_id)
            .ok_or(SessionError::UnknownMessage(message_id))?;
        self.transcript.truncate(index);
        self.send_message(replacement, update_tx).await
    }

    async fn run_stream(
        &mut self,
        mut stream: ByteStream,
        update_tx: Option<&mpsc::UnboundedSender<SessionUpdate>>,
    ) -> Result<(), SessionError> {
        let cancel = self.cancel.clone();
        let mut parser = StreamParser::new();

        while self.running {
            let chunk = tokio::select! {
                _ = cancel.cancelled() => {
                    self.finish_turn(
                        MessageStatus::Incomplete { reason: StopReason::Cancelled },
                        update_tx,
                    );
                    self.emit(update_tx, SessionUpdate::TurnComplete);
                    return Ok(());
                }
                chunk = stream.next() => chunk,
            };

            match chunk {
                Some(Ok(bytes)) => {
                    for event in parser.process(&bytes) {
                        self.ingest(&event, update_tx);
                    }
                }
                Some(Err(error)) => {
                    self.finish_turn(
                        MessageStatus::Incomplete {
                            reason: StopReason::Error,
                        },
                        update_tx,
                    );
                    self.emit(
                        update_tx,
                        SessionUpdate::TurnFailed {
                            message: error.to_string(),
                        },
                    );
                    return Err(error.into());
                }
                None => {
                    // EOF without a finish frame still ends in a terminal
                    // status; nothing stays running.
                    self.finish_turn(
                        MessageStatus::Incomplete {
                            reason: StopReason::Other,
                        },
                        update_tx,
                    );
                    self.emit(update_tx, SessionUpdate::TurnComplete);
                    return Ok(());
                }
            }
        }

        Ok(())
    }

    /// Fold one event, publish the resulting snapshot, forward warnings, and
    /// clear the running flag on terminal frames.
    pub(super) fn ingest(
        &mut self,
        event: &StreamEvent,
        update_tx: Option<&mpsc::UnboundedSender<SessionUpdate>>,
    ) {
        if !self.running {
            // The turn was already sealed (finish, error, or cancellation):
            // anything still in flight is discarded.
            return;
        }
        let outcome = fold(std::mem::take(&mut self.transcript), event);
        self.transcript = outcome.transcript;
        for warning in outcome.warnings {
            tracing::warn!(%warning, "transcript fold");
            self.emit(update_tx, SessionUpdate::Warning(warning));
        }
        self.publish(update_tx);

        match event {
            StreamEvent::FinishMessage { .. } => {
                self.running = false;
                self.emit(update_tx, SessionUpdate::TurnComplete);
            }
            StreamEvent::Error { message } => {
                self.running = false;
                self.emit(
                    update_tx,
                    SessionUpdate::TurnFailed {
                        message: message.clone(),
                    },
                );
            }
            _ => {}
        }
    }

    fn finish_turn(
        &mut self,
        status: MessageStatus,
        update_tx: Option<&mpsc::UnboundedSender<SessionUpdate>>,
    ) {
        if seal_open_message(&mut self.transcript, status) {
            self.publish(update_tx);
        }
        self.running = false;
    }

    fn publish(&self, update_tx: Option<&mpsc::UnboundedSender<SessionUpdate>>) {
        self.emit(update_tx, SessionUpdate::Transcript(self.transcript.clone()));
    }

    fn emit(
        &self,
        update_tx: Option<&mpsc::UnboundedSender<SessionUpdate>>,
        update: SessionUpdate,
    ) {
        if let Some(tx) = update_tx {
            let _ = tx.send(update);
        }
    }
}
