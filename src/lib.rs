//! Client-side bridge between a chat UI and a remote conversational-agent
//! service.
//!
//! The crate converts between the UI's append/render message shapes and the
//! service's core-message shapes, and incrementally reconstructs a
//! conversation transcript from the service's response stream so partial
//! turns render as they arrive. [`fold::fold`] is the heart of it: a pure
//! reducer folding one decoded stream event into the transcript.
//! [`session::Session`] drives a turn end to end and owns the
//! one-send-in-flight contract; [`threads::ThreadList`] caches the thread
//! metadata the UI's thread switcher works against.

pub mod api;
pub mod config;
pub mod convert;
pub mod error;
pub mod fold;
pub mod session;
pub mod threads;
pub mod types;

pub use api::client::AgentClient;
pub use config::{RetryPolicy, SessionConfig, StreamOptions};
pub use convert::history::transcript_from_history;
pub use convert::outbound::{to_service_message, AppendMessage, AppendPart};
pub use convert::render::{to_render_message, RenderMessage, RenderPart};
pub use error::{ConfigError, ConvertError, FoldWarning, SessionError, TransportError};
pub use fold::FoldOutcome;
pub use session::{Session, SessionUpdate};
pub use threads::{ThreadList, ThreadSummary};
pub use types::message::{
    ContentPart, Message, MessageContent, MessageStatus, Role, StopReason, Transcript,
};
pub use types::wire::{FinishReason, ServiceMessage, StreamEvent};
