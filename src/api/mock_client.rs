use crate::api::client::{ByteStream, MockStreamProducer};
use crate::error::TransportError;
use crate::types::wire::StreamRequest;
use bytes::Bytes;
use futures::{stream, StreamExt};
use std::collections::VecDeque;
use std::sync::Mutex;

/// Scripted response for one `stream()` call.
pub enum MockTurn {
    /// Yield these wire chunks, then end the stream.
    Chunks(Vec<String>),
    /// Yield these wire chunks, then stay open forever. Used by cancellation
    /// tests that must interrupt an in-flight stream.
    ChunksThenPending(Vec<String>),
    /// Fail the stream open with an HTTP 503.
    FailOpen,
}

pub struct MockAgentService {
    turns: Mutex<VecDeque<MockTurn>>,
}

impl MockAgentService {
    pub fn new(turns: Vec<MockTurn>) -> Self {
        Self {
            turns: Mutex::new(turns.into()),
        }
    }
}

impl MockStreamProducer for MockAgentService {
    fn create_mock_stream(&self, _request: &StreamRequest) -> Result<ByteStream, TransportError> {
        let turn = self
            .turns
            .lock()
            .expect("mock turn queue poisoned")
            .pop_front()
            .expect("MockAgentService: no scripted turn left");

        match turn {
            MockTurn::FailOpen => Err(TransportError::Status {
                url: "mock://agent/stream".to_string(),
                status: reqwest::StatusCode::SERVICE_UNAVAILABLE,
            }),
            MockTurn::Chunks(chunks) => Ok(Box::pin(stream::iter(frame_chunks(chunks)))),
            MockTurn::ChunksThenPending(chunks) => Ok(Box::pin(
                stream::iter(frame_chunks(chunks)).chain(stream::pending()),
            )),
        }
    }
}

fn frame_chunks(chunks: Vec<String>) -> Vec<Result<Bytes, TransportError>> {
    chunks
        .into_iter()
        .map(|chunk| {
            let framed = if chunk.ends_with('\n') {
                chunk
            } else {
                format!("{chunk}\n")
            };
            Ok(Bytes::from(framed))
        })
        .collect()
}
