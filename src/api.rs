pub mod client;
pub mod stream;

#[cfg(test)]
pub mod mock_client;

pub use client::{AgentClient, ByteStream};
pub use stream::StreamParser;
