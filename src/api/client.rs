use crate::config::RetryPolicy;
use crate::error::TransportError;
use crate::types::wire::{ServiceMessage, StreamRequest, ThreadRecord};
use bytes::Bytes;
use futures::{Stream, StreamExt};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::pin::Pin;
#[cfg(test)]
use std::sync::Arc;

pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, TransportError>> + Send>>;

/// Test seam: replaces the HTTP stream with scripted wire chunks.
#[cfg(test)]
pub trait MockStreamProducer: Send + Sync {
    fn create_mock_stream(&self, request: &StreamRequest) -> Result<ByteStream, TransportError>;
}

/// HTTP client for the remote agent service: response streaming plus the
/// thread CRUD surface. Holds no conversation state.
#[derive(Clone)]
pub struct AgentClient {
    http: reqwest::Client,
    base_url: String,
    retry: RetryPolicy,
    #[cfg(test)]
    mock_stream_producer: Option<Arc<dyn MockStreamProducer>>,
}

impl AgentClient {
    pub fn new(base_url: impl Into<String>, retry: RetryPolicy) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            http: reqwest::Client::new(),
            base_url,
            retry,
            #[cfg(test)]
            mock_stream_producer: None,
        }
    }

    #[cfg(test)]
    pub fn new_mock(producer: Arc<dyn MockStreamProducer>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: "http://localhost:4111".to_string(),
            retry: RetryPolicy {
                retries: 0,
                ..RetryPolicy::default()
            },
            mock_stream_producer: Some(producer),
        }
    }

    /// Open a response stream for one agent invocation. Retries connect-class
    /// failures per the retry policy; once the stream is open, read failures
    /// surface immediately.
    pub async fn stream(
        &self,
        agent_id: &str,
        request: &StreamRequest,
    ) -> Result<ByteStream, TransportError> {
        #[cfg(test)]
        {
            if let Some(producer) = &self.mock_stream_producer {
                return producer.create_mock_stream(request);
            }
        }

        let url = format!("{}/api/agents/{agent_id}/stream", self.base_url);
        let response = self
            .send_with_retry(&url, || self.http.post(&url).json(request))
            .await?;

        let stream_url = url.clone();
        let stream = response
            .bytes_stream()
            .map(move |item| item.map_err(|error| map_transport_error(&stream_url, error)));
        Ok(Box::pin(stream))
    }

    pub async fn list_threads(
        &self,
        agent_id: &str,
        resource_id: &str,
    ) -> Result<Vec<ThreadRecord>, TransportError> {
        let url = format!("{}/api/memory/threads", self.base_url);
        let response = self
            .send_with_retry(&url, || {
                self.http
                    .get(&url)
                    .query(&[("agentId", agent_id), ("resourceid", resource_id)])
            })
            .await?;
        decode_json(&url, response).await
    }

    pub async fn get_thread(
        &self,
        thread_id: &str,
        agent_id: &str,
    ) -> Result<ThreadRecord, TransportError> {
        let url = format!("{}/api/memory/threads/{thread_id}", self.base_url);
        let response = self
            .send_with_retry(&url, || {
                self.http.get(&url).query(&[("agentId", agent_id)])
            })
            .await?;
        decode_json(&url, response).await
    }

    pub async fn create_thread(
        &self,
        agent_id: &str,
        resource_id: &str,
        thread_id: &str,
        title: &str,
    ) -> Result<ThreadRecord, TransportError> {
        let url = format!("{}/api/memory/threads", self.base_url);
        let body = CreateThreadRequest {
            thread_id,
            resource_id,
            title,
            metadata: Value::Object(serde_json::Map::new()),
        };
        let response = self
            .send_with_retry(&url, || {
                self.http
                    .post(&url)
                    .query(&[("agentId", agent_id)])
                    .json(&body)
            })
            .await?;
        decode_json(&url, response).await
    }

    pub async fn update_thread(
        &self,
        thread_id: &str,
        agent_id: &str,
        title: &str,
        metadata: Value,
    ) -> Result<ThreadRecord, TransportError> {
        let url = format!("{}/api/memory/threads/{thread_id}", self.base_url);
        let body = UpdateThreadRequest { title, metadata };
        let response = self
            .send_with_retry(&url, || {
                self.http
                    .patch(&url)
                    .query(&[("agentId", agent_id)])
                    .json(&body)
            })
            .await?;
        decode_json(&url, response).await
    }

    pub async fn delete_thread(
        &self,
        thread_id: &str,
        agent_id: &str,
    ) -> Result<(), TransportError> {
        let url = format!("{}/api/memory/threads/{thread_id}", self.base_url);
        self.send_with_retry(&url, || {
            self.http.delete(&url).query(&[("agentId", agent_id)])
        })
        .await?;
        Ok(())
    }

    /// Persisted messages for a thread, in the service's core-message shape.
    /// Callers normalize these before they reach the transcript.
    pub async fn thread_messages(
        &self,
        thread_id: &str,
        agent_id: &str,
    ) -> Result<Vec<ServiceMessage>, TransportError> {
        let url = format!("{}/api/memory/threads/{thread_id}/messages", self.base_url);
        let response = self
            .send_with_retry(&url, || {
                self.http.get(&url).query(&[("agentId", agent_id)])
            })
            .await?;
        let body: ThreadMessagesResponse = decode_json(&url, response).await?;
        Ok(body.messages)
    }

    async fn send_with_retry<F>(
        &self,
        url: &str,
        build: F,
    ) -> Result<reqwest::Response, TransportError>
    where
        F: Fn() -> reqwest::RequestBuilder,
    {
        let mut attempt = 0u32;
        loop {
            match build().send().await.and_then(|r| r.error_for_status()) {
                Ok(response) => return Ok(response),
                Err(error) => {
                    let retryable = error.is_connect() || error.is_timeout();
                    if retryable && attempt < self.retry.retries {
                        let delay = self.retry.backoff_after(attempt);
                        tracing::debug!(url, attempt, ?delay, "retrying agent service request");
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                        continue;
                    }
                    return Err(map_transport_error(url, error));
                }
            }
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateThreadRequest<'a> {
    thread_id: &'a str,
    resource_id: &'a str,
    title: &'a str,
    metadata: Value,
}

#[derive(Serialize)]
struct UpdateThreadRequest<'a> {
    title: &'a str,
    metadata: Value,
}

#[derive(Deserialize)]
struct ThreadMessagesResponse {
    #[serde(default)]
    messages: Vec<ServiceMessage>,
}

async fn decode_json<T: DeserializeOwned>(
    url: &str,
    response: reqwest::Response,
) -> Result<T, TransportError> {
    response.json().await.map_err(|error| TransportError::Decode {
        url: url.to_string(),
        source: error,
    })
}

fn map_transport_error(url: &str, error: reqwest::Error) -> TransportError {
    if error.is_connect() {
        return TransportError::Connect {
            url: url.to_string(),
            source: error,
        };
    }
    if error.is_timeout() {
        return TransportError::Timeout {
            url: url.to_string(),
            source: error,
        };
    }
    if let Some(status) = error.status() {
        return TransportError::Status {
            url: url.to_string(),
            status,
        };
    }
    if error.is_decode() {
        return TransportError::Decode {
            url: url.to_string(),
            source: error,
        };
    }
    TransportError::Http {
        url: url.to_string(),
        source: error,
    }
}
