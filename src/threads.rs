//! Locally cached thread metadata plus the thread-list operations the UI
//! exposes (archive, rename, delete, switch). Every mutation is a simple
//! request/response round-trip followed by a refresh; nothing here touches
//! the transcript.

use crate::api::client::AgentClient;
use crate::error::TransportError;
use crate::types::wire::ThreadRecord;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadSummary {
    pub thread_id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub is_archived: bool,
}

pub struct ThreadList {
    client: Arc<AgentClient>,
    agent_id: String,
    resource_id: String,
    current_thread_id: String,
    threads: Vec<ThreadSummary>,
    archived: Vec<ThreadSummary>,
}

impl ThreadList {
    pub fn new(
        client: Arc<AgentClient>,
        agent_id: impl Into<String>,
        resource_id: impl Into<String>,
        thread_id: impl Into<String>,
    ) -> Self {
        Self {
            client,
            agent_id: agent_id.into(),
            resource_id: resource_id.into(),
            current_thread_id: thread_id.into(),
            threads: Vec::new(),
            archived: Vec::new(),
        }
    }

    /// Active threads, newest first.
    pub fn threads(&self) -> &[ThreadSummary] {
        &self.threads
    }

    /// Archived threads, newest first.
    pub fn archived_threads(&self) -> &[ThreadSummary] {
        &self.archived
    }

    pub fn current_thread_id(&self) -> &str {
        &self.current_thread_id
    }

    pub fn switch_to(&mut self, thread_id: impl Into<String>) {
        self.current_thread_id = thread_id.into();
    }

    pub async fn refresh(&mut self) -> Result<(), TransportError> {
        let records = self
            .client
            .list_threads(&self.agent_id, &self.resource_id)
            .await?;
        let (threads, archived) = partition_threads(&records);
        self.threads = threads;
        self.archived = archived;
        Ok(())
    }

    pub async fn archive(&mut self, thread_id: &str) -> Result<(), TransportError> {
        self.set_archived(thread_id, true).await
    }

    pub async fn unarchive(&mut self, thread_id: &str) -> Result<(), TransportError> {
        self.set_archived(thread_id, false).await
    }

    pub async fn rename(&mut self, thread_id: &str, title: &str) -> Result<(), TransportError> {
        let record = self.client.get_thread(thread_id, &self.agent_id).await?;
        self.client
            .update_thread(thread_id, &self.agent_id, title, record.metadata)
            .await?;
        self.refresh().await
    }

    pub async fn delete(&mut self, thread_id: &str) -> Result<(), TransportError> {
        self.client.delete_thread(thread_id, &self.agent_id).await?;
        self.refresh().await
    }

    /// Create a fresh thread, make it current, and return its id.
    pub async fn switch_to_new(&mut self) -> Result<String, TransportError> {
        let thread_id = Uuid::new_v4().to_string();
        self.client
            .create_thread(&self.agent_id, &self.resource_id, &thread_id, "")
            .await?;
        self.refresh().await?;
        self.current_thread_id = thread_id.clone();
        Ok(thread_id)
    }

    /// Read-modify-write of the archived flag; other metadata keys survive.
    async fn set_archived(&mut self, thread_id: &str, archived: bool) -> Result<(), TransportError> {
        let record = self.client.get_thread(thread_id, &self.agent_id).await?;
        let mut metadata = record.metadata;
        if !metadata.is_object() {
            metadata = json!({});
        }
        if let Some(map) = metadata.as_object_mut() {
            map.insert("isArchived".to_string(), Value::Bool(archived));
        }
        self.client
            .update_thread(thread_id, &self.agent_id, &record.title, metadata)
            .await?;
        self.refresh().await
    }
}

fn partition_threads(records: &[ThreadRecord]) -> (Vec<ThreadSummary>, Vec<ThreadSummary>) {
    let mut threads = Vec::new();
    let mut archived = Vec::new();
    for record in records {
        let summary = ThreadSummary {
            thread_id: record.id.clone(),
            title: record.title.clone(),
            created_at: record.created_at,
            is_archived: record.is_archived(),
        };
        if summary.is_archived {
            archived.push(summary);
        } else {
            threads.push(summary);
        }
    }
    threads.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    archived.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    (threads, archived)
}
