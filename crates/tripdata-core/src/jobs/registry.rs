//! Process-wide job table.
//!
//! One registry instance is constructed at startup and shared (via `Arc`)
//! by every runner and query handler. Reads and writes may arrive from many
//! job tasks at once; the inner lock serializes per-record mutation so
//! progress updates are never lost.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::Utc;
use thiserror::Error;
use uuid::Uuid;

use super::types::{JobId, JobRecord, JobResult, JobStatus};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("job not found: {0}")]
    NotFound(JobId),
}

#[derive(Debug, Default)]
pub struct JobRegistry {
    jobs: RwLock<HashMap<JobId, JobRecord>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a fresh pending job and return its record.
    pub fn create(&self) -> JobRecord {
        let now = Utc::now();
        let record = JobRecord {
            id: Uuid::new_v4().to_string(),
            status: JobStatus::Pending,
            progress: 0,
            message: "queued".to_string(),
            created_at: now,
            updated_at: now,
            result: None,
        };
        self.jobs
            .write()
            .unwrap()
            .insert(record.id.clone(), record.clone());
        record
    }

    /// Update a job in place. The creation timestamp is never touched; the
    /// update timestamp always is. Progress never moves backwards and is
    /// clamped to 100. A `Some` result replaces any existing payload.
    pub fn transition(
        &self,
        id: &str,
        status: JobStatus,
        progress: u8,
        message: impl Into<String>,
        result: Option<JobResult>,
    ) -> Result<(), RegistryError> {
        let mut jobs = self.jobs.write().unwrap();
        let record = jobs
            .get_mut(id)
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))?;
        record.status = status;
        record.progress = record.progress.max(progress.min(100));
        record.message = message.into();
        record.updated_at = Utc::now();
        if let Some(result) = result {
            record.result = Some(result);
        }
        Ok(())
    }

    pub fn get(&self, id: &str) -> Result<JobRecord, RegistryError> {
        self.jobs
            .read()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))
    }

    /// All records, most recently created first.
    pub fn list(&self) -> Vec<JobRecord> {
        let mut records: Vec<JobRecord> = self.jobs.read().unwrap().values().cloned().collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        records
    }

    /// Remove a record and any retained result. Does not stop an in-flight
    /// runner; its later writes will simply find nothing to update.
    pub fn delete(&self, id: &str) -> Result<(), RegistryError> {
        self.jobs
            .write()
            .unwrap()
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))
    }
}
