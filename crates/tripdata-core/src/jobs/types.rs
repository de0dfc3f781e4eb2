//! Job records and terminal result payloads.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Opaque job identifier (uuid v4 string, generated at submission).
pub type JobId = String;

/// Job lifecycle. No cancelled state: a submitted job always runs to a
/// terminal status or the process exits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

/// Terminal payload of a collection job.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CollectionJobResult {
    pub files_count: u64,
    pub total_bytes: u64,
    pub files: Vec<String>,
}

/// Per-file outcome within a conversion batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileConversionRecord {
    pub input: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Whether the converted source was moved to the backup directory.
    /// Absent when no backup directory is configured or the file failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup_moved: Option<bool>,
}

/// Terminal payload of a conversion batch job.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversionJobResult {
    pub total_files: usize,
    pub converted: usize,
    pub failed: usize,
    pub records: Vec<FileConversionRecord>,
}

/// Tagged terminal payload, present once a job reaches a terminal status.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum JobResult {
    Collection(CollectionJobResult),
    Conversion(ConversionJobResult),
}

/// One entry in the job registry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobRecord {
    pub id: JobId,
    pub status: JobStatus,
    /// 0–100; never moves backwards within a run.
    pub progress: u8,
    pub message: String,
    /// Set exactly once at creation and preserved across every transition.
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<JobResult>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_serializes_with_wire_field_names() {
        let now = Utc::now();
        let record = JobRecord {
            id: "abc".to_string(),
            status: JobStatus::Pending,
            progress: 0,
            message: "queued".to_string(),
            created_at: now,
            updated_at: now,
            result: None,
        };
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["id"], "abc");
        assert_eq!(value["status"], "pending");
        assert_eq!(value["progress"], 0);
        assert!(value.get("created_at").is_some());
        assert!(value.get("updated_at").is_some());
        assert!(value.get("result").is_none(), "absent until terminal");
    }

    #[test]
    fn result_payloads_are_tagged() {
        let result = JobResult::Collection(CollectionJobResult {
            files_count: 2,
            total_bytes: 1024,
            files: vec!["yellow_tripdata_2021-11.csv".to_string()],
        });
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["kind"], "collection");
        assert_eq!(value["files_count"], 2);

        let result = JobResult::Conversion(ConversionJobResult {
            total_files: 1,
            converted: 0,
            failed: 1,
            records: vec![FileConversionRecord {
                input: "a.csv".to_string(),
                output: None,
                success: false,
                error: Some("empty csv".to_string()),
                backup_moved: None,
            }],
        });
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["kind"], "conversion");
        assert_eq!(value["records"][0]["success"], false);
    }

    #[test]
    fn terminal_statuses() {
        assert!(!JobStatus::Pending.is_terminal());
        assert!(!JobStatus::Running.is_terminal());
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert_eq!(JobStatus::Running.as_str(), "running");
    }
}
