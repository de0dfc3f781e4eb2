//! Poll a submitted job to its terminal state, printing progress changes.

use anyhow::Result;
use std::time::Duration;
use tripdata_core::jobs::{JobRecord, JobRegistry};

const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Blocks (asynchronously) until the job reaches a terminal status, echoing
/// each new progress message to stdout.
pub async fn wait_for_terminal(registry: &JobRegistry, id: &str) -> Result<JobRecord> {
    let mut last_message = String::new();
    loop {
        let record = registry.get(id)?;
        if record.message != last_message {
            println!("[{:>3}%] {}", record.progress, record.message);
            last_message = record.message.clone();
        }
        if record.status.is_terminal() {
            return Ok(record);
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}
