//! Async job bookkeeping: registry, records, and detached runners.
//!
//! The shared engine behind the "submit and poll" surface of both services.
//! Records live for the process lifetime only; there is no persistence and
//! no cancellation.

mod registry;
mod runner;
mod types;

pub use registry::{JobRegistry, RegistryError};
pub use runner::{submit_collection, submit_conversion};
pub use types::{
    CollectionJobResult, ConversionJobResult, FileConversionRecord, JobId, JobRecord, JobResult,
    JobStatus,
};
