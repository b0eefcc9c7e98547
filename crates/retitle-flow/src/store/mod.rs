//! Pluggable storage for job records.
//!
//! The `JobStore` trait defines the persistence layer for the pipeline's one
//! durable entity, keyed by job id.
//!
//! ## Design Principles
//!
//! - **Merge, never replace**: stages write partial records; fields they do
//!   not touch must survive. The merge itself lives on
//!   [`JobRecord::apply`](crate::record::JobRecord::apply) so every backend
//!   shares the exact same semantics.
//! - **Per-job isolation**: merges for different job ids never interfere;
//!   duplicate merges for the same job are tolerated via idempotence, not
//!   prevented via cross-job locks.
//! - **Testability**: in-memory implementation for tests and dev, a
//!   filesystem implementation for single-process durable deployments.

pub mod fs;
pub mod memory;

use async_trait::async_trait;

use retitle_core::JobId;

use crate::error::Result;
use crate::record::{JobPatch, JobRecord};

pub use fs::FsJobStore;
pub use memory::InMemoryJobStore;

/// Storage abstraction for job records.
///
/// ## Thread Safety
///
/// All methods are `Send + Sync`; many stage handlers belonging to many jobs
/// call them concurrently.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Gets a record by id.
    ///
    /// Returns `None` if no record exists.
    async fn get(&self, job_id: &JobId) -> Result<Option<JobRecord>>;

    /// Inserts a fresh record.
    ///
    /// Idempotent: creating an id that already exists returns the stored
    /// record unchanged, so a redelivered submission cannot clobber a job
    /// already in flight.
    async fn create(&self, record: JobRecord) -> Result<JobRecord>;

    /// Merges a patch onto the stored record and returns the result.
    ///
    /// Atomic with respect to a single caller. Fails with
    /// [`Error::JobNotFound`](crate::error::Error::JobNotFound) when the id
    /// is unknown: an event referencing a job the store has never seen is a
    /// boundary condition, not a request to create one.
    async fn merge(&self, job_id: &JobId, patch: JobPatch) -> Result<JobRecord>;
}
