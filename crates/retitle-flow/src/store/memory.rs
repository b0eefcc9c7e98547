//! In-memory job store for tests and development.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;

use retitle_core::JobId;

use crate::error::{Error, Result};
use crate::record::{JobPatch, JobRecord};
use crate::store::JobStore;

fn poison_err<T>(_: PoisonError<T>) -> Error {
    Error::storage("lock poisoned")
}

/// In-memory implementation of [`JobStore`].
///
/// ## Limitations
///
/// NOT suitable for production use:
/// - No durability: records are lost when the process exits.
/// - No cross-process sharing.
///
/// The write lock makes each merge atomic with respect to every other
/// caller, which is stronger than the contract requires but free here.
#[derive(Debug, Default)]
pub struct InMemoryJobStore {
    jobs: RwLock<HashMap<JobId, JobRecord>>,
}

impl InMemoryJobStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored records.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock is poisoned.
    pub fn len(&self) -> Result<usize> {
        let jobs = self.jobs.read().map_err(poison_err)?;
        Ok(jobs.len())
    }

    /// Returns true if the store holds no records.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock is poisoned.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn get(&self, job_id: &JobId) -> Result<Option<JobRecord>> {
        let jobs = self.jobs.read().map_err(poison_err)?;
        Ok(jobs.get(job_id).cloned())
    }

    async fn create(&self, record: JobRecord) -> Result<JobRecord> {
        let mut jobs = self.jobs.write().map_err(poison_err)?;
        if let Some(existing) = jobs.get(&record.job_id) {
            tracing::debug!(job_id = %record.job_id, "create for existing job id; keeping stored record");
            return Ok(existing.clone());
        }
        let stored = record.clone();
        jobs.insert(record.job_id, record);
        drop(jobs);
        Ok(stored)
    }

    async fn merge(&self, job_id: &JobId, patch: JobPatch) -> Result<JobRecord> {
        let mut jobs = self.jobs.write().map_err(poison_err)?;
        let record = jobs
            .get_mut(job_id)
            .ok_or(Error::JobNotFound { job_id: *job_id })?;
        record.apply(&patch);
        let merged = record.clone();
        drop(jobs);
        Ok(merged)
    }
}
