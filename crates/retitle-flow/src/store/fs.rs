//! Filesystem job store: one JSON document per job.
//!
//! Layout: `<root>/jobs/<jobId>.json`. Writes go to a temp file first and
//! are renamed into place, so a crash mid-write cannot leave a torn record.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::Mutex;

use retitle_core::JobId;

use crate::error::{Error, Result};
use crate::record::{JobPatch, JobRecord};
use crate::store::JobStore;

/// Filesystem implementation of [`JobStore`].
///
/// ## Limitations
///
/// Single-process only: the read-modify-write cycle is serialized by an
/// in-process lock, not by the filesystem. Two processes sharing a root
/// would race.
#[derive(Debug)]
pub struct FsJobStore {
    root: PathBuf,
    // Serializes read-modify-write cycles; per-caller atomicity is the
    // store contract.
    write_lock: Mutex<()>,
}

impl FsJobStore {
    /// Creates a store rooted at `root`. The directory is created on first
    /// write.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            write_lock: Mutex::new(()),
        }
    }

    fn jobs_dir(&self) -> PathBuf {
        self.root.join("jobs")
    }

    fn record_path(&self, job_id: &JobId) -> PathBuf {
        self.jobs_dir().join(format!("{job_id}.json"))
    }

    async fn read_record(&self, path: &Path) -> Result<Option<JobRecord>> {
        match tokio::fs::read(path).await {
            Ok(bytes) => {
                let record = serde_json::from_slice(&bytes)?;
                Ok(Some(record))
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(Error::storage_with_source(
                format!("failed to read {}", path.display()),
                err,
            )),
        }
    }

    async fn write_record(&self, record: &JobRecord) -> Result<()> {
        let dir = self.jobs_dir();
        tokio::fs::create_dir_all(&dir).await.map_err(|err| {
            Error::storage_with_source(format!("failed to create {}", dir.display()), err)
        })?;

        let path = self.record_path(&record.job_id);
        let tmp = path.with_extension("json.tmp");
        let bytes = serde_json::to_vec_pretty(record)?;

        tokio::fs::write(&tmp, &bytes).await.map_err(|err| {
            Error::storage_with_source(format!("failed to write {}", tmp.display()), err)
        })?;
        tokio::fs::rename(&tmp, &path).await.map_err(|err| {
            Error::storage_with_source(format!("failed to rename into {}", path.display()), err)
        })?;
        Ok(())
    }
}

#[async_trait]
impl JobStore for FsJobStore {
    async fn get(&self, job_id: &JobId) -> Result<Option<JobRecord>> {
        self.read_record(&self.record_path(job_id)).await
    }

    async fn create(&self, record: JobRecord) -> Result<JobRecord> {
        let _guard = self.write_lock.lock().await;
        if let Some(existing) = self.read_record(&self.record_path(&record.job_id)).await? {
            tracing::debug!(job_id = %record.job_id, "create for existing job id; keeping stored record");
            return Ok(existing);
        }
        self.write_record(&record).await?;
        Ok(record)
    }

    async fn merge(&self, job_id: &JobId, patch: JobPatch) -> Result<JobRecord> {
        let _guard = self.write_lock.lock().await;
        let mut record = self
            .read_record(&self.record_path(job_id))
            .await?
            .ok_or(Error::JobNotFound { job_id: *job_id })?;
        record.apply(&patch);
        self.write_record(&record).await?;
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::JobStatus;

    fn fresh_record() -> JobRecord {
        JobRecord::new(JobId::generate(), "@somechannel", "a@b.com")
    }

    #[tokio::test]
    async fn create_get_merge_roundtrip() -> Result<()> {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FsJobStore::new(dir.path());

        let record = fresh_record();
        let job_id = record.job_id;
        store.create(record.clone()).await?;

        let loaded = store.get(&job_id).await?.expect("record stored");
        assert_eq!(loaded, record);

        let merged = store
            .merge(
                &job_id,
                JobPatch::status(JobStatus::ResolvingChannel),
            )
            .await?;
        assert_eq!(merged.status, JobStatus::ResolvingChannel);
        Ok(())
    }

    #[tokio::test]
    async fn records_survive_reopening_the_store() -> Result<()> {
        let dir = tempfile::tempdir().expect("tempdir");
        let job_id;
        {
            let store = FsJobStore::new(dir.path());
            let record = fresh_record();
            job_id = record.job_id;
            store.create(record).await?;
        }

        let reopened = FsJobStore::new(dir.path());
        let loaded = reopened.get(&job_id).await?.expect("record persisted");
        assert_eq!(loaded.status, JobStatus::Queued);
        Ok(())
    }

    #[tokio::test]
    async fn get_missing_returns_none() -> Result<()> {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FsJobStore::new(dir.path());
        assert!(store.get(&JobId::generate()).await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn merge_unknown_id_is_not_found() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FsJobStore::new(dir.path());
        let err = store
            .merge(&JobId::generate(), JobPatch::status(JobStatus::Failed))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::JobNotFound { .. }));
    }

    #[tokio::test]
    async fn create_existing_id_keeps_stored_record() -> Result<()> {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FsJobStore::new(dir.path());
        let record = fresh_record();
        let job_id = record.job_id;
        store.create(record.clone()).await?;
        store
            .merge(&job_id, JobPatch::status(JobStatus::ResolvingChannel))
            .await?;

        let kept = store.create(record).await?;
        assert_eq!(kept.status, JobStatus::ResolvingChannel);
        Ok(())
    }
}
