// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Per-job filesystem storage and read leases.
//
// Every job owns one directory under the configured data root. Outputs are
// written to a `.partial` staging name and promoted with an atomic rename,
// so a visible output file is always complete. Read leases protect a job's
// files from the reaper while a fetch is in flight.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use blattwerk_core::error::{BlattwerkError, Result};
use blattwerk_core::types::JobId;
use sha2::{Digest, Sha256};
use tracing::{debug, instrument, warn};

/// SHA-256 of a byte slice, lowercase hex.
pub fn hash_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

// -- Storage area -------------------------------------------------------------

/// Filesystem root holding one subdirectory per job.
#[derive(Debug, Clone)]
pub struct StorageArea {
    root: PathBuf,
}

impl StorageArea {
    /// Open (creating if needed) the storage root.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root).map_err(|err| {
            BlattwerkError::Storage(format!("cannot create data dir {}: {}", root.display(), err))
        })?;
        Ok(Self { root })
    }

    /// Directory owned by one job.
    pub fn job_dir(&self, id: JobId) -> PathBuf {
        self.root.join(id.to_string())
    }

    /// Absolute path of a file inside a job's directory.
    pub fn path_of(&self, id: JobId, name: &str) -> PathBuf {
        self.job_dir(id).join(name)
    }

    /// Persist one input file, returning its storage-relative name.
    #[instrument(skip(self, data), fields(job_id = %id, index, bytes = data.len()))]
    pub async fn save_input(
        &self,
        id: JobId,
        index: usize,
        extension: &str,
        data: &[u8],
    ) -> Result<String> {
        let dir = self.job_dir(id);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|err| storage_err(&dir, err))?;

        let name = format!("input_{}.{}", index, extension);
        let path = dir.join(&name);
        tokio::fs::write(&path, data)
            .await
            .map_err(|err| storage_err(&path, err))?;
        debug!(name, "input stored");
        Ok(name)
    }

    /// Write an output file: staged under a `.partial` name, then renamed
    /// into place. Readers never observe a half-written output.
    #[instrument(skip(self, data), fields(job_id = %id, name, bytes = data.len()))]
    pub async fn write_output(&self, id: JobId, name: &str, data: &[u8]) -> Result<()> {
        let dir = self.job_dir(id);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|err| storage_err(&dir, err))?;

        let staged = dir.join(format!("{}.partial", name));
        let final_path = dir.join(name);
        tokio::fs::write(&staged, data)
            .await
            .map_err(|err| storage_err(&staged, err))?;
        tokio::fs::rename(&staged, &final_path)
            .await
            .map_err(|err| storage_err(&final_path, err))?;
        debug!("output promoted");
        Ok(())
    }

    /// Read a stored file back into memory.
    pub async fn read(&self, id: JobId, name: &str) -> Result<Vec<u8>> {
        let path = self.path_of(id, name);
        tokio::fs::read(&path)
            .await
            .map_err(|err| storage_err(&path, err))
    }

    /// Remove a job's entire directory. Missing directories are fine.
    pub async fn remove_job(&self, id: JobId) -> Result<()> {
        let dir = self.job_dir(id);
        match tokio::fs::remove_dir_all(&dir).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(storage_err(&dir, err)),
        }
    }
}

fn storage_err(path: &Path, err: std::io::Error) -> BlattwerkError {
    BlattwerkError::Storage(format!("{}: {}", path.display(), err))
}

// -- Read leases --------------------------------------------------------------

struct LeaseEntry {
    count: usize,
    expires_at: Instant,
}

/// Reference-counted, TTL-bounded read leases keyed by job id.
///
/// A live lease makes the job invisible to the reaper. The TTL is a
/// backstop for leaked lease guards; a lease past its TTL no longer
/// protects anything.
#[derive(Clone, Default)]
pub struct LeaseSet {
    inner: Arc<Mutex<HashMap<JobId, LeaseEntry>>>,
}

impl LeaseSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take a lease on a job's files. Dropping the guard releases it.
    pub fn acquire(&self, id: JobId, ttl: Duration) -> ReadLease {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let expires_at = Instant::now() + ttl;
        let entry = inner.entry(id).or_insert(LeaseEntry { count: 0, expires_at });
        entry.count += 1;
        entry.expires_at = entry.expires_at.max(expires_at);
        ReadLease { set: self.clone(), id }
    }

    /// Whether any unexpired lease currently protects the job.
    pub fn is_leased(&self, id: JobId) -> bool {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner
            .get(&id)
            .is_some_and(|entry| entry.count > 0 && Instant::now() < entry.expires_at)
    }

    fn release(&self, id: JobId) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(entry) = inner.get_mut(&id) {
            entry.count = entry.count.saturating_sub(1);
            if entry.count == 0 {
                inner.remove(&id);
            }
        } else {
            warn!(job_id = %id, "released a lease that was not held");
        }
    }
}

/// RAII guard for one read lease.
pub struct ReadLease {
    set: LeaseSet,
    id: JobId,
}

impl std::fmt::Debug for ReadLease {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadLease").field("job_id", &self.id).finish()
    }
}

impl Drop for ReadLease {
    fn drop(&mut self) {
        self.set.release(self.id);
    }
}
