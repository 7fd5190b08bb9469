// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The engine facade. A `Service` owns the store, storage area, dispatcher,
// worker pool, and reaper; embedders (HTTP adapters, CLIs, tests) talk to
// jobs exclusively through it.

use std::sync::Arc;

use blattwerk_core::config::EngineConfig;
use blattwerk_core::error::{BlattwerkError, Result};
use blattwerk_core::types::{Job, JobId, JobKind, JobParams, JobStatus, MediaKind};
use blattwerk_document::pdf::info::{DocumentInfo, inspect};
use tokio::task::JoinHandle;
use tracing::{info, instrument};

use crate::dispatcher::Dispatcher;
use crate::storage::{self, LeaseSet, ReadLease, StorageArea};
use crate::store::JobStore;
use crate::validate::{self, Upload};
use crate::{naming, reaper, registry, worker};

/// State shared by the facade, the worker pool, and the reaper.
pub(crate) struct EngineCtx {
    pub(crate) config: EngineConfig,
    pub(crate) store: JobStore,
    pub(crate) storage: StorageArea,
    pub(crate) leases: LeaseSet,
    pub(crate) dispatcher: Dispatcher,
}

struct Inner {
    ctx: Arc<EngineCtx>,
    workers: Vec<JoinHandle<()>>,
    reaper: JoinHandle<()>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        self.reaper.abort();
        for worker in &self.workers {
            worker.abort();
        }
    }
}

/// Handle to the running engine. Cheap to clone; the engine shuts down
/// when the last handle drops.
#[derive(Clone)]
pub struct Service {
    inner: Arc<Inner>,
}

impl Service {
    /// Start the engine: open the storage area, spawn the worker pool and
    /// the reaper. Must be called from within a Tokio runtime.
    pub fn new(config: EngineConfig) -> Result<Self> {
        let storage = StorageArea::new(&config.data_dir)?;
        let (dispatcher, queue) = Dispatcher::new();
        let workers = config.workers;

        let ctx = Arc::new(EngineCtx {
            config,
            store: JobStore::new(),
            storage,
            leases: LeaseSet::new(),
            dispatcher,
        });
        let workers = worker::spawn_workers(Arc::clone(&ctx), queue, workers);
        let reaper = reaper::spawn_reaper(Arc::clone(&ctx));

        info!(workers = workers.len(), "engine started");
        Ok(Self {
            inner: Arc::new(Inner { ctx, workers, reaper }),
        })
    }

    /// Validate a submission, persist its inputs, record the job, and
    /// queue it. Returns the new job's id; a rejected submission leaves
    /// no job behind.
    #[instrument(skip_all, fields(operation = %params.kind(), files = uploads.len()))]
    pub async fn submit(&self, params: JobParams, uploads: Vec<Upload>) -> Result<JobId> {
        let ctx = &self.inner.ctx;
        let spec = registry::spec_for(params.kind());
        validate::validate_submission(spec, &params, &uploads, &ctx.config)?;

        let mut job = Job::new(params, Vec::new(), Vec::new(), Vec::new());
        for (index, upload) in uploads.iter().enumerate() {
            let extension = naming::extension(&upload.filename)
                .unwrap_or_else(|| "bin".to_string());
            let stored = match ctx
                .storage
                .save_input(job.id, index, &extension, &upload.data)
                .await
            {
                Ok(name) => name,
                Err(err) => {
                    let _ = ctx.storage.remove_job(job.id).await;
                    return Err(err);
                }
            };
            job.input_refs.push(stored);
            job.input_names.push(naming::sanitize(&upload.filename));
            job.input_hashes.push(storage::hash_bytes(&upload.data));
        }

        let id = job.id;
        ctx.store.insert(job).await;
        if let Err(err) = ctx.dispatcher.dispatch(id) {
            ctx.store.remove(id).await;
            let _ = ctx.storage.remove_job(id).await;
            return Err(err);
        }
        info!(job_id = %id, "job submitted");
        Ok(id)
    }

    /// Snapshot of a job's current record.
    pub async fn status(&self, id: JobId) -> Result<Job> {
        self.inner
            .ctx
            .store
            .get(id)
            .await
            .ok_or_else(|| BlattwerkError::NotFound(format!("job {} not found", id)))
    }

    /// Fetch a completed job's output. The returned handle holds a read
    /// lease, so the job survives the reaper while the handle is alive.
    pub async fn fetch_output(&self, id: JobId) -> Result<OutputHandle> {
        let ctx = &self.inner.ctx;
        // Lease before the record lookup so the reaper cannot slip between
        // the status check and the file read.
        let lease = ctx.leases.acquire(id, ctx.config.lease_ttl);

        let job = ctx
            .store
            .get(id)
            .await
            .ok_or_else(|| BlattwerkError::NotFound(format!("job {} not found", id)))?;
        // A job that is not completed has no output to find; the caller
        // cannot distinguish this from an unknown or reaped id.
        if job.status != JobStatus::Completed {
            return Err(BlattwerkError::NotFound(format!(
                "no output for job {} (status: {:?})",
                id, job.status
            )));
        }

        let output_ref = job.output_ref.ok_or_else(|| {
            BlattwerkError::Storage("completed job is missing its output reference".to_string())
        })?;
        let data = ctx.storage.read(id, &output_ref).await?;
        let filename = job.output_filename.unwrap_or(output_ref);
        Ok(OutputHandle {
            media_type: naming::media_type(&filename),
            filename,
            data,
            _lease: lease,
        })
    }

    /// The first (left) unmodified input of a completed compare job.
    pub async fn compare_left(&self, id: JobId) -> Result<OutputHandle> {
        self.compare_input(id, 0).await
    }

    /// The second (right) unmodified input of a completed compare job.
    pub async fn compare_right(&self, id: JobId) -> Result<OutputHandle> {
        self.compare_input(id, 1).await
    }

    /// A completed compare job's structured change list.
    pub async fn compare_report(&self, id: JobId) -> Result<serde_json::Value> {
        let job = self.status(id).await?;
        job.report
            .ok_or_else(|| BlattwerkError::NotFound(format!("job {} has no report", id)))
    }

    async fn compare_input(&self, id: JobId, index: usize) -> Result<OutputHandle> {
        let ctx = &self.inner.ctx;
        let lease = ctx.leases.acquire(id, ctx.config.lease_ttl);

        let job = ctx
            .store
            .get(id)
            .await
            .ok_or_else(|| BlattwerkError::NotFound(format!("job {} not found", id)))?;
        if job.kind() != JobKind::Compare {
            return Err(BlattwerkError::Validation(format!(
                "job {} is a {} job, not a comparison",
                id,
                job.kind()
            )));
        }
        if job.status != JobStatus::Completed {
            return Err(BlattwerkError::NotFound(format!(
                "no comparison result for job {} (status: {:?})",
                id, job.status
            )));
        }

        let input_ref = job.input_refs.get(index).cloned().ok_or_else(|| {
            BlattwerkError::NotFound(format!("job {} has no input {}", id, index))
        })?;
        let filename = job
            .input_names
            .get(index)
            .cloned()
            .unwrap_or_else(|| input_ref.clone());
        let data = ctx.storage.read(id, &input_ref).await?;
        Ok(OutputHandle {
            media_type: naming::media_type(&filename),
            filename,
            data,
            _lease: lease,
        })
    }

    /// Inspect a PDF without creating a job. Encrypted documents are
    /// reported, not rejected.
    pub fn document_info(&self, upload: &Upload) -> Result<DocumentInfo> {
        let config = &self.inner.ctx.config;
        validate::validate_upload(upload, MediaKind::Pdf, config.max_upload_bytes)?;
        inspect(&upload.data)
    }

    /// Run one reap pass immediately, outside the background schedule.
    pub async fn reap_now(&self) -> usize {
        reaper::reap_once(&self.inner.ctx).await
    }

    /// Number of job records currently held.
    pub async fn job_count(&self) -> usize {
        self.inner.ctx.store.len().await
    }
}

/// A served file (an output or a compare input), pinned against reaping
/// while the handle is alive.
#[derive(Debug)]
pub struct OutputHandle {
    pub filename: String,
    pub media_type: &'static str,
    pub data: Vec<u8>,
    _lease: ReadLease,
}
