// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// In-memory job store.
//
// Jobs are records behind an async RwLock; readers get clones, never
// references into the map. Claiming is the only compare-and-set: a job
// moves Pending → Processing exactly once, so a job can never run twice
// even if it were dispatched twice.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use blattwerk_core::error::BlattwerkError;
use blattwerk_core::types::{Job, JobId, JobStatus};
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Shared in-memory job table. Cloning is cheap and shares state.
#[derive(Clone, Default)]
pub struct JobStore {
    jobs: Arc<RwLock<HashMap<JobId, Job>>>,
}

impl JobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, job: Job) {
        let mut jobs = self.jobs.write().await;
        debug!(job_id = %job.id, kind = %job.kind(), "job recorded");
        jobs.insert(job.id, job);
    }

    /// Snapshot of one job, if it exists.
    pub async fn get(&self, id: JobId) -> Option<Job> {
        self.jobs.read().await.get(&id).cloned()
    }

    /// Claim a pending job for execution. Returns the claimed snapshot, or
    /// `None` when the job is gone or not pending (already claimed).
    pub async fn claim(&self, id: JobId) -> Option<Job> {
        let mut jobs = self.jobs.write().await;
        let job = jobs.get_mut(&id)?;
        if job.status != JobStatus::Pending {
            warn!(job_id = %id, status = ?job.status, "claim refused, job not pending");
            return None;
        }
        job.status = JobStatus::Processing;
        Some(job.clone())
    }

    /// Record success. Output fields and `completed_at` are set here, once.
    pub async fn complete(
        &self,
        id: JobId,
        output_ref: String,
        output_filename: String,
        report: Option<serde_json::Value>,
    ) {
        let mut jobs = self.jobs.write().await;
        let Some(job) = jobs.get_mut(&id) else {
            warn!(job_id = %id, "completion for an unknown job dropped");
            return;
        };
        if job.status != JobStatus::Processing {
            warn!(job_id = %id, status = ?job.status, "completion for a non-processing job dropped");
            return;
        }
        job.status = JobStatus::Completed;
        job.output_ref = Some(output_ref);
        job.output_filename = Some(output_filename);
        job.report = report;
        job.completed_at = Some(Utc::now());
        info!(job_id = %id, kind = %job.kind(), "job completed");
    }

    /// Record failure with the error's public message and classification.
    pub async fn fail(&self, id: JobId, error: &BlattwerkError) {
        let mut jobs = self.jobs.write().await;
        let Some(job) = jobs.get_mut(&id) else {
            warn!(job_id = %id, "failure for an unknown job dropped");
            return;
        };
        if job.status != JobStatus::Processing {
            warn!(job_id = %id, status = ?job.status, "failure for a non-processing job dropped");
            return;
        }
        job.status = JobStatus::Failed;
        job.error = Some(error.public_message());
        job.error_kind = Some(error.kind());
        job.completed_at = Some(Utc::now());
        info!(job_id = %id, kind = %job.kind(), error_kind = ?error.kind(), "job failed");
    }

    /// Terminal jobs whose retention window has elapsed.
    pub async fn expired(&self, retention: Duration) -> Vec<JobId> {
        let retention = chrono::Duration::from_std(retention)
            .unwrap_or_else(|_| chrono::Duration::MAX);
        let cutoff = Utc::now() - retention;
        self.jobs
            .read()
            .await
            .values()
            .filter(|job| {
                job.status.is_terminal()
                    && job.completed_at.is_some_and(|done| done <= cutoff)
            })
            .map(|job| job.id)
            .collect()
    }

    /// Remove a job record, returning it if it existed.
    pub async fn remove(&self, id: JobId) -> Option<Job> {
        self.jobs.write().await.remove(&id)
    }

    pub async fn len(&self) -> usize {
        self.jobs.read().await.len()
    }
}
