// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// FIFO dispatch channel between submission and the worker pool. Only job
// ids travel on the channel; workers re-read the record from the store at
// claim time, so a stale queue entry for a removed job is harmless.

use std::sync::Arc;

use blattwerk_core::error::{BlattwerkError, Result};
use blattwerk_core::types::JobId;
use tokio::sync::{Mutex, mpsc};
use tracing::debug;

/// Receiving half shared by the worker pool.
pub(crate) type JobQueue = Arc<Mutex<mpsc::UnboundedReceiver<JobId>>>;

#[derive(Clone)]
pub(crate) struct Dispatcher {
    tx: mpsc::UnboundedSender<JobId>,
}

impl Dispatcher {
    pub(crate) fn new() -> (Self, JobQueue) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, Arc::new(Mutex::new(rx)))
    }

    /// Enqueue a job for execution, in submission order.
    pub(crate) fn dispatch(&self, id: JobId) -> Result<()> {
        self.tx.send(id).map_err(|_| {
            BlattwerkError::Storage("job queue is closed; engine is shut down".to_string())
        })?;
        debug!(job_id = %id, "job dispatched");
        Ok(())
    }
}
