// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Worker pool. Each worker pulls job ids off the shared queue, claims the
// record, and executes the transform under the configured timeout. Outputs
// are staged and promoted before the record turns Completed, so a Completed
// status always implies a readable output file.

use std::sync::Arc;

use blattwerk_core::error::BlattwerkError;
use blattwerk_core::types::JobId;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, error, info, instrument};

use crate::dispatcher::JobQueue;
use crate::exec;
use crate::service::EngineCtx;

/// Spawn the fixed worker pool. Workers exit when the queue closes.
pub(crate) fn spawn_workers(
    ctx: Arc<EngineCtx>,
    queue: JobQueue,
    count: usize,
) -> Vec<JoinHandle<()>> {
    (0..count.max(1))
        .map(|index| {
            let ctx = Arc::clone(&ctx);
            let queue = Arc::clone(&queue);
            tokio::spawn(async move {
                debug!(worker = index, "worker started");
                loop {
                    let next = {
                        let mut rx = queue.lock().await;
                        rx.recv().await
                    };
                    let Some(id) = next else {
                        debug!(worker = index, "queue closed, worker exiting");
                        break;
                    };
                    process(&ctx, id).await;
                }
            })
        })
        .collect()
}

/// Run one dispatched job to a terminal state.
#[instrument(skip(ctx), fields(job_id = %id))]
async fn process(ctx: &EngineCtx, id: JobId) {
    // A missing or already-claimed job means the queue entry is stale.
    let Some(job) = ctx.store.claim(id).await else {
        debug!("stale queue entry skipped");
        return;
    };
    info!(kind = %job.kind(), "job claimed");

    let budget = ctx.config.transform_timeout;
    let outcome = match timeout(budget, exec::execute(&job, ctx)).await {
        Err(_) => Err(BlattwerkError::Timeout(budget.as_secs())),
        Ok(result) => result,
    };

    match outcome {
        Ok(output) => {
            for (name, bytes) in &output.files {
                if let Err(err) = ctx.storage.write_output(id, name, bytes).await {
                    error!(%err, "output write failed");
                    ctx.store.fail(id, &err).await;
                    return;
                }
            }
            ctx.store
                .complete(id, output.primary_ref, output.download_name, output.report)
                .await;
        }
        Err(err) => {
            info!(error_kind = ?err.kind(), %err, "transform failed");
            ctx.store.fail(id, &err).await;
        }
    }
}
