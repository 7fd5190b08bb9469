// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Background reaper. Periodically removes terminal jobs whose retention
// window has elapsed, unless a read lease protects them. The record is
// removed before the files: after a removal, a concurrent status call
// reports NotFound rather than finding a half-deleted job.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::service::EngineCtx;

pub(crate) fn spawn_reaper(ctx: Arc<EngineCtx>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(ctx.config.reap_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            reap_once(&ctx).await;
        }
    })
}

/// One reap pass. Returns the number of jobs removed.
pub(crate) async fn reap_once(ctx: &EngineCtx) -> usize {
    let expired = ctx.store.expired(ctx.config.retention).await;
    let mut removed = 0usize;

    for id in expired {
        if ctx.leases.is_leased(id) {
            debug!(job_id = %id, "expired job is leased, deferred");
            continue;
        }
        if ctx.store.remove(id).await.is_none() {
            continue;
        }
        if let Err(err) = ctx.storage.remove_job(id).await {
            // The record is already gone; files will be retried only by an
            // operator, so make the situation visible.
            warn!(job_id = %id, %err, "job files could not be removed");
        }
        debug!(job_id = %id, "expired job reaped");
        removed += 1;
    }

    if removed > 0 {
        info!(removed, "reap pass finished");
    }
    removed
}
