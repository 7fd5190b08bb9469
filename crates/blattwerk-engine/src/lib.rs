// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// blattwerk-engine — Job orchestration for the Blattwerk transformation
// engine.
//
// A [`Service`] owns the in-memory job store, a FIFO dispatcher feeding a
// fixed pool of worker tasks, per-job filesystem storage gated by read
// leases, and a background reaper that removes expired terminal jobs.

pub mod naming;
pub mod registry;
pub mod service;
pub mod storage;
pub mod store;
pub mod validate;

mod dispatcher;
mod exec;
mod reaper;
mod worker;

#[cfg(test)]
pub(crate) mod testutil;

pub use registry::{InputArity, TransformSpec, spec_for};
pub use service::{OutputHandle, Service};
pub use storage::{LeaseSet, ReadLease, StorageArea, hash_bytes};
pub use store::JobStore;
pub use validate::Upload;

pub use blattwerk_core::config::EngineConfig;
pub use blattwerk_core::error::{BlattwerkError, ErrorKind, Result};
pub use blattwerk_core::types::{Job, JobId, JobKind, JobParams, JobStatus};
