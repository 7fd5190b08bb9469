// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Engine configuration.

use std::path::PathBuf;
use std::time::Duration;

/// Tunables for the transformation engine. The embedder constructs one of
/// these at startup; all components read from it, none mutate it.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Root of the storage area; one subdirectory per job is created here.
    pub data_dir: PathBuf,
    /// Number of concurrent transform executors. Bounds the maximum number
    /// of simultaneously in-flight transforms; excess submissions queue.
    pub workers: usize,
    /// Maximum wall-clock duration of a single transform execution.
    pub transform_timeout: Duration,
    /// Minimum time a terminal job's record and files are kept.
    pub retention: Duration,
    /// How often the reaper scans for expired jobs.
    pub reap_interval: Duration,
    /// How long a read lease protects a storage entry from deletion.
    pub lease_ttl: Duration,
    /// Per-file upload cap in bytes.
    pub max_upload_bytes: u64,
    /// Page-count cap applied after a PDF input is saved.
    pub max_pages: usize,
    /// Maximum number of probes the target-size compression search makes.
    pub compress_attempt_budget: usize,
    /// Relative tolerance around the size target (0.05 = ±5%).
    pub compress_tolerance: f64,
    /// Binary invoked for office-to-PDF conversion.
    pub office_converter: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            data_dir: std::env::temp_dir().join("blattwerk-jobs"),
            workers: 4,
            transform_timeout: Duration::from_secs(120),
            retention: Duration::from_secs(30 * 60),
            reap_interval: Duration::from_secs(60),
            lease_ttl: Duration::from_secs(30),
            max_upload_bytes: 25 * 1024 * 1024,
            max_pages: 200,
            compress_attempt_budget: 6,
            compress_tolerance: 0.05,
            office_converter: "soffice".to_string(),
        }
    }
}
