// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Size-targeted compression search.
//
// Pure binary search over compression levels 1..=9, generic over the probe
// so the logic is testable without building PDFs. Assumes output size is
// non-increasing in the level; if a probe breaks that assumption the search
// still returns the best size it actually observed.

use blattwerk_core::error::Result;
use blattwerk_core::types::CompressionAttempt;
use tracing::{debug, info, instrument};

use crate::compress::{MAX_LEVEL, MIN_LEVEL};

/// Result of a target-size search.
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    /// Level whose output the caller should keep.
    pub level: u8,
    /// Output size at that level.
    pub size_bytes: u64,
    /// Every probe made, in probe order.
    pub attempts: Vec<CompressionAttempt>,
    /// Whether `size_bytes` is within the accepted band around the target.
    pub within_target: bool,
}

/// Search for the lightest compression level whose output size lands at or
/// below `target_bytes * (1 + tolerance)`.
///
/// Stops early once a probe lands inside the tolerance band on both sides.
/// When no level reaches the target within `attempt_budget` probes, returns
/// the smallest output observed with `within_target = false`.
#[instrument(skip(attempt), fields(target_bytes, tolerance, attempt_budget))]
pub fn search_target_size(
    target_bytes: u64,
    tolerance: f64,
    attempt_budget: usize,
    mut attempt: impl FnMut(u8) -> Result<u64>,
) -> Result<SearchOutcome> {
    let budget = attempt_budget.max(1);
    let upper_bound = (target_bytes as f64 * (1.0 + tolerance)).floor() as u64;
    let lower_bound = (target_bytes as f64 * (1.0 - tolerance)).ceil() as u64;

    let mut attempts: Vec<CompressionAttempt> = Vec::new();
    // Lightest level observed to satisfy the target.
    let mut best_fit: Option<(u8, u64)> = None;
    // Smallest output seen anywhere, the fallback when the target is unreachable.
    let mut best_overall: Option<(u8, u64)> = None;

    let mut lo = MIN_LEVEL as i32;
    let mut hi = MAX_LEVEL as i32;

    while lo <= hi && attempts.len() < budget {
        let level = ((lo + hi) / 2) as u8;
        let size = attempt(level)?;
        attempts.push(CompressionAttempt { level, size_bytes: size });
        debug!(level, size, "compression probe");

        if best_overall.map_or(true, |(_, best)| size < best) {
            best_overall = Some((level, size));
        }

        if size <= upper_bound {
            if best_fit.map_or(true, |(best_level, _)| level < best_level) {
                best_fit = Some((level, size));
            }
            if size >= lower_bound {
                // Inside the band on both sides: no lighter level can do better.
                break;
            }
            // Overshot below the band; try a lighter level.
            hi = level as i32 - 1;
        } else {
            lo = level as i32 + 1;
        }
    }

    let (level, size_bytes, within_target) = match (best_fit, best_overall) {
        (Some((level, size)), _) => (level, size, true),
        (None, Some((level, size))) => (level, size, false),
        (None, None) => unreachable!("budget >= 1 guarantees at least one probe"),
    };

    info!(
        level,
        size_bytes,
        within_target,
        probes = attempts.len(),
        "target-size search finished"
    );
    Ok(SearchOutcome { level, size_bytes, attempts, within_target })
}
