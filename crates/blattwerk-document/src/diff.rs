// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Structural document diff.
//
// Pages are compared pairwise by position; each page's text lines are
// aligned with a longest-matching-block algorithm and the gaps between
// matches become change records. A replaced region always emits its
// removal before its addition, and each contiguous run of lines is
// reported as a single multi-line record.

use std::collections::HashMap;

use blattwerk_core::error::Result;
use blattwerk_core::types::{ChangeKind, ChangeRecord, CompareReport};
use tracing::{info, instrument};

use crate::pdf::PdfFile;
use crate::pdf::text::page_lines;

/// Compare two documents and produce the change report.
#[instrument(skip_all)]
pub fn diff_documents(left: &PdfFile, right: &PdfFile) -> Result<CompareReport> {
    let left_pages = page_lines(left)?;
    let right_pages = page_lines(right)?;

    let page_count = left_pages.len().max(right_pages.len());
    let empty: Vec<String> = Vec::new();

    let mut changes = Vec::new();
    for index in 0..page_count {
        let a = left_pages.get(index).unwrap_or(&empty);
        let b = right_pages.get(index).unwrap_or(&empty);
        diff_page(index as u32 + 1, a, b, &mut changes);
    }

    let report = CompareReport::from_changes(changes);
    info!(total = report.total, pages = page_count, "documents compared");
    Ok(report)
}

/// Diff one aligned page pair, appending change records.
fn diff_page(page: u32, a: &[String], b: &[String], changes: &mut Vec<ChangeRecord>) {
    let mut a_pos = 0usize;
    let mut b_pos = 0usize;
    for (a_start, b_start, length) in matching_blocks(a, b) {
        push_change(page, ChangeKind::Removal, &a[a_pos..a_start], changes);
        push_change(page, ChangeKind::Addition, &b[b_pos..b_start], changes);
        a_pos = a_start + length;
        b_pos = b_start + length;
    }
    push_change(page, ChangeKind::Removal, &a[a_pos..], changes);
    push_change(page, ChangeKind::Addition, &b[b_pos..], changes);
}

fn push_change(page: u32, kind: ChangeKind, lines: &[String], changes: &mut Vec<ChangeRecord>) {
    let text = lines.join("\n");
    if text.trim().is_empty() {
        return;
    }
    changes.push(ChangeRecord { page, kind, text });
}

/// All maximal matching blocks of `a` against `b`, sorted by position.
///
/// Classic divide-and-conquer: find the longest common block, then recurse
/// into the regions before and after it. Ties prefer the earliest block in
/// `a`, then in `b`.
fn matching_blocks(a: &[String], b: &[String]) -> Vec<(usize, usize, usize)> {
    let mut blocks = Vec::new();
    let mut queue = vec![(0usize, a.len(), 0usize, b.len())];

    while let Some((a_lo, a_hi, b_lo, b_hi)) = queue.pop() {
        let (a_start, b_start, length) = longest_match(a, b, a_lo, a_hi, b_lo, b_hi);
        if length == 0 {
            continue;
        }
        blocks.push((a_start, b_start, length));
        queue.push((a_lo, a_start, b_lo, b_start));
        queue.push((a_start + length, a_hi, b_start + length, b_hi));
    }

    blocks.sort();
    blocks
}

/// Longest block with `a[a_start..a_start+len] == b[b_start..b_start+len]`
/// inside the given window.
fn longest_match(
    a: &[String],
    b: &[String],
    a_lo: usize,
    a_hi: usize,
    b_lo: usize,
    b_hi: usize,
) -> (usize, usize, usize) {
    let mut best = (a_lo, b_lo, 0usize);
    // j2len[j] = length of the match ending at (i, j).
    let mut j2len: HashMap<usize, usize> = HashMap::new();

    for i in a_lo..a_hi {
        let mut new_j2len: HashMap<usize, usize> = HashMap::new();
        for j in b_lo..b_hi {
            if a[i] == b[j] {
                let length = j.checked_sub(1)
                    .and_then(|prev| j2len.get(&prev).copied())
                    .unwrap_or(0)
                    + 1;
                new_j2len.insert(j, length);
                if length > best.2 {
                    best = (i + 1 - length, j + 1 - length, length);
                }
            }
        }
        j2len = new_j2len;
    }
    best
}
