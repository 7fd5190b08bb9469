// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Blattwerk transformation engine.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ErrorKind;

/// Unique identifier for a transformation job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(pub Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse a job id from its string form (e.g. a path parameter).
    pub fn parse(s: &str) -> Option<Self> {
        Uuid::parse_str(s.trim()).ok().map(Self)
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle states of a job.
///
/// Transitions are monotonic: `Pending → Processing → {Completed, Failed}`.
/// No transition skips `Processing` and terminal states are final.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Queued, waiting for a worker to claim it.
    Pending,
    /// Claimed by a worker; the transform is running.
    Processing,
    /// Transform succeeded — output reference recorded.
    Completed,
    /// Transform failed — see the job's error fields.
    Failed,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// Media kinds an operation accepts as input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Pdf,
    /// Word-processor / spreadsheet / presentation formats handled by the
    /// external office converter.
    Office,
}

impl MediaKind {
    /// Accepted filename extensions (lowercase, without the dot).
    pub fn extensions(self) -> &'static [&'static str] {
        match self {
            Self::Pdf => &["pdf"],
            Self::Office => &["docx", "doc", "xlsx", "xls", "pptx", "ppt", "odt", "ods"],
        }
    }

    /// Accepted claimed content types. Browsers and API clients often send
    /// loose types, so octet-stream is tolerated for PDFs.
    pub fn content_types(self) -> &'static [&'static str] {
        match self {
            Self::Pdf => &["application/pdf", "application/x-pdf", "application/octet-stream"],
            Self::Office => &[
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
                "application/vnd.openxmlformats-officedocument.presentationml.presentation",
                "application/msword",
                "application/vnd.ms-excel",
                "application/vnd.ms-powerpoint",
                "application/vnd.oasis.opendocument.text",
                "application/vnd.oasis.opendocument.spreadsheet",
                "application/octet-stream",
            ],
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Pdf => "PDF",
            Self::Office => "office document",
        }
    }
}

/// Registered operation names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    Merge,
    Rotate,
    Delete,
    Extract,
    Reorder,
    PdfToText,
    Compress,
    Compare,
    OfficeToPdf,
}

impl JobKind {
    /// Operation name as used by routing adapters (`POST /{operation}`).
    pub fn name(self) -> &'static str {
        match self {
            Self::Merge => "merge",
            Self::Rotate => "rotate",
            Self::Delete => "delete",
            Self::Extract => "extract",
            Self::Reorder => "reorder",
            Self::PdfToText => "pdf_to_text",
            Self::Compress => "compress",
            Self::Compare => "compare",
            Self::OfficeToPdf => "office_to_pdf",
        }
    }

    /// Resolve an operation name; unknown names fail validation at
    /// submission time rather than dispatch time.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "merge" => Some(Self::Merge),
            "rotate" => Some(Self::Rotate),
            "delete" => Some(Self::Delete),
            "extract" => Some(Self::Extract),
            "reorder" => Some(Self::Reorder),
            "pdf_to_text" => Some(Self::PdfToText),
            "compress" => Some(Self::Compress),
            "compare" => Some(Self::Compare),
            "office_to_pdf" => Some(Self::OfficeToPdf),
            _ => None,
        }
    }
}

impl std::fmt::Display for JobKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Output format for text extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextFormat {
    Plain,
    Markdown,
}

/// Unit for a desired output size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SizeUnit {
    #[serde(rename = "KB")]
    Kb,
    #[serde(rename = "MB")]
    Mb,
}

impl SizeUnit {
    pub fn to_bytes(self, value: f64) -> u64 {
        let factor = match self {
            Self::Kb => 1024.0,
            Self::Mb => 1024.0 * 1024.0,
        };
        (value * factor) as u64
    }
}

/// How the compress operation chooses its compression level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum CompressMode {
    /// Apply the requested level (1–9) directly, no search.
    Quality { level: u8 },
    /// Search the level domain for an output within tolerance of the target.
    FileSize { desired_size: f64, unit: SizeUnit },
}

/// Caller-supplied options, snapshotted immutably at submission.
///
/// One variant per registered operation; the variant doubles as the
/// operation selector (a fixed table of tagged variants, not a string
/// lookup at execution time).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "operation", rename_all = "snake_case")]
pub enum JobParams {
    /// Concatenate all inputs in submission order.
    Merge,
    /// Rotate the listed pages (1-indexed) by `angle` degrees.
    Rotate { pages: Vec<u32>, angle: i32 },
    /// Remove the listed pages (1-indexed).
    Delete { pages: Vec<u32> },
    /// Keep only the listed pages, in the listed order.
    Extract { pages: Vec<u32> },
    /// Reorder all pages; `order` must be a permutation of 1..=page_count.
    Reorder { order: Vec<u32> },
    /// Extract text, one section per page.
    PdfToText { format: TextFormat },
    /// Reduce file size; see [`CompressMode`].
    Compress { mode: CompressMode, grayscale: bool },
    /// Structural diff of exactly two documents.
    Compare,
    /// Convert an office document to PDF via the external converter.
    OfficeToPdf,
}

impl JobParams {
    pub fn kind(&self) -> JobKind {
        match self {
            Self::Merge => JobKind::Merge,
            Self::Rotate { .. } => JobKind::Rotate,
            Self::Delete { .. } => JobKind::Delete,
            Self::Extract { .. } => JobKind::Extract,
            Self::Reorder { .. } => JobKind::Reorder,
            Self::PdfToText { .. } => JobKind::PdfToText,
            Self::Compress { .. } => JobKind::Compress,
            Self::Compare => JobKind::Compare,
            Self::OfficeToPdf => JobKind::OfficeToPdf,
        }
    }
}

/// A tracked unit of asynchronous transformation work.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub params: JobParams,
    pub status: JobStatus,
    /// Storage-relative file names, in submission order. Order is
    /// semantically meaningful (merge concatenates in this order).
    pub input_refs: Vec<String>,
    /// Original upload filenames, used for output naming.
    pub input_names: Vec<String>,
    /// SHA-256 of each stored input, parallel to `input_refs`.
    pub input_hashes: Vec<String>,
    /// Storage-relative output file name; set exactly once, on completion.
    pub output_ref: Option<String>,
    /// Download filename presented to the caller.
    pub output_filename: Option<String>,
    /// Human-readable cause; set exactly once, on failure. Never a raw
    /// internal error chain.
    pub error: Option<String>,
    pub error_kind: Option<ErrorKind>,
    pub created_at: DateTime<Utc>,
    /// Drives reaper eligibility; set at the terminal transition.
    pub completed_at: Option<DateTime<Utc>>,
    /// Structured auxiliary data (compare change list, compression warning).
    pub report: Option<serde_json::Value>,
}

impl Job {
    pub fn new(params: JobParams, input_refs: Vec<String>, input_names: Vec<String>, input_hashes: Vec<String>) -> Self {
        Self {
            id: JobId::new(),
            params,
            status: JobStatus::Pending,
            input_refs,
            input_names,
            input_hashes,
            output_ref: None,
            output_filename: None,
            error: None,
            error_kind: None,
            created_at: Utc::now(),
            completed_at: None,
            report: None,
        }
    }

    pub fn kind(&self) -> JobKind {
        self.params.kind()
    }
}

/// One unit of difference between two compared documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRecord {
    /// 1-indexed page the change is anchored to.
    pub page: u32,
    pub kind: ChangeKind,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Addition,
    Removal,
}

impl ChangeKind {
    /// The kind this record would carry if the compared documents were
    /// swapped.
    pub fn swapped(self) -> Self {
        match self {
            Self::Addition => Self::Removal,
            Self::Removal => Self::Addition,
        }
    }
}

/// Structured output of the compare operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct CompareReport {
    /// Ordered by page, then first occurrence within the page.
    pub changes: Vec<ChangeRecord>,
    pub total: usize,
    /// Change count per page.
    pub by_page: BTreeMap<u32, usize>,
}

impl CompareReport {
    pub fn from_changes(changes: Vec<ChangeRecord>) -> Self {
        let mut by_page = BTreeMap::new();
        for change in &changes {
            *by_page.entry(change.page).or_insert(0) += 1;
        }
        Self {
            total: changes.len(),
            changes,
            by_page,
        }
    }
}

/// One probe made by the target-size compression search.
///
/// Search-internal bookkeeping; attempts are reported but never persisted
/// beyond the job's report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompressionAttempt {
    pub level: u8,
    pub size_bytes: u64,
}

/// Structured output of the compress operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompressionReport {
    /// Level actually applied to produce the output.
    pub level: u8,
    pub output_bytes: u64,
    /// Target in bytes, when file-size mode was requested.
    pub target_bytes: Option<u64>,
    pub attempts: usize,
    /// Non-fatal: set when the target could not be reached and the
    /// smallest achievable output was kept instead.
    pub warning: Option<String>,
}
