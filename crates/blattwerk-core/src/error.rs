// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Blattwerk, plus the classification used when a
// failed transformation is recorded against a job.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Top-level error type for all Blattwerk operations.
#[derive(Debug, Error)]
pub enum BlattwerkError {
    // -- Submission errors --
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("unknown operation: {0}")]
    UnknownOperation(String),

    // -- Document errors --
    #[error("PDF operation failed: {0}")]
    PdfError(String),

    #[error("image processing failed: {0}")]
    ImageError(String),

    #[error("transform rejected input: {0}")]
    Transform(String),

    // -- Execution errors --
    #[error("external tool unavailable: {0}")]
    Dependency(String),

    #[error("transform timed out after {0} seconds")]
    Timeout(u64),

    // -- Lookup --
    #[error("not found: {0}")]
    NotFound(String),

    // -- Storage / persistence --
    #[error("storage error: {0}")]
    Storage(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, BlattwerkError>;

/// Coarse classification recorded on a failed job.
///
/// Lets a caller distinguish "fix your request" from "fix the environment"
/// from "the input itself was rejected" without parsing message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed parameters or inputs; rejected synchronously, no job created.
    Validation,
    /// A required external tool is missing or misconfigured; resubmitting
    /// will not help until the environment is fixed.
    Dependency,
    /// The operation's own logic rejected the input (corrupt document,
    /// out-of-range page, and so on).
    Transform,
    /// Execution exceeded the configured bound; partial output discarded.
    Timeout,
    /// Unknown job id, result not ready, or already reaped.
    NotFound,
    /// Process-level storage or serialization failure surfaced to a job.
    Internal,
}

impl BlattwerkError {
    /// Classify this error for recording on a failed job.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) | Self::UnknownOperation(_) => ErrorKind::Validation,
            Self::Dependency(_) => ErrorKind::Dependency,
            Self::PdfError(_) | Self::ImageError(_) | Self::Transform(_) => ErrorKind::Transform,
            Self::Timeout(_) => ErrorKind::Timeout,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Storage(_) | Self::Io(_) | Self::Serialization(_) => ErrorKind::Internal,
        }
    }

    /// Stable, human-readable cause suitable for a job's `error` field.
    ///
    /// Internal storage and serialization failures are redacted to a generic
    /// message — operator logs carry the detail, job records never do.
    pub fn public_message(&self) -> String {
        match self.kind() {
            ErrorKind::Internal => "internal storage error".to_string(),
            _ => self.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_errors_classify_as_transform() {
        let err = BlattwerkError::PdfError("page 9 out of range".into());
        assert_eq!(err.kind(), ErrorKind::Transform);
    }

    #[test]
    fn missing_tool_classifies_as_dependency() {
        let err = BlattwerkError::Dependency("soffice not found".into());
        assert_eq!(err.kind(), ErrorKind::Dependency);
    }

    #[test]
    fn io_detail_is_redacted_from_public_message() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "/var/lib/secret");
        let err = BlattwerkError::Io(io);
        assert_eq!(err.kind(), ErrorKind::Internal);
        assert!(!err.public_message().contains("/var/lib/secret"));
    }

    #[test]
    fn transform_message_is_passed_through() {
        let err = BlattwerkError::Transform("order must list each page exactly once".into());
        assert!(err.public_message().contains("exactly once"));
    }
}
