// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// blattwerk-document — Document operations for the Blattwerk engine.
//
// Provides PDF page assembly (merge, extract, delete, reorder, rotate),
// per-page text extraction, document inspection, size-targeted compression,
// and the structural diff engine behind the compare operation.

pub mod compress;
pub mod diff;
pub mod pdf;
pub mod search;

pub use compress::{CompressOptions, compress_pdf};
pub use diff::diff_documents;
pub use pdf::PdfFile;
pub use pdf::info::DocumentInfo;
pub use search::{SearchOutcome, search_target_size};
