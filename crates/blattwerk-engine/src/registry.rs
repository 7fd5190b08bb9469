// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The fixed table of registered transforms: per operation, how many inputs
// it takes and what media it accepts. Submission validation and output
// naming both read from here.

use blattwerk_core::types::{JobKind, MediaKind};

/// Input-count constraint of a transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputArity {
    Exactly(usize),
    AtLeast(usize),
}

impl InputArity {
    pub fn accepts(self, count: usize) -> bool {
        match self {
            Self::Exactly(n) => count == n,
            Self::AtLeast(n) => count >= n,
        }
    }

    pub fn describe(self) -> String {
        match self {
            Self::Exactly(1) => "exactly 1 file".to_string(),
            Self::Exactly(n) => format!("exactly {} files", n),
            Self::AtLeast(n) => format!("at least {} files", n),
        }
    }
}

/// Static description of one registered transform.
#[derive(Debug, Clone, Copy)]
pub struct TransformSpec {
    pub kind: JobKind,
    pub arity: InputArity,
    pub media: MediaKind,
    /// Appended to the first input's stem to form the download name.
    pub suffix: &'static str,
}

static REGISTRY: [TransformSpec; 9] = [
    TransformSpec {
        kind: JobKind::Merge,
        arity: InputArity::AtLeast(2),
        media: MediaKind::Pdf,
        suffix: "_merge",
    },
    TransformSpec {
        kind: JobKind::Rotate,
        arity: InputArity::Exactly(1),
        media: MediaKind::Pdf,
        suffix: "_rotate",
    },
    TransformSpec {
        kind: JobKind::Delete,
        arity: InputArity::Exactly(1),
        media: MediaKind::Pdf,
        suffix: "_delete",
    },
    TransformSpec {
        kind: JobKind::Extract,
        arity: InputArity::Exactly(1),
        media: MediaKind::Pdf,
        suffix: "_extract",
    },
    TransformSpec {
        kind: JobKind::Reorder,
        arity: InputArity::Exactly(1),
        media: MediaKind::Pdf,
        suffix: "_reorder",
    },
    TransformSpec {
        kind: JobKind::PdfToText,
        arity: InputArity::Exactly(1),
        media: MediaKind::Pdf,
        suffix: "_text",
    },
    TransformSpec {
        kind: JobKind::Compress,
        arity: InputArity::Exactly(1),
        media: MediaKind::Pdf,
        suffix: "_compress",
    },
    TransformSpec {
        kind: JobKind::Compare,
        arity: InputArity::Exactly(2),
        media: MediaKind::Pdf,
        suffix: "_compare",
    },
    TransformSpec {
        kind: JobKind::OfficeToPdf,
        arity: InputArity::Exactly(1),
        media: MediaKind::Office,
        suffix: "_pdf",
    },
];

/// Look up the registered spec for an operation.
pub fn spec_for(kind: JobKind) -> &'static TransformSpec {
    REGISTRY
        .iter()
        .find(|spec| spec.kind == kind)
        .unwrap_or_else(|| unreachable!("every JobKind is registered"))
}
