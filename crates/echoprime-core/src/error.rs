// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for EchoPrime.

use thiserror::Error;

use crate::types::{Identity, Index};

/// Top-level error type for all EchoPrime operations.
#[derive(Debug, Error)]
pub enum EchoPrimeError {
    // -- Numeric pipeline --
    #[error("invalid index {0}: index must be >= 1")]
    InvalidIndex(u64),

    #[error("no safe prime found after {attempts} attempts from index {index}")]
    SearchExhausted { index: Index, attempts: u32 },

    #[error("search for index {0} was cancelled")]
    Cancelled(Index),

    #[error("invalid candidate {0}: p must be greater than 2")]
    InvalidCandidate(String),

    #[error("candidate {0} must be odd")]
    MustBeOdd(String),

    #[error("inconsistent pair: q = {q} is not (p - 1) / 2 for p = {p}")]
    InconsistentPair { p: String, q: String },

    // -- Trace integrity --
    #[error("trace digest mismatch: expected {expected}, got {actual}")]
    DigestMismatch { expected: String, actual: String },

    // -- Registry --
    #[error("index {0} has already been submitted")]
    AlreadySubmitted(Index),

    #[error("identity {0:?} is not authorized for this operation")]
    Unauthorized(Identity),

    #[error("batch sequences have mismatched lengths: {0:?}")]
    BatchLengthMismatch([usize; 5]),

    #[error("batch of {len} entries exceeds the limit of {max}")]
    BatchTooLarge { len: usize, max: usize },

    #[error("new owner must not be a null identity")]
    InvalidOwner,

    // -- Storage / infrastructure --
    #[error("database error: {0}")]
    Database(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("discovery worker failed: {0}")]
    Worker(String),
}

/// How far the effect of an error reaches.
///
/// No error is retried by EchoPrime itself; the scope only tells the caller
/// what was aborted and whether adjusting the input can help.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorScope {
    /// One index's numeric pipeline was aborted. Retry with an adjusted
    /// index or a larger attempt cap.
    Index,
    /// A whole registry call was rejected without any state change.
    Call,
    /// The index is already recorded. Inside a batch this is a silent skip.
    Duplicate,
    /// Storage, I/O, serialization or worker failure.
    Infrastructure,
}

impl EchoPrimeError {
    /// Classify this error by the scope of what it aborted.
    pub fn scope(&self) -> ErrorScope {
        match self {
            Self::InvalidIndex(_)
            | Self::SearchExhausted { .. }
            | Self::Cancelled(_)
            | Self::InvalidCandidate(_)
            | Self::MustBeOdd(_)
            | Self::InconsistentPair { .. }
            | Self::DigestMismatch { .. } => ErrorScope::Index,

            Self::Unauthorized(_)
            | Self::BatchLengthMismatch(_)
            | Self::BatchTooLarge { .. }
            | Self::InvalidOwner => ErrorScope::Call,

            Self::AlreadySubmitted(_) => ErrorScope::Duplicate,

            Self::Database(_)
            | Self::Io(_)
            | Self::Serialization(_)
            | Self::Config(_)
            | Self::Worker(_) => ErrorScope::Infrastructure,
        }
    }

    /// Whether the caller can reasonably retry with adjusted input
    /// (a different index, a larger attempt cap, a fresh signal).
    pub fn is_caller_retryable(&self) -> bool {
        matches!(
            self,
            Self::InvalidIndex(_) | Self::SearchExhausted { .. } | Self::Cancelled(_)
        )
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, EchoPrimeError>;
