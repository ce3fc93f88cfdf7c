// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>

//! echoprime-trace: tamper-evident records of safe prime discoveries.
//!
//! An oracle trace commits to its fields through a SHA-256 digest over a
//! canonical byte encoding (fixed field order, fixed-width integers, no
//! floating point). The same fields always produce the same digest, on any
//! machine. This crate builds traces, re-checks them, and renders them in
//! the portable JSON export format.

pub mod builder;
pub mod export;
pub mod integrity;

pub use builder::{canonical_bytes, create_trace, trace_from_verification, verify_trace};
pub use export::{from_json, to_json, traces_to_json};
pub use integrity::{DIGEST_HEX_LEN, check_digest, trace_digest};
