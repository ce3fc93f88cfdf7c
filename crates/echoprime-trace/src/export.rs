// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Portable JSON export of oracle traces.

use echoprime_core::error::Result;
use echoprime_core::types::OracleTrace;

use crate::builder::verify_trace;

/// Render one trace as pretty-printed JSON.
pub fn to_json(trace: &OracleTrace) -> Result<String> {
    Ok(serde_json::to_string_pretty(trace)?)
}

/// Parse a trace and check it before handing it back.
///
/// A trace whose digest no longer matches its fields is rejected with
/// `DigestMismatch`, so nothing downstream sees a tampered record.
pub fn from_json(json: &str) -> Result<OracleTrace> {
    let trace: OracleTrace = serde_json::from_str(json)?;
    verify_trace(&trace)?;
    Ok(trace)
}

/// Render a list of traces as a pretty-printed JSON array.
pub fn traces_to_json(traces: &[OracleTrace]) -> Result<String> {
    Ok(serde_json::to_string_pretty(traces)?)
}
