// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Trace digests: SHA-256 over the canonical encoding, written as lowercase
// hex. A digest read back from elsewhere may be in either case.

use sha2::{Digest, Sha256};

use echoprime_core::error::{EchoPrimeError, Result};

/// Characters in a trace digest.
pub const DIGEST_HEX_LEN: usize = 64;

/// Digest of a trace's canonical bytes.
pub fn trace_digest(canonical: &[u8]) -> String {
    hex::encode(Sha256::digest(canonical))
}

/// Recompute the digest of `canonical` and compare it with `claimed`.
///
/// On mismatch the error carries `claimed` as `expected` and the recomputed
/// digest as `actual`.
pub fn check_digest(canonical: &[u8], claimed: &str) -> Result<()> {
    let actual = trace_digest(canonical);
    if actual.eq_ignore_ascii_case(claimed) {
        return Ok(());
    }
    Err(EchoPrimeError::DigestMismatch {
        expected: claimed.to_owned(),
        actual,
    })
}
