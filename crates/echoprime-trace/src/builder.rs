// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Trace construction over a canonical byte encoding.
//
// Encoding (all integers big-endian):
//
//   "echoprime/oracle-trace/v1" 0x00
//   index            u64
//   len(p)           u64, then p's magnitude bytes
//   len(q)           u64, then q's magnitude bytes
//   scoreP           u64 (fixed point, 10^18 = 1.0)
//   scoreQ           u64
//   verified         u8 (0 or 1)

use num_bigint::BigUint;
use tracing::debug;

use echoprime_core::error::Result;
use echoprime_core::types::{CollapseScore, Index, OracleTrace, VerificationResult, check_consistent};

use crate::integrity::{check_digest, trace_digest};

/// Domain separation tag, bumped whenever the layout changes.
const DOMAIN_TAG: &[u8] = b"echoprime/oracle-trace/v1\0";

/// Canonical bytes committed to by a trace digest.
pub fn canonical_bytes(
    index: Index,
    p: &BigUint,
    q: &BigUint,
    score_p: CollapseScore,
    score_q: CollapseScore,
    verified: bool,
) -> Vec<u8> {
    let p_bytes = p.to_bytes_be();
    let q_bytes = q.to_bytes_be();

    let mut out = Vec::with_capacity(DOMAIN_TAG.len() + 8 * 5 + p_bytes.len() + q_bytes.len() + 1);
    out.extend_from_slice(DOMAIN_TAG);
    out.extend_from_slice(&index.get().to_be_bytes());
    for magnitude in [&p_bytes, &q_bytes] {
        out.extend_from_slice(&(magnitude.len() as u64).to_be_bytes());
        out.extend_from_slice(magnitude);
    }
    out.extend_from_slice(&score_p.raw().to_be_bytes());
    out.extend_from_slice(&score_q.raw().to_be_bytes());
    out.push(u8::from(verified));
    out
}

/// Build a trace and attach its digest.
///
/// Fails with `InconsistentPair` unless `q == (p - 1) / 2`. Pure: identical
/// arguments always give an identical digest.
pub fn create_trace(
    index: Index,
    p: BigUint,
    q: BigUint,
    score_p: CollapseScore,
    score_q: CollapseScore,
    verified: bool,
) -> Result<OracleTrace> {
    check_consistent(&p, &q)?;
    let digest = trace_digest(&canonical_bytes(index, &p, &q, score_p, score_q, verified));
    debug!(%index, %digest, "trace created");
    Ok(OracleTrace {
        index,
        p,
        q,
        score_p,
        score_q,
        verified,
        digest,
    })
}

/// Build a trace straight from a verifier result.
pub fn trace_from_verification(index: Index, result: &VerificationResult) -> Result<OracleTrace> {
    create_trace(
        index,
        result.p.clone(),
        result.q.clone(),
        result.score_p,
        result.score_q,
        result.verified,
    )
}

/// Re-check a trace received from elsewhere: the pair must be consistent
/// and the digest must match the recomputed one.
pub fn verify_trace(trace: &OracleTrace) -> Result<()> {
    check_consistent(&trace.p, &trace.q)?;
    let bytes = canonical_bytes(
        trace.index,
        &trace.p,
        &trace.q,
        trace.score_p,
        trace.score_q,
        trace.verified,
    );
    check_digest(&bytes, &trace.digest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use echoprime_core::error::EchoPrimeError;

    fn index(n: u64) -> Index {
        Index::new(n).unwrap()
    }

    fn big(n: u64) -> BigUint {
        BigUint::from(n)
    }

    fn sample() -> OracleTrace {
        create_trace(index(1), big(47), big(23), CollapseScore::ONE, CollapseScore::ONE, true)
            .expect("trace")
    }

    #[test]
    fn golden_vector() {
        let bytes = canonical_bytes(index(1), &big(47), &big(23), CollapseScore::ONE, CollapseScore::ONE, true);
        assert_eq!(
            hex::encode(&bytes),
            "6563686f7072696d652f6f7261636c652d74726163652f7631000000000000000001\
             00000000000000012f0000000000000001170de0b6b3a76400000de0b6b3a764000001"
        );
        assert_eq!(
            sample().digest,
            "739d231ed724c775ba7360ba081136ad78bcbd89b95369cf62838b99656e1d08"
        );
    }

    #[test]
    fn identical_inputs_give_identical_digests() {
        assert_eq!(sample().digest, sample().digest);
        assert_eq!(sample(), sample());
    }

    #[test]
    fn every_field_changes_the_digest() {
        let base = sample().digest;
        let one = CollapseScore::ONE;
        let almost = CollapseScore::from_raw(CollapseScore::SCALE - 1).unwrap();
        let variants = [
            create_trace(index(2), big(47), big(23), one, one, true),
            create_trace(index(1), big(23), big(11), one, one, true),
            create_trace(index(1), big(47), big(23), almost, one, true),
            create_trace(index(1), big(47), big(23), one, almost, true),
            create_trace(index(1), big(47), big(23), one, one, false),
        ];
        for variant in variants {
            assert_ne!(variant.unwrap().digest, base);
        }
    }

    #[test]
    fn swapped_scores_do_not_collide() {
        let half = CollapseScore::from_ratio(1, 2);
        let a = create_trace(index(1), big(47), big(23), half, CollapseScore::ONE, true).unwrap();
        let b = create_trace(index(1), big(47), big(23), CollapseScore::ONE, half, true).unwrap();
        assert_ne!(a.digest, b.digest);
    }

    #[test]
    fn inconsistent_pair_is_rejected() {
        let result =
            create_trace(index(1), big(47), big(22), CollapseScore::ONE, CollapseScore::ONE, true);
        assert!(matches!(result, Err(EchoPrimeError::InconsistentPair { .. })));
    }

    #[test]
    fn tampered_trace_fails_verification() {
        let trace = sample();
        assert!(verify_trace(&trace).is_ok());

        let mut tampered = trace.clone();
        tampered.verified = false;
        match verify_trace(&tampered) {
            Err(EchoPrimeError::DigestMismatch { expected, .. }) => assert_eq!(expected, trace.digest),
            other => panic!("unexpected result: {other:?}"),
        }

        let mut broken = trace;
        broken.q = big(5);
        assert!(matches!(verify_trace(&broken), Err(EchoPrimeError::InconsistentPair { .. })));
    }
}
