// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Symbolic collapse score and safe prime verification.
//
//   S(p) = |{ k in [1, T] : C(p, k) ≡ 0 (mod p) }| / T
//
// By Lucas' theorem every C(p, k) with 1 <= k < p vanishes mod a prime p, so
// S(p) = 1 for every prime. The score is a consequence of primality, not an
// independent witness: it carries no assurance beyond the primality tests
// run alongside it, and for p <= T it cannot stand in for them at all.

use num_bigint::BigUint;
use num_traits::{One, ToPrimitive, Zero};
use tracing::{debug, instrument};

use echoprime_core::config::OracleConfig;
use echoprime_core::error::{EchoPrimeError, Result};
use echoprime_core::types::{CollapseScore, SafePrimePair, VerificationResult};

use crate::primality::is_prime;

/// Default window size T.
pub const DEFAULT_WINDOW: u32 = 128;

/// Default minimum score, as a fraction.
pub const DEFAULT_THRESHOLD: f64 = 0.95;

/// Collapse score of `p` over the window `[1, min(window, p - 1)]`.
///
/// `C(p, k)` is built with the exact recurrence
/// `C(p, k) = C(p, k - 1) · (p - k + 1) / k`; the full coefficient C(p, p/2)
/// is never materialized. Values below 2 score 0.
pub fn collapse_score(p: &BigUint, window: u32) -> CollapseScore {
    if p < &BigUint::from(2u32) {
        return CollapseScore::ZERO;
    }
    let p_minus_one = p - BigUint::one();
    let t = match p_minus_one.to_u64() {
        Some(limit) => limit.min(u64::from(window)),
        None => u64::from(window),
    };

    let mut binomial = BigUint::one();
    let mut hits = 0u64;
    for k in 1..=t {
        binomial = binomial * (p - (k - 1)) / k;
        if (&binomial % p).is_zero() {
            hits += 1;
        }
    }
    CollapseScore::from_ratio(hits, t)
}

/// Verifier with a fixed window and threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollapseVerifier {
    window: u32,
    threshold: CollapseScore,
}

impl Default for CollapseVerifier {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW, CollapseScore::from_fraction(DEFAULT_THRESHOLD))
    }
}

impl CollapseVerifier {
    pub fn new(window: u32, threshold: CollapseScore) -> Self {
        Self { window, threshold }
    }

    pub fn from_config(config: &OracleConfig) -> Self {
        Self::new(config.window, config.threshold_score())
    }

    pub fn window(&self) -> u32 {
        self.window
    }

    pub fn threshold(&self) -> CollapseScore {
        self.threshold
    }

    /// Verify `p` and its companion `q = (p - 1) / 2`.
    ///
    /// `verified` holds only if both are prime, `2q + 1 == p`, and both
    /// collapse scores reach the threshold. An even `p` is reported as
    /// unverified rather than rejected. Fails with `InvalidCandidate` for
    /// `p <= 2`.
    #[instrument(skip_all, fields(p = %p, window = self.window))]
    pub fn verify(&self, p: &BigUint) -> Result<VerificationResult> {
        if p <= &BigUint::from(2u32) {
            return Err(EchoPrimeError::InvalidCandidate(p.to_string()));
        }
        let q = (p - BigUint::one()) >> 1u32;

        let p_is_prime = is_prime(p);
        let q_is_prime = is_prime(&q);
        let well_formed = (&q << 1u32) + 1u32 == *p;

        let score_p = collapse_score(p, self.window);
        let score_q = collapse_score(&q, self.window);
        let symbolic_pass = score_p >= self.threshold && score_q >= self.threshold;
        let verified = p_is_prime && q_is_prime && well_formed && symbolic_pass;

        debug!(
            p_is_prime,
            q_is_prime,
            score_p = score_p.as_f64(),
            score_q = score_q.as_f64(),
            verified,
            "candidate verified"
        );

        Ok(VerificationResult {
            p: p.clone(),
            q,
            score_p,
            score_q,
            p_is_prime,
            q_is_prime,
            symbolic_pass,
            verified,
        })
    }

    pub fn verify_pair(&self, pair: &SafePrimePair) -> Result<VerificationResult> {
        self.verify(&pair.p)
    }

    /// Verify each candidate independently.
    pub fn batch_verify(&self, candidates: &[BigUint]) -> Vec<Result<VerificationResult>> {
        candidates.iter().map(|p| self.verify(p)).collect()
    }
}

/// Verify with the default window and threshold.
pub fn verify_safe_prime(p: &BigUint) -> Result<VerificationResult> {
    CollapseVerifier::default().verify(p)
}

/// Verify a slice of candidates with an explicit window and threshold.
pub fn batch_verify(
    candidates: &[BigUint],
    window: u32,
    threshold: CollapseScore,
) -> Vec<Result<VerificationResult>> {
    CollapseVerifier::new(window, threshold).batch_verify(candidates)
}
