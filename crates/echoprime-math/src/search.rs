// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Deterministic forward search from the estimate to the first safe prime pair.
//
// Prime gaps are unbounded, so every search carries a hard attempt cap and
// can fail with `SearchExhausted`. Callers that need to stop a search early
// pass a cancellation flag, which is checked before every prime advance.

use std::sync::atomic::{AtomicBool, Ordering};

use num_bigint::BigUint;
use tracing::{debug, instrument, warn};

use echoprime_core::error::{EchoPrimeError, Result};
use echoprime_core::types::{Index, SafePrimePair};

use crate::estimator::estimate_index;
use crate::primality::{is_prime, next_prime};

/// Default cap on prime advances per search.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 10_000;

/// Find the first safe prime pair reachable from `estimate(n)`.
///
/// Walks the primes `r >= estimate(n)` in order and returns the first with
/// `p = 2r + 1` prime. At most `max_attempts` values of `r` are tried.
pub fn find_safe_prime_near(n: u64, max_attempts: u32) -> Result<SafePrimePair> {
    search(Index::new(n)?, max_attempts, None)
}

/// As [`find_safe_prime_near`], stopping with `Cancelled` once `cancel` is set.
pub fn find_safe_prime_near_cancellable(
    n: u64,
    max_attempts: u32,
    cancel: &AtomicBool,
) -> Result<SafePrimePair> {
    search(Index::new(n)?, max_attempts, Some(cancel))
}

#[instrument(skip_all, fields(index = %index, max_attempts = max_attempts))]
pub(crate) fn search(
    index: Index,
    max_attempts: u32,
    cancel: Option<&AtomicBool>,
) -> Result<SafePrimePair> {
    let start = estimate_index(index);
    debug!(estimate = %start, "search starting");

    let mut r = next_prime(&start);
    let mut attempts = 0u32;
    loop {
        if attempts >= max_attempts {
            warn!(attempts, "search exhausted without a safe prime");
            return Err(EchoPrimeError::SearchExhausted { index, attempts });
        }
        if cancel.is_some_and(|flag| flag.load(Ordering::Relaxed)) {
            debug!(attempts, "search cancelled");
            return Err(EchoPrimeError::Cancelled(index));
        }

        let p: BigUint = (&r << 1u32) + 1u32;
        if is_prime(&p) {
            debug!(%p, attempts, "safe prime found");
            // q = r was primality-tested by next_prime.
            return Ok(SafePrimePair { p, q: r });
        }

        r = next_prime(&(r + 1u32));
        attempts += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::estimator::estimate;
    use crate::known::is_safe_prime;

    fn big(n: u64) -> BigUint {
        BigUint::from(n)
    }

    #[test]
    fn index_100_lands_above_its_estimate() {
        let pair = find_safe_prime_near(100, DEFAULT_MAX_ATTEMPTS).expect("search");
        assert_eq!(pair.p, &pair.q * 2u32 + 1u32);
        assert!(is_prime(&pair.p));
        assert!(is_prime(&pair.q));
        assert!(pair.p >= estimate(100).unwrap());
    }

    #[test]
    fn small_indices_are_exact() {
        // estimate(1) = 5 -> r = 5, p = 11.
        let pair = find_safe_prime_near(1, DEFAULT_MAX_ATTEMPTS).unwrap();
        assert_eq!((pair.p, pair.q), (big(11), big(5)));

        // estimate(2) = 7 -> r = 7 gives 15 (composite), r = 11 gives 23.
        let pair = find_safe_prime_near(2, DEFAULT_MAX_ATTEMPTS).unwrap();
        assert_eq!((pair.p, pair.q), (big(23), big(11)));
    }

    #[test]
    fn search_is_deterministic() {
        for n in [7u64, 42, 500] {
            let a = find_safe_prime_near(n, DEFAULT_MAX_ATTEMPTS).unwrap();
            let b = find_safe_prime_near(n, DEFAULT_MAX_ATTEMPTS).unwrap();
            assert_eq!(a, b);
            assert!(is_safe_prime(&a.p));
        }
    }

    #[test]
    fn first_twenty_indices_produce_safe_primes() {
        for n in 1..=20u64 {
            let pair = find_safe_prime_near(n, DEFAULT_MAX_ATTEMPTS).unwrap();
            assert!(is_safe_prime(&pair.p), "index {n}: {} is not a safe prime", pair.p);
        }
    }

    #[test]
    fn attempt_cap_is_enforced() {
        assert!(matches!(
            find_safe_prime_near(5, 0),
            Err(EchoPrimeError::SearchExhausted { attempts: 0, .. })
        ));
        // Index 2 needs a second prime advance.
        assert!(matches!(
            find_safe_prime_near(2, 1),
            Err(EchoPrimeError::SearchExhausted { attempts: 1, .. })
        ));
        assert!(find_safe_prime_near(2, 2).is_ok());
    }

    #[test]
    fn zero_index_is_rejected() {
        assert!(matches!(
            find_safe_prime_near(0, DEFAULT_MAX_ATTEMPTS),
            Err(EchoPrimeError::InvalidIndex(0))
        ));
    }

    #[test]
    fn cancellation_stops_the_search() {
        let cancel = AtomicBool::new(true);
        assert!(matches!(
            find_safe_prime_near_cancellable(100, DEFAULT_MAX_ATTEMPTS, &cancel),
            Err(EchoPrimeError::Cancelled(_))
        ));

        let cancel = AtomicBool::new(false);
        assert!(find_safe_prime_near_cancellable(100, DEFAULT_MAX_ATTEMPTS, &cancel).is_ok());
    }
}
