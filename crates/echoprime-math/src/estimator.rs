// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Analytic location estimate for the n-th safe prime: p_n ≈ a · n · (ln n)².

use num_bigint::BigUint;
use num_traits::FromPrimitive;

use echoprime_core::error::Result;
use echoprime_core::types::Index;

use crate::primality::next_prime;

/// Fitted constant `a`, derived offline from the Bateman-Horn heuristic for
/// the polynomial pair (x, 2x + 1).
pub const A_CONSTANT: f64 = 2.8913;

/// The first safe primes, returned directly for indices 1..=5 where ln n is
/// too small for the law to be meaningful.
pub const SMALL_INDEX_SAFE_PRIMES: [u64; 5] = [5, 7, 11, 23, 47];

/// No estimate is ever below the smallest safe prime.
pub const ESTIMATE_FLOOR: u64 = 5;

/// Projected location of the n-th safe prime. Fails with `InvalidIndex` for 0.
pub fn estimate(n: u64) -> Result<BigUint> {
    Ok(estimate_index(Index::new(n)?))
}

/// Projected location for an already-validated index.
pub fn estimate_index(index: Index) -> BigUint {
    let n = index.get();
    let slot = usize::try_from(n - 1).ok();
    if let Some(&known) = slot.and_then(|i| SMALL_INDEX_SAFE_PRIMES.get(i)) {
        return BigUint::from(known);
    }
    project(n as f64)
}

/// Raw safe-prime candidate for lattice index `k`: the next prime `q` at or
/// above the projection of `k`, mapped to `2q + 1`. The result is not
/// necessarily prime.
pub fn candidate_from_index(k: u64) -> Result<BigUint> {
    let k = Index::new(k)?.get();
    let raw = project(k as f64);
    let q = next_prime(&raw);
    Ok((q << 1u32) + 1u32)
}

/// Map an external epoch/offset value to a starting lattice index:
/// `max(1, floor(raw / (a · ln²(max(raw, 2)))) + offset)`.
pub fn location_to_lattice_index(raw: u64, offset: i64) -> u64 {
    let ln = (raw.max(2) as f64).ln();
    let k_start = (raw as f64 / (A_CONSTANT * ln * ln)).floor() as i64;
    k_start.saturating_add(offset).max(1) as u64
}

/// `floor(a · x · ln²(max(x, 2)))`, never below the floor.
fn project(x: f64) -> BigUint {
    let ln = x.max(2.0).ln();
    let value = (A_CONSTANT * x * ln * ln).floor();
    let floor = BigUint::from(ESTIMATE_FLOOR);
    match BigUint::from_f64(value) {
        Some(v) if v > floor => v,
        _ => floor,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use echoprime_core::error::EchoPrimeError;

    #[test]
    fn zero_is_invalid() {
        assert!(matches!(estimate(0), Err(EchoPrimeError::InvalidIndex(0))));
        assert!(matches!(candidate_from_index(0), Err(EchoPrimeError::InvalidIndex(0))));
    }

    #[test]
    fn small_indices_use_known_safe_primes() {
        for (i, &p) in SMALL_INDEX_SAFE_PRIMES.iter().enumerate() {
            assert_eq!(estimate(i as u64 + 1).unwrap(), BigUint::from(p));
        }
    }

    #[test]
    fn indices_past_the_table_are_projected() {
        // 2.8913 * 6 * ln(6)^2 = 55.7...
        assert_eq!(estimate(6).unwrap(), BigUint::from(55u32));
        for n in [(1u64 << 32) + 1, (1u64 << 32) + 5, 1 << 40] {
            let value = estimate(n).unwrap();
            assert_eq!(value, project(n as f64));
            assert!(value > BigUint::from(n), "estimate({n}) fell back to the table");
        }
    }

    #[test]
    fn index_one_does_not_collapse() {
        assert_eq!(estimate(1).unwrap(), BigUint::from(ESTIMATE_FLOOR));
    }

    #[test]
    fn law_matches_hand_computation() {
        // 2.8913 * 100 * ln(100)^2 = 6131.6...
        assert_eq!(estimate(100).unwrap(), BigUint::from(6131u32));
        // 2.8913 * 10 * ln(10)^2 = 153.29...
        assert_eq!(estimate(10).unwrap(), BigUint::from(153u32));
    }

    #[test]
    fn estimates_grow_with_index() {
        let mut previous = estimate(6).unwrap();
        for n in [10u64, 100, 1_000, 10_000, 1_000_000, u64::MAX] {
            let current = estimate(n).unwrap();
            assert!(current > previous, "estimate({n}) did not grow");
            previous = current;
        }
    }

    #[test]
    fn candidate_is_twice_a_prime_plus_one() {
        // projection(10) = 153, next prime 157, candidate 315.
        assert_eq!(candidate_from_index(10).unwrap(), BigUint::from(315u32));
    }

    #[test]
    fn lattice_index_inverse_mapping() {
        assert_eq!(location_to_lattice_index(0, 0), 1);
        assert_eq!(location_to_lattice_index(1, 0), 1);
        // 6131 / (2.8913 * ln(6131)^2) = 27.8...
        assert_eq!(location_to_lattice_index(6131, 0), 27);
        assert_eq!(location_to_lattice_index(6131, 5), 32);
        assert_eq!(location_to_lattice_index(6131, -100), 1);
    }
}
