// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Deterministic primality testing for arbitrary-precision integers.
//
// Pipeline: trial division by the primes below 200, a strong base-2
// Miller-Rabin round, a strong Lucas round with Selfridge parameters
// (together: Baillie-PSW), then Miller-Rabin with the first twelve prime
// bases. No step draws random witnesses, so the verdict for a given input
// never changes between runs. No Baillie-PSW pseudoprime is known, and the
// fixed-base rounds are a proof of primality below 3.3 * 10^24.

use num_bigint::BigUint;
use num_traits::{One, ToPrimitive, Zero};

/// The primes below 200, used for trial division.
const SMALL_PRIMES: [u32; 46] = [
    2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37, 41, 43, 47, 53, 59, 61, 67, 71, 73, 79, 83, 89,
    97, 101, 103, 107, 109, 113, 127, 131, 137, 139, 149, 151, 157, 163, 167, 173, 179, 181, 191,
    193, 197, 199,
];

/// Anything below 199^2 that survives trial division is prime.
const TRIAL_DIVISION_BOUND: u32 = 199 * 199;

/// Miller-Rabin bases applied after Baillie-PSW.
const MR_BASES: [u32; 12] = [2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37];

/// Whether `n` is prime.
pub fn is_prime(n: &BigUint) -> bool {
    if n < &BigUint::from(2u32) {
        return false;
    }

    for &sp in &SMALL_PRIMES {
        if *n == BigUint::from(sp) {
            return true;
        }
        if (n % sp).is_zero() {
            return false;
        }
    }
    if n < &BigUint::from(TRIAL_DIVISION_BOUND) {
        return true;
    }

    if !miller_rabin(n, 2) || !strong_lucas(n) {
        return false;
    }
    MR_BASES[1..].iter().all(|&base| miller_rabin(n, base))
}

/// Convenience wrapper for machine-sized values.
pub fn is_prime_u64(n: u64) -> bool {
    is_prime(&BigUint::from(n))
}

/// Smallest prime greater than or equal to `n`.
pub fn next_prime(n: &BigUint) -> BigUint {
    let two = BigUint::from(2u32);
    if n <= &two {
        return two;
    }
    let mut candidate = n.clone();
    if !candidate.bit(0) {
        candidate += 1u32;
    }
    while !is_prime(&candidate) {
        candidate += 2u32;
    }
    candidate
}

/// One strong probable-prime round to `base`. `n` must be odd and larger
/// than `base`.
fn miller_rabin(n: &BigUint, base: u32) -> bool {
    let one = BigUint::one();
    let n_minus_one = n - &one;
    let s = n_minus_one.trailing_zeros().unwrap_or(0);
    let d = &n_minus_one >> s;

    let mut x = BigUint::from(base).modpow(&d, n);
    if x == one || x == n_minus_one {
        return true;
    }
    for _ in 1..s {
        x = (&x * &x) % n;
        if x == n_minus_one {
            return true;
        }
        if x == one {
            return false;
        }
    }
    false
}

/// Strong Lucas probable-prime test with Selfridge's method A parameters
/// (P = 1, Q = (1 - D) / 4, D the first of 5, -7, 9, -11, ... with
/// Jacobi(D / n) = -1). `n` must be odd and free of small factors.
fn strong_lucas(n: &BigUint) -> bool {
    // Jacobi(D / n) is never -1 for a perfect square.
    let root = n.sqrt();
    if &root * &root == *n {
        return false;
    }

    let mut d: i64 = 5;
    loop {
        match jacobi(&signed_mod(d, n), n) {
            -1 => break,
            0 => return false,
            _ => d = if d > 0 { -(d + 2) } else { -(d - 2) },
        }
    }

    let d_mod = signed_mod(d, n);
    let q = signed_mod((1 - d) / 4, n);

    let n_plus_one = n + 1u32;
    let s = n_plus_one.trailing_zeros().unwrap_or(0);
    let k = &n_plus_one >> s;

    // U_1 = 1, V_1 = P = 1, Q^1 = Q; walk the bits of k below the top one.
    let mut u = BigUint::one();
    let mut v = BigUint::one();
    let mut qk = q.clone();
    for bit in (0..k.bits() - 1).rev() {
        u = (&u * &v) % n;
        v = sub_mod(&(&v * &v), &(&qk << 1u32), n);
        qk = (&qk * &qk) % n;

        if k.bit(bit) {
            let next_u = half_mod(&u + &v, n);
            let next_v = half_mod(&d_mod * &u + &v, n);
            u = next_u;
            v = next_v;
            qk = (&qk * &q) % n;
        }
    }

    if u.is_zero() || v.is_zero() {
        return true;
    }
    for _ in 1..s {
        v = sub_mod(&(&v * &v), &(&qk << 1u32), n);
        if v.is_zero() {
            return true;
        }
        qk = (&qk * &qk) % n;
    }
    false
}

/// Jacobi symbol (a / n) for odd positive `n`.
fn jacobi(a: &BigUint, n: &BigUint) -> i32 {
    let mut a = a % n;
    let mut n = n.clone();
    let mut result = 1;

    while !a.is_zero() {
        let twos = a.trailing_zeros().unwrap_or(0);
        a >>= twos;
        if twos % 2 == 1 {
            let r = low_bits(&n, 8);
            if r == 3 || r == 5 {
                result = -result;
            }
        }
        std::mem::swap(&mut a, &mut n);
        if low_bits(&a, 4) == 3 && low_bits(&n, 4) == 3 {
            result = -result;
        }
        a = &a % &n;
    }

    if n.is_one() { result } else { 0 }
}

/// `x mod modulus` for a small power-of-two modulus.
fn low_bits(x: &BigUint, modulus: u32) -> u32 {
    (x % modulus).to_u32().unwrap_or(0)
}

/// `value mod n` as a non-negative residue.
fn signed_mod(value: i64, n: &BigUint) -> BigUint {
    let magnitude = BigUint::from(value.unsigned_abs()) % n;
    if value >= 0 || magnitude.is_zero() {
        magnitude
    } else {
        n - magnitude
    }
}

/// `(a - b) mod n`.
fn sub_mod(a: &BigUint, b: &BigUint, n: &BigUint) -> BigUint {
    ((a % n) + n - (b % n)) % n
}

/// `x / 2 mod n` for odd `n`.
fn half_mod(x: BigUint, n: &BigUint) -> BigUint {
    let x = x % n;
    if x.bit(0) { (x + n) >> 1u32 } else { x >> 1u32 }
}
