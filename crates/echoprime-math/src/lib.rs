// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// EchoPrime Math: the purely computational half of the oracle: locating a
// safe prime from an index, searching forward to a genuine pair, and
// verifying it. Nothing in this crate performs I/O or shares mutable state,
// so independent indices can be processed on independent threads.

pub mod collapse;
pub mod estimator;
pub mod known;
pub mod primality;
pub mod search;

pub use collapse::{CollapseVerifier, batch_verify, collapse_score, verify_safe_prime};
pub use estimator::{
    A_CONSTANT, candidate_from_index, estimate, estimate_index, location_to_lattice_index,
};
pub use known::{KNOWN_SAFE_PRIMES, is_safe_prime};
pub use primality::{is_prime, next_prime};
pub use search::{DEFAULT_MAX_ATTEMPTS, find_safe_prime_near, find_safe_prime_near_cancellable};
