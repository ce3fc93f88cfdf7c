// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the EchoPrime safe prime oracle.

use chrono::{DateTime, Utc};
use num_bigint::BigUint;
use num_traits::One;
use serde::{Deserialize, Serialize};

use crate::error::{EchoPrimeError, Result};

/// Sequential safe-prime slot number. Always >= 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u64")]
pub struct Index(u64);

impl Index {
    pub fn new(n: u64) -> Result<Self> {
        if n == 0 {
            return Err(EchoPrimeError::InvalidIndex(n));
        }
        Ok(Self(n))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl TryFrom<u64> for Index {
    type Error = EchoPrimeError;

    fn try_from(n: u64) -> Result<Self> {
        Self::new(n)
    }
}

impl From<Index> for u64 {
    fn from(index: Index) -> Self {
        index.0
    }
}

impl std::fmt::Display for Index {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Collapse score in [0, 1] as a fixed-point integer scaled by 10^18.
///
/// Scores never pass through floating point on their way into a trace, so
/// two machines always agree on the encoded value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u64")]
pub struct CollapseScore(u64);

impl CollapseScore {
    /// Fixed-point scale: 1.0 is represented as 10^18.
    pub const SCALE: u64 = 1_000_000_000_000_000_000;
    pub const ZERO: Self = Self(0);
    pub const ONE: Self = Self(Self::SCALE);

    /// Wrap a raw fixed-point value. Returns `None` above 1.0.
    pub fn from_raw(raw: u64) -> Option<Self> {
        (raw <= Self::SCALE).then_some(Self(raw))
    }

    /// Exact `hits / total`, rounded down. A zero total scores 0.
    pub fn from_ratio(hits: u64, total: u64) -> Self {
        if total == 0 {
            return Self::ZERO;
        }
        let hits = hits.min(total) as u128;
        let raw = hits * Self::SCALE as u128 / total as u128;
        Self(raw as u64)
    }

    /// Convert a configured fraction (e.g. a threshold of 0.95). Values are
    /// clamped to [0, 1] and NaN maps to 0.
    pub fn from_fraction(value: f64) -> Self {
        if value.is_nan() || value <= 0.0 {
            return Self::ZERO;
        }
        if value >= 1.0 {
            return Self::ONE;
        }
        Self((value * Self::SCALE as f64).round() as u64)
    }

    pub fn raw(self) -> u64 {
        self.0
    }

    /// Lossy conversion for display and logging only.
    pub fn as_f64(self) -> f64 {
        self.0 as f64 / Self::SCALE as f64
    }
}

impl TryFrom<u64> for CollapseScore {
    type Error = String;

    fn try_from(raw: u64) -> std::result::Result<Self, String> {
        Self::from_raw(raw).ok_or_else(|| format!("collapse score {raw} exceeds 10^18"))
    }
}

impl From<CollapseScore> for u64 {
    fn from(score: CollapseScore) -> Self {
        score.0
    }
}

impl std::fmt::Display for CollapseScore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{:018}", self.0 / Self::SCALE, self.0 % Self::SCALE)
    }
}

/// A safe prime `p` together with its Sophie Germain companion `q = (p - 1) / 2`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SafePrimePair {
    #[serde(with = "decimal")]
    pub p: BigUint,
    #[serde(with = "decimal")]
    pub q: BigUint,
}

impl SafePrimePair {
    /// Derive `q` from `p`, enforcing `p > 2` and `p` odd.
    ///
    /// Primality is not checked here; see the verifier.
    pub fn from_p(p: BigUint) -> Result<Self> {
        let q = companion(&p)?;
        Ok(Self { p, q })
    }

    /// Accept an explicit pair, enforcing `q == (p - 1) / 2`.
    pub fn new(p: BigUint, q: BigUint) -> Result<Self> {
        check_consistent(&p, &q)?;
        Ok(Self { p, q })
    }
}

/// Validate `p > 2`, `p` odd, and return `q = (p - 1) / 2`.
pub fn companion(p: &BigUint) -> Result<BigUint> {
    if p <= &BigUint::from(2u32) {
        return Err(EchoPrimeError::InvalidCandidate(p.to_string()));
    }
    if !p.bit(0) {
        return Err(EchoPrimeError::MustBeOdd(p.to_string()));
    }
    Ok((p - BigUint::one()) >> 1u32)
}

/// Fail with `InconsistentPair` unless `2q + 1 == p`.
pub fn check_consistent(p: &BigUint, q: &BigUint) -> Result<()> {
    if (q << 1u32) + BigUint::one() != *p {
        return Err(EchoPrimeError::InconsistentPair {
            p: p.to_string(),
            q: q.to_string(),
        });
    }
    Ok(())
}

/// Outcome of verifying a safe prime candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationResult {
    #[serde(with = "decimal")]
    pub p: BigUint,
    #[serde(with = "decimal")]
    pub q: BigUint,
    pub score_p: CollapseScore,
    pub score_q: CollapseScore,
    pub p_is_prime: bool,
    pub q_is_prime: bool,
    /// Both collapse scores met the threshold.
    pub symbolic_pass: bool,
    /// Both primality checks passed, `2q + 1 == p`, and `symbolic_pass`.
    pub verified: bool,
}

/// Canonical, hash-committed record of one verified safe prime discovery.
///
/// Serialized field order is fixed: index, p, q, scoreP, scoreQ, verified,
/// digest. `p` and `q` travel as decimal strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OracleTrace {
    pub index: Index,
    #[serde(with = "decimal")]
    pub p: BigUint,
    #[serde(with = "decimal")]
    pub q: BigUint,
    pub score_p: CollapseScore,
    pub score_q: CollapseScore,
    pub verified: bool,
    /// Lowercase hex SHA-256 over the canonical encoding of the fields above.
    pub digest: String,
}

impl OracleTrace {
    /// Arguments for a single `submitVerification` call.
    pub fn submission(&self) -> Submission {
        Submission {
            index: self.index,
            p: self.p.clone(),
            score_p: self.score_p,
            score_q: self.score_q,
            verified: self.verified,
        }
    }
}

/// The argument tuple of `submitVerification(index, p, scoreP, scoreQ, verified)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub index: Index,
    #[serde(with = "decimal")]
    pub p: BigUint,
    pub score_p: CollapseScore,
    pub score_q: CollapseScore,
    pub verified: bool,
}

/// Caller identity presented to the registry.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(String);

impl Identity {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Empty, whitespace-only, or an all-zero `0x` address.
    pub fn is_null(&self) -> bool {
        let trimmed = self.0.trim();
        if trimmed.is_empty() {
            return true;
        }
        match trimmed.strip_prefix("0x").or_else(|| trimmed.strip_prefix("0X")) {
            Some(hex) => hex.chars().all(|c| c == '0'),
            None => false,
        }
    }
}

impl std::fmt::Display for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Identity {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// A trace as permanently stored by the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryRecord {
    #[serde(flatten)]
    pub trace: OracleTrace,
    pub submitter: Identity,
    pub recorded_at: DateTime<Utc>,
}

/// Serde helpers: arbitrary-precision integers as decimal strings.
pub mod decimal {
    use num_bigint::BigUint;
    use serde::{Deserialize, Deserializer, Serializer, de::Error as _};

    pub fn serialize<S: Serializer>(value: &BigUint, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_str_radix(10))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<BigUint, D::Error> {
        let s = String::deserialize(deserializer)?;
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(D::Error::custom(format!("not a decimal integer: {s:?}")));
        }
        BigUint::parse_bytes(s.as_bytes(), 10)
            .ok_or_else(|| D::Error::custom(format!("not a decimal integer: {s:?}")))
    }
}
