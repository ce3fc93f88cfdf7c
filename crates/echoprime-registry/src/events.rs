// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Events published by the registry, in commit order.

use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

use echoprime_core::types::{CollapseScore, Identity, Index, RegistryRecord, decimal};

/// Payload of a `PrimeVerified` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrimeVerified {
    pub index: Index,
    #[serde(with = "decimal")]
    pub p: BigUint,
    #[serde(with = "decimal")]
    pub q: BigUint,
    pub score_p: CollapseScore,
    pub score_q: CollapseScore,
    pub verified: bool,
    pub submitter: Identity,
}

/// A committed registry state change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum RegistryEvent {
    PrimeVerified(PrimeVerified),
    SubmitterAdded {
        identity: Identity,
    },
    SubmitterRemoved {
        identity: Identity,
    },
    OwnershipTransferred {
        previous: Identity,
        #[serde(rename = "newOwner")]
        new_owner: Identity,
    },
}

impl RegistryEvent {
    pub fn prime_verified(record: &RegistryRecord) -> Self {
        let trace = &record.trace;
        Self::PrimeVerified(PrimeVerified {
            index: trace.index,
            p: trace.p.clone(),
            q: trace.q.clone(),
            score_p: trace.score_p,
            score_q: trace.score_q,
            verified: trace.verified,
            submitter: record.submitter.clone(),
        })
    }

    /// Short name used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::PrimeVerified(_) => "PrimeVerified",
            Self::SubmitterAdded { .. } => "SubmitterAdded",
            Self::SubmitterRemoved { .. } => "SubmitterRemoved",
            Self::OwnershipTransferred { .. } => "OwnershipTransferred",
        }
    }
}
