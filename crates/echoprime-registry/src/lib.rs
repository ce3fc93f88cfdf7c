// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>

//! echoprime-registry: the shared, append-only ledger of safe prime records.
//!
//! Each index moves from unused to recorded exactly once. Writes are limited
//! to the owner and authorized submitters, and every committed change is
//! published as a [`RegistryEvent`]. Records live in memory or in SQLite
//! behind the [`LedgerStore`] seam.

pub mod auth;
pub mod events;
pub mod registry;
pub mod sqlite;
pub mod store;

pub use auth::AuthorizationState;
pub use events::{PrimeVerified, RegistryEvent};
pub use registry::{BatchOutcome, Registry};
pub use sqlite::SqliteLedger;
pub use store::{LedgerStore, MemoryLedger};
