// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Storage seam for the registry ledger.
//
// Backends are append-only for records: there is no way to overwrite or
// remove one. Every write call is atomic; either all of its records and
// events land or none do.

use std::collections::HashMap;

use echoprime_core::error::{EchoPrimeError, Result};
use echoprime_core::types::{Index, RegistryRecord};

use crate::auth::AuthorizationState;
use crate::events::RegistryEvent;

/// Persistent backing for a [`Registry`](crate::Registry).
///
/// Implementations do not check authorization or duplicates themselves; the
/// registry does that while holding its write lock. A backend must still
/// refuse to store a second record for an index.
pub trait LedgerStore: Send {
    /// The persisted authorization state, if the ledger was initialized.
    fn authorization(&self) -> Result<Option<AuthorizationState>>;

    fn record(&self, index: Index) -> Result<Option<RegistryRecord>>;

    fn contains(&self, index: Index) -> Result<bool>;

    /// Recorded indices in insertion order.
    fn indices(&self) -> Result<Vec<Index>>;

    fn count(&self) -> Result<u64>;

    /// Every committed event, oldest first.
    fn events(&self) -> Result<Vec<RegistryEvent>>;

    /// Append records and their events in one atomic step.
    fn append_records(&mut self, records: &[RegistryRecord], events: &[RegistryEvent]) -> Result<()>;

    /// Replace the authorization state and append events in one atomic step.
    fn update_authorization(
        &mut self,
        auth: &AuthorizationState,
        events: &[RegistryEvent],
    ) -> Result<()>;
}

/// Volatile ledger kept in process memory.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    auth: Option<AuthorizationState>,
    records: HashMap<Index, RegistryRecord>,
    order: Vec<Index>,
    events: Vec<RegistryEvent>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LedgerStore for MemoryLedger {
    fn authorization(&self) -> Result<Option<AuthorizationState>> {
        Ok(self.auth.clone())
    }

    fn record(&self, index: Index) -> Result<Option<RegistryRecord>> {
        Ok(self.records.get(&index).cloned())
    }

    fn contains(&self, index: Index) -> Result<bool> {
        Ok(self.records.contains_key(&index))
    }

    fn indices(&self) -> Result<Vec<Index>> {
        Ok(self.order.clone())
    }

    fn count(&self) -> Result<u64> {
        Ok(self.order.len() as u64)
    }

    fn events(&self) -> Result<Vec<RegistryEvent>> {
        Ok(self.events.clone())
    }

    fn append_records(&mut self, records: &[RegistryRecord], events: &[RegistryEvent]) -> Result<()> {
        // Check the whole batch first so a rejected call leaves no trace.
        let mut incoming = std::collections::HashSet::with_capacity(records.len());
        for record in records {
            let index = record.trace.index;
            if self.records.contains_key(&index) || !incoming.insert(index) {
                return Err(EchoPrimeError::AlreadySubmitted(index));
            }
        }
        for record in records {
            self.order.push(record.trace.index);
            self.records.insert(record.trace.index, record.clone());
        }
        self.events.extend_from_slice(events);
        Ok(())
    }

    fn update_authorization(
        &mut self,
        auth: &AuthorizationState,
        events: &[RegistryEvent],
    ) -> Result<()> {
        self.auth = Some(auth.clone());
        self.events.extend_from_slice(events);
        Ok(())
    }
}
