// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The registry: an append-only, access-controlled ledger of safe prime
// records, one per index.
//
// Single-writer model. Authorization state and the store sit behind one
// mutex, and every operation holds it from its first check to its last
// write, so the "already recorded?" check and the insert it guards can
// never interleave with another call. Events are broadcast before the lock
// is released, which makes delivery order equal commit order.
//
// Reads take the same lock and are serialized with everything else:
// `rusqlite::Connection` is `Send` but not `Sync`, so the store cannot be
// shared behind a read lock.

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use num_bigint::BigUint;
use tokio::sync::broadcast;
use tracing::{debug, info, instrument, warn};

use echoprime_core::config::{MAX_BATCH, RegistryConfig};
use echoprime_core::error::{EchoPrimeError, Result};
use echoprime_core::types::{CollapseScore, Identity, Index, OracleTrace, RegistryRecord, companion};
use echoprime_trace::{create_trace, verify_trace};

use crate::auth::AuthorizationState;
use crate::events::RegistryEvent;
use crate::sqlite::SqliteLedger;
use crate::store::{LedgerStore, MemoryLedger};

/// Result of a structurally valid batch submission.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    /// Newly written indices, in batch order.
    pub recorded: Vec<Index>,
    /// Indices skipped because they were already recorded, either before the
    /// call or earlier in the same batch.
    pub skipped: Vec<Index>,
}

struct Inner {
    auth: AuthorizationState,
    store: Box<dyn LedgerStore>,
}

/// Shared ledger of safe prime records.
///
/// `Send + Sync`; share it with `Arc<Registry>`. Every method is blocking
/// and should be called from `spawn_blocking` in async code when the store
/// is on disk.
pub struct Registry {
    inner: Mutex<Inner>,
    events: broadcast::Sender<RegistryEvent>,
    max_batch: usize,
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("max_batch", &self.max_batch)
            .field("subscribers", &self.events.receiver_count())
            .finish_non_exhaustive()
    }
}

impl Registry {
    /// Create a registry on an empty store with `owner` in charge.
    ///
    /// Fails with `InvalidOwner` for a null owner and with `Config` if the
    /// store already belongs to an initialized registry.
    #[instrument(skip_all, fields(owner = %owner))]
    pub fn initialize(
        mut store: Box<dyn LedgerStore>,
        owner: Identity,
        event_capacity: usize,
    ) -> Result<Self> {
        if store.authorization()?.is_some() {
            return Err(EchoPrimeError::Config(
                "ledger is already initialized; resume it instead".into(),
            ));
        }
        let auth = AuthorizationState::new(owner)?;
        store.update_authorization(&auth, &[])?;
        info!("registry initialized");
        Ok(Self::assemble(auth, store, event_capacity))
    }

    /// Reopen a registry persisted in `store`.
    #[instrument(skip_all)]
    pub fn resume(store: Box<dyn LedgerStore>, event_capacity: usize) -> Result<Self> {
        let auth = store.authorization()?.ok_or_else(|| {
            EchoPrimeError::Config("ledger has not been initialized".into())
        })?;
        info!(owner = %auth.owner(), recorded = store.count()?, "registry resumed");
        Ok(Self::assemble(auth, store, event_capacity))
    }

    /// Open the registry described by `config`.
    ///
    /// Without a `database_path` the ledger lives in memory. A database that
    /// already holds a registry is resumed and `owner` is ignored. Fails with
    /// `Config` for an invalid section.
    pub fn open(config: &RegistryConfig, owner: Identity) -> Result<Self> {
        config.validate()?;
        let store: Box<dyn LedgerStore> = match &config.database_path {
            Some(path) => Box::new(SqliteLedger::open(path)?),
            None => Box::new(MemoryLedger::new()),
        };
        let mut registry = if store.authorization()?.is_some() {
            Self::resume(store, config.event_capacity)?
        } else {
            Self::initialize(store, owner, config.event_capacity)?
        };
        registry.max_batch = config.max_batch;
        Ok(registry)
    }

    fn assemble(auth: AuthorizationState, store: Box<dyn LedgerStore>, event_capacity: usize) -> Self {
        let (events, _) = broadcast::channel(event_capacity.max(1));
        Self {
            inner: Mutex::new(Inner { auth, store }),
            events,
            max_batch: MAX_BATCH,
        }
    }

    /// Largest batch this registry accepts.
    pub fn max_batch(&self) -> usize {
        self.max_batch
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|_| EchoPrimeError::Database("registry lock poisoned".into()))
    }

    fn broadcast(&self, event: RegistryEvent) {
        // Having no live subscriber is not an error; history keeps the event.
        let _ = self.events.send(event);
    }

    // -- Submission ----------------------------------------------------------

    /// Record one verification result for `index`.
    ///
    /// Checks, in order: caller authorization, `p > 2`, `p` odd, and that
    /// `index` is still unused. On success the record is stored and a
    /// `PrimeVerified` event is published.
    #[instrument(skip_all, fields(submitter = %caller, index = %index, verified = verified))]
    pub fn submit(
        &self,
        caller: &Identity,
        index: Index,
        p: BigUint,
        score_p: CollapseScore,
        score_q: CollapseScore,
        verified: bool,
    ) -> Result<RegistryRecord> {
        let mut inner = self.lock()?;
        if let Err(e) = inner.auth.require_submitter(caller) {
            warn!("unauthorized submission rejected");
            return Err(e);
        }
        let q = companion(&p)?;
        if inner.store.contains(index)? {
            return Err(EchoPrimeError::AlreadySubmitted(index));
        }

        let record = RegistryRecord {
            trace: create_trace(index, p, q, score_p, score_q, verified)?,
            submitter: caller.clone(),
            recorded_at: Utc::now(),
        };
        let event = RegistryEvent::prime_verified(&record);
        inner
            .store
            .append_records(std::slice::from_ref(&record), std::slice::from_ref(&event))?;
        self.broadcast(event);

        info!(p = %record.trace.p, "record written");
        Ok(record)
    }

    /// Submit a trace produced elsewhere, after checking its digest.
    pub fn submit_trace(&self, caller: &Identity, trace: &OracleTrace) -> Result<RegistryRecord> {
        verify_trace(trace)?;
        self.submit(
            caller,
            trace.index,
            trace.p.clone(),
            trace.score_p,
            trace.score_q,
            trace.verified,
        )
    }

    /// Record up to 100 results in one call.
    ///
    /// The call is rejected as a whole, with no state change, when the caller
    /// is unauthorized, the five sequences differ in length, the batch is too
    /// large, or any `p` is invalid. Otherwise each entry stands alone:
    /// indices that are already recorded are skipped silently and every new
    /// one is written and announced.
    #[instrument(skip_all, fields(submitter = %caller, count = indices.len()))]
    pub fn batch_submit(
        &self,
        caller: &Identity,
        indices: &[Index],
        primes: &[BigUint],
        scores_p: &[CollapseScore],
        scores_q: &[CollapseScore],
        verifieds: &[bool],
    ) -> Result<BatchOutcome> {
        let mut inner = self.lock()?;
        if let Err(e) = inner.auth.require_submitter(caller) {
            warn!("unauthorized batch rejected");
            return Err(e);
        }

        let lengths = [
            indices.len(),
            primes.len(),
            scores_p.len(),
            scores_q.len(),
            verifieds.len(),
        ];
        if lengths.iter().any(|&len| len != lengths[0]) {
            return Err(EchoPrimeError::BatchLengthMismatch(lengths));
        }
        if indices.len() > self.max_batch {
            return Err(EchoPrimeError::BatchTooLarge {
                len: indices.len(),
                max: self.max_batch,
            });
        }
        let companions = primes.iter().map(companion).collect::<Result<Vec<_>>>()?;

        let now = Utc::now();
        let mut outcome = BatchOutcome::default();
        let mut records = Vec::new();
        let mut seen = HashSet::with_capacity(indices.len());
        for (i, q) in companions.into_iter().enumerate() {
            let index = indices[i];
            if !seen.insert(index) || inner.store.contains(index)? {
                debug!(%index, "already recorded, skipping");
                outcome.skipped.push(index);
                continue;
            }
            let trace = create_trace(index, primes[i].clone(), q, scores_p[i], scores_q[i], verifieds[i])?;
            records.push(RegistryRecord {
                trace,
                submitter: caller.clone(),
                recorded_at: now,
            });
            outcome.recorded.push(index);
        }

        let events: Vec<RegistryEvent> = records.iter().map(RegistryEvent::prime_verified).collect();
        inner.store.append_records(&records, &events)?;
        for event in events {
            self.broadcast(event);
        }

        info!(
            recorded = outcome.recorded.len(),
            skipped = outcome.skipped.len(),
            "batch committed"
        );
        Ok(outcome)
    }

    /// Batch form of [`submit_trace`](Self::submit_trace). Every digest is
    /// checked before anything is written.
    pub fn batch_submit_traces(&self, caller: &Identity, traces: &[OracleTrace]) -> Result<BatchOutcome> {
        for trace in traces {
            verify_trace(trace)?;
        }
        let indices: Vec<Index> = traces.iter().map(|t| t.index).collect();
        let primes: Vec<BigUint> = traces.iter().map(|t| t.p.clone()).collect();
        let scores_p: Vec<CollapseScore> = traces.iter().map(|t| t.score_p).collect();
        let scores_q: Vec<CollapseScore> = traces.iter().map(|t| t.score_q).collect();
        let verifieds: Vec<bool> = traces.iter().map(|t| t.verified).collect();
        self.batch_submit(caller, &indices, &primes, &scores_p, &scores_q, &verifieds)
    }

    // -- Queries -------------------------------------------------------------

    pub fn get_record(&self, index: Index) -> Result<Option<RegistryRecord>> {
        self.lock()?.store.record(index)
    }

    pub fn is_recorded(&self, index: Index) -> Result<bool> {
        self.lock()?.store.contains(index)
    }

    /// Recorded indices in the order they were written.
    pub fn list_recorded_indices(&self) -> Result<Vec<Index>> {
        self.lock()?.store.indices()
    }

    pub fn total_recorded(&self) -> Result<u64> {
        self.lock()?.store.count()
    }

    pub fn owner(&self) -> Result<Identity> {
        Ok(self.lock()?.auth.owner().clone())
    }

    pub fn is_authorized(&self, who: &Identity) -> Result<bool> {
        Ok(self.lock()?.auth.is_authorized(who))
    }

    pub fn submitters(&self) -> Result<Vec<Identity>> {
        Ok(self.lock()?.auth.submitters().cloned().collect())
    }

    /// Live event feed. Receivers see every event committed after they
    /// subscribe; a receiver that falls behind the channel capacity gets
    /// `RecvError::Lagged` and can catch up from [`events`](Self::events).
    pub fn subscribe(&self) -> broadcast::Receiver<RegistryEvent> {
        self.events.subscribe()
    }

    /// Every committed event, oldest first.
    pub fn events(&self) -> Result<Vec<RegistryEvent>> {
        self.lock()?.store.events()
    }

    // -- Administration ------------------------------------------------------

    /// Grant submit rights. Owner only; adding a present submitter is a
    /// no-op that still emits `SubmitterAdded`.
    #[instrument(skip_all, fields(caller = %caller, identity = %identity))]
    pub fn add_submitter(&self, caller: &Identity, identity: Identity) -> Result<()> {
        let event = RegistryEvent::SubmitterAdded {
            identity: identity.clone(),
        };
        self.update_auth(caller, event, |auth| {
            auth.add_submitter(identity);
            Ok(())
        })?;
        info!("submitter added");
        Ok(())
    }

    /// Revoke submit rights. Owner only; removing an absent submitter is a
    /// no-op that still emits `SubmitterRemoved`.
    #[instrument(skip_all, fields(caller = %caller, identity = %identity))]
    pub fn remove_submitter(&self, caller: &Identity, identity: Identity) -> Result<()> {
        let event = RegistryEvent::SubmitterRemoved {
            identity: identity.clone(),
        };
        self.update_auth(caller, event, |auth| {
            auth.remove_submitter(&identity);
            Ok(())
        })?;
        info!("submitter removed");
        Ok(())
    }

    /// Hand the registry to `new_owner`. The caller loses owner rights at
    /// once. Fails with `InvalidOwner` for a null identity.
    #[instrument(skip_all, fields(caller = %caller, new_owner = %new_owner))]
    pub fn transfer_ownership(&self, caller: &Identity, new_owner: Identity) -> Result<()> {
        let event = RegistryEvent::OwnershipTransferred {
            previous: caller.clone(),
            new_owner: new_owner.clone(),
        };
        self.update_auth(caller, event, |auth| auth.transfer_ownership(new_owner).map(drop))?;
        info!("ownership transferred");
        Ok(())
    }

    /// Owner-only authorization change: apply `change` to a copy, persist
    /// it with `event`, then swap it in.
    fn update_auth(
        &self,
        caller: &Identity,
        event: RegistryEvent,
        change: impl FnOnce(&mut AuthorizationState) -> Result<()>,
    ) -> Result<()> {
        let mut inner = self.lock()?;
        if let Err(e) = inner.auth.require_owner(caller) {
            warn!(kind = event.kind(), "non-owner administration rejected");
            return Err(e);
        }
        let mut next = inner.auth.clone();
        change(&mut next)?;
        inner.store.update_authorization(&next, std::slice::from_ref(&event))?;
        inner.auth = next;
        self.broadcast(event);
        Ok(())
    }
}
