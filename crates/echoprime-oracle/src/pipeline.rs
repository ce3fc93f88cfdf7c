// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// End-to-end discovery: estimate -> search -> verify -> trace, and
// publication of the resulting traces to a registry.
//
// The numeric pipeline is pure CPU work with no shared state, so indices
// fan out over tokio's blocking pool. A semaphore bounds how many run at
// once.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Instant;

use num_bigint::BigUint;
use tokio::sync::Semaphore;
use tracing::{debug, info, instrument, warn};

use echoprime_core::config::OracleConfig;
use echoprime_core::error::{EchoPrimeError, Result};
use echoprime_core::types::{Identity, Index, OracleTrace, RegistryRecord, VerificationResult};
use echoprime_math::{CollapseVerifier, find_safe_prime_near, find_safe_prime_near_cancellable};
use echoprime_registry::{BatchOutcome, Registry};
use echoprime_trace::trace_from_verification;

/// The safe prime oracle.
///
/// Cheap to clone; each clone carries its own copy of the configuration.
#[derive(Debug, Clone)]
pub struct Oracle {
    config: OracleConfig,
    verifier: CollapseVerifier,
}

impl Default for Oracle {
    fn default() -> Self {
        let config = OracleConfig::default();
        Self {
            verifier: CollapseVerifier::from_config(&config),
            config,
        }
    }
}

impl Oracle {
    /// Build an oracle, rejecting an invalid configuration with `Config`.
    pub fn new(config: OracleConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            verifier: CollapseVerifier::from_config(&config),
            config,
        })
    }

    pub fn config(&self) -> &OracleConfig {
        &self.config
    }

    /// Verify an arbitrary candidate with this oracle's window and threshold.
    pub fn verify(&self, p: &BigUint) -> Result<VerificationResult> {
        self.verifier.verify(p)
    }

    /// Run the full pipeline for one index.
    pub fn discover(&self, index: Index) -> Result<OracleTrace> {
        self.run(index, None)
    }

    /// As [`discover`](Self::discover), giving up with `Cancelled` once
    /// `cancel` is set.
    pub fn discover_cancellable(&self, index: Index, cancel: &AtomicBool) -> Result<OracleTrace> {
        self.run(index, Some(cancel))
    }

    #[instrument(skip_all, fields(index = %index))]
    fn run(&self, index: Index, cancel: Option<&AtomicBool>) -> Result<OracleTrace> {
        let started = Instant::now();
        let max_attempts = self.config.max_attempts;
        let pair = match cancel {
            Some(flag) => find_safe_prime_near_cancellable(index.get(), max_attempts, flag)?,
            None => find_safe_prime_near(index.get(), max_attempts)?,
        };
        let result = self.verifier.verify(&pair.p)?;
        if !result.verified {
            warn!(p = %pair.p, "search result failed verification");
        }
        let trace = trace_from_verification(index, &result)?;

        debug!(
            p = %trace.p,
            verified = trace.verified,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "index discovered"
        );
        Ok(trace)
    }

    /// Discover many indices in parallel, at most `workers` at a time.
    ///
    /// Returns one result per index, in input order. Indices fail
    /// independently; a panicking worker surfaces as `Worker`.
    pub async fn discover_many(&self, indices: &[Index]) -> Vec<Result<OracleTrace>> {
        self.fan_out(indices, None).await
    }

    /// As [`discover_many`](Self::discover_many); setting `cancel` stops
    /// every search still running and skips those not yet started.
    pub async fn discover_many_cancellable(
        &self,
        indices: &[Index],
        cancel: Arc<AtomicBool>,
    ) -> Vec<Result<OracleTrace>> {
        self.fan_out(indices, Some(cancel)).await
    }

    async fn fan_out(
        &self,
        indices: &[Index],
        cancel: Option<Arc<AtomicBool>>,
    ) -> Vec<Result<OracleTrace>> {
        info!(count = indices.len(), workers = self.config.workers, "discovery started");
        let permits = Arc::new(Semaphore::new(self.config.workers.max(1)));

        let mut handles = Vec::with_capacity(indices.len());
        for &index in indices {
            let permit = match Arc::clone(&permits).acquire_owned().await {
                Ok(permit) => permit,
                Err(e) => {
                    handles.push(Err(EchoPrimeError::Worker(e.to_string())));
                    continue;
                }
            };
            let oracle = self.clone();
            let cancel = cancel.clone();
            handles.push(Ok(tokio::task::spawn_blocking(move || {
                let _permit = permit;
                oracle.run(index, cancel.as_deref())
            })));
        }

        let mut results = Vec::with_capacity(handles.len());
        for handle in handles {
            let result = match handle {
                Ok(task) => task
                    .await
                    .unwrap_or_else(|e| Err(EchoPrimeError::Worker(e.to_string()))),
                Err(e) => Err(e),
            };
            results.push(result);
        }

        let failed = results.iter().filter(|r| r.is_err()).count();
        info!(count = results.len(), failed, "discovery finished");
        results
    }
}

/// Submit one trace to `registry` as `submitter`.
pub fn publish(registry: &Registry, submitter: &Identity, trace: &OracleTrace) -> Result<RegistryRecord> {
    registry.submit_trace(submitter, trace)
}

/// Submit any number of traces, split into the largest batches the
/// registry accepts.
///
/// Each batch commits on its own: if a later batch is rejected, earlier
/// ones stay recorded and the error is returned.
#[instrument(skip_all, fields(submitter = %submitter, count = traces.len()))]
pub fn publish_all(
    registry: &Registry,
    submitter: &Identity,
    traces: &[OracleTrace],
) -> Result<BatchOutcome> {
    let mut total = BatchOutcome::default();
    for chunk in traces.chunks(registry.max_batch()) {
        let outcome = registry.batch_submit_traces(submitter, chunk)?;
        total.recorded.extend(outcome.recorded);
        total.skipped.extend(outcome.skipped);
    }
    info!(
        recorded = total.recorded.len(),
        skipped = total.skipped.len(),
        "traces published"
    );
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use echoprime_core::types::CollapseScore;
    use echoprime_math::{estimate, is_safe_prime};
    use echoprime_registry::{MemoryLedger, RegistryEvent};
    use echoprime_trace::verify_trace;

    fn idx(n: u64) -> Index {
        Index::new(n).unwrap()
    }

    fn registry(owner: &str) -> Registry {
        Registry::initialize(Box::new(MemoryLedger::new()), Identity::from(owner), 256).unwrap()
    }

    #[test]
    fn discover_produces_a_verified_trace() {
        let oracle = Oracle::default();
        let trace = oracle.discover(idx(100)).unwrap();

        assert!(trace.verified);
        assert!(is_safe_prime(&trace.p));
        assert_eq!(trace.p, &trace.q * 2u32 + 1u32);
        assert!(trace.p >= estimate(100).unwrap());
        assert_eq!(trace.score_p, CollapseScore::ONE);
        assert!(verify_trace(&trace).is_ok());
        assert_eq!(oracle.discover(idx(100)).unwrap(), trace);
    }

    #[test]
    fn first_index_yields_eleven() {
        let trace = Oracle::default().discover(idx(1)).unwrap();
        assert_eq!(trace.p, BigUint::from(11u32));
        assert_eq!(trace.q, BigUint::from(5u32));
    }

    #[test]
    fn invalid_configuration_is_rejected() {
        let config = OracleConfig {
            workers: 0,
            ..OracleConfig::default()
        };
        assert!(matches!(Oracle::new(config), Err(EchoPrimeError::Config(_))));
    }

    #[test]
    fn exhausted_search_is_reported() {
        let oracle = Oracle::new(OracleConfig {
            max_attempts: 1,
            ..OracleConfig::default()
        })
        .unwrap();
        let err = oracle.discover(idx(2)).unwrap_err();
        assert!(matches!(err, EchoPrimeError::SearchExhausted { attempts: 1, .. }));
        assert!(err.is_caller_retryable());
    }

    #[test]
    fn cancelled_discovery_stops() {
        let cancel = AtomicBool::new(true);
        assert!(matches!(
            Oracle::default().discover_cancellable(idx(50), &cancel),
            Err(EchoPrimeError::Cancelled(_))
        ));
    }

    #[test]
    fn verify_uses_the_configured_threshold() {
        let lenient = Oracle::new(OracleConfig {
            threshold: 0.0,
            ..OracleConfig::default()
        })
        .unwrap();
        assert!(lenient.verify(&BigUint::from(9u32)).unwrap().symbolic_pass);
        assert!(!Oracle::default().verify(&BigUint::from(9u32)).unwrap().symbolic_pass);
    }

    #[tokio::test]
    async fn discover_many_keeps_input_order() {
        let oracle = Oracle::new(OracleConfig {
            workers: 2,
            ..OracleConfig::default()
        })
        .unwrap();
        let indices: Vec<Index> = [30u64, 1, 12, 7, 1].into_iter().map(idx).collect();

        let results = oracle.discover_many(&indices).await;
        assert_eq!(results.len(), indices.len());
        for (index, result) in indices.iter().zip(&results) {
            let trace = result.as_ref().unwrap();
            assert_eq!(trace.index, *index);
            assert_eq!(trace, &oracle.discover(*index).unwrap());
        }
        assert_eq!(results[1].as_ref().unwrap(), results[4].as_ref().unwrap());
    }

    #[tokio::test]
    async fn discover_many_fails_per_index() {
        let oracle = Oracle::new(OracleConfig {
            max_attempts: 1,
            ..OracleConfig::default()
        })
        .unwrap();
        let results = oracle.discover_many(&[idx(1), idx(2)]).await;
        assert!(results[0].is_ok());
        assert!(matches!(results[1], Err(EchoPrimeError::SearchExhausted { .. })));
    }

    #[tokio::test]
    async fn cancelled_fan_out_reports_every_index() {
        let cancel = Arc::new(AtomicBool::new(true));
        let results = Oracle::default()
            .discover_many_cancellable(&[idx(10), idx(20), idx(30)], cancel)
            .await;
        assert_eq!(results.len(), 3);
        assert!(results.iter().all(|r| matches!(r, Err(EchoPrimeError::Cancelled(_)))));
    }

    #[tokio::test]
    async fn empty_fan_out_is_empty() {
        assert!(Oracle::default().discover_many(&[]).await.is_empty());
    }

    #[test]
    fn published_trace_lands_in_the_registry() {
        let owner = Identity::from("0xa11ce");
        let registry = registry("0xa11ce");
        let trace = Oracle::default().discover(idx(3)).unwrap();

        let record = publish(&registry, &owner, &trace).unwrap();
        assert_eq!(record.trace, trace);
        assert!(matches!(
            publish(&registry, &owner, &trace),
            Err(EchoPrimeError::AlreadySubmitted(_))
        ));
    }

    #[tokio::test]
    async fn discover_then_publish_all_end_to_end() {
        let owner = Identity::from("0xa11ce");
        let registry = registry("0xa11ce");
        let mut feed = registry.subscribe();

        let indices: Vec<Index> = (1..=120u64).map(idx).collect();
        let traces: Vec<OracleTrace> = Oracle::default()
            .discover_many(&indices)
            .await
            .into_iter()
            .collect::<Result<_>>()
            .unwrap();

        publish(&registry, &owner, &traces[0]).unwrap();
        let outcome = publish_all(&registry, &owner, &traces).unwrap();
        assert_eq!(outcome.skipped, vec![idx(1)]);
        assert_eq!(outcome.recorded.len(), 119);
        assert_eq!(registry.total_recorded().unwrap(), 120);
        assert_eq!(registry.list_recorded_indices().unwrap(), indices);

        let mut announced = 0;
        while let Ok(event) = feed.try_recv() {
            assert!(matches!(event, RegistryEvent::PrimeVerified(_)));
            announced += 1;
        }
        assert_eq!(announced, 120);
    }

    #[test]
    fn publish_all_requires_authorization() {
        let registry = registry("0xa11ce");
        let trace = Oracle::default().discover(idx(4)).unwrap();
        assert!(matches!(
            publish_all(&registry, &Identity::from("0xbad"), &[trace]),
            Err(EchoPrimeError::Unauthorized(_))
        ));
        assert_eq!(registry.total_recorded().unwrap(), 0);
    }

    #[test]
    fn publish_all_respects_a_smaller_batch_limit() {
        use echoprime_core::config::RegistryConfig;

        let config = RegistryConfig {
            max_batch: 3,
            ..RegistryConfig::default()
        };
        let owner = Identity::from("0xa11ce");
        let registry = Registry::open(&config, owner.clone()).unwrap();
        let oracle = Oracle::default();
        let traces: Vec<OracleTrace> = (1..=7u64).map(|n| oracle.discover(idx(n)).unwrap()).collect();

        let outcome = publish_all(&registry, &owner, &traces).unwrap();
        assert_eq!(outcome.recorded.len(), 7);
        assert_eq!(registry.total_recorded().unwrap(), 7);
    }

    #[tokio::test]
    async fn published_traces_survive_a_reopen() {
        use echoprime_core::config::RegistryConfig;

        let dir = tempfile::tempdir().unwrap();
        let config = RegistryConfig {
            database_path: Some(dir.path().join("ledger.db")),
            max_batch: 2,
            ..RegistryConfig::default()
        };
        let owner = Identity::from("0xa11ce");
        let indices = [idx(9), idx(3), idx(5)];

        let traces: Vec<OracleTrace> = Oracle::default()
            .discover_many(&indices)
            .await
            .into_iter()
            .map(|r| r.unwrap())
            .collect();
        {
            let registry = Registry::open(&config, owner.clone()).unwrap();
            let outcome = publish_all(&registry, &owner, &traces).unwrap();
            assert_eq!(outcome.recorded, indices.to_vec());
        }

        let registry = Registry::open(&config, Identity::from("0xb0b")).unwrap();
        assert_eq!(registry.owner().unwrap(), owner);
        assert_eq!(registry.list_recorded_indices().unwrap(), indices.to_vec());
        for trace in &traces {
            let record = registry.get_record(trace.index).unwrap().unwrap();
            assert_eq!(&record.trace, trace);
            assert_eq!(record.submitter, owner);
            assert!(verify_trace(&record.trace).is_ok());
        }

        // A second publication of the same traces records nothing new.
        let again = publish_all(&registry, &owner, &traces).unwrap();
        assert!(again.recorded.is_empty());
        assert_eq!(again.skipped, indices.to_vec());
        assert_eq!(registry.total_recorded().unwrap(), 3);
    }
}
