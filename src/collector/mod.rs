//! The collection loop.
//!
//! A [`Collector`] walks the candidates supplied by the load order, resolves
//! each candidate's override chain, classifies it, and accumulates the
//! included winners. Per-candidate resolution failures are recorded and the
//! loop moves on; configuration and output failures abort the run.
//!
//! ```text
//!  candidates ──► resolve_chain ──► classify ──► include? ──► CollectionResult
//!                      │                            │
//!                      └── failure list             └── exclusion counters
//! ```

mod guard;
mod pool;

pub use guard::RunState;

use std::collections::{BTreeMap, BTreeSet};
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::classifier::{self, Decision, Exclusion};
use crate::entity::EntityKey;
use crate::error::{CollectorError, CollectorResult, ConfigError, ResolutionError};
use crate::output::{OutputReceipt, OutputSink};
use crate::policy::{Policy, Settings};
use crate::resolution::{Candidate, ChainResolver};
use crate::source::{BaseSources, SourceId};

use guard::RUN_SLOT;

/// Collector configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectorConfig {
    /// Classification workers used by [`Collector::run`]. One means the
    /// candidates are processed sequentially, in order.
    pub workers: usize,
    /// Maximum candidates queued ahead of the workers.
    pub queue_capacity: usize,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            workers: 1,
            queue_capacity: 1024,
        }
    }
}

impl CollectorConfig {
    /// Rejects zero-sized pools and queues.
    ///
    /// # Errors
    /// `InvalidCollectorConfig` naming the offending field.
    pub fn validate(self) -> Result<Self, ConfigError> {
        if self.workers == 0 {
            return Err(ConfigError::InvalidCollectorConfig {
                reason: "workers must be at least 1".to_string(),
            });
        }
        if self.queue_capacity == 0 {
            return Err(ConfigError::InvalidCollectorConfig {
                reason: "queue_capacity must be at least 1".to_string(),
            });
        }
        Ok(self)
    }
}

/// One collected winner.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CollectedRecord<V> {
    /// Entity identity.
    pub key: EntityKey,
    /// Winning value.
    pub value: V,
    /// Source supplying the winning value.
    pub winner: SourceId,
    /// Source directly below the winner, if any.
    pub parent: Option<SourceId>,
}

/// Everything a collection pass produced.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionResult<V> {
    records: Vec<CollectedRecord<V>>,
    failures: Vec<ResolutionError>,
    exclusions: BTreeMap<Exclusion, usize>,
    examined: usize,
}

impl<V> Default for CollectionResult<V> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            failures: Vec::new(),
            exclusions: BTreeMap::new(),
            examined: 0,
        }
    }
}

impl<V> CollectionResult<V> {
    /// Collected winners.
    #[must_use]
    pub fn records(&self) -> &[CollectedRecord<V>] {
        &self.records
    }

    /// Number of collected winners.
    #[must_use]
    pub fn count(&self) -> usize {
        self.records.len()
    }

    /// Candidates whose chain could not be resolved.
    #[must_use]
    pub fn failures(&self) -> &[ResolutionError] {
        &self.failures
    }

    /// How many candidates each gate excluded.
    #[must_use]
    pub fn exclusions(&self) -> &BTreeMap<Exclusion, usize> {
        &self.exclusions
    }

    /// Number of candidates consumed.
    #[must_use]
    pub fn examined(&self) -> usize {
        self.examined
    }

    /// Collected keys, for order-independent comparison.
    #[must_use]
    pub fn keys(&self) -> BTreeSet<&EntityKey> {
        self.records.iter().map(|record| &record.key).collect()
    }

    /// Consumes the result, returning the collected winners.
    #[must_use]
    pub fn into_records(self) -> Vec<CollectedRecord<V>> {
        self.records
    }

    fn absorb(&mut self, outcome: Outcome<V>) {
        self.examined += 1;
        match outcome {
            Outcome::Collected(record) => self.records.push(record),
            Outcome::Excluded(reason) => *self.exclusions.entry(reason).or_insert(0) += 1,
            Outcome::Failed(err) => self.failures.push(err),
        }
    }
}

/// Summary of a completed [`Collector::run`].
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Number of collected winners.
    pub collected: usize,
    /// Number of candidates consumed.
    pub examined: usize,
    /// Candidates whose chain could not be resolved.
    pub failures: Vec<ResolutionError>,
    /// How many candidates each gate excluded.
    pub exclusions: BTreeMap<Exclusion, usize>,
    /// Where the output went.
    pub output: OutputReceipt,
    /// Wall time of the whole run.
    pub elapsed: Duration,
}

pub(crate) enum Outcome<V> {
    Collected(CollectedRecord<V>),
    Excluded(Exclusion),
    Failed(ResolutionError),
}

pub(crate) fn process_candidate<V, R>(
    candidate: Candidate<V>,
    resolver: &R,
    policy: &Policy,
    base_sources: &BaseSources,
) -> Outcome<V>
where
    V: PartialEq,
    R: ChainResolver<V> + ?Sized,
{
    let chain = match resolver.resolve_chain(&candidate.key) {
        Ok(chain) => chain,
        Err(err) => {
            warn!(key = %candidate.key, error = %err, "skipping candidate");
            return Outcome::Failed(err);
        }
    };

    let is_winner_from_base_source = base_sources.contains(candidate.origin());
    match classifier::evaluate(
        &chain,
        candidate.containment,
        is_winner_from_base_source,
        policy,
        base_sources,
    ) {
        Decision::Include => {
            let parent = chain.parent().map(|entry| entry.source.clone());
            debug!(
                key = %candidate.key,
                winner = %candidate.winner,
                parent = parent.as_ref().map(tracing::field::display),
                "collecting navmesh"
            );
            Outcome::Collected(CollectedRecord {
                key: candidate.key,
                value: candidate.value,
                winner: candidate.winner,
                parent,
            })
        }
        Decision::Exclude(reason) => {
            debug!(key = %candidate.key, %reason, "excluded");
            Outcome::Excluded(reason)
        }
    }
}

/// Runs collection passes.
///
/// At most one pass is active in the process at a time, across every
/// `Collector` instance.
#[derive(Debug, Default)]
pub struct Collector {
    config: CollectorConfig,
}

impl Collector {
    /// Creates a collector with a validated configuration.
    ///
    /// # Errors
    /// `InvalidCollectorConfig` if `workers` or `queue_capacity` is zero.
    pub fn new(config: CollectorConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            config: config.validate()?,
        })
    }

    /// The collector's configuration.
    #[must_use]
    pub const fn config(&self) -> &CollectorConfig {
        &self.config
    }

    /// Whether any run is currently in flight in this process.
    #[must_use]
    pub fn state(&self) -> RunState {
        RUN_SLOT.state()
    }

    /// Classifies every candidate in order and accumulates the winners.
    ///
    /// # Errors
    /// - `Configuration` if the policy can never include anything; no
    ///   candidate is consumed.
    /// - `ConcurrentRunRejected` if another pass is in flight, from this or
    ///   any other `Collector`.
    pub fn collect<V, R, I>(
        &self,
        candidates: I,
        resolver: &R,
        policy: &Policy,
        base_sources: &BaseSources,
    ) -> CollectorResult<CollectionResult<V>>
    where
        V: PartialEq,
        R: ChainResolver<V> + ?Sized,
        I: IntoIterator<Item = Candidate<V>>,
    {
        let _guard = RUN_SLOT.try_begin().ok_or(CollectorError::ConcurrentRunRejected)?;
        Self::collect_sequential(candidates, resolver, policy, base_sources)
    }

    /// Like [`Collector::collect`], but classifies on `workers` threads.
    ///
    /// Records come back ordered by key rather than by candidate order.
    ///
    /// # Errors
    /// - `Configuration` if the policy can never include anything.
    /// - `ConcurrentRunRejected` if another pass is in flight.
    /// - `Internal` if a worker thread cannot be spawned or every worker
    ///   exits early.
    pub fn collect_parallel<V, R, I>(
        &self,
        candidates: I,
        resolver: &R,
        policy: &Policy,
        base_sources: &BaseSources,
        workers: usize,
    ) -> CollectorResult<CollectionResult<V>>
    where
        V: PartialEq + Send,
        R: ChainResolver<V> + ?Sized,
        I: IntoIterator<Item = Candidate<V>>,
    {
        let _guard = RUN_SLOT.try_begin().ok_or(CollectorError::ConcurrentRunRejected)?;
        self.collect_pooled(candidates, resolver, policy, base_sources, workers)
    }

    /// A full run: snapshot the settings, collect, and write the output.
    ///
    /// Nothing reaches `sink` unless collection finished. A sink failure
    /// fails the whole run.
    ///
    /// # Errors
    /// - `Configuration` if the settings can never include anything; the
    ///   sink is not called.
    /// - `ConcurrentRunRejected` if another pass is in flight.
    /// - `OutputWrite` if the sink fails, carrying the sink's error.
    /// - `Internal` from the worker pool when `workers > 1`.
    pub fn run<V, R, I, S>(
        &self,
        settings: &Settings,
        candidates: I,
        resolver: &R,
        base_sources: &BaseSources,
        sink: &S,
    ) -> CollectorResult<RunReport>
    where
        V: PartialEq + Send,
        R: ChainResolver<V> + ?Sized,
        I: IntoIterator<Item = Candidate<V>>,
        S: OutputSink<V> + ?Sized,
    {
        let _guard = RUN_SLOT.try_begin().ok_or(CollectorError::ConcurrentRunRejected)?;
        let started = Instant::now();

        let policy = Policy::from_settings(settings);
        info!(
            workers = self.config.workers,
            base_sources = base_sources.len(),
            "starting navmesh collection"
        );

        let result = if self.config.workers > 1 {
            self.collect_pooled(candidates, resolver, &policy, base_sources, self.config.workers)?
        } else {
            Self::collect_sequential(candidates, resolver, &policy, base_sources)?
        };

        let output = sink.write(&result).map_err(|err| {
            warn!(error = %err, "failed to write output");
            CollectorError::from(err)
        })?;
        info!(location = %output.location, records = output.records_written, "output written");

        Ok(RunReport {
            collected: result.count(),
            examined: result.examined,
            failures: result.failures,
            exclusions: result.exclusions,
            output,
            elapsed: started.elapsed(),
        })
    }

    fn collect_sequential<V, R, I>(
        candidates: I,
        resolver: &R,
        policy: &Policy,
        base_sources: &BaseSources,
    ) -> CollectorResult<CollectionResult<V>>
    where
        V: PartialEq,
        R: ChainResolver<V> + ?Sized,
        I: IntoIterator<Item = Candidate<V>>,
    {
        begin(policy)?;

        let mut result = CollectionResult::default();
        for candidate in candidates {
            result.absorb(process_candidate(candidate, resolver, policy, base_sources));
        }

        finish(&result);
        Ok(result)
    }

    fn collect_pooled<V, R, I>(
        &self,
        candidates: I,
        resolver: &R,
        policy: &Policy,
        base_sources: &BaseSources,
        workers: usize,
    ) -> CollectorResult<CollectionResult<V>>
    where
        V: PartialEq + Send,
        R: ChainResolver<V> + ?Sized,
        I: IntoIterator<Item = Candidate<V>>,
    {
        begin(policy)?;

        let outcomes = pool::classify_parallel(
            candidates,
            resolver,
            policy,
            base_sources,
            workers,
            self.config.queue_capacity,
        )?;

        let mut result = CollectionResult::default();
        for outcome in outcomes {
            result.absorb(outcome);
        }
        // Workers finish in any order; a keyed order keeps runs comparable.
        result.records.sort_by(|a, b| a.key.cmp(&b.key));
        result.failures.sort_by(|a, b| a.key().cmp(b.key()));

        finish(&result);
        Ok(result)
    }
}

fn begin(policy: &Policy) -> Result<(), ConfigError> {
    policy.validate()?;
    if policy.has_worldspace_selection() {
        warn!(
            selected = policy.selected_worldspaces.len(),
            "worldspace selection is not applied; navmeshes from every worldspace are considered"
        );
    }
    Ok(())
}

/// Serializes tests that start runs; the run slot is shared by the whole
/// test binary.
#[cfg(test)]
pub(crate) fn serial_runs() -> std::sync::MutexGuard<'static, ()> {
    static SERIAL: std::sync::Mutex<()> = std::sync::Mutex::new(());
    SERIAL.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

fn finish<V>(result: &CollectionResult<V>) {
    info!(
        collected = result.count(),
        examined = result.examined,
        failures = result.failures.len(),
        "collection complete"
    );
}
