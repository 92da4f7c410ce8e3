//! Bounded worker pool for classifying candidates in parallel.
//!
//! Candidates are fed through a bounded channel so a lazy candidate source
//! is never materialized up front. Outcomes come back on an unbounded
//! channel, so workers never block on the coordinator while it is still
//! feeding.

use std::thread;

use crossbeam_channel::{bounded, unbounded};

use crate::collector::{process_candidate, Outcome};
use crate::error::CollectorError;
use crate::policy::Policy;
use crate::resolution::{Candidate, ChainResolver};
use crate::source::BaseSources;

pub(crate) fn classify_parallel<V, R, I>(
    candidates: I,
    resolver: &R,
    policy: &Policy,
    base_sources: &BaseSources,
    workers: usize,
    queue_capacity: usize,
) -> Result<Vec<Outcome<V>>, CollectorError>
where
    V: PartialEq + Send,
    R: ChainResolver<V> + ?Sized,
    I: IntoIterator<Item = Candidate<V>>,
{
    let workers = workers.max(1);
    let queue_capacity = queue_capacity.max(1);

    thread::scope(|scope| {
        let (job_tx, job_rx) = bounded::<Candidate<V>>(queue_capacity);
        let (out_tx, out_rx) = unbounded::<Outcome<V>>();

        for idx in 0..workers {
            let job_rx = job_rx.clone();
            let out_tx = out_tx.clone();
            thread::Builder::new()
                .name(format!("navmesh-collector-{idx}"))
                .spawn_scoped(scope, move || {
                    for candidate in job_rx {
                        let outcome = process_candidate(candidate, resolver, policy, base_sources);
                        if out_tx.send(outcome).is_err() {
                            break;
                        }
                    }
                })
                .map_err(|e| CollectorError::internal(format!("failed to spawn worker {idx}: {e}")))?;
        }
        drop(job_rx);
        drop(out_tx);

        for candidate in candidates {
            if job_tx.send(candidate).is_err() {
                return Err(CollectorError::internal("all classification workers exited"));
            }
        }
        // Close the queue: workers drain what is left, then exit.
        drop(job_tx);

        Ok(out_rx.iter().collect())
    })
}
