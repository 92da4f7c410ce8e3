//! Run-level mutual exclusion.
//!
//! Collection is either `Idle` or `Running` for the whole process: every
//! [`Collector`](crate::Collector) claims the same [`RUN_SLOT`], so two
//! instances cannot run side by side. Starting a run is a single
//! compare-and-swap from `Idle` to `Running`; the returned guard moves the
//! state back to `Idle` when dropped, on every exit path including panics.
//! A second start while running fails immediately rather than waiting.

use std::sync::atomic::{AtomicU8, Ordering};

const IDLE: u8 = 0;
const RUNNING: u8 = 1;

/// Observable state of a collector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunState {
    /// No run in flight.
    Idle,
    /// A run holds the guard.
    Running,
}

#[derive(Debug)]
pub(crate) struct RunSlot(AtomicU8);

/// The one slot shared by every collector in the process.
pub(crate) static RUN_SLOT: RunSlot = RunSlot::new();

impl RunSlot {
    pub(crate) const fn new() -> Self {
        Self(AtomicU8::new(IDLE))
    }

    /// Idle → Running, or `None` if a run is already in flight.
    pub(crate) fn try_begin(&self) -> Option<RunGuard<'_>> {
        self.0
            .compare_exchange(IDLE, RUNNING, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| RunGuard { slot: self })
    }

    pub(crate) fn state(&self) -> RunState {
        match self.0.load(Ordering::Acquire) {
            RUNNING => RunState::Running,
            _ => RunState::Idle,
        }
    }
}

/// Holds a collector in the `Running` state.
#[derive(Debug)]
pub(crate) struct RunGuard<'a> {
    slot: &'a RunSlot,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.slot.0.store(IDLE, Ordering::Release);
    }
}
