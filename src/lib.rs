//! # navmesh-collector
//!
//! Decides which winning navmesh overrides in a plugin load order deserve to
//! be carried into a merged output, based on how the sources that touch each
//! navmesh agree or disagree.
//!
//! ## Core Concepts
//!
//! - **Source**: a plugin file in the load order; some are privileged *base* sources
//! - **Override chain**: every version of one entity, lowest priority first
//! - **Classifier**: seven ordered gates that include or exclude the winner
//! - **Collector**: walks the candidates, classifies each, accumulates winners
//! - **Policy**: an immutable snapshot of the user's switches, taken per run
//!
//! ## Usage
//!
//! ```rust
//! use navmesh_collector::{
//!     BaseSources, Collector, ContainmentKind, EntityKey, InMemoryLoadOrder, MemorySink, Settings,
//!     SourceId,
//! };
//!
//! let skyrim: SourceId = "Skyrim.esm".parse()?;
//! let mod_a: SourceId = "BetterCaves.esp".parse()?;
//! let mod_b: SourceId = "NavFixes.esp".parse()?;
//!
//! let mut load_order = InMemoryLoadOrder::with_sources([skyrim.clone(), mod_a.clone(), mod_b.clone()]);
//! let key: EntityKey = "0A1B2C:Skyrim.esm".parse()?;
//! load_order.insert(&skyrim, &key, ContainmentKind::Interior, "vanilla")?;
//! load_order.insert(&mod_a, &key, ContainmentKind::Interior, "caves")?;
//! load_order.insert(&mod_b, &key, ContainmentKind::Interior, "fixes")?;
//!
//! let sink = MemorySink::new();
//! let report = Collector::default().run(
//!     &Settings::default(),
//!     load_order.candidates(),
//!     &load_order,
//!     &BaseSources::official(),
//!     &sink,
//! )?;
//! assert_eq!(report.collected, 1);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod chain;
pub mod classifier;
pub mod collector;
pub mod entity;
pub mod error;
pub mod output;
pub mod policy;
pub mod resolution;
pub mod source;

// Re-export primary types at crate root for convenience
pub use chain::{is_non_conflicting, OverrideChain, OverrideEntry};
pub use classifier::{classify, evaluate, ChainFacts, Decision, Exclusion};
pub use collector::{
    CollectedRecord, CollectionResult, Collector, CollectorConfig, RunReport, RunState,
};
pub use entity::{ContainmentKind, EntityKey};
pub use error::{
    ChainError, CollectorError, CollectorResult, ConfigError, OutputError, ResolutionError,
};
pub use output::{JsonFileSink, MemorySink, OutputLock, OutputReceipt, OutputSink};
pub use policy::{CellSettings, OverrideSettings, Policy, Settings, WorldspaceSelection};
pub use resolution::{Candidate, ChainResolver, InMemoryLoadOrder};
pub use source::{
    load_creation_listings, parse_creation_listings, BaseSources, SourceId, SourceKind,
};
