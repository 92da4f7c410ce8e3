//! Record resolution: where candidates and override chains come from.
//!
//! The collector does not parse plugins or decide winners. It consumes
//! [`Candidate`]s and asks a [`ChainResolver`] for each candidate's chain.
//! [`InMemoryLoadOrder`] is a reference implementation for tests and
//! embedded use.

mod memory;
mod traits;

pub use memory::InMemoryLoadOrder;
pub use traits::{Candidate, ChainResolver};
