//! Contracts consumed from the record-resolution collaborator.

use serde::{Deserialize, Serialize};

use crate::chain::OverrideChain;
use crate::entity::{ContainmentKind, EntityKey};
use crate::error::ResolutionError;
use crate::source::SourceId;

/// One entity's winning version, as enumerated by the load order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate<V> {
    /// Stable entity identity.
    pub key: EntityKey,
    /// The source supplying the winning version.
    pub winner: SourceId,
    /// The winning value.
    pub value: V,
    /// Where the entity lives.
    pub containment: ContainmentKind,
}

impl<V> Candidate<V> {
    /// The source that defines the entity.
    #[must_use]
    pub const fn origin(&self) -> &SourceId {
        self.key.origin()
    }
}

/// Produces the full override chain for an entity.
///
/// # Contract
/// - The chain lists every source that defines or overrides `key`, lowest
///   priority first.
/// - Implementations must be safe to call concurrently from worker threads.
pub trait ChainResolver<V>: Send + Sync {
    /// Resolves all versions of `key` across the load order.
    ///
    /// # Errors
    /// `NotFound` if no source touches `key`, `Malformed` if the versions do
    /// not form a valid chain, `Backend` if the records cannot be read.
    fn resolve_chain(&self, key: &EntityKey) -> Result<OverrideChain<V>, ResolutionError>;
}

impl<V, R: ChainResolver<V> + ?Sized> ChainResolver<V> for &R {
    fn resolve_chain(&self, key: &EntityKey) -> Result<OverrideChain<V>, ResolutionError> {
        (**self).resolve_chain(key)
    }
}
