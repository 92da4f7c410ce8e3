//! Override chains: every version of one entity across the load order.
//!
//! A chain lists `(source, value)` pairs from lowest to highest priority.
//! The last entry is the winner; the entry just below it is the parent.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::ChainError;
use crate::source::{BaseSources, SourceId};

/// One source's version of an entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverrideEntry<V> {
    /// The source that defines or overrides the entity.
    pub source: SourceId,
    /// The entity's data as that source defines it.
    pub value: V,
}

impl<V> OverrideEntry<V> {
    /// Creates an entry.
    #[must_use]
    pub fn new(source: SourceId, value: V) -> Self {
        Self { source, value }
    }
}

/// A validated override chain.
///
/// - Never empty.
/// - Each source appears at most once.
/// - Ordered lowest → highest priority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct OverrideChain<V>(Vec<OverrideEntry<V>>);

impl<V> OverrideChain<V> {
    /// Validates and wraps `entries`.
    ///
    /// # Errors
    /// `Empty` for no entries, `DuplicateSource` if a source repeats.
    pub fn new(entries: Vec<OverrideEntry<V>>) -> Result<Self, ChainError> {
        if entries.is_empty() {
            return Err(ChainError::Empty);
        }

        let mut seen: HashSet<&SourceId> = HashSet::with_capacity(entries.len());
        for entry in &entries {
            if !seen.insert(&entry.source) {
                return Err(ChainError::DuplicateSource {
                    source_id: entry.source.clone(),
                });
            }
        }

        Ok(Self(entries))
    }

    /// Builds a chain from `(source, value)` pairs.
    ///
    /// # Errors
    /// Same as [`OverrideChain::new`].
    pub fn from_pairs(pairs: impl IntoIterator<Item = (SourceId, V)>) -> Result<Self, ChainError> {
        Self::new(
            pairs
                .into_iter()
                .map(|(source, value)| OverrideEntry::new(source, value))
                .collect(),
        )
    }

    /// Entries, lowest priority first.
    #[must_use]
    pub fn entries(&self) -> &[OverrideEntry<V>] {
        &self.0
    }

    /// Number of sources touching the entity. Always at least one.
    #[must_use]
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when a single source touches the entity.
    #[must_use]
    pub fn is_singleton(&self) -> bool {
        self.0.len() == 1
    }

    /// The lowest-priority entry.
    #[must_use]
    pub fn origin(&self) -> &OverrideEntry<V> {
        &self.0[0]
    }

    /// The highest-priority (winning) entry.
    #[must_use]
    pub fn winner(&self) -> &OverrideEntry<V> {
        &self.0[self.0.len() - 1]
    }

    /// The entry directly below the winner, if any.
    #[must_use]
    pub fn parent(&self) -> Option<&OverrideEntry<V>> {
        self.0.len().checked_sub(2).map(|idx| &self.0[idx])
    }

    /// Consumes the chain, returning its entries.
    #[must_use]
    pub fn into_entries(self) -> Vec<OverrideEntry<V>> {
        self.0
    }
}

impl<V: PartialEq> OverrideChain<V> {
    /// Entries deduplicated by value; first occurrence wins, order kept.
    #[must_use]
    pub fn distinct(&self) -> Vec<&OverrideEntry<V>> {
        let mut distinct: Vec<&OverrideEntry<V>> = Vec::with_capacity(self.0.len());
        for entry in &self.0 {
            if !distinct.iter().any(|seen| seen.value == entry.value) {
                distinct.push(entry);
            }
        }
        distinct
    }

    /// Whether the chain's values form a no-conflict override.
    ///
    /// See [`is_non_conflicting`].
    #[must_use]
    pub fn is_no_conflict(&self) -> bool {
        let values: Vec<&V> = self.0.iter().map(|entry| &entry.value).collect();
        is_non_conflicting(&values)
    }

    /// Number of distinct variants that do not come from a base source.
    #[must_use]
    pub fn non_base_variants(&self, base_sources: &BaseSources) -> usize {
        self.distinct()
            .into_iter()
            .filter(|entry| !base_sources.contains(&entry.source))
            .count()
    }
}

impl<'de, V: Deserialize<'de>> Deserialize<'de> for OverrideChain<V> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = Vec::<OverrideEntry<V>>::deserialize(deserializer)?;
        OverrideChain::new(raw).map_err(serde::de::Error::custom)
    }
}

/// Two-value alternation test over a priority-ordered sequence.
///
/// - An empty sequence is never non-conflicting.
/// - Any sequence of exactly two items is non-conflicting, equal or not.
/// - Otherwise there must be exactly two distinct values, and once the
///   second distinct value appears the first may not reappear.
#[must_use]
pub fn is_non_conflicting<T: PartialEq>(items: &[T]) -> bool {
    match items.len() {
        0 => return false,
        2 => return true,
        _ => {}
    }

    let first = &items[0];
    let Some(second) = items.iter().find(|item| *item != first) else {
        return false;
    };
    if items.iter().any(|item| item != first && item != second) {
        return false;
    }

    let mut found_second = false;
    for item in items {
        if item == second {
            found_second = true;
        } else if found_second && item == first {
            return false;
        }
    }
    true
}
