//! In-memory load order.
//!
//! Holds each source's records in load order and answers candidate and
//! chain queries the way a real link cache would: the highest-priority
//! source that touches a key wins, and the chain lists every source that
//! touches it, lowest priority first.

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::chain::{OverrideChain, OverrideEntry};
use crate::entity::{ContainmentKind, EntityKey};
use crate::error::{ConfigError, ResolutionError};
use crate::resolution::traits::{Candidate, ChainResolver};
use crate::source::SourceId;

#[derive(Debug, Clone)]
struct Record<V> {
    containment: ContainmentKind,
    value: V,
}

/// A load order held entirely in memory.
///
/// # Examples
///
/// ```
/// use navmesh_collector::{ContainmentKind, EntityKey, InMemoryLoadOrder, SourceId};
///
/// let skyrim: SourceId = "Skyrim.esm".parse().unwrap();
/// let fix: SourceId = "NavFix.esp".parse().unwrap();
///
/// let mut load_order = InMemoryLoadOrder::new();
/// load_order.push_source(skyrim.clone()).unwrap();
/// load_order.push_source(fix.clone()).unwrap();
///
/// let key: EntityKey = "0A1B2C:Skyrim.esm".parse().unwrap();
/// load_order.insert(&skyrim, &key, ContainmentKind::Interior, "vanilla").unwrap();
/// load_order.insert(&fix, &key, ContainmentKind::Interior, "fixed").unwrap();
///
/// let candidates = load_order.candidates();
/// assert_eq!(candidates.len(), 1);
/// assert_eq!(candidates[0].value, "fixed");
/// ```
#[derive(Debug, Clone)]
pub struct InMemoryLoadOrder<V> {
    /// Lowest priority first.
    sources: Vec<SourceId>,
    records: HashMap<SourceId, BTreeMap<EntityKey, Record<V>>>,
    unreadable: HashMap<EntityKey, String>,
}

impl<V> Default for InMemoryLoadOrder<V> {
    fn default() -> Self {
        Self {
            sources: Vec::new(),
            records: HashMap::new(),
            unreadable: HashMap::new(),
        }
    }
}

impl<V> InMemoryLoadOrder<V> {
    /// An empty load order.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a load order from sources listed lowest priority first.
    ///
    /// Duplicate sources are ignored (first occurrence wins).
    #[must_use]
    pub fn with_sources(sources: impl IntoIterator<Item = SourceId>) -> Self {
        let mut seen = HashSet::new();
        let sources = sources
            .into_iter()
            .filter(|source| seen.insert(source.clone()))
            .collect();
        Self {
            sources,
            ..Self::default()
        }
    }

    /// Appends `source` at the highest priority.
    ///
    /// # Errors
    /// `InvalidSourceName` if `source` is already in the load order.
    pub fn push_source(&mut self, source: SourceId) -> Result<(), ConfigError> {
        if self.sources.contains(&source) {
            return Err(ConfigError::InvalidSourceName {
                name: source.to_string(),
                reason: "already in the load order".to_string(),
            });
        }
        self.sources.push(source);
        Ok(())
    }

    /// Sources, lowest priority first.
    #[must_use]
    pub fn sources(&self) -> &[SourceId] {
        &self.sources
    }

    /// Records that `source` defines or overrides `key`.
    ///
    /// A later insert for the same `(source, key)` replaces the earlier one.
    ///
    /// # Errors
    /// `InvalidSourceName` if `source` is not in the load order.
    pub fn insert(
        &mut self,
        source: &SourceId,
        key: &EntityKey,
        containment: ContainmentKind,
        value: V,
    ) -> Result<(), ConfigError> {
        if !self.sources.contains(source) {
            return Err(ConfigError::InvalidSourceName {
                name: source.to_string(),
                reason: "not in the load order".to_string(),
            });
        }
        self.records
            .entry(source.clone())
            .or_default()
            .insert(key.clone(), Record { containment, value });
        Ok(())
    }

    /// Makes chain resolution for `key` fail with a backend error.
    pub fn mark_unreadable(&mut self, key: &EntityKey, message: impl Into<String>) {
        self.unreadable.insert(key.clone(), message.into());
    }
}

impl<V: Clone> InMemoryLoadOrder<V> {
    /// Winning versions, one per entity, highest-priority source first.
    #[must_use]
    pub fn candidates(&self) -> Vec<Candidate<V>> {
        let mut seen: HashSet<&EntityKey> = HashSet::new();
        let mut out = Vec::new();
        for source in self.sources.iter().rev() {
            let Some(records) = self.records.get(source) else {
                continue;
            };
            for (key, record) in records {
                if seen.insert(key) {
                    out.push(Candidate {
                        key: key.clone(),
                        winner: source.clone(),
                        value: record.value.clone(),
                        containment: record.containment,
                    });
                }
            }
        }
        out
    }
}

impl<V: Clone + Send + Sync> ChainResolver<V> for InMemoryLoadOrder<V> {
    fn resolve_chain(&self, key: &EntityKey) -> Result<OverrideChain<V>, ResolutionError> {
        if let Some(message) = self.unreadable.get(key) {
            return Err(ResolutionError::Backend {
                key: key.clone(),
                message: message.clone(),
            });
        }

        let entries: Vec<OverrideEntry<V>> = self
            .sources
            .iter()
            .filter_map(|source| {
                self.records
                    .get(source)
                    .and_then(|records| records.get(key))
                    .map(|record| OverrideEntry::new(source.clone(), record.value.clone()))
            })
            .collect();

        if entries.is_empty() {
            return Err(ResolutionError::NotFound { key: key.clone() });
        }

        OverrideChain::new(entries).map_err(|source| ResolutionError::Malformed {
            key: key.clone(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sid(name: &str) -> SourceId {
        SourceId::from_file_name(name).unwrap()
    }

    fn key(s: &str) -> EntityKey {
        s.parse().unwrap()
    }

    fn load_order() -> InMemoryLoadOrder<&'static str> {
        let mut lo = InMemoryLoadOrder::with_sources([sid("Skyrim.esm"), sid("Update.esm"), sid("Mod.esp")]);
        let a = key("000001:Skyrim.esm");
        let b = key("000002:Skyrim.esm");
        let c = key("000800:Mod.esp");
        lo.insert(&sid("Skyrim.esm"), &a, ContainmentKind::Interior, "a0").unwrap();
        lo.insert(&sid("Update.esm"), &a, ContainmentKind::Interior, "a1").unwrap();
        lo.insert(&sid("Mod.esp"), &a, ContainmentKind::Interior, "a2").unwrap();
        lo.insert(&sid("Skyrim.esm"), &b, ContainmentKind::Exterior, "b0").unwrap();
        lo.insert(&sid("Mod.esp"), &c, ContainmentKind::Exterior, "c0").unwrap();
        lo
    }

    #[test]
    fn candidates_are_winners_in_priority_order() {
        let candidates = load_order().candidates();
        let summary: Vec<(String, String, &str)> = candidates
            .iter()
            .map(|c| (c.key.to_string(), c.winner.to_string(), c.value))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("000800:Mod.esp".to_string(), "Mod.esp".to_string(), "c0"),
                ("000001:Skyrim.esm".to_string(), "Mod.esp".to_string(), "a2"),
                ("000002:Skyrim.esm".to_string(), "Skyrim.esm".to_string(), "b0"),
            ]
        );
    }

    #[test]
    fn chain_lists_every_source_lowest_first() {
        let chain = load_order().resolve_chain(&key("000001:Skyrim.esm")).unwrap();
        let sources: Vec<String> = chain.entries().iter().map(|e| e.source.to_string()).collect();
        assert_eq!(sources, vec!["Skyrim.esm", "Update.esm", "Mod.esp"]);
        assert_eq!(chain.winner().value, "a2");
    }

    #[test]
    fn unknown_key_is_not_found() {
        let err = load_order().resolve_chain(&key("00FFFF:Skyrim.esm")).unwrap_err();
        assert!(matches!(err, ResolutionError::NotFound { .. }));
    }

    #[test]
    fn unreadable_key_reports_backend_error() {
        let mut lo = load_order();
        lo.mark_unreadable(&key("000002:Skyrim.esm"), "corrupt subrecord");
        let err = lo.resolve_chain(&key("000002:Skyrim.esm")).unwrap_err();
        assert!(matches!(err, ResolutionError::Backend { ref message, .. } if message == "corrupt subrecord"));
    }

    #[test]
    fn insert_requires_known_source() {
        let mut lo = load_order();
        let err = lo
            .insert(&sid("Unknown.esp"), &key("000001:Skyrim.esm"), ContainmentKind::Interior, "x")
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidSourceName { .. }));
        assert!(lo.push_source(sid("mod.ESP")).is_err());
    }

    #[test]
    fn with_sources_deduplicates() {
        let lo: InMemoryLoadOrder<u8> = InMemoryLoadOrder::with_sources([sid("A.esm"), sid("B.esp"), sid("a.esm")]);
        assert_eq!(lo.sources().len(), 2);
    }
}
