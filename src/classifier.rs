//! Override classification: should an entity's winning version be collected?
//!
//! Seven gates are evaluated in a fixed order and the first one that fires
//! excludes the entity. Each gate is an independent necessary condition, so
//! the order only matters for how much work is done, never for the verdict.
//!
//! | # | Gate            | Excludes when                                          |
//! |---|-----------------|--------------------------------------------------------|
//! | 1 | base override   | parent source is base and base overrides are off       |
//! | 2 | containment     | interior/exterior switch is off for the entity's cell  |
//! | 3 | modded cells    | origin is not base and modded cells are off            |
//! | 4 | singles         | one source touches the entity and singles are off      |
//! | 5 | identicals      | every version is equal and identicals are off          |
//! | 6 | no conflict     | the chain is a no-conflict override and those are off  |
//! | 7 | base conflict   | one non-base variant remains and base conflicts are off|
//!
//! A singleton chain has no parent and no variants to compare, so only gates
//! 2 to 4 can exclude it.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::chain::OverrideChain;
use crate::entity::ContainmentKind;
use crate::policy::Policy;
use crate::source::BaseSources;

/// The gate that excluded an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Exclusion {
    /// The winning override sits directly on a base source.
    BaseOverride,
    /// Interior cells are disabled.
    InteriorCell,
    /// Exterior cells are disabled.
    ExteriorCell,
    /// The entity is defined by a non-base source and modded cells are disabled.
    ModdedCell,
    /// Only one source touches the entity.
    Single,
    /// Every version of the entity is identical.
    Identical,
    /// Later sources never revert to an earlier distinct value.
    NoConflict,
    /// Exactly one non-base variant remains after discounting base variants.
    BaseConflict,
}

impl Exclusion {
    /// Short stable identifier for logs and reports.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::BaseOverride => "base_override",
            Self::InteriorCell => "interior_cell",
            Self::ExteriorCell => "exterior_cell",
            Self::ModdedCell => "modded_cell",
            Self::Single => "single",
            Self::Identical => "identical",
            Self::NoConflict => "no_conflict",
            Self::BaseConflict => "base_conflict",
        }
    }
}

impl fmt::Display for Exclusion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Verdict for one entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "verdict", content = "reason")]
pub enum Decision {
    /// Collect the winning version.
    Include,
    /// Skip it; the payload names the first gate that fired.
    Exclude(Exclusion),
}

impl Decision {
    /// Returns true for [`Decision::Include`].
    #[must_use]
    pub const fn is_included(self) -> bool {
        matches!(self, Self::Include)
    }

    /// The exclusion reason, if excluded.
    #[must_use]
    pub const fn exclusion(self) -> Option<Exclusion> {
        match self {
            Self::Include => None,
            Self::Exclude(reason) => Some(reason),
        }
    }
}

/// Every fact the classifier derives from a chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainFacts {
    /// Number of sources touching the entity.
    pub override_count: usize,
    /// Number of distinct values among them.
    pub distinct_count: usize,
    /// Exactly one source touches the entity.
    pub is_singleton: bool,
    /// Two or more sources, all with the same value.
    pub is_fully_identical: bool,
    /// See [`crate::chain::is_non_conflicting`].
    pub is_no_conflict: bool,
    /// Two or more sources and exactly one non-base variant.
    pub is_base_only_conflict: bool,
    /// The parent source is a base source.
    pub is_from_base_source: bool,
}

impl ChainFacts {
    /// Computes all facts for `chain`.
    #[must_use]
    pub fn compute<V: PartialEq>(chain: &OverrideChain<V>, base_sources: &BaseSources) -> Self {
        let override_count = chain.len();
        let is_singleton = chain.is_singleton();
        let distinct_count = chain.distinct().len();
        Self {
            override_count,
            distinct_count,
            is_singleton,
            is_fully_identical: !is_singleton && distinct_count == 1,
            is_no_conflict: chain.is_no_conflict(),
            is_base_only_conflict: !is_singleton && chain.non_base_variants(base_sources) == 1,
            is_from_base_source: is_from_base_source(chain, base_sources),
        }
    }
}

fn is_from_base_source<V>(chain: &OverrideChain<V>, base_sources: &BaseSources) -> bool {
    chain
        .parent()
        .is_some_and(|parent| base_sources.contains(&parent.source))
}

/// Runs the gates in order and reports the first exclusion.
///
/// `is_winner_from_base_source` is true when the source that defines the
/// entity (its key's origin) is a base source.
#[must_use]
pub fn evaluate<V: PartialEq>(
    chain: &OverrideChain<V>,
    containment: ContainmentKind,
    is_winner_from_base_source: bool,
    policy: &Policy,
    base_sources: &BaseSources,
) -> Decision {
    use Decision::Exclude;

    if !policy.include_base_overrides && is_from_base_source(chain, base_sources) {
        return Exclude(Exclusion::BaseOverride);
    }

    match containment {
        ContainmentKind::Interior if !policy.interior_cells => return Exclude(Exclusion::InteriorCell),
        ContainmentKind::Exterior if !policy.exterior_cells => return Exclude(Exclusion::ExteriorCell),
        _ => {}
    }

    // Worldspace selection is not applied.

    if !policy.modded_cells && !is_winner_from_base_source {
        return Exclude(Exclusion::ModdedCell);
    }

    if chain.is_singleton() {
        return if policy.include_singles {
            Decision::Include
        } else {
            Exclude(Exclusion::Single)
        };
    }

    let distinct = chain.distinct();
    if !policy.include_identicals && distinct.len() == 1 {
        return Exclude(Exclusion::Identical);
    }

    if !policy.include_no_conflicts && chain.is_no_conflict() {
        return Exclude(Exclusion::NoConflict);
    }

    let base_variants = distinct
        .iter()
        .filter(|entry| base_sources.contains(&entry.source))
        .count();
    if !policy.include_base_conflicts && distinct.len() - base_variants == 1 {
        return Exclude(Exclusion::BaseConflict);
    }

    Decision::Include
}

/// Decides whether the winning version of the entity should be collected.
#[must_use]
pub fn classify<V: PartialEq>(
    chain: &OverrideChain<V>,
    containment: ContainmentKind,
    is_winner_from_base_source: bool,
    policy: &Policy,
    base_sources: &BaseSources,
) -> bool {
    evaluate(chain, containment, is_winner_from_base_source, policy, base_sources).is_included()
}
