//! User settings and the immutable per-run policy snapshot.
//!
//! [`Settings`] mirrors the persisted settings document (three groups) and
//! may be edited freely by its owner. A run never reads it directly: it
//! takes a deep copy as a [`Policy`] first and shares that read-only.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::entity::EntityKey;
use crate::error::ConfigError;

/// Worldspace restriction group.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldspaceSelection {
    /// Worldspaces to restrict output to. Accepted but not applied.
    pub selected_worldspaces: Vec<EntityKey>,
}

/// Cell inclusion group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CellSettings {
    /// Include navmeshes in interior cells.
    pub interior_cells: bool,
    /// Include navmeshes in exterior cells.
    pub exterior_cells: bool,
    /// Include navmeshes defined by non-base sources.
    pub modded_cells: bool,
}

impl Default for CellSettings {
    fn default() -> Self {
        Self {
            interior_cells: true,
            exterior_cells: true,
            modded_cells: true,
        }
    }
}

/// Override inclusion group.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverrideSettings {
    /// Include entities touched by a single source.
    pub include_singles: bool,
    /// Include entities whose every version is identical.
    pub include_identicals: bool,
    /// Include winners of no-conflict overrides.
    pub include_no_conflicts: bool,
    /// Include entities whose only non-base variant conflicts with base content.
    pub include_base_conflicts: bool,
    /// Include winners whose parent override is a base source.
    pub include_base_overrides: bool,
}

/// The settings document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Worldspace restriction.
    pub worldspace_selection: WorldspaceSelection,
    /// Cell inclusion switches.
    pub cell_settings: CellSettings,
    /// Override inclusion switches.
    pub override_settings: OverrideSettings,
}

impl Settings {
    /// Parses a settings document. Missing groups and fields take defaults.
    ///
    /// # Errors
    /// `ConfigError::Settings` if the document is not valid JSON or a field
    /// has the wrong type.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|e| ConfigError::Settings {
            message: e.to_string(),
        })
    }

    /// Renders the settings document as indented JSON.
    ///
    /// # Errors
    /// `ConfigError::Settings` if serialization fails.
    pub fn to_json(&self) -> Result<String, ConfigError> {
        serde_json::to_string_pretty(self).map_err(|e| ConfigError::Settings {
            message: e.to_string(),
        })
    }
}

/// Immutable snapshot of the switches that drive classification.
///
/// Taken once before a run and shared by reference with every
/// classification.
///
/// # Examples
///
/// ```
/// use navmesh_collector::{ConfigError, Policy};
///
/// let interior_only = Policy {
///     exterior_cells: false,
///     ..Policy::default()
/// };
/// assert!(interior_only.validate().is_ok());
///
/// let nothing = Policy {
///     interior_cells: false,
///     ..interior_only
/// };
/// assert!(matches!(nothing.validate(), Err(ConfigError::NoContainmentSelected)));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    /// Interior cells may be collected.
    pub interior_cells: bool,
    /// Exterior cells may be collected.
    pub exterior_cells: bool,
    /// Entities defined by non-base sources may be collected.
    pub modded_cells: bool,
    /// Collect entities touched by one source.
    pub include_singles: bool,
    /// Collect entities whose versions are all equal.
    pub include_identicals: bool,
    /// Collect winners of no-conflict overrides.
    pub include_no_conflicts: bool,
    /// Collect entities with a single non-base variant.
    pub include_base_conflicts: bool,
    /// Collect winners whose parent is a base source.
    pub include_base_overrides: bool,
    /// Inert: carried for completeness, never used to filter.
    pub selected_worldspaces: BTreeSet<EntityKey>,
}

impl Default for Policy {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

impl Policy {
    /// Deep-copies `settings` into a snapshot.
    #[must_use]
    pub fn from_settings(settings: &Settings) -> Self {
        let cells = settings.cell_settings;
        let overrides = settings.override_settings;
        Self {
            interior_cells: cells.interior_cells,
            exterior_cells: cells.exterior_cells,
            modded_cells: cells.modded_cells,
            include_singles: overrides.include_singles,
            include_identicals: overrides.include_identicals,
            include_no_conflicts: overrides.include_no_conflicts,
            include_base_conflicts: overrides.include_base_conflicts,
            include_base_overrides: overrides.include_base_overrides,
            selected_worldspaces: settings
                .worldspace_selection
                .selected_worldspaces
                .iter()
                .cloned()
                .collect(),
        }
    }

    /// Rejects policies under which nothing could ever be collected.
    ///
    /// # Errors
    /// `NoContainmentSelected` when interior and exterior cells are both off.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.interior_cells && !self.exterior_cells {
            return Err(ConfigError::NoContainmentSelected);
        }
        Ok(())
    }

    /// Returns true if a worldspace restriction was requested.
    #[must_use]
    pub fn has_worldspace_selection(&self) -> bool {
        !self.selected_worldspaces.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_document_schema() {
        let policy = Policy::default();
        assert!(policy.interior_cells);
        assert!(policy.exterior_cells);
        assert!(policy.modded_cells);
        assert!(!policy.include_singles);
        assert!(!policy.include_identicals);
        assert!(!policy.include_no_conflicts);
        assert!(!policy.include_base_conflicts);
        assert!(!policy.include_base_overrides);
        assert!(policy.selected_worldspaces.is_empty());
        assert!(policy.validate().is_ok());
    }

    #[test]
    fn partial_document_fills_defaults() {
        let settings = Settings::from_json(
            r#"{ "cell_settings": { "modded_cells": false }, "override_settings": { "include_singles": true } }"#,
        )
        .unwrap();
        assert!(settings.cell_settings.interior_cells);
        assert!(!settings.cell_settings.modded_cells);
        assert!(settings.override_settings.include_singles);
        assert!(!settings.override_settings.include_identicals);
        assert!(settings.worldspace_selection.selected_worldspaces.is_empty());
    }

    #[test]
    fn empty_document_is_default() {
        assert_eq!(Settings::from_json("{}").unwrap(), Settings::default());
    }

    #[test]
    fn bad_document_is_config_error() {
        let err = Settings::from_json(r#"{ "cell_settings": { "interior_cells": "yes" } }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Settings { .. }));

        let err = Settings::from_json(
            r#"{ "worldspace_selection": { "selected_worldspaces": ["not-a-key"] } }"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Settings { .. }));
    }

    #[test]
    fn document_roundtrip() {
        let mut settings = Settings::default();
        settings.override_settings.include_no_conflicts = true;
        settings
            .worldspace_selection
            .selected_worldspaces
            .push("00003C:Skyrim.esm".parse().unwrap());
        let json = settings.to_json().unwrap();
        assert!(json.contains("\"00003C:Skyrim.esm\""));
        assert_eq!(Settings::from_json(&json).unwrap(), settings);
    }

    #[test]
    fn snapshot_is_detached_from_settings() {
        let mut settings = Settings::default();
        let policy = Policy::from_settings(&settings);

        settings.cell_settings.interior_cells = false;
        settings.override_settings.include_singles = true;
        settings
            .worldspace_selection
            .selected_worldspaces
            .push("00003C:Skyrim.esm".parse().unwrap());

        assert!(policy.interior_cells);
        assert!(!policy.include_singles);
        assert!(!policy.has_worldspace_selection());
    }

    #[test]
    fn both_containments_disabled_is_rejected() {
        let mut settings = Settings::default();
        settings.cell_settings.interior_cells = false;
        settings.cell_settings.exterior_cells = false;
        let err = Policy::from_settings(&settings).validate().unwrap_err();
        assert!(matches!(err, ConfigError::NoContainmentSelected));

        settings.cell_settings.exterior_cells = true;
        assert!(Policy::from_settings(&settings).validate().is_ok());
    }
}
