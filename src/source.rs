//! Source identifiers and the privileged base source set.
//!
//! A source is one plugin file in the load order. Sources are identified by
//! their file name; comparison is ASCII case-insensitive, matching how the
//! game itself resolves plugin names.

use std::collections::HashSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::warn;

use crate::error::ConfigError;

/// The kind of plugin file, derived from its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// `.esm` master file.
    Master,
    /// `.esp` plugin file.
    Plugin,
    /// `.esl` light master file.
    Light,
}

impl SourceKind {
    /// File extension for this kind, without the dot.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Master => "esm",
            Self::Plugin => "esp",
            Self::Light => "esl",
        }
    }

    fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "esm" => Some(Self::Master),
            "esp" => Some(Self::Plugin),
            "esl" => Some(Self::Light),
            _ => None,
        }
    }
}

/// Identifier of a data source (a plugin file).
///
/// # Examples
///
/// ```
/// use navmesh_collector::SourceId;
///
/// let a: SourceId = "Skyrim.esm".parse().unwrap();
/// let b: SourceId = "skyrim.ESM".parse().unwrap();
/// assert_eq!(a, b);
/// assert_eq!(a.to_string(), "Skyrim.esm");
/// ```
#[derive(Debug, Clone)]
pub struct SourceId {
    name: String,
    kind: SourceKind,
}

impl SourceId {
    /// Parses a plugin file name such as `Dawnguard.esm`.
    ///
    /// # Errors
    /// `InvalidSourceName` for paths, empty stems, and extensions other
    /// than `.esm`, `.esp` or `.esl`.
    pub fn from_file_name(file_name: &str) -> Result<Self, ConfigError> {
        let invalid = |reason: &str| ConfigError::InvalidSourceName {
            name: file_name.to_string(),
            reason: reason.to_string(),
        };

        if file_name.contains(['/', '\\']) {
            return Err(invalid("must be a bare file name"));
        }
        let Some((stem, ext)) = file_name.rsplit_once('.') else {
            return Err(invalid("missing extension"));
        };
        if stem.trim().is_empty() {
            return Err(invalid("empty name"));
        }
        let kind = SourceKind::from_extension(ext)
            .ok_or_else(|| invalid("extension must be .esm, .esp or .esl"))?;

        Ok(Self {
            name: stem.to_string(),
            kind,
        })
    }

    /// Returns the file name without its extension.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the plugin kind.
    #[must_use]
    pub const fn kind(&self) -> SourceKind {
        self.kind
    }

    /// Returns the full file name, e.g. `Update.esm`.
    #[must_use]
    pub fn file_name(&self) -> String {
        format!("{}.{}", self.name, self.kind.extension())
    }
}

impl PartialEq for SourceId {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.name.eq_ignore_ascii_case(&other.name)
    }
}

impl Eq for SourceId {}

impl Hash for SourceId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for byte in self.name.bytes() {
            state.write_u8(byte.to_ascii_lowercase());
        }
        self.kind.hash(state);
    }
}

impl PartialOrd for SourceId {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SourceId {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        let lhs = self.name.bytes().map(|b| b.to_ascii_lowercase());
        let rhs = other.name.bytes().map(|b| b.to_ascii_lowercase());
        lhs.cmp(rhs)
            .then_with(|| self.kind.extension().cmp(other.kind.extension()))
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.name, self.kind.extension())
    }
}

impl FromStr for SourceId {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_file_name(s)
    }
}

impl Serialize for SourceId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SourceId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::from_file_name(&raw).map_err(serde::de::Error::custom)
    }
}

/// First-party masters shipped with the game.
pub const OFFICIAL_MASTERS: [&str; 5] = [
    "Skyrim.esm",
    "Update.esm",
    "Dawnguard.esm",
    "Dragonborn.esm",
    "HearthFires.esm",
];

/// The privileged ("base") source set.
///
/// Built once per run and shared read-only by every classification.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BaseSources(HashSet<SourceId>);

impl BaseSources {
    /// An empty base set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The first-party masters.
    #[must_use]
    pub fn official() -> Self {
        OFFICIAL_MASTERS
            .iter()
            .filter_map(|name| SourceId::from_file_name(name).ok())
            .collect()
    }

    /// Returns the union of this set with `creation_sources`.
    ///
    /// Creation content is treated as base content by every gate.
    #[must_use]
    pub fn with_creation_sources(mut self, creation_sources: impl IntoIterator<Item = SourceId>) -> Self {
        self.0.extend(creation_sources);
        self
    }

    /// Returns true if `source` is a base source.
    #[must_use]
    pub fn contains(&self, source: &SourceId) -> bool {
        self.0.contains(source)
    }

    /// Number of base sources.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if there are no base sources.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates the base sources in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &SourceId> {
        self.0.iter()
    }
}

impl FromIterator<SourceId> for BaseSources {
    fn from_iter<I: IntoIterator<Item = SourceId>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Parses a creation-content listings file body.
///
/// One plugin file name per line. Blank lines and lines that are not valid
/// plugin file names are skipped.
#[must_use]
pub fn parse_creation_listings(contents: &str) -> HashSet<SourceId> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(|line| SourceId::from_file_name(line).ok())
        .collect()
}

/// Loads the creation-content listings file at `path`.
///
/// A missing file yields an empty set. An unreadable file is logged and also
/// yields an empty set; it never aborts a run.
#[must_use]
pub fn load_creation_listings(path: &Path) -> HashSet<SourceId> {
    if !path.exists() {
        return HashSet::new();
    }
    match std::fs::read_to_string(path) {
        Ok(contents) => parse_creation_listings(&contents),
        Err(err) => {
            warn!(path = %path.display(), error = %err, "could not read creation listings");
            HashSet::new()
        }
    }
}
