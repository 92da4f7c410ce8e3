//! Entity identity and structural containment.
//!
//! An [`EntityKey`] is stable across every source in the load order: the
//! source that first defines a record plus the record's local id within it.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ConfigError;
use crate::source::SourceId;

/// Largest local id a record can carry (24 bits).
pub const MAX_LOCAL_ID: u32 = 0x00FF_FFFF;

/// Stable identifier of one logical entity across all sources.
///
/// The text form is six hex digits, a colon and the origin file name,
/// e.g. `"01A2B3:Skyrim.esm"`.
///
/// # Examples
///
/// ```
/// use navmesh_collector::EntityKey;
///
/// let key: EntityKey = "000D62:Skyrim.esm".parse().unwrap();
/// assert_eq!(key.local_id(), 0xD62);
/// assert_eq!(key.origin().to_string(), "Skyrim.esm");
/// assert_eq!(key.to_string(), "000D62:Skyrim.esm");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityKey {
    origin: SourceId,
    local_id: u32,
}

impl EntityKey {
    /// Creates a key; the local id is masked to 24 bits.
    #[must_use]
    pub fn new(local_id: u32, origin: SourceId) -> Self {
        Self {
            origin,
            local_id: local_id & MAX_LOCAL_ID,
        }
    }

    /// The local id within the origin source.
    #[must_use]
    pub const fn local_id(&self) -> u32 {
        self.local_id
    }

    /// The source that defines this entity.
    #[must_use]
    pub const fn origin(&self) -> &SourceId {
        &self.origin
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:06X}:{}", self.local_id, self.origin)
    }
}

impl FromStr for EntityKey {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: String| ConfigError::InvalidEntityKey {
            value: s.to_string(),
            reason,
        };

        let (id, origin) = s
            .split_once(':')
            .ok_or_else(|| invalid("expected '<hex id>:<plugin file>'".to_string()))?;
        let id = id
            .strip_prefix("0x")
            .or_else(|| id.strip_prefix("0X"))
            .unwrap_or(id);
        if id.is_empty() || id.len() > 6 || !id.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(invalid("local id must be 1 to 6 hex digits".to_string()));
        }
        let local_id = u32::from_str_radix(id, 16).map_err(|e| invalid(e.to_string()))?;
        let origin = SourceId::from_file_name(origin).map_err(|e| invalid(e.to_string()))?;

        Ok(Self::new(local_id, origin))
    }
}

impl Serialize for EntityKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for EntityKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Where an entity structurally lives.
///
/// Decided once by the record-resolution collaborator and carried on each
/// candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainmentKind {
    /// Inside an interior cell.
    Interior,
    /// Inside a worldspace (exterior cell).
    Exterior,
    /// Parent could not be classified.
    Unclassified,
}

impl fmt::Display for ContainmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Interior => write!(f, "interior"),
            Self::Exterior => write!(f, "exterior"),
            Self::Unclassified => write!(f, "unclassified"),
        }
    }
}
