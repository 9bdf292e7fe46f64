//! Structured `type:name` identity.
//!
//! The string form `type:name` is the external key everywhere (manifest map,
//! dependency references, tracker map, CLI arguments). Internally the pair is
//! kept structured so comparisons never depend on string splitting.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use super::{CapmError, ItemType};

/// Unique identity of a registry item.
///
/// Ordering is lexicographic on the canonical string form. No type name is a
/// prefix of another, so comparing `(type, name)` as strings gives the same
/// result as comparing `"type:name"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ItemId {
    item_type: ItemType,
    name: String,
}

impl ItemId {
    pub fn new(item_type: ItemType, name: impl Into<String>) -> Self {
        Self {
            item_type,
            name: name.into(),
        }
    }

    #[must_use]
    pub const fn item_type(&self) -> ItemType {
        self.item_type
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Whether `name` can be used as a single path component of an install
/// destination: no separators, no `..`, no drive prefix.
#[must_use]
pub fn is_path_safe_name(name: &str) -> bool {
    !name.trim().is_empty() && !name.contains(['/', '\\', ':']) && !name.contains("..")
}

impl Ord for ItemId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.item_type
            .as_str()
            .cmp(other.item_type.as_str())
            .then_with(|| self.name.cmp(&other.name))
    }
}

impl PartialOrd for ItemId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.item_type, self.name)
    }
}

impl FromStr for ItemId {
    type Err = CapmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| CapmError::InvalidItemId {
            id: s.to_string(),
            reason: reason.to_string(),
        };

        let (type_part, name_part) =
            s.trim().split_once(':').ok_or_else(|| invalid("expected the form type:name"))?;
        let item_type = type_part.parse::<ItemType>().map_err(|_| {
            invalid(&format!("unknown item type '{type_part}'"))
        })?;
        let name = name_part.trim();
        if name.is_empty() {
            return Err(invalid("name is empty"));
        }
        Ok(Self::new(item_type, name))
    }
}

impl Serialize for ItemId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ItemId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
