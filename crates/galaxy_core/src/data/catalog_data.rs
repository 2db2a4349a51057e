//! Catalog file layout.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Attribute name to value.
///
/// Values are decimals at the data boundary only; they become fixed-point
/// when the catalog is built.
pub type AttributeMap = BTreeMap<String, f64>;

/// Balance numbers for one entity type.
///
/// # Example RON
///
/// ```ron
/// (
///     attributes: { "max_level": 3, "size": 3 },
///     levels: {
///         1: { "attack_power": 10, "training_time": 60 },
///         2: { "attack_power": 20, "training_time": 90 },
///     },
/// )
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TypeData {
    /// Values that do not depend on level.
    #[serde(default)]
    pub attributes: AttributeMap,

    /// Per-level values. A level value shadows a level-independent one.
    #[serde(default)]
    pub levels: BTreeMap<u32, AttributeMap>,
}

impl TypeData {
    /// Highest level with an entry.
    #[must_use]
    pub fn highest_level(&self) -> Option<u32> {
        self.levels.keys().next_back().copied()
    }
}

/// Complete catalog document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogData {
    /// Building types keyed by catalog name (`"farm"`, `"barrack"`, ...).
    #[serde(default)]
    pub buildings: BTreeMap<String, TypeData>,

    /// Attack unit types keyed by catalog name (`"space_marine"`, ...).
    #[serde(default)]
    pub units: BTreeMap<String, TypeData>,

    /// Spaceship types; levels follow the spaceport level.
    #[serde(default)]
    pub spaceships: BTreeMap<String, TypeData>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_type_data() {
        let text = r#"(
            attributes: { "max_level": 2 },
            levels: { 1: { "build_cost": 50 }, 2: { "build_cost": 400.5 } },
        )"#;
        let data: TypeData = ron::from_str(text).unwrap();
        assert_eq!(data.attributes["max_level"], 2.0);
        assert_eq!(data.levels[&2]["build_cost"], 400.5);
        assert_eq!(data.highest_level(), Some(2));
    }

    #[test]
    fn test_missing_sections_default() {
        let data: CatalogData = ron::from_str("(units: {})").unwrap();
        assert!(data.buildings.is_empty());
        assert!(data.spaceships.is_empty());
    }
}
