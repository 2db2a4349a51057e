//! Property catalog: static balance numbers keyed by type and level.
//!
//! The catalog is built once from a [`CatalogData`] document and never
//! mutated afterwards. Every lookup that misses is a
//! [`GameError::PropertyNotFound`], which callers propagate as a
//! configuration fault rather than recover from.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::buildings::BuildingKind;
use crate::data::{CatalogData, TypeData};
use crate::error::{GameError, Result};
use crate::math::Fixed;
use crate::units::UnitKind;

/// Default balance table shipped with the engine.
const BUILTIN_CATALOG: &str = include_str!("../data/catalog.ron");

/// Catalog name of the (single) spaceship type.
pub const SPACESHIP_TYPE: &str = "spaceship";

/// Attribute names the engine reads.
pub mod attr {
    /// Highest level a type can reach (level-independent).
    pub const MAX_LEVEL: &str = "max_level";
    /// Materials to build (level 1) or upgrade into this level.
    pub const BUILD_COST: &str = "build_cost";
    /// Construction seconds to reach this level.
    pub const UPGRADE_TIME: &str = "upgrade_time";
    /// Farm/Mine output per hour.
    pub const PRODUCTION_RATE: &str = "production_rate";
    /// Farm/Mine storage.
    pub const CAPACITY: &str = "capacity";
    /// Barrack storage in unit size.
    pub const MAX_CAPACITY: &str = "max_capacity";
    /// Space a unit occupies (level-independent).
    pub const SIZE: &str = "size";
    /// Upper bound of the unit's dice roll.
    pub const ATTACK_POWER: &str = "attack_power";
    /// Upkeep per hour.
    pub const RATIONS_PER_HOUR: &str = "rations_per_hour";
    /// Seconds in the training queue.
    pub const TRAINING_TIME: &str = "training_time";
    /// Rations to queue one unit.
    pub const TRAINING_COST: &str = "training_cost";
    /// Materials to raise a barrack's unit type into this level.
    pub const UPGRADE_COST: &str = "upgrade_cost";
    /// Spaceship speed multiplier.
    pub const TRAVEL_SPEED_FACTOR: &str = "travel_speed_factor";
    /// Spaceship troop space in unit size.
    pub const UNIT_CAPACITY: &str = "unit_capacity";
    /// Spaceship rations + materials space.
    pub const RESOURCE_CAPACITY: &str = "resource_capacity";
}

/// Top-level grouping of catalog entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    /// Buildings.
    Building,
    /// Attack units.
    Unit,
    /// Spaceships.
    Spaceship,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Building => f.write_str("building"),
            Self::Unit => f.write_str("unit"),
            Self::Spaceship => f.write_str("spaceship"),
        }
    }
}

/// Fixed-point values for one type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct TypeTable {
    attributes: BTreeMap<String, Fixed>,
    levels: BTreeMap<u32, BTreeMap<String, Fixed>>,
}

impl TypeTable {
    fn from_data(category: Category, name: &str, data: &TypeData) -> Result<Self> {
        let convert = |values: &BTreeMap<String, f64>, level: Option<u32>| {
            values
                .iter()
                .map(|(key, &raw)| {
                    let value = Fixed::checked_from_num(raw)
                        .filter(|v| *v >= Fixed::ZERO)
                        .ok_or_else(|| {
                            GameError::CatalogInvalid(format!(
                                "{category}/{name} level {level:?} '{key}' = {raw} is not a \
                                 non-negative finite number in range"
                            ))
                        })?;
                    Ok((key.clone(), value))
                })
                .collect::<Result<BTreeMap<_, _>>>()
        };

        let attributes = convert(&data.attributes, None)?;
        let levels = data
            .levels
            .iter()
            .map(|(&level, values)| Ok((level, convert(values, Some(level))?)))
            .collect::<Result<BTreeMap<_, _>>>()?;
        Ok(Self { attributes, levels })
    }
}

/// A value the engine needs that the catalog does not define.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogIssue {
    /// Category searched.
    pub category: Category,
    /// Type name searched.
    pub type_name: String,
    /// Level, when the value is level-specific.
    pub level: Option<u32>,
    /// Missing attribute.
    pub attribute: String,
}

impl fmt::Display for CatalogIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.level {
            Some(level) => write!(
                f,
                "{}/{} level {}: missing '{}'",
                self.category, self.type_name, level, self.attribute
            ),
            None => write!(
                f,
                "{}/{}: missing '{}'",
                self.category, self.type_name, self.attribute
            ),
        }
    }
}

/// Immutable lookup of balance numbers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertyCatalog {
    tables: BTreeMap<Category, BTreeMap<String, TypeTable>>,
}

impl PropertyCatalog {
    /// Build the catalog from a parsed document.
    ///
    /// # Errors
    ///
    /// Fails with [`GameError::CatalogInvalid`] on negative, non-finite or
    /// out-of-range numbers.
    pub fn from_data(data: &CatalogData) -> Result<Self> {
        let mut tables = BTreeMap::new();
        for (category, entries) in [
            (Category::Building, &data.buildings),
            (Category::Unit, &data.units),
            (Category::Spaceship, &data.spaceships),
        ] {
            let converted = entries
                .iter()
                .map(|(name, entry)| Ok((name.clone(), TypeTable::from_data(category, name, entry)?)))
                .collect::<Result<BTreeMap<_, _>>>()?;
            tables.insert(category, converted);
        }
        Ok(Self { tables })
    }

    /// Parse a RON catalog document.
    ///
    /// # Errors
    ///
    /// Fails with [`GameError::CatalogInvalid`] on syntax or value errors.
    pub fn from_ron_str(text: &str) -> Result<Self> {
        let data: CatalogData = ron::from_str(text)
            .map_err(|e| GameError::CatalogInvalid(format!("parse error: {e}")))?;
        Self::from_data(&data)
    }

    /// The balance table embedded in the engine.
    ///
    /// # Errors
    ///
    /// Only fails if the embedded document is malformed.
    pub fn builtin() -> Result<Self> {
        Self::from_ron_str(BUILTIN_CATALOG)
    }

    fn table(&self, category: Category, type_name: &str) -> Option<&TypeTable> {
        self.tables.get(&category)?.get(type_name)
    }

    /// Names of all types in a category.
    pub fn type_names(&self, category: Category) -> impl Iterator<Item = &str> {
        self.tables
            .get(&category)
            .into_iter()
            .flat_map(|types| types.keys().map(String::as_str))
    }

    /// Look up a level-specific value.
    ///
    /// The level must exist for the type. Within it, a level value shadows a
    /// level-independent value of the same name.
    pub fn lookup(
        &self,
        category: Category,
        type_name: &str,
        level: u32,
        attribute: &str,
    ) -> Result<Fixed> {
        self.table(category, type_name)
            .and_then(|table| {
                let values = table.levels.get(&level)?;
                values
                    .get(attribute)
                    .or_else(|| table.attributes.get(attribute))
                    .copied()
            })
            .ok_or_else(|| GameError::PropertyNotFound {
                category,
                type_name: type_name.to_string(),
                level: Some(level),
                attribute: attribute.to_string(),
            })
    }

    /// Look up a level-independent value.
    pub fn attribute(&self, category: Category, type_name: &str, attribute: &str) -> Result<Fixed> {
        self.table(category, type_name)
            .and_then(|table| table.attributes.get(attribute).copied())
            .ok_or_else(|| GameError::PropertyNotFound {
                category,
                type_name: type_name.to_string(),
                level: None,
                attribute: attribute.to_string(),
            })
    }

    /// [`lookup`](Self::lookup) truncated to an integer.
    pub fn lookup_u64(
        &self,
        category: Category,
        type_name: &str,
        level: u32,
        attribute: &str,
    ) -> Result<u64> {
        Ok(self
            .lookup(category, type_name, level, attribute)?
            .saturating_to_num::<u64>())
    }

    /// [`lookup`](Self::lookup) truncated to a `u32`.
    pub fn lookup_u32(
        &self,
        category: Category,
        type_name: &str,
        level: u32,
        attribute: &str,
    ) -> Result<u32> {
        Ok(self
            .lookup(category, type_name, level, attribute)?
            .saturating_to_num::<u32>())
    }

    /// [`attribute`](Self::attribute) truncated to a `u32`.
    pub fn attribute_u32(&self, category: Category, type_name: &str, attribute: &str) -> Result<u32> {
        Ok(self
            .attribute(category, type_name, attribute)?
            .saturating_to_num::<u32>())
    }

    /// Highest level a type can reach.
    pub fn max_level(&self, category: Category, type_name: &str) -> Result<u32> {
        self.attribute_u32(category, type_name, attr::MAX_LEVEL)
    }

    // ========================================================================
    // Typed shortcuts
    // ========================================================================

    /// Building value at a level.
    pub fn building(&self, kind: BuildingKind, level: u32, attribute: &str) -> Result<Fixed> {
        self.lookup(Category::Building, kind.catalog_name(), level, attribute)
    }

    /// Building value at a level, as an integer.
    pub fn building_u64(&self, kind: BuildingKind, level: u32, attribute: &str) -> Result<u64> {
        self.lookup_u64(Category::Building, kind.catalog_name(), level, attribute)
    }

    /// Unit value at a level.
    pub fn unit(&self, kind: UnitKind, level: u32, attribute: &str) -> Result<Fixed> {
        self.lookup(Category::Unit, kind.catalog_name(), level, attribute)
    }

    /// Unit value at a level, as an integer.
    pub fn unit_u64(&self, kind: UnitKind, level: u32, attribute: &str) -> Result<u64> {
        self.lookup_u64(Category::Unit, kind.catalog_name(), level, attribute)
    }

    /// Space a unit type occupies.
    pub fn unit_size(&self, kind: UnitKind) -> Result<u32> {
        self.attribute_u32(Category::Unit, kind.catalog_name(), attr::SIZE)
    }

    /// Spaceship value at a spaceport level.
    pub fn spaceship(&self, spaceport_level: u32, attribute: &str) -> Result<Fixed> {
        self.lookup(Category::Spaceship, SPACESHIP_TYPE, spaceport_level, attribute)
    }

    // ========================================================================
    // Validation
    // ========================================================================

    /// Every value the engine can ask for but the catalog lacks.
    ///
    /// An empty result means no lookup made by the engine for an existing
    /// level can fail.
    #[must_use]
    pub fn completeness_issues(&self) -> Vec<CatalogIssue> {
        let mut issues = Vec::new();

        for kind in BuildingKind::ALL {
            let mut needed = vec![attr::BUILD_COST, attr::UPGRADE_TIME];
            match kind {
                BuildingKind::Farm | BuildingKind::Mine => {
                    needed.extend([attr::PRODUCTION_RATE, attr::CAPACITY]);
                }
                BuildingKind::Barrack => needed.push(attr::MAX_CAPACITY),
                _ => {}
            }
            self.check_type(Category::Building, kind.catalog_name(), &[], &needed, &mut issues);
        }

        for kind in UnitKind::ALL {
            self.check_type(
                Category::Unit,
                kind.catalog_name(),
                &[attr::SIZE],
                &[
                    attr::ATTACK_POWER,
                    attr::RATIONS_PER_HOUR,
                    attr::TRAINING_TIME,
                    attr::TRAINING_COST,
                    attr::UPGRADE_COST,
                ],
                &mut issues,
            );
        }

        // Spaceship levels follow the spaceport, so every spaceport level needs a row.
        let port_levels = self
            .max_level(Category::Building, BuildingKind::Spaceport.catalog_name())
            .unwrap_or(0);
        for level in 1..=port_levels {
            for attribute in [
                attr::TRAVEL_SPEED_FACTOR,
                attr::UNIT_CAPACITY,
                attr::RESOURCE_CAPACITY,
            ] {
                if self.spaceship(level, attribute).is_err() {
                    issues.push(CatalogIssue {
                        category: Category::Spaceship,
                        type_name: SPACESHIP_TYPE.to_string(),
                        level: Some(level),
                        attribute: attribute.to_string(),
                    });
                }
            }
        }

        issues
    }

    fn check_type(
        &self,
        category: Category,
        type_name: &str,
        fixed_attributes: &[&str],
        level_attributes: &[&str],
        issues: &mut Vec<CatalogIssue>,
    ) {
        let issue = |level: Option<u32>, attribute: &str| CatalogIssue {
            category,
            type_name: type_name.to_string(),
            level,
            attribute: attribute.to_string(),
        };

        let Ok(max_level) = self.max_level(category, type_name) else {
            issues.push(issue(None, attr::MAX_LEVEL));
            return;
        };
        for attribute in fixed_attributes {
            if self.attribute(category, type_name, attribute).is_err() {
                issues.push(issue(None, *attribute));
            }
        }
        for level in 1..=max_level {
            for attribute in level_attributes {
                if self.lookup(category, type_name, level, attribute).is_err() {
                    issues.push(issue(Some(level), *attribute));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_catalog_is_complete() {
        let catalog = PropertyCatalog::builtin().unwrap();
        let issues = catalog.completeness_issues();
        assert!(issues.is_empty(), "issues: {issues:?}");
    }

    #[test]
    fn test_builtin_reference_values() {
        let catalog = PropertyCatalog::builtin().unwrap();
        assert_eq!(
            catalog
                .building_u64(BuildingKind::Farm, 1, attr::CAPACITY)
                .unwrap(),
            1000
        );
        assert_eq!(
            catalog
                .building_u64(BuildingKind::Farm, 1, attr::PRODUCTION_RATE)
                .unwrap(),
            200
        );
        assert_eq!(
            catalog
                .unit_u64(UnitKind::SpaceMarine, 1, attr::TRAINING_TIME)
                .unwrap(),
            60
        );
        assert_eq!(catalog.unit_size(UnitKind::SpaceDrone).unwrap(), 20);
        assert_eq!(
            catalog.spaceship(2, attr::TRAVEL_SPEED_FACTOR).unwrap(),
            Fixed::from_num(1.5)
        );
    }

    #[test]
    fn test_missing_level_is_property_not_found() {
        let catalog = PropertyCatalog::builtin().unwrap();
        let err = catalog
            .unit(UnitKind::SpaceMarine, 99, attr::ATTACK_POWER)
            .unwrap_err();
        assert!(matches!(
            err,
            GameError::PropertyNotFound { level: Some(99), .. }
        ));
    }

    #[test]
    fn test_level_value_shadows_type_value() {
        let catalog = PropertyCatalog::from_ron_str(
            r#"(units: { "space_marine": (
                attributes: { "size": 3, "max_level": 1 },
                levels: { 1: { "size": 4 } },
            ) })"#,
        )
        .unwrap();
        assert_eq!(
            catalog
                .lookup(Category::Unit, "space_marine", 1, attr::SIZE)
                .unwrap(),
            Fixed::from_num(4)
        );
        assert_eq!(catalog.unit_size(UnitKind::SpaceMarine).unwrap(), 3);
    }

    #[test]
    fn test_negative_value_rejected() {
        let err = PropertyCatalog::from_ron_str(
            r#"(buildings: { "farm": (levels: { 1: { "build_cost": -5 } }) })"#,
        )
        .unwrap_err();
        assert!(matches!(err, GameError::CatalogInvalid(_)));
    }

    #[test]
    fn test_completeness_reports_gaps() {
        let catalog = PropertyCatalog::from_ron_str(
            r#"(buildings: { "farm": (
                attributes: { "max_level": 2 },
                levels: { 1: { "build_cost": 50, "upgrade_time": 10, "production_rate": 200, "capacity": 1000 } },
            ) })"#,
        )
        .unwrap();
        let issues = catalog.completeness_issues();
        assert!(issues.iter().any(|i| i.type_name == "farm"
            && i.level == Some(2)
            && i.attribute == attr::BUILD_COST));
        assert!(issues
            .iter()
            .any(|i| i.type_name == "barrack" && i.attribute == attr::MAX_LEVEL));
    }
}
