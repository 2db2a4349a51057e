//! Error types for the game simulation.
//!
//! Every failure a command can produce is a [`GameError`] variant. Callers that
//! only care about the broad category (reject the request, report a conflict,
//! answer "not found") use [`GameError::kind`].

use thiserror::Error;

use crate::catalog::Category;
use crate::components::{
    AttackId, BuildingId, GridPos, LinkId, PlanetId, ResourceKind, SettlementId, ShipId, UnitId,
};
use crate::units::UnitKind;

/// Result type alias using [`GameError`].
pub type Result<T> = std::result::Result<T, GameError>;

/// Broad classification of a [`GameError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A precondition was not met; the request is rejected as-is.
    Validation,
    /// A uniqueness or mutual-exclusion rule would be broken.
    Conflict,
    /// A referenced id does not resolve.
    NotFound,
    /// The operation is not valid in the entity's current state.
    State,
    /// The property catalog does not match what the engine needs.
    Configuration,
}

/// Top-level error type for all game simulation errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GameError {
    // ========================================================================
    // Validation
    // ========================================================================
    /// Insufficient resources.
    #[error("Insufficient {resource}: need {required}, have {available}")]
    InsufficientResources {
        /// Resource type.
        resource: ResourceKind,
        /// Amount required.
        required: u64,
        /// Amount available.
        available: u64,
    },

    /// Requested unit level differs from the level the barrack trains.
    #[error("Unit level {requested} doesn't match barrack's {kind} level {unlocked}")]
    UnitLevelMismatch {
        /// Unit type.
        kind: UnitKind,
        /// Level asked for.
        requested: u32,
        /// Level the barrack currently trains.
        unlocked: u32,
    },

    /// Barrack storage cannot hold the unit.
    #[error("Barrack does not have enough space: {taken} of {capacity} taken, unit needs {size}")]
    BarrackFull {
        /// Space already used.
        taken: u32,
        /// Maximum capacity.
        capacity: u32,
        /// Size of the unit.
        size: u32,
    },

    /// The training queue is at its maximum depth.
    #[error("Barrack has a full queue already ({0} units)")]
    QueueFull(usize),

    /// Barrack level too low to train this unit type.
    #[error("Barrack hasn't unlocked {kind}: requires level {required}")]
    UnitLocked {
        /// Unit type.
        kind: UnitKind,
        /// Barrack level needed.
        required: u32,
    },

    /// Already at the highest level defined in the catalog.
    #[error("Maximum level {0} reached")]
    MaxLevelReached(u32),

    /// Grid coordinates outside the settlement.
    #[error("Grid position {0} is outside the settlement")]
    OutOfGrid(GridPos),

    /// Planet already holds the maximum number of settlements.
    #[error("Planet already has {0} settlements")]
    SettlementLimit(usize),

    /// No unit selected for a side and auto-selection is off.
    #[error("No {0} unit selected")]
    NoUnitSelected(&'static str),

    /// Unit cannot take part (still training, or on the wrong side).
    #[error("Unit {0} is not available")]
    UnitUnavailable(UnitId),

    /// Cargo exceeds the spaceship's capacity.
    #[error("Spaceship capacity exceeded: {used} + {requested} > {capacity}")]
    ShipCapacityExceeded {
        /// Already loaded.
        used: u64,
        /// Amount being boarded.
        requested: u64,
        /// Capacity at the spaceport's level.
        capacity: u64,
    },

    /// Source and destination planet are the same.
    #[error("Planet {0} cannot target itself")]
    SamePlanet(PlanetId),

    /// Attacker and defender belong to the same owner.
    #[error("Planet is owned by the same user")]
    SameOwner,

    /// Building is not of the kind the operation needs.
    #[error("Building {building} is not a {expected}")]
    WrongBuildingKind {
        /// Building addressed.
        building: BuildingId,
        /// Kind the operation needs.
        expected: &'static str,
    },

    // ========================================================================
    // Conflict
    // ========================================================================
    /// Planet already runs an attack.
    #[error("Planet {0} is already attacking")]
    AlreadyAttacking(PlanetId),

    /// Planet is already under attack.
    #[error("Planet {0} is already defending")]
    AlreadyDefending(PlanetId),

    /// Warper already holds a link to another planet.
    #[error("Warper {warper} already has link {link}")]
    WarperAlreadyLinked {
        /// Warper building.
        warper: BuildingId,
        /// Link it holds.
        link: LinkId,
    },

    /// Grid slot already holds a building.
    #[error("Grid position {0} is occupied")]
    SlotOccupied(GridPos),

    // ========================================================================
    // Not found
    // ========================================================================
    /// Unknown planet.
    #[error("Planet not found: {0}")]
    PlanetNotFound(PlanetId),

    /// No planet at the given coordinates.
    #[error("No planet at ({x}, {y})")]
    NoPlanetAt {
        /// X coordinate.
        x: i32,
        /// Y coordinate.
        y: i32,
    },

    /// Unknown settlement.
    #[error("Settlement not found: {0}")]
    SettlementNotFound(SettlementId),

    /// Unknown building.
    #[error("Building not found: {0}")]
    BuildingNotFound(BuildingId),

    /// Unknown unit.
    #[error("Unit not found: {0}")]
    UnitNotFound(UnitId),

    /// Unknown spaceship.
    #[error("Spaceship not found: {0}")]
    ShipNotFound(ShipId),

    /// Unknown attack.
    #[error("Attack not found: {0}")]
    AttackNotFound(AttackId),

    /// Unknown planet link.
    #[error("Planet link not found: {0}")]
    LinkNotFound(LinkId),

    // ========================================================================
    // State
    // ========================================================================
    /// Building is still being constructed or upgraded.
    #[error("Building {0} is under construction")]
    UnderConstruction(BuildingId),

    /// Production building is already gathering.
    #[error("Building {0} is already gathering")]
    AlreadyGathering(BuildingId),

    /// Production building has not finished gathering.
    #[error("Building {0} is still gathering")]
    StillGathering(BuildingId),

    /// Spaceship is in transit.
    #[error("Spaceship {0} is moving")]
    ShipMoving(ShipId),

    /// Invalid game state.
    #[error("Invalid game state: {0}")]
    InvalidState(String),

    // ========================================================================
    // Configuration
    // ========================================================================
    /// Catalog has no value for the requested property.
    #[error("Property not found: {category}/{type_name} level {level:?} attribute '{attribute}'")]
    PropertyNotFound {
        /// Catalog category.
        category: Category,
        /// Type name.
        type_name: String,
        /// Level, if the lookup was level-specific.
        level: Option<u32>,
        /// Attribute name.
        attribute: String,
    },

    /// Catalog document could not be parsed or holds bad values.
    #[error("Invalid catalog: {0}")]
    CatalogInvalid(String),
}

impl GameError {
    /// Classify this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InsufficientResources { .. }
            | Self::UnitLevelMismatch { .. }
            | Self::BarrackFull { .. }
            | Self::QueueFull(_)
            | Self::UnitLocked { .. }
            | Self::MaxLevelReached(_)
            | Self::OutOfGrid(_)
            | Self::SettlementLimit(_)
            | Self::NoUnitSelected(_)
            | Self::UnitUnavailable(_)
            | Self::ShipCapacityExceeded { .. }
            | Self::SamePlanet(_)
            | Self::SameOwner
            | Self::WrongBuildingKind { .. } => ErrorKind::Validation,
            Self::AlreadyAttacking(_)
            | Self::AlreadyDefending(_)
            | Self::WarperAlreadyLinked { .. }
            | Self::SlotOccupied(_) => ErrorKind::Conflict,
            Self::PlanetNotFound(_)
            | Self::NoPlanetAt { .. }
            | Self::SettlementNotFound(_)
            | Self::BuildingNotFound(_)
            | Self::UnitNotFound(_)
            | Self::ShipNotFound(_)
            | Self::AttackNotFound(_)
            | Self::LinkNotFound(_) => ErrorKind::NotFound,
            Self::UnderConstruction(_)
            | Self::AlreadyGathering(_)
            | Self::StillGathering(_)
            | Self::ShipMoving(_)
            | Self::InvalidState(_) => ErrorKind::State,
            Self::PropertyNotFound { .. } | Self::CatalogInvalid(_) => ErrorKind::Configuration,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_classification() {
        assert_eq!(GameError::QueueFull(5).kind(), ErrorKind::Validation);
        assert_eq!(
            GameError::AlreadyAttacking(PlanetId::new(1)).kind(),
            ErrorKind::Conflict
        );
        assert_eq!(
            GameError::UnitNotFound(UnitId::new(3)).kind(),
            ErrorKind::NotFound
        );
        assert_eq!(GameError::ShipMoving(ShipId::new(2)).kind(), ErrorKind::State);
        assert_eq!(
            GameError::CatalogInvalid("bad".into()).kind(),
            ErrorKind::Configuration
        );
    }

    #[test]
    fn test_insufficient_resources_message() {
        let err = GameError::InsufficientResources {
            resource: ResourceKind::Rations,
            required: 40,
            available: 10,
        };
        assert_eq!(err.to_string(), "Insufficient rations: need 40, have 10");
    }
}
