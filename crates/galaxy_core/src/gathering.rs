//! Farm and mine gathering.
//!
//! A gatherer is idle until started, then fills towards its level's capacity
//! at the level's hourly rate. Once full it idles again until collected.

use serde::{Deserialize, Serialize};

use crate::buildings::{BuildingStatus, Facility, UpdateContext};
use crate::catalog::{attr, PropertyCatalog};
use crate::components::{ResourceKind, Stockpile};
use crate::error::{GameError, Result};
use crate::events::SimEvent;
use crate::math::{fixed_from_u64, fixed_serde, hourly_yield, Fixed, Seconds, SECONDS_PER_HOUR};

/// Gathering state of a farm or mine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Gatherer {
    /// Resources waiting to be collected.
    pub stored_resources: u64,
    /// Seconds until the store is full; zero when idle.
    #[serde(with = "fixed_serde")]
    pub gathering_time_left: Seconds,
}

fn level_numbers(status: BuildingStatus, catalog: &PropertyCatalog) -> Result<(u64, u64)> {
    let rate = catalog.building_u64(status.kind, status.level, attr::PRODUCTION_RATE)?;
    let capacity = catalog.building_u64(status.kind, status.level, attr::CAPACITY)?;
    Ok((rate, capacity))
}

impl Gatherer {
    /// Whether a gathering run is in progress.
    #[must_use]
    pub fn is_gathering(&self) -> bool {
        self.gathering_time_left > Fixed::ZERO
    }

    /// Begin filling the store.
    ///
    /// Sets the timer to `capacity / production_rate * 3600` seconds.
    ///
    /// # Errors
    ///
    /// [`GameError::UnderConstruction`] or [`GameError::AlreadyGathering`],
    /// with no state change.
    pub fn start_gathering(&mut self, status: BuildingStatus, catalog: &PropertyCatalog) -> Result<()> {
        if status.under_construction {
            return Err(GameError::UnderConstruction(status.id));
        }
        if self.is_gathering() {
            return Err(GameError::AlreadyGathering(status.id));
        }
        let (rate, capacity) = level_numbers(status, catalog)?;
        if rate == 0 {
            return Err(GameError::CatalogInvalid(format!(
                "{} level {} has a zero production rate",
                status.kind, status.level
            )));
        }
        self.gathering_time_left =
            fixed_from_u64(capacity).saturating_mul_int(i64::from(SECONDS_PER_HOUR)) / fixed_from_u64(rate);
        tracing::debug!(
            building = %status.id,
            seconds = %self.gathering_time_left,
            "Gathering started"
        );
        Ok(())
    }

    /// Move the stored resources into `stockpile`.
    ///
    /// Returns the amount transferred. Zeroes the store and the timer.
    ///
    /// # Errors
    ///
    /// [`GameError::StillGathering`] while a run is in progress.
    pub fn collect_resources(
        &mut self,
        status: BuildingStatus,
        resource: ResourceKind,
        stockpile: &mut Stockpile,
    ) -> Result<u64> {
        if self.is_gathering() {
            return Err(GameError::StillGathering(status.id));
        }
        let amount = self.stored_resources;
        stockpile.credit(resource, amount);
        self.stored_resources = 0;
        self.gathering_time_left = Fixed::ZERO;
        Ok(amount)
    }
}

impl Facility for Gatherer {
    fn advance(
        &mut self,
        status: BuildingStatus,
        elapsed: Seconds,
        ctx: &mut UpdateContext<'_>,
    ) -> Result<()> {
        if !self.is_gathering() {
            return Ok(());
        }
        let (rate, capacity) = level_numbers(status, ctx.catalog)?;

        self.gathering_time_left -= elapsed;
        self.stored_resources = self
            .stored_resources
            .saturating_add(hourly_yield(elapsed, rate))
            .min(capacity);

        if self.gathering_time_left <= Fixed::ZERO {
            // A full bin is exactly full regardless of step size
            self.gathering_time_left = Fixed::ZERO;
            self.stored_resources = capacity;
            if let Some(resource) = status.kind.gathered_resource() {
                ctx.events.push(SimEvent::GatheringFinished {
                    building: status.id,
                    resource,
                    stored: capacity,
                });
            }
        }
        Ok(())
    }

    fn check_upgrade(&self, status: BuildingStatus) -> Result<()> {
        if self.is_gathering() {
            return Err(GameError::StillGathering(status.id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buildings::BuildingKind;
    use crate::components::BuildingId;

    fn farm_status(level: u32) -> BuildingStatus {
        BuildingStatus {
            id: BuildingId::new(5),
            kind: BuildingKind::Farm,
            level,
            under_construction: false,
        }
    }

    fn advance(gatherer: &mut Gatherer, status: BuildingStatus, secs: i32) -> Vec<SimEvent> {
        let catalog = PropertyCatalog::builtin().unwrap();
        let mut stock = Stockpile::default();
        let mut events = Vec::new();
        let mut ctx = UpdateContext {
            catalog: &catalog,
            stockpile: &mut stock,
            events: &mut events,
        };
        gatherer
            .advance(status, Fixed::from_num(secs), &mut ctx)
            .unwrap();
        events
    }

    #[test]
    fn test_start_sets_fill_time() {
        let catalog = PropertyCatalog::builtin().unwrap();
        let mut g = Gatherer::default();
        g.start_gathering(farm_status(1), &catalog).unwrap();
        // 1000 capacity at 200/h
        assert_eq!(g.gathering_time_left, Fixed::from_num(5 * 3600));
    }

    #[test]
    fn test_start_rejected_when_busy_or_constructing() {
        let catalog = PropertyCatalog::builtin().unwrap();
        let mut g = Gatherer::default();
        let mut status = farm_status(1);
        status.under_construction = true;
        assert_eq!(
            g.start_gathering(status, &catalog).unwrap_err(),
            GameError::UnderConstruction(status.id)
        );
        assert!(!g.is_gathering());

        g.start_gathering(farm_status(1), &catalog).unwrap();
        let before = g;
        assert_eq!(
            g.start_gathering(farm_status(1), &catalog).unwrap_err(),
            GameError::AlreadyGathering(status.id)
        );
        assert_eq!(g, before);
    }

    #[test]
    fn test_hourly_accrual_then_snap_to_capacity() {
        let catalog = PropertyCatalog::builtin().unwrap();
        let mut g = Gatherer::default();
        g.start_gathering(farm_status(1), &catalog).unwrap();

        advance(&mut g, farm_status(1), 3600);
        assert_eq!(g.stored_resources, 200);

        let events = advance(&mut g, farm_status(1), 4 * 3600);
        assert_eq!(g.stored_resources, 1000);
        assert_eq!(g.gathering_time_left, Fixed::ZERO);
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn test_overshoot_snaps_to_capacity() {
        let catalog = PropertyCatalog::builtin().unwrap();
        let mut g = Gatherer::default();
        g.start_gathering(farm_status(1), &catalog).unwrap();
        advance(&mut g, farm_status(1), 100 * 3600);
        assert_eq!(g.stored_resources, 1000);
        assert!(!g.is_gathering());
    }

    #[test]
    fn test_collect_only_when_idle() {
        let catalog = PropertyCatalog::builtin().unwrap();
        let mut g = Gatherer::default();
        let mut stock = Stockpile::new(50_000, 0);
        g.start_gathering(farm_status(1), &catalog).unwrap();
        assert_eq!(
            g.collect_resources(farm_status(1), ResourceKind::Rations, &mut stock)
                .unwrap_err(),
            GameError::StillGathering(BuildingId::new(5))
        );

        advance(&mut g, farm_status(1), 5 * 3600);
        let amount = g
            .collect_resources(farm_status(1), ResourceKind::Rations, &mut stock)
            .unwrap();
        assert_eq!(amount, 1000);
        assert_eq!(stock.rations, 51_000);
        assert_eq!(g, Gatherer::default());
    }

    #[test]
    fn test_upgrade_blocked_while_gathering() {
        let catalog = PropertyCatalog::builtin().unwrap();
        let mut g = Gatherer::default();
        g.start_gathering(farm_status(1), &catalog).unwrap();
        assert!(g.check_upgrade(farm_status(1)).is_err());
    }

    #[test]
    fn test_zero_delta_is_noop() {
        let catalog = PropertyCatalog::builtin().unwrap();
        let mut g = Gatherer::default();
        g.start_gathering(farm_status(1), &catalog).unwrap();
        advance(&mut g, farm_status(1), 1234);
        let before = g;
        let events = advance(&mut g, farm_status(1), 0);
        assert_eq!(g, before);
        assert!(events.is_empty());
    }
}
