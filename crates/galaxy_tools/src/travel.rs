//! Travel time tables.

use galaxy_core::buildings::BuildingKind;
use galaxy_core::catalog::{Category, PropertyCatalog};
use galaxy_core::error::Result;
use galaxy_core::math::{Fixed, Seconds};
use galaxy_core::movement::{self, ShipCapacity, Warper};

/// One row of a travel table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TravelRow {
    /// Spaceport level the ship belongs to.
    pub spaceport_level: u32,
    /// One-way seconds.
    pub one_way: Seconds,
    /// Seconds for the round trip.
    pub round_trip: Seconds,
}

/// Travel times over `distance` for every spaceport level, optionally along
/// a warp link powered at `warper_level`.
pub fn travel_table(
    catalog: &PropertyCatalog,
    distance: u32,
    warper_level: Option<u32>,
) -> Result<Vec<TravelRow>> {
    let link_factor = warper_level.map_or(Fixed::ONE, Warper::speed_factor);
    let max_level = catalog.max_level(Category::Building, BuildingKind::Spaceport.catalog_name())?;
    (1..=max_level)
        .map(|level| {
            let speed = ShipCapacity::at_level(level, catalog)?.speed;
            let one_way = movement::travel_time(Fixed::from_num(distance), speed, link_factor)?;
            Ok(TravelRow {
                spaceport_level: level,
                one_way,
                round_trip: one_way.saturating_mul_int(2),
            })
        })
        .collect()
}
