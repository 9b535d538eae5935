pub mod generation;
pub mod geometry;
pub mod map;

use glam::{DVec2, DVec3};
use serde::{Deserialize, Serialize};

pub use map::{InterpolationStrategy, Map, MapError};

/// The three environmental readings a station reports.
///
/// Units: air pollution in µg/m³ PM2.5, population density in the unit of the
/// configured fuzzy universe (people/km² or inhabitants/ha), vegetation cover in %.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Readings {
    pub air_pollution: f64,
    pub population_density: f64,
    pub vegetation_cover: f64,
}

/// Legacy marker some upstream feeds use for "no measurement".
pub const NO_DATA_SENTINEL: f64 = -1.0;

impl Readings {
    pub fn new(air_pollution: f64, population_density: f64, vegetation_cover: f64) -> Self {
        Readings {
            air_pollution,
            population_density,
            vegetation_cover,
        }
    }

    /// Accept a raw triple from an upstream feed that marks missing data with `-1`
    /// in every component. Returns `None` for that marker.
    pub fn from_sentinel(raw: [f64; 3]) -> Option<Self> {
        if raw.iter().all(|&v| v == NO_DATA_SENTINEL) {
            None
        } else {
            Some(Readings::new(raw[0], raw[1], raw[2]))
        }
    }

    pub fn is_finite(&self) -> bool {
        self.to_vec3().is_finite()
    }

    pub fn to_vec3(self) -> DVec3 {
        DVec3::new(self.air_pollution, self.population_density, self.vegetation_cover)
    }

    pub fn from_vec3(v: DVec3) -> Self {
        Readings::new(v.x, v.y, v.z)
    }
}

/// A sensor station: a fixed location and the readings measured there.
#[derive(Debug, Clone, PartialEq)]
pub struct Station {
    pub location: DVec2,
    pub readings: Readings,
}

impl Station {
    pub fn new(location: DVec2, readings: Readings) -> Self {
        Station { location, readings }
    }

    pub fn at(x: f64, y: f64, air_pollution: f64, population_density: f64, vegetation_cover: f64) -> Self {
        Station::new(
            DVec2::new(x, y),
            Readings::new(air_pollution, population_density, vegetation_cover),
        )
    }
}

impl std::fmt::Display for Station {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Station at ({}, {}):", self.location.x, self.location.y)?;
        writeln!(f, "    Air pollution       = {}", self.readings.air_pollution)?;
        writeln!(f, "    Population density  = {}", self.readings.population_density)?;
        write!(f, "    Vegetation cover    = {}", self.readings.vegetation_cover)
    }
}

/// Upstream data contract: one `(location, readings)` pair as it appears in TOML.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationRecord {
    pub location: [f64; 2],
    pub air_pollution: f64,
    pub population_density: f64,
    pub vegetation_cover: f64,
}

impl From<&StationRecord> for Station {
    fn from(record: &StationRecord) -> Self {
        Station::at(
            record.location[0],
            record.location[1],
            record.air_pollution,
            record.population_density,
            record.vegetation_cover,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinel_triple_means_no_data() {
        assert_eq!(Readings::from_sentinel([-1.0, -1.0, -1.0]), None);
    }

    #[test]
    fn partial_sentinel_is_real_data() {
        let r = Readings::from_sentinel([-1.0, 0.0, 12.0]).unwrap();
        assert_eq!(r.air_pollution, -1.0);
        assert_eq!(r.vegetation_cover, 12.0);
    }

    #[test]
    fn zero_readings_are_not_missing() {
        assert_eq!(
            Readings::from_sentinel([0.0, 0.0, 0.0]),
            Some(Readings::new(0.0, 0.0, 0.0))
        );
    }

    #[test]
    fn station_display_lists_all_readings() {
        let s = Station::at(2.0, 3.0, 12.0, 400.0, 35.0);
        let text = s.to_string();
        assert!(text.contains("(2, 3)"));
        assert!(text.contains("12"));
        assert!(text.contains("400"));
        assert!(text.contains("35"));
    }

    #[test]
    fn record_converts_to_station() {
        let record = StationRecord {
            location: [1.5, 2.5],
            air_pollution: 10.0,
            population_density: 20.0,
            vegetation_cover: 30.0,
        };
        let station = Station::from(&record);
        assert_eq!(station.location, DVec2::new(1.5, 2.5));
        assert_eq!(station.readings.population_density, 20.0);
    }
}
