use serde::Deserialize;
use std::path::Path;

use crate::fuzzy::category::{Category, default_categories, validate_categories};
use crate::spatial::{InterpolationStrategy, StationRecord};

#[derive(Debug, Clone, Deserialize)]
pub struct SimulationConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Path to a fuzzy system TOML; the built-in need-for-action system when absent.
    #[serde(default)]
    pub fuzzy_config: Option<String>,
    #[serde(default = "default_output_variable")]
    pub output_variable: String,
    #[serde(default = "default_map_size")]
    pub map_size: u32,
    #[serde(default = "default_grid_size")]
    pub grid_size: u32,
    #[serde(default = "default_coordinates")]
    pub coordinates: String,
    #[serde(default)]
    pub interpolation: InterpolationConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default = "default_categories")]
    pub categories: Vec<Category>,
    /// Explicit stations. When empty, stations are generated from `[generation]`.
    #[serde(default)]
    pub stations: Vec<StationRecord>,
}

/// Interpolation settings.
///
/// Uses a flat struct (not a tagged enum) for TOML friendliness.
/// `method` is "barycentric" (default) or "idw".
/// `idw_neighbors` is only used by "idw".
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct InterpolationConfig {
    #[serde(default = "default_method")]
    pub method: String,
    #[serde(default = "default_idw_neighbors")]
    pub idw_neighbors: usize,
}

/// Parameters for a random station set. Stored with results for reproducibility.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GenerationConfig {
    /// 0 draws a random seed.
    #[serde(default)]
    pub seed: u64,
    #[serde(default = "default_station_count")]
    pub station_count: u32,
    #[serde(default = "default_max_air_pollution")]
    pub max_air_pollution: u32,
    #[serde(default = "default_max_population_density")]
    pub max_population_density: u32,
    #[serde(default = "default_max_vegetation_cover")]
    pub max_vegetation_cover: u32,
}

fn default_log_level() -> String {
    "info".to_string()
}
fn default_output_variable() -> String {
    "need_for_action".to_string()
}
fn default_map_size() -> u32 {
    100
}
fn default_grid_size() -> u32 {
    100
}
fn default_coordinates() -> String {
    "grid".to_string()
}
fn default_method() -> String {
    "barycentric".to_string()
}
fn default_idw_neighbors() -> usize {
    3
}
fn default_station_count() -> u32 {
    100
}
fn default_max_air_pollution() -> u32 {
    150
}
fn default_max_population_density() -> u32 {
    20000
}
fn default_max_vegetation_cover() -> u32 {
    100
}

impl Default for InterpolationConfig {
    fn default() -> Self {
        InterpolationConfig {
            method: default_method(),
            idw_neighbors: default_idw_neighbors(),
        }
    }
}

impl InterpolationConfig {
    /// Resolve into a strategy. Call after validation; unknown methods fall
    /// back to barycentric.
    pub fn strategy(&self) -> InterpolationStrategy {
        match self.method.as_str() {
            "idw" => InterpolationStrategy::Idw {
                neighbors: self.idw_neighbors,
            },
            _ => InterpolationStrategy::Barycentric,
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        GenerationConfig {
            seed: 0,
            station_count: default_station_count(),
            max_air_pollution: default_max_air_pollution(),
            max_population_density: default_max_population_density(),
            max_vegetation_cover: default_max_vegetation_cover(),
        }
    }
}

impl SimulationConfig {
    pub fn from_file(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Cannot read {}: {}", path.display(), e))?;
        Self::from_toml_str(&content, path)
    }

    pub fn from_toml_str(content: &str, source_path: &Path) -> Result<Self, String> {
        let config: SimulationConfig =
            toml::from_str(content).map_err(|e| format!("{}: {}", source_path.display(), e))?;
        config.validate()?;
        Ok(config)
    }

    pub fn is_geo_referenced(&self) -> bool {
        self.coordinates == "geo"
    }

    pub fn validate(&self) -> Result<(), String> {
        let mut errors = Vec::new();

        let valid_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_levels.contains(&self.log_level.as_str()) {
            errors.push(format!(
                "log_level must be one of {:?}, got '{}'. Example: log_level = \"info\"",
                valid_levels, self.log_level
            ));
        }

        if self.output_variable.is_empty() {
            errors.push(
                "output_variable must not be empty. Example: output_variable = \"need_for_action\""
                    .to_string(),
            );
        }

        if self.map_size == 0 {
            errors.push(format!(
                "map_size must be > 0, got {}. Example: map_size = 100",
                self.map_size
            ));
        }

        if !(1..=1000).contains(&self.grid_size) {
            errors.push(format!(
                "grid_size must be 1-1000, got {}. Example: grid_size = 100",
                self.grid_size
            ));
        }

        let valid_coordinates = ["grid", "geo"];
        if !valid_coordinates.contains(&self.coordinates.as_str()) {
            errors.push(format!(
                "coordinates must be one of {:?}, got '{}'. Example: coordinates = \"grid\"",
                valid_coordinates, self.coordinates
            ));
        }
        if self.is_geo_referenced() && self.stations.is_empty() {
            errors.push(
                "coordinates = \"geo\" requires explicit [[stations]]. Example: location = [4.35, 50.85]"
                    .to_string(),
            );
        }

        let valid_methods = ["barycentric", "idw"];
        if !valid_methods.contains(&self.interpolation.method.as_str()) {
            errors.push(format!(
                "interpolation.method must be one of {:?}, got '{}'. Example: method = \"idw\"",
                valid_methods, self.interpolation.method
            ));
        }
        if self.interpolation.idw_neighbors == 0 {
            errors.push(format!(
                "interpolation.idw_neighbors must be >= 1, got {}. Example: idw_neighbors = 3",
                self.interpolation.idw_neighbors
            ));
        }

        let generation = &self.generation;
        if generation.station_count == 0 {
            errors.push(format!(
                "generation.station_count must be >= 1, got {}. Example: station_count = 100",
                generation.station_count
            ));
        }
        let capacity = self.map_size as u64 * self.map_size as u64;
        if generation.station_count as u64 > capacity {
            errors.push(format!(
                "generation.station_count must be <= map_size² ({}), got {}",
                capacity, generation.station_count
            ));
        }
        for (key, value, example) in [
            ("max_air_pollution", generation.max_air_pollution, 150),
            ("max_population_density", generation.max_population_density, 20000),
            ("max_vegetation_cover", generation.max_vegetation_cover, 100),
        ] {
            if value == 0 {
                errors.push(format!(
                    "generation.{} must be > 0, got {}. Example: {} = {}",
                    key, value, key, example
                ));
            }
        }

        if let Err(e) = validate_categories(&self.categories) {
            errors.push(e);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors.join("\n"))
        }
    }
}
