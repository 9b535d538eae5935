pub mod heatmap;
pub mod recommendations;
pub mod statistics;

use std::path::Path;

use glam::DVec2;
use serde::Serialize;
use tracing::warn;

use crate::config::fuzzy::FuzzyConfig;
use crate::config::simulation::SimulationConfig;
use crate::fuzzy::category::Categorizer;
use crate::fuzzy::engine::{FuzzySystem, InferenceError};
use crate::fuzzy::variable::Role;
use crate::simulation::recommendations::{AssessmentLabels, recommendation, recommendations_for};
use crate::spatial::{Map, MapError, Readings};

pub const AIR_POLLUTION: &str = "air_pollution";
pub const POPULATION_DENSITY: &str = "population_density";
pub const VEGETATION_COVER: &str = "vegetation_cover";

/// Score reported for locations without data.
pub const NO_DATA_SCORE: f64 = 0.0;

/// A failed query: interpolation or inference.
#[derive(Debug, Clone, PartialEq)]
pub enum SimulationError {
    Map(MapError),
    Inference(InferenceError),
}

impl std::fmt::Display for SimulationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SimulationError::Map(e) => write!(f, "Interpolation failed: {}", e),
            SimulationError::Inference(e) => write!(f, "Inference failed: {}", e),
        }
    }
}

impl std::error::Error for SimulationError {}

impl From<MapError> for SimulationError {
    fn from(e: MapError) -> Self {
        SimulationError::Map(e)
    }
}

impl From<InferenceError> for SimulationError {
    fn from(e: InferenceError) -> Self {
        SimulationError::Inference(e)
    }
}

/// Everything known about one location.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Assessment {
    pub location: [f64; 2],
    pub readings: Readings,
    pub score: f64,
    pub category: String,
    pub labels: AssessmentLabels,
    pub recommendation: String,
    pub actions: Vec<String>,
}

/// Connects interpolated readings to the fuzzy system.
///
/// Immutable once built; share it across threads. Every inference creates
/// its own [`crate::fuzzy::Simulation`].
#[derive(Debug, Clone)]
pub struct RiskModel {
    system: FuzzySystem,
    categorizer: Categorizer,
    output_variable: String,
}

impl RiskModel {
    /// Checks that the system has the three reading antecedents and the output consequent.
    pub fn new(
        system: FuzzySystem,
        categorizer: Categorizer,
        output_variable: &str,
    ) -> Result<Self, String> {
        let mut errors = Vec::new();
        for name in [AIR_POLLUTION, POPULATION_DENSITY, VEGETATION_COVER] {
            match system.variable(name) {
                Some(v) if v.role == Role::Antecedent => {}
                Some(_) => errors.push(format!("variable '{}' must be an antecedent", name)),
                None => errors.push(format!("fuzzy system has no variable '{}'", name)),
            }
        }
        match system.variable(output_variable) {
            Some(v) if v.role == Role::Consequent => {}
            _ => errors.push(format!(
                "output_variable '{}' must name a consequent of the fuzzy system",
                output_variable
            )),
        }
        if !errors.is_empty() {
            return Err(errors.join("\n"));
        }
        Ok(RiskModel {
            system,
            categorizer,
            output_variable: output_variable.to_string(),
        })
    }

    /// The built-in need-for-action system with default categories.
    pub fn need_for_action() -> Result<Self, String> {
        let system = FuzzySystem::from_config(&FuzzyConfig::need_for_action()?)?;
        RiskModel::new(system, Categorizer::default(), "need_for_action")
    }

    /// Build from a run configuration. Relative `fuzzy_config` paths resolve
    /// against `base_dir`.
    pub fn from_config(config: &SimulationConfig, base_dir: &Path) -> Result<Self, String> {
        let fuzzy = match &config.fuzzy_config {
            Some(path) => FuzzyConfig::from_file(&base_dir.join(path))?,
            None => FuzzyConfig::need_for_action()?,
        };
        let system = FuzzySystem::from_config(&fuzzy)?;
        let categorizer = Categorizer::new(config.categories.clone())?;
        RiskModel::new(system, categorizer, &config.output_variable)
    }

    pub fn system(&self) -> &FuzzySystem {
        &self.system
    }

    pub fn categorizer(&self) -> &Categorizer {
        &self.categorizer
    }

    pub fn output_variable(&self) -> &str {
        &self.output_variable
    }

    /// Crisp output for one reading triple, on a fresh simulation.
    pub fn infer(
        &self,
        air_pollution: f64,
        population_density: f64,
        vegetation_cover: f64,
    ) -> Result<f64, InferenceError> {
        let mut sim = self.system.simulation();
        sim.set_input(AIR_POLLUTION, air_pollution)?;
        sim.set_input(POPULATION_DENSITY, population_density)?;
        sim.set_input(VEGETATION_COVER, vegetation_cover)?;
        sim.compute()?;
        sim.output(&self.output_variable)
    }

    pub fn infer_readings(&self, readings: &Readings) -> Result<f64, InferenceError> {
        self.infer(
            readings.air_pollution,
            readings.population_density,
            readings.vegetation_cover,
        )
    }

    pub fn categorize(&self, score: f64) -> &str {
        self.categorizer.categorize(score)
    }

    /// Display label of the dominant term of `variable` at `value`.
    pub fn label_for(&self, variable: &str, value: f64) -> Result<&str, InferenceError> {
        self.system
            .variable(variable)
            .map(|v| v.display_label(value))
            .ok_or_else(|| InferenceError::UnknownVariable(variable.to_string()))
    }

    /// Score at `location`, or `None` when the map has no data there.
    pub fn score_at(&self, location: DVec2, map: &Map) -> Result<Option<f64>, SimulationError> {
        match map.interpolate(location)? {
            Some(readings) => Ok(Some(self.infer_readings(&readings)?)),
            None => Ok(None),
        }
    }

    /// Need-for-action score at `location`. Missing data yields
    /// [`NO_DATA_SCORE`] with a warning instead of running inference.
    pub fn run_simulation(&self, location: DVec2, map: &Map) -> Result<f64, SimulationError> {
        match self.score_at(location, map)? {
            Some(score) => Ok(score),
            None => {
                warn!(
                    x = location.x,
                    y = location.y,
                    "No data at location, using default score"
                );
                Ok(NO_DATA_SCORE)
            }
        }
    }

    /// Readings, score, category, labels and advice for `location`.
    /// `None` when the map has no data there.
    pub fn assess(&self, location: DVec2, map: &Map) -> Result<Option<Assessment>, SimulationError> {
        let Some(readings) = map.interpolate(location)? else {
            warn!(x = location.x, y = location.y, "No data at location, nothing to assess");
            return Ok(None);
        };
        let score = self.infer_readings(&readings)?;
        Ok(Some(self.describe(location, readings, score)?))
    }

    fn describe(
        &self,
        location: DVec2,
        readings: Readings,
        score: f64,
    ) -> Result<Assessment, InferenceError> {
        let labels = AssessmentLabels {
            air_pollution: self.label_for(AIR_POLLUTION, readings.air_pollution)?.to_string(),
            population_density: self
                .label_for(POPULATION_DENSITY, readings.population_density)?
                .to_string(),
            vegetation_cover: self
                .label_for(VEGETATION_COVER, readings.vegetation_cover)?
                .to_string(),
            need_for_action: self.label_for(&self.output_variable, score)?.to_string(),
        };
        let category = self.categorize(score).to_string();
        Ok(Assessment {
            location: location.to_array(),
            readings,
            score,
            recommendation: recommendation(&labels).to_string(),
            actions: recommendations_for(&category)
                .iter()
                .map(|s| s.to_string())
                .collect(),
            category,
            labels,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fuzzy::category::Category;
    use crate::spatial::{InterpolationStrategy, Station};
    use std::path::PathBuf;

    fn model() -> RiskModel {
        RiskModel::need_for_action().unwrap()
    }

    fn square_map() -> Map {
        Map::new(
            vec![
                Station::at(0.0, 0.0, 5.0, 100.0, 90.0),
                Station::at(10.0, 0.0, 140.0, 15000.0, 5.0),
                Station::at(0.0, 10.0, 25.0, 2000.0, 50.0),
                Station::at(10.0, 10.0, 60.0, 6000.0, 20.0),
            ],
            20.0,
            InterpolationStrategy::Barycentric,
        )
        .unwrap()
    }

    #[test]
    fn extreme_clean_inputs_are_low() {
        let m = model();
        let score = m.infer(0.0, 0.0, 100.0).unwrap();
        assert_eq!(m.categorize(score), "Low");
    }

    #[test]
    fn extreme_polluted_inputs_are_high() {
        let m = model();
        let score = m.infer(150.0, 20000.0, 0.0).unwrap();
        assert_eq!(m.categorize(score), "High");
    }

    #[test]
    fn infer_is_deterministic() {
        let m = model();
        let a = m.infer(37.0, 4200.0, 22.0).unwrap();
        let b = m.infer(37.0, 4200.0, 22.0).unwrap();
        assert_eq!(a.to_bits(), b.to_bits());
    }

    #[test]
    fn label_for_returns_display_labels() {
        let m = model();
        assert_eq!(m.label_for(AIR_POLLUTION, 5.0).unwrap(), "Good");
        assert_eq!(m.label_for(POPULATION_DENSITY, 15000.0).unwrap(), "Very High");
        assert_eq!(m.label_for(VEGETATION_COVER, 200.0).unwrap(), "Undefined");
        assert!(m.label_for("humidity", 1.0).is_err());
    }

    #[test]
    fn label_for_matches_degrees() {
        let m = model();
        let variable = m.system().variable(POPULATION_DENSITY).unwrap();
        for value in [0.0, 600.0, 1200.0, 2600.0, 4000.0, 8000.0, 19000.0] {
            let term = variable.dominant_term(value).unwrap();
            let best = variable.degree_of(&term.name, value).unwrap();
            assert!(variable.terms().iter().all(|t| t.function.evaluate(value) <= best));
            assert_eq!(m.label_for(POPULATION_DENSITY, value).unwrap(), term.label);
        }
    }

    #[test]
    fn run_simulation_at_station_uses_its_readings() {
        let m = model();
        let map = square_map();
        let score = m.run_simulation(DVec2::new(10.0, 0.0), &map).unwrap();
        assert_eq!(score, m.infer(140.0, 15000.0, 5.0).unwrap());
    }

    #[test]
    fn run_simulation_without_data_returns_default() {
        let m = model();
        let empty = Map::new(Vec::new(), 10.0, InterpolationStrategy::Barycentric).unwrap();
        assert_eq!(m.run_simulation(DVec2::new(1.0, 1.0), &empty).unwrap(), NO_DATA_SCORE);
        assert_eq!(m.score_at(DVec2::new(1.0, 1.0), &empty).unwrap(), None);
    }

    #[test]
    fn run_simulation_propagates_geometry_failure() {
        let m = model();
        let collinear = Map::new(
            vec![
                Station::at(0.0, 0.0, 10.0, 100.0, 50.0),
                Station::at(1.0, 0.0, 10.0, 100.0, 50.0),
                Station::at(2.0, 0.0, 10.0, 100.0, 50.0),
            ],
            10.0,
            InterpolationStrategy::Barycentric,
        )
        .unwrap();
        let err = m.run_simulation(DVec2::new(1.0, 5.0), &collinear).unwrap_err();
        assert!(matches!(err, SimulationError::Map(MapError::Geometry(_))));
    }

    #[test]
    fn assess_collects_labels_and_advice() {
        let m = model();
        let map = square_map();
        let assessment = m.assess(DVec2::new(0.0, 0.0), &map).unwrap().unwrap();
        assert_eq!(assessment.readings, Readings::new(5.0, 100.0, 90.0));
        assert_eq!(assessment.category, "Low");
        assert_eq!(assessment.labels.air_pollution, "Good");
        assert_eq!(assessment.labels.population_density, "Very Low");
        assert_eq!(assessment.labels.vegetation_cover, "High");
        assert_eq!(assessment.labels.need_for_action, "Low");
        assert!(assessment.recommendation.contains("seem effective"));
        assert_eq!(assessment.actions.len(), 2);

        let json = serde_json::to_string(&assessment).unwrap();
        assert!(json.contains("\"category\":\"Low\""));
    }

    #[test]
    fn model_requires_reading_antecedents() {
        let fuzzy = FuzzyConfig::from_toml_str(
            r#"
            [[variables]]
            name = "heat"
            role = "antecedent"
            min = 0.0
            max = 10.0
            [[variables.terms]]
            name = "hot"
            shape = { kind = "s_curve", a = 2.0, b = 8.0 }

            [[variables]]
            name = "risk"
            role = "consequent"
            min = 0.0
            max = 10.0
            [[variables.terms]]
            name = "high"
            shape = { kind = "s_curve", a = 2.0, b = 8.0 }

            [[rules]]
            when = "heat[hot]"
            then = "risk[high]"
            "#,
            Path::new("test.toml"),
        )
        .unwrap();
        let system = FuzzySystem::from_config(&fuzzy).unwrap();
        let err = RiskModel::new(system, Categorizer::default(), "heat").unwrap_err();
        assert!(err.contains("no variable 'air_pollution'"), "Error: {}", err);
        assert!(err.contains("output_variable 'heat'"), "Error: {}", err);
    }

    #[test]
    fn from_config_uses_custom_categories() {
        let mut config = SimulationConfig::from_toml_str("", &PathBuf::from("c.toml")).unwrap();
        config.categories = vec![Category::new(Some(50.0), "Fine"), Category::new(None, "Act")];
        let m = RiskModel::from_config(&config, Path::new(".")).unwrap();
        let score = m.infer(0.0, 0.0, 100.0).unwrap();
        assert_eq!(m.categorize(score), "Fine");
    }

    #[test]
    fn from_config_reports_missing_fuzzy_file() {
        let mut config = SimulationConfig::from_toml_str("", &PathBuf::from("c.toml")).unwrap();
        config.fuzzy_config = Some("does-not-exist.toml".to_string());
        let err = RiskModel::from_config(&config, Path::new("/nonexistent")).unwrap_err();
        assert!(err.contains("Cannot read"));
    }
}
