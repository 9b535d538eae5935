use std::path::Path;

use glam::DVec2;

use crate::config::simulation::SimulationConfig;
use crate::fuzzy::engine::describe_rule;
use crate::simulation::heatmap::{HeatmapResult, compute_heatmap};
use crate::simulation::recommendations::recommendations_for;
use crate::simulation::statistics::HeatmapStatistics;
use crate::simulation::{Assessment, RiskModel};
use crate::spatial::generation::generate_random_stations;
use crate::spatial::{InterpolationStrategy, Map, Station};

/// Stations and the seed they were generated from, if any.
pub struct LoadedMap {
    pub map: Map,
    pub seed: Option<u64>,
}

/// Build the risk model for `config`, resolving paths against the config file's directory.
pub fn load_model(config: &SimulationConfig, config_path: &Path) -> Result<RiskModel, String> {
    let base_dir = config_path.parent().unwrap_or(Path::new("."));
    RiskModel::from_config(config, base_dir)
}

/// Use the configured `[[stations]]`, or generate a random set when there are none.
pub fn load_map(config: &SimulationConfig) -> Result<LoadedMap, String> {
    let strategy = config.interpolation.strategy();
    if !config.stations.is_empty() {
        let stations: Vec<Station> = config.stations.iter().map(Station::from).collect();
        let map = if config.is_geo_referenced() {
            Map::geo_referenced(stations, strategy)
        } else {
            Map::new(stations, config.map_size as f64, strategy)
        }
        .map_err(|e| format!("Invalid station set: {}", e))?;
        return Ok(LoadedMap { map, seed: None });
    }

    let generated = generate_random_stations(&config.generation, config.map_size)?;
    let map = Map::new(generated.stations, config.map_size as f64, strategy)
        .map_err(|e| format!("Invalid station set: {}", e))?;
    Ok(LoadedMap {
        map,
        seed: Some(generated.seed),
    })
}

/// Compute and summarize a heatmap over the configured grid.
pub fn heatmap(config: &SimulationConfig, config_path: &Path, json: bool) -> Result<(), String> {
    let model = load_model(config, config_path)?;
    let loaded = load_map(config)?;
    if let Some(seed) = loaded.seed {
        eprintln!(
            "Generated {} stations (seed {})",
            loaded.map.len(),
            seed
        );
    }

    let result = compute_heatmap(&model, &loaded.map, config.grid_size as usize);
    if json {
        let text = serde_json::to_string_pretty(&result.statistics)
            .map_err(|e| format!("Cannot serialize statistics: {}", e))?;
        println!("{}", text);
    } else {
        print_heatmap_summary(&result);
    }
    Ok(())
}

/// Assess a single location on the configured map.
pub fn assess(
    config: &SimulationConfig,
    config_path: &Path,
    x: f64,
    y: f64,
    json: bool,
) -> Result<(), String> {
    let model = load_model(config, config_path)?;
    let loaded = load_map(config)?;
    let assessment = model
        .assess(DVec2::new(x, y), &loaded.map)
        .map_err(|e| e.to_string())?;

    match assessment {
        Some(a) if json => {
            let text = serde_json::to_string_pretty(&a)
                .map_err(|e| format!("Cannot serialize assessment: {}", e))?;
            println!("{}", text);
        }
        Some(a) => print_assessment(&a),
        None => println!("No data at ({}, {})", x, y),
    }
    Ok(())
}

/// Infer directly from a reading triple, bypassing interpolation.
pub fn infer(
    config: &SimulationConfig,
    config_path: &Path,
    air_pollution: f64,
    population_density: f64,
    vegetation_cover: f64,
) -> Result<(), String> {
    let model = load_model(config, config_path)?;
    let score = model
        .infer(air_pollution, population_density, vegetation_cover)
        .map_err(|e| e.to_string())?;
    let category = model.categorize(score);

    println!("{}: {:.2} ({})", model.output_variable(), score, category);
    for action in recommendations_for(category) {
        println!("  - {}", action);
    }
    Ok(())
}

/// Print the display label of `variable` at `value`.
pub fn label(
    config: &SimulationConfig,
    config_path: &Path,
    variable: &str,
    value: f64,
) -> Result<(), String> {
    let model = load_model(config, config_path)?;
    let label = model
        .label_for(variable, value)
        .map_err(|e| e.to_string())?;
    println!("{} = {} -> {}", variable, value, label);
    Ok(())
}

/// List the stations of the configured map.
pub fn stations(config: &SimulationConfig) -> Result<(), String> {
    let loaded = load_map(config)?;
    if let Some(seed) = loaded.seed {
        println!("Seed: {}", seed);
    }
    println!("Interpolation: {}", describe_strategy(loaded.map.strategy()));
    println!("{}", loaded.map);
    Ok(())
}

/// List variables, terms and rules of the configured fuzzy system.
pub fn rules(config: &SimulationConfig, config_path: &Path) -> Result<(), String> {
    let model = load_model(config, config_path)?;
    let system = model.system();

    println!("=== Variables ===");
    for variable in system.variables() {
        println!(
            "{} ({}, [{}, {}) step {})",
            variable.name,
            variable.role,
            variable.universe.min,
            variable.universe.max,
            variable.universe.step
        );
        for term in variable.terms() {
            println!("  {:<12} {:<12} {}", term.name, term.label, term.function.kind());
        }
    }

    let outputs: Vec<&str> = system.consequents().map(|v| v.name.as_str()).collect();
    println!("Outputs: {}", outputs.join(", "));

    println!("\n=== Rules ===");
    for (i, rule) in system.rules().iter().enumerate() {
        let name = rule.name.as_deref().unwrap_or("");
        println!("{:>3}. {:<28} {}", i + 1, name, describe_rule(system, rule));
    }
    Ok(())
}

fn describe_strategy(strategy: InterpolationStrategy) -> String {
    match strategy {
        InterpolationStrategy::Barycentric => "barycentric".to_string(),
        InterpolationStrategy::Idw { neighbors } => format!("idw ({} neighbors)", neighbors),
    }
}

pub fn print_heatmap_summary(result: &HeatmapResult) {
    let stats: &HeatmapStatistics = &result.statistics;
    println!("=== Heatmap Summary ===");
    println!("Grid: {0}x{0} ({1} cells)", result.heatmap.grid_size, stats.cells);
    println!("Scored: {}", stats.scored_cells);
    println!("Failed: {}", stats.failed_cells);
    println!("No data: {}", stats.no_data_cells);
    if let (Some(mean), Some(min), Some(max)) = (stats.mean_score, stats.min_score, stats.max_score)
    {
        println!("Score: mean {:.2}, min {:.2}, max {:.2}", mean, min, max);
    }

    if !stats.category_distribution.is_empty() {
        println!("\nCategories:");
        for (label, count) in &stats.category_distribution {
            let pct = *count as f32 / stats.scored_cells.max(1) as f32 * 100.0;
            println!("  {:<12} {:>7} ({:.1}%)", label, count, pct);
        }
    }

    if let Some(first) = result.heatmap.failures.first() {
        println!("\nFirst failure at ({}, {}): {}", first.i, first.j, first.error);
    }
    println!("\nComputed in {:.1} ms", stats.duration_ms);
}

pub fn print_assessment(a: &Assessment) {
    println!("=== Location ({}, {}) ===", a.location[0], a.location[1]);
    println!(
        "  Air pollution:      {:>10.2}  {}",
        a.readings.air_pollution, a.labels.air_pollution
    );
    println!(
        "  Population density: {:>10.2}  {}",
        a.readings.population_density, a.labels.population_density
    );
    println!(
        "  Vegetation cover:   {:>10.2}  {}",
        a.readings.vegetation_cover, a.labels.vegetation_cover
    );
    println!(
        "  Need for action:    {:>10.2}  {} ({})",
        a.score, a.labels.need_for_action, a.category
    );
    println!();
    println!("{}", a.recommendation);
    for action in &a.actions {
        println!("  - {}", action);
    }
}
