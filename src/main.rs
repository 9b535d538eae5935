use clap::{Parser, Subcommand};
use std::path::Path;
use tracing_subscriber::EnvFilter;

use microclimate::cli::commands;
use microclimate::config::simulation::SimulationConfig;

#[derive(Parser)]
#[command(name = "microclimate")]
#[command(about = "Estimate microclimate need for action from sparse sensor stations")]
#[command(version)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Emit logs as JSON lines on stderr
    #[arg(long)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute a need-for-action heatmap over the configured grid
    Heatmap {
        /// Print statistics as JSON
        #[arg(long)]
        json: bool,
    },

    /// Interpolate readings at a location and assess them
    Assess {
        x: f64,
        y: f64,

        /// Print the assessment as JSON
        #[arg(long)]
        json: bool,
    },

    /// Infer the score for explicit readings
    Infer {
        air_pollution: f64,
        population_density: f64,
        vegetation_cover: f64,
    },

    /// Show the linguistic label of a value
    Label { variable: String, value: f64 },

    /// List the stations of the configured map
    Stations,

    /// List fuzzy variables and rules
    Rules,
}

fn init_logging(level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn main() {
    let cli = Cli::parse();

    let config_path = Path::new(&cli.config);
    let config = match SimulationConfig::from_file(config_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading config: {}", e);
            std::process::exit(1);
        }
    };
    init_logging(&config.log_level, cli.log_json);

    let result = match cli.command {
        Commands::Heatmap { json } => commands::heatmap(&config, config_path, json),
        Commands::Assess { x, y, json } => commands::assess(&config, config_path, x, y, json),
        Commands::Infer {
            air_pollution,
            population_density,
            vegetation_cover,
        } => commands::infer(
            &config,
            config_path,
            air_pollution,
            population_density,
            vegetation_cover,
        ),
        Commands::Label { variable, value } => {
            commands::label(&config, config_path, &variable, value)
        }
        Commands::Stations => commands::stations(&config),
        Commands::Rules => commands::rules(&config, config_path),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
