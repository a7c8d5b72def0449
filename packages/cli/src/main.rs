#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command-line front end for the impact map toolchain.
//!
//! Loads the configured datasets and either analyzes one work, lists the
//! known works, or starts the HTTP server.

use std::sync::Arc;

use clap::{Parser, Subcommand};
use impact_map_analytics::ImpactAnalyzer;
use impact_map_analytics::config::AppConfig;
use impact_map_analytics_models::ImpactAnalysisResult;

#[derive(Parser)]
#[command(name = "impact_map", about = "Construction work impact analysis")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze the work whose name contains QUERY
    Analyze {
        /// Free-text work name
        query: String,
        /// Buffer distance in metres (overrides the configuration)
        #[arg(long)]
        buffer: Option<f64>,
        /// Print the full result as JSON
        #[arg(long)]
        json: bool,
    },
    /// List the names of every work
    Works,
    /// Start the HTTP server
    Serve,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init_custom_env("RUST_LOG");
    let cli = Cli::parse();

    let mut config = AppConfig::load()?;
    if let Commands::Analyze {
        buffer: Some(distance),
        ..
    } = &cli.command
    {
        config.analysis.buffer_distance_m = *distance;
    }

    let analyzer = impact_map_server::load_analyzer(&config)?;
    log::debug!(
        "Analyzer ready: {}m buffer in {}",
        config.analysis.buffer_distance_m,
        config.analysis.working_crs
    );

    match cli.command {
        Commands::Analyze { query, json, .. } => analyze(&analyzer, &query, json)?,
        Commands::Works => {
            for name in analyzer.work_names() {
                println!("{name}");
            }
        }
        Commands::Serve => {
            actix_web::rt::System::new().block_on(impact_map_server::serve(Arc::new(analyzer)))?;
        }
    }

    Ok(())
}

/// Runs one analysis and prints it. A work that cannot be found is
/// reported on stdout; defects are returned as errors.
fn analyze(
    analyzer: &ImpactAnalyzer,
    query: &str,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let result = match analyzer.run_impact_analysis(query) {
        Ok(result) => result,
        Err(e) if e.is_user_facing() => {
            println!("{}", e.user_message());
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&to_json(&result))?);
    } else {
        let [west, south, east, north] = result.map.bounds;
        println!("Work:               {}", result.matched_work_name);
        println!(
            "Buffer:             {} m",
            analyzer.config().buffer_distance_m
        );
        println!("Affected buildings: {}", result.affected_building_count());
        println!(
            "Affected residents: {} ({:.2} estimated)",
            result.affected_population_count, result.affected_population
        );
        println!("Bounds:             [{west:.6}, {south:.6}, {east:.6}, {north:.6}]");
    }

    Ok(())
}

fn to_json(result: &ImpactAnalysisResult) -> serde_json::Value {
    serde_json::json!({
        "matchedWorkName": result.matched_work_name,
        "summary": result.summary,
        "affectedBuildingCount": result.affected_building_count(),
        "affectedPopulation": result.affected_population,
        "affectedPopulationCount": result.affected_population_count,
        "map": result.map,
    })
}
