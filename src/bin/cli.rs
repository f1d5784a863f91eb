//! fellmatch CLI - Species exposure analysis over forestry operation layers
//!
//! Usage:
//!   fellmatch-cli analyze <project-root>
//!   fellmatch-cli cache <project-root> [--clear]
//!
//! `analyze` runs the full pipeline (observation exports + operation layers
//! in the project root), prints the exposure summary and writes the Excel
//! report under `processed/`. `cache` inspects the result-cache snapshot
//! without running anything.

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use fellmatch::{
    summarize, write_report, AnalysisRun, FellmatchError, MatchEngine, ProjectPaths, Summary,
    ACCURACY_LIMIT_METERS, NEAR_ZONE_METERS,
};

#[derive(Parser)]
#[command(name = "fellmatch-cli")]
#[command(about = "Correlates species observations with forestry operations", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the analysis and write the report workbook
    Analyze {
        /// Project root containing observation exports and layer files
        root: PathBuf,
    },

    /// Show the result-cache snapshot status
    Cache {
        /// Project root containing observation exports and layer files
        root: PathBuf,

        /// Delete the snapshot instead of showing it
        #[arg(long)]
        clear: bool,
    },
}

fn main() -> ExitCode {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format(|buf, record| writeln!(buf, "[{:5}] {}", record.level(), record.args()))
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Analyze { root } => run_analyze(&root),
        Commands::Cache { root, clear } => run_cache(&root, clear),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("[ERR] {e}");
            ExitCode::FAILURE
        }
    }
}

fn run_analyze(root: &PathBuf) -> Result<(), FellmatchError> {
    let paths = ProjectPaths::from_root(root);
    paths.ensure_output_dir()?;
    let engine = MatchEngine::new(paths.clone());

    println!("\n[Step 1] Running match pipeline...");
    let run = engine.run()?;
    if run.from_cache {
        println!("  [OK] Answered from cache snapshot (inputs unchanged)");
    } else {
        println!(
            "  [OK] {} observations, {} operations, {} match records",
            run.observations.len(),
            run.polygons.len(),
            run.records.len()
        );
    }

    println!("\n[Step 2] Aggregating exposure statistics...");
    let summary = summarize(&run);
    print_summary(&run, &summary);

    println!("\n[Step 3] Writing report workbook...");
    write_report(&run, &summary, &paths.report_file)?;
    println!("  [OK] {}", paths.report_file.display());

    Ok(())
}

fn run_cache(root: &PathBuf, clear: bool) -> Result<(), FellmatchError> {
    let paths = ProjectPaths::from_root(root);
    let engine = MatchEngine::new(paths);
    let cache = engine.cache();

    if clear {
        if cache.clear()? {
            println!("[OK] Snapshot deleted: {}", cache.path().display());
        } else {
            println!("No snapshot to delete at {}", cache.path().display());
        }
        return Ok(());
    }

    println!("Snapshot file: {}", cache.path().display());
    let fingerprint = engine.fingerprint()?;
    println!("Current input fingerprint: {}", &fingerprint[..16]);
    match cache.try_load(&fingerprint) {
        Ok(run) => println!(
            "Snapshot valid: {} observations, {} operations, {} records",
            run.observations.len(),
            run.polygons.len(),
            run.records.len()
        ),
        Err(e) => println!("Snapshot unusable (next analyze recomputes): {e}"),
    }

    Ok(())
}

/// Console banner mirroring the report's summary sheet.
fn print_summary(run: &AnalysisRun, summary: &Summary) {
    let species: Vec<&str> = summary.species.iter().map(|s| s.species.as_str()).collect();
    let last_observed = run.observations.iter().filter_map(|o| o.observed).max();

    println!("\n{}", "=".repeat(70));
    println!(
        "    ANALYSIS OF:         {}",
        if species.is_empty() {
            "(no species)".to_string()
        } else {
            species.join(", ")
        }
    );
    println!(
        "    Study period:        {}",
        match (summary.date_floor, last_observed) {
            (Some(first), Some(last)) => format!("{first} to {last}"),
            _ => "unknown".to_string(),
        }
    );
    println!(
        "    Filter:              accuracy <= {ACCURACY_LIMIT_METERS} m, near zone {NEAR_ZONE_METERS} m"
    );
    println!("{}", "=".repeat(70));

    if summary.observation_total == 0 {
        println!("\nNo usable observations after filtering; all figures are zero.");
    } else if run.polygons.is_empty() {
        println!("\nNo operations intersect the study region; all figures are zero.");
    }

    for layer in &summary.layers {
        println!("\n{} OPERATIONS:", layer.kind.label().to_uppercase());
        println!("  OBSERVATIONS:");
        println!(
            "    - Inside an operation area:            {} of {}",
            layer.observations_inside, summary.observation_total
        );
        println!(
            "    - In the near zone (0-{NEAR_ZONE_METERS} m) only:  {} of {}",
            layer.observations_near, summary.observation_total
        );
        println!("  OPERATION AREAS:");
        println!(
            "    - With observations inside:            {}",
            layer.with_inside
        );
        println!(
            "    - With observations in near zone only: {}",
            layer.near_only
        );
        println!(
            "    - TOTAL affected:                      {} of {} ({:.1}%)",
            layer.affected(),
            layer.considered,
            layer.affected_share()
        );
    }

    println!(
        "\nObservations affected overall: {} of {} ({:.1}%)",
        summary.observations_affected,
        summary.observation_total,
        summary.observations_affected_share()
    );
}
