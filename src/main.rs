use clap::Parser;
use regional_health_atlas::{config::AppConfig, pipeline};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// TOML configuration; the default input and output file names are used without it
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    let app_config = match &cli.config {
        Some(path) => {
            println!("Running analysis with config: {:?}", path);
            AppConfig::load_from_file(path)?
        }
        None => AppConfig::default(),
    };

    let report = pipeline::run(&app_config)?;

    println!(
        "Matched {} of {} facilities to {} regions.",
        report.facility_join.matches.len(),
        report.facilities.len(),
        report.regions.len()
    );
    for artifact in &report.artifacts {
        println!("  wrote {}", artifact.display());
    }
    println!("Analysis complete!");

    Ok(())
}
