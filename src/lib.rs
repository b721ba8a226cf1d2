pub mod cli;
pub mod config;
pub mod converter;
pub mod crawler;
pub mod error;
pub mod report;
pub mod system;

use anyhow::Result;
use env_logger::Env;
use log::*;
use std::env;

use crate::cli::{Cli, Commands};

/// Fallback log filter when neither `--log-level` nor `RUST_LOG` is set
pub const LOG_LEVEL_ENV: &str = "GOVCAL_LOG_LEVEL";

/// Dispatch a parsed command line. Returns whether the command succeeded.
pub fn run(cli: Cli) -> Result<bool> {
    let mut config = Config::load(cli.config.as_deref())?;
    cli.apply_overrides(&mut config);

    match cli.command.clone().unwrap_or(Commands::Run) {
        Commands::Run => {
            let system = system::CalendarSystem::new(config)?;
            Ok(system.run().overall_success)
        }
        Commands::Crawl => {
            let system = system::CalendarSystem::new(config)?;
            let report = system.crawl_only()?;
            Ok(report.succeeded())
        }
        Commands::Convert => {
            let report = converter::Converter::from_config(&config).convert_all();
            info!("Converted {}/{} files", report.success, report.total);
            Ok(report.succeeded())
        }
        Commands::Summary { json } => {
            let stats = converter::Converter::from_config(&config).conversion_summary();
            if json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                println!("{} CSV file(s) staged:", stats.csv_files);
                for name in &stats.csv_file_list {
                    println!("  {}", name);
                }
                println!("{} JSON file(s) published:", stats.json_files);
                for name in &stats.json_file_list {
                    println!("  {}", name);
                }
            }
            Ok(true)
        }
    }
}

pub fn init_logger(level: Option<&str>) {
    let fallback = env::var(LOG_LEVEL_ENV).unwrap_or_else(|_| "info".to_string());
    let mut builder = env_logger::Builder::from_env(Env::default().default_filter_or(fallback));
    if let Some(level) = level {
        builder.parse_filters(level);
    }

    builder
        .format(|buf, record| {
            use chrono::Local;
            use std::io::Write;
            writeln!(
                buf,
                "{} [{}] {}",
                Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.args()
            )
        })
        .init();
}

// Re-export commonly used types
pub use config::Config;
pub use converter::{Converter, DayRecord};
pub use crawler::{Crawler, ResourceRef};
pub use report::{RunSummary, StageReport};
