use crate::config::Config;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// gov-calendar - fetch the government office calendar and publish it as JSON
#[derive(Debug, Parser)]
#[command(name = "gov-calendar")]
#[command(about = "Fetch the government office calendar CSV files and convert them to per-year JSON", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Command to execute (defaults to the full pipeline)
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Path to a TOML config file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Dataset page listing the CSV resources
    #[arg(long, global = true)]
    pub portal_url: Option<String>,

    /// Directory holding downloaded CSV files
    #[arg(long, global = true)]
    pub staging_dir: Option<PathBuf>,

    /// Directory receiving the per-year JSON files
    #[arg(long, global = true)]
    pub output_dir: Option<PathBuf>,

    /// Log filter, e.g. "debug" or "gov_calendar=trace"
    #[arg(long, global = true)]
    pub log_level: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Commands {
    /// Download new calendar files, then convert everything staged
    Run,

    /// Only download calendar files into the staging directory
    Crawl,

    /// Only convert already staged files
    Convert,

    /// Show staged and published files without touching the network
    Summary {
        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },
}

impl Cli {
    /// Apply command-line overrides on top of the loaded config
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(url) = &self.portal_url {
            config.portal.url = url.clone();
        }
        if let Some(dir) = &self.staging_dir {
            config.storage.staging_dir = dir.clone();
        }
        if let Some(dir) = &self.output_dir {
            config.storage.output_dir = dir.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_to_no_subcommand() {
        let cli = Cli::parse_from(["gov-calendar"]);
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_overrides_apply_to_config() {
        let cli = Cli::parse_from([
            "gov-calendar",
            "convert",
            "--staging-dir",
            "raw",
            "--output-dir",
            "public",
        ]);
        let mut config = Config::default();
        cli.apply_overrides(&mut config);

        assert_eq!(cli.command, Some(Commands::Convert));
        assert_eq!(config.storage.staging_dir, PathBuf::from("raw"));
        assert_eq!(config.storage.output_dir, PathBuf::from("public"));
        assert_eq!(config.portal.url, crate::config::DEFAULT_PORTAL_URL);
    }

    #[test]
    fn test_summary_json_flag() {
        let cli = Cli::parse_from(["gov-calendar", "summary", "--json"]);
        assert_eq!(cli.command, Some(Commands::Summary { json: true }));
    }
}
