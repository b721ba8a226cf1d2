//! Pipeline orchestration: environment check, crawl, convert, summary.

use crate::config::Config;
use crate::converter::Converter;
use crate::crawler::{Crawler, HttpClient, ReqwestClient};
use crate::report::{RunSummary, StageReport};
use anyhow::{Context, Result};
use chrono::Local;
use log::{debug, error, info, warn};
use std::fs;
use std::time::{Duration, Instant};

const PROBE_TIMEOUT: Duration = Duration::from_secs(10);
const BANNER: &str = "============================================================";

pub struct CalendarSystem<C: HttpClient> {
    config: Config,
    crawler: Crawler<C>,
    converter: Converter,
}

impl CalendarSystem<ReqwestClient> {
    pub fn new(config: Config) -> Result<Self> {
        let crawler = Crawler::from_config(&config).context("Failed to set up the crawler")?;
        Ok(Self::assemble(config, crawler))
    }
}

impl<C: HttpClient> CalendarSystem<C> {
    pub fn with_client(config: Config, client: C) -> Result<Self> {
        let crawler =
            Crawler::with_client(client, &config).context("Failed to set up the crawler")?;
        Ok(Self::assemble(config, crawler))
    }

    fn assemble(config: Config, crawler: Crawler<C>) -> Self {
        let converter = Converter::from_config(&config);
        Self { config, crawler, converter }
    }

    pub fn crawler(&self) -> &Crawler<C> {
        &self.crawler
    }

    pub fn converter(&self) -> &Converter {
        &self.converter
    }

    /// Create the working directories and optionally probe connectivity.
    /// Only directory creation can fail the check.
    pub fn check_environment(&self) -> Result<()> {
        info!("Checking environment");

        for dir in [&self.config.storage.staging_dir, &self.config.storage.output_dir] {
            fs::create_dir_all(dir)
                .with_context(|| format!("Cannot create directory {}", dir.display()))?;
        }

        if let Some(probe_url) = &self.config.portal.connectivity_probe_url {
            match self.crawler.client().get_text(probe_url, PROBE_TIMEOUT) {
                Ok(_) => debug!("Connectivity probe to {} succeeded", probe_url),
                Err(e) => warn!("Connectivity probe to {} failed: {}", probe_url, e),
            }
        }

        info!("Environment check passed");
        Ok(())
    }

    pub fn execute_crawling(&self, errors: &mut Vec<String>) -> StageReport {
        stage_banner("Crawl stage");
        let report = self.crawler.crawl();
        record_stage_error(&report, "no files downloaded", errors);
        report
    }

    pub fn execute_conversion(&self, errors: &mut Vec<String>) -> StageReport {
        stage_banner("Conversion stage");
        let report = self.converter.convert_all();
        record_stage_error(&report, "no files converted", errors);
        report
    }

    /// Environment check plus the crawl stage alone
    pub fn crawl_only(&self) -> Result<StageReport> {
        self.check_environment()?;
        let mut errors = Vec::new();
        Ok(self.execute_crawling(&mut errors))
    }

    /// Run the whole pipeline. Conversion runs even when crawling failed, so
    /// files staged by earlier runs are still published.
    pub fn run(&self) -> RunSummary {
        let started = Instant::now();
        info!("Office calendar pipeline starting at {}", Local::now().format("%Y-%m-%d %H:%M:%S"));

        let mut errors = Vec::new();
        let (crawl, convert) = match self.run_stages(&mut errors) {
            Ok(reports) => reports,
            Err(e) => {
                error!("Unexpected error during run: {:?}", e);
                errors.push(format!("system error: {:#}", e));
                (StageReport::new("crawl"), StageReport::new("convert"))
            }
        };

        let summary = RunSummary::new(
            started.elapsed().as_secs_f64(),
            &crawl,
            &convert,
            self.converter.conversion_summary(),
            errors,
        );
        summary.log();
        summary
    }

    fn run_stages(&self, errors: &mut Vec<String>) -> Result<(StageReport, StageReport)> {
        self.check_environment()?;

        let crawl = self.execute_crawling(errors);
        let convert = self.execute_conversion(errors);

        info!("Crawl stage: {}", status_word(&crawl));
        info!("Conversion stage: {}", status_word(&convert));
        Ok((crawl, convert))
    }
}

fn stage_banner(title: &str) {
    info!("{}", BANNER);
    info!("{}", title);
    info!("{}", BANNER);
}

fn record_stage_error(report: &StageReport, empty_message: &str, errors: &mut Vec<String>) {
    if report.succeeded() {
        info!(
            "{} stage finished: {}/{} files",
            report.stage, report.success, report.total
        );
        return;
    }

    let message = match &report.fatal {
        Some(fatal) => format!("{} stage: {}", report.stage, fatal),
        None => format!("{} stage: {}", report.stage, empty_message),
    };
    error!("{}", message);
    errors.push(message);
}

fn status_word(report: &StageReport) -> &'static str {
    if report.succeeded() { "succeeded" } else { "failed" }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::http::fake::{FakeClient, FakeResponse};
    use crate::error::HttpError;
    use tempfile::tempdir;

    const PORTAL: &str = "https://data.gov.tw/dataset/14718";

    fn config(root: &std::path::Path) -> Config {
        let mut config = Config::default();
        config.storage.staging_dir = root.join("origin");
        config.storage.output_dir = root.join("docs");
        config.network = config.network.without_delays();
        config
    }

    #[test]
    fn test_check_environment_creates_dirs() {
        let dir = tempdir().unwrap();
        let mut config = config(dir.path());
        config.portal.connectivity_probe_url = Some("https://probe.test/".to_string());
        let system = CalendarSystem::with_client(config, FakeClient::new()).unwrap();

        system.check_environment().unwrap();

        assert!(dir.path().join("origin").is_dir());
        assert!(dir.path().join("docs").is_dir());
        assert_eq!(system.crawler().client().calls_to("https://probe.test/"), 1);
    }

    #[test]
    fn test_unwritable_directory_fails_the_run() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "not a directory").unwrap();
        let mut config = config(dir.path());
        config.storage.output_dir = blocker.join("docs");
        let system = CalendarSystem::with_client(config, FakeClient::new()).unwrap();

        let summary = system.run();

        assert!(!summary.overall_success);
        assert!(summary.errors[0].starts_with("system error"));
    }

    #[test]
    fn test_fetch_failure_still_converts_staged_files() {
        let dir = tempdir().unwrap();
        let config = config(dir.path());
        fs::create_dir_all(&config.storage.staging_dir).unwrap();
        fs::write(
            config.storage.staging_dir.join("114年日曆.csv"),
            "西元日期,星期,是否放假,備註\n20250101,三,2,開國紀念日\n",
        )
        .unwrap();
        let client =
            FakeClient::new().respond(PORTAL, FakeResponse::Fail(HttpError::Status(503)));
        let system = CalendarSystem::with_client(config, client).unwrap();

        let summary = system.run();

        assert_eq!(summary.conversion_results.success, 1);
        assert_eq!(summary.crawl_results.total, 0);
        assert_eq!(summary.errors.len(), 1);
        assert!(summary.errors[0].starts_with("crawl stage:"));
        assert!(!summary.overall_success);
        assert!(dir.path().join("docs").join("2025.json").exists());
    }
}
