//! Resource locator and fetcher for the portal dataset page.
//
// Fetches the listing page, extracts the CSV resources and stages each one
// in the staging directory. Strictly sequential.

pub mod download;
pub mod http;
pub mod resources;
pub mod retry;

pub use download::{DownloadOutcome, sanitize_filename};
pub use http::{DownloadMeta, HttpClient, ReqwestClient, TlsPolicy};
pub use resources::{ResourceRef, parse_resource_items};
pub use retry::RetryPolicy;

use crate::config::{Config, NetworkConfig};
use crate::error::CrawlError;
use crate::report::StageReport;
use log::{error, info};
use std::path::{Path, PathBuf};
use std::thread;
use url::Url;

pub struct Crawler<C: HttpClient> {
    client: C,
    portal_url: Url,
    staging_dir: PathBuf,
    network: NetworkConfig,
}

impl Crawler<ReqwestClient> {
    /// Build a crawler with a real HTTP client, honouring the configured
    /// user agent and certificate policy.
    pub fn from_config(config: &Config) -> Result<Self, CrawlError> {
        let tls = TlsPolicy::from_flag(config.portal.accept_invalid_certs);
        let client = ReqwestClient::new(&config.portal.user_agent, tls)?;
        Self::with_client(client, config)
    }
}

impl<C: HttpClient> Crawler<C> {
    pub fn with_client(client: C, config: &Config) -> Result<Self, CrawlError> {
        let portal_url = Url::parse(&config.portal.url).map_err(|source| {
            CrawlError::InvalidUrl { href: config.portal.url.clone(), source }
        })?;

        Ok(Self {
            client,
            portal_url,
            staging_dir: config.storage.staging_dir.clone(),
            network: config.network.clone(),
        })
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn portal_url(&self) -> &Url {
        &self.portal_url
    }

    pub fn staging_dir(&self) -> &Path {
        &self.staging_dir
    }

    /// GET a page with the configured retry budget.
    pub fn fetch_page(&self, url: &str) -> Result<String, CrawlError> {
        let retry = RetryPolicy::new(self.network.page_attempts, self.network.page_retry_delay());

        let html = retry
            .run(&format!("Fetching {}", url), |attempt| {
                info!("Fetching page {} (attempt {}/{})", url, attempt, retry.attempts());
                self.client.get_text(url, self.network.page_timeout())
            })
            .map_err(|source| CrawlError::FetchFailed {
                url: url.to_string(),
                attempts: retry.attempts(),
                source,
            })?;

        info!("Fetched page content ({} bytes)", html.len());
        Ok(html)
    }

    pub fn parse_resource_items(&self, html: &str) -> Vec<ResourceRef> {
        parse_resource_items(html, &self.portal_url)
    }

    pub fn download_file(&self, url: &str, filename: &str) -> Result<DownloadOutcome, CrawlError> {
        let retry =
            RetryPolicy::new(self.network.download_attempts, self.network.download_retry_delay());
        download::download_file(
            &self.client,
            url,
            filename,
            &self.staging_dir,
            self.network.download_timeout(),
            retry,
        )
    }

    /// Fetch the portal page and list its resources. An empty listing is an
    /// error because nothing can be downloaded.
    pub fn locate(&self) -> Result<Vec<ResourceRef>, CrawlError> {
        let html = self.fetch_page(self.portal_url.as_str())?;
        let resources = self.parse_resource_items(&html);
        if resources.is_empty() {
            return Err(CrawlError::NoResourcesFound(self.portal_url.to_string()));
        }
        Ok(resources)
    }

    /// Locate and download every resource in page order, pausing between
    /// downloads. Item failures are counted, never fatal.
    pub fn crawl(&self) -> StageReport {
        let mut report = StageReport::new("crawl");
        info!("Starting crawl of {}", self.portal_url);

        let resources = match self.locate() {
            Ok(resources) => resources,
            Err(e) => {
                error!("Crawl aborted: {}", e);
                report.abort(e.to_string());
                return report;
            }
        };

        report.total = resources.len();
        let pacing = self.network.pacing_delay();

        for (index, resource) in resources.iter().enumerate() {
            if index > 0 && !pacing.is_zero() {
                thread::sleep(pacing);
            }

            info!("Processing file {}/{}: {}", index + 1, report.total, resource.display_name);
            match self.download_file(resource.link.as_str(), &resource.display_name) {
                Ok(_) => report.record_success(),
                Err(e) => {
                    error!("{}", e);
                    report.record_failure(e.to_string());
                }
            }
        }

        info!("Crawl finished: {}/{} files staged", report.success, report.total);
        report
    }
}
