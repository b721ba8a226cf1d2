//! HTTP access for the crawler.
//!
//! The crawler only talks to the network through [`HttpClient`], so the
//! page-scraping and download logic can be exercised without a live portal.

use crate::error::{CrawlError, HttpError};
use log::warn;
use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use std::io::Write;
use std::time::Duration;

/// Metadata about a body that was streamed into a writer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadMeta {
    pub content_type: Option<String>,
    pub bytes: u64,
}

/// Blocking GET operations used by the crawler
pub trait HttpClient {
    /// Fetch a page and return its body decoded as UTF-8.
    fn get_text(&self, url: &str, timeout: Duration) -> Result<String, HttpError>;

    /// Stream a response body into `sink`. Bytes already written stay in the
    /// sink when an error is returned; the caller owns cleanup.
    fn download(
        &self,
        url: &str,
        timeout: Duration,
        sink: &mut dyn Write,
    ) -> Result<DownloadMeta, HttpError>;
}

/// Certificate handling for portal traffic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TlsPolicy {
    Verify,
    /// Skip certificate validation. Only for hosts with known-broken chains.
    AcceptInvalidCerts,
}

impl TlsPolicy {
    pub fn from_flag(accept_invalid_certs: bool) -> Self {
        if accept_invalid_certs { TlsPolicy::AcceptInvalidCerts } else { TlsPolicy::Verify }
    }
}

/// [`HttpClient`] backed by a blocking reqwest client
pub struct ReqwestClient {
    client: Client,
}

impl ReqwestClient {
    pub fn new(user_agent: &str, tls: TlsPolicy) -> Result<Self, CrawlError> {
        let mut builder = Client::builder()
            .user_agent(user_agent)
            .connect_timeout(Duration::from_secs(10));

        if tls == TlsPolicy::AcceptInvalidCerts {
            warn!("TLS certificate validation is disabled for portal requests");
            builder = builder.danger_accept_invalid_certs(true);
        }

        let client = builder.build().map_err(|e| CrawlError::Client(e.to_string()))?;
        Ok(Self { client })
    }

    fn send(&self, url: &str, timeout: Duration) -> Result<reqwest::blocking::Response, HttpError> {
        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .map_err(|e| HttpError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(HttpError::Status(status.as_u16()));
        }
        Ok(response)
    }
}

impl HttpClient for ReqwestClient {
    fn get_text(&self, url: &str, timeout: Duration) -> Result<String, HttpError> {
        let response = self.send(url, timeout)?;
        // The portal does not always declare a charset; it is always UTF-8.
        let body = response.bytes().map_err(|e| HttpError::Body(e.to_string()))?;
        Ok(String::from_utf8_lossy(&body).into_owned())
    }

    fn download(
        &self,
        url: &str,
        timeout: Duration,
        sink: &mut dyn Write,
    ) -> Result<DownloadMeta, HttpError> {
        let mut response = self.send(url, timeout)?;
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);

        let bytes = response.copy_to(sink).map_err(|e| HttpError::Body(e.to_string()))?;
        Ok(DownloadMeta { content_type, bytes })
    }
}
