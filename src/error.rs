//! Error taxonomy for the acquisition and normalisation stages.
//!
//! Item-level and row-level variants are absorbed by the stage that raises
//! them; only stage-level failures reach the run summary.

use std::path::PathBuf;
use thiserror::Error;

/// Transport-level failure of a single HTTP exchange.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HttpError {
    #[error("request failed: {0}")]
    Transport(String),
    #[error("server responded with HTTP {0}")]
    Status(u16),
    #[error("failed to read response body: {0}")]
    Body(String),
}

/// Failures of the resource locator and fetcher.
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("failed to fetch {url} after {attempts} attempts: {source}")]
    FetchFailed {
        url: String,
        attempts: u32,
        #[source]
        source: HttpError,
    },
    #[error("no downloadable resources found on {0}")]
    NoResourcesFound(String),
    #[error("download of '{file}' failed after {attempts} attempts: {reason}")]
    DownloadFailed { file: String, attempts: u32, reason: String },
    #[error("downloaded file '{0}' is empty")]
    EmptyDownload(String),
    #[error("invalid resource link '{href}': {source}")]
    InvalidUrl {
        href: String,
        #[source]
        source: url::ParseError,
    },
    #[error("failed to build HTTP client: {0}")]
    Client(String),
    #[error(transparent)]
    Http(#[from] HttpError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Failures of the record normaliser.
#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("could not read tabular data from {0}")]
    ReadFailure(PathBuf),
    #[error("invalid table structure: {0}")]
    StructureInvalid(String),
    #[error("row {row}: {reason}")]
    RowConversion { row: usize, reason: String },
    #[error("no records could be converted from {0}")]
    NoRecordsProduced(PathBuf),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
