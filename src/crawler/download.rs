use super::http::HttpClient;
use super::retry::RetryPolicy;
use crate::error::CrawlError;
use log::{debug, info, warn};
use scopeguard::ScopeGuard;
use std::fs::{self, File};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

const STAGED_EXTENSION: &str = ".csv";
const FALLBACK_STEM: &str = "download";
/// Suffix of the sibling file a download streams into before it is renamed
const PARTIAL_SUFFIX: &str = "part";

/// Result of a successful [`download_file`] call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    /// A file with the same sanitized name was already staged; no request made
    Cached(PathBuf),
    Downloaded { path: PathBuf, bytes: u64 },
}

impl DownloadOutcome {
    pub fn path(&self) -> &Path {
        match self {
            DownloadOutcome::Cached(path) => path,
            DownloadOutcome::Downloaded { path, .. } => path,
        }
    }
}

/// Keep alphanumerics, spaces, hyphens, underscores and dots, then make
/// sure the name carries the `.csv` extension.
pub fn sanitize_filename(name: &str) -> String {
    let kept: String = name
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_' | '.'))
        .collect();

    let mut safe = kept.trim_end().to_string();
    if safe.is_empty() {
        safe = FALLBACK_STEM.to_string();
    }
    if !safe.ends_with(STAGED_EXTENSION) {
        safe.push_str(STAGED_EXTENSION);
    }
    safe
}

pub fn is_csv_content_type(content_type: Option<&str>) -> bool {
    content_type
        .map(|value| {
            let value = value.to_ascii_lowercase();
            value.contains("text/csv") || value.contains("application/csv")
        })
        .unwrap_or(false)
}

/// Download `url` into `staging_dir` under the sanitized `filename`.
///
/// An existing staged file short-circuits to [`DownloadOutcome::Cached`].
/// The body streams into `<name>.part` and only a complete, non-empty body
/// is renamed onto the staged name, so an interrupted run never leaves a
/// truncated file that later runs would treat as cached.
pub fn download_file<C: HttpClient + ?Sized>(
    client: &C,
    url: &str,
    filename: &str,
    staging_dir: &Path,
    timeout: Duration,
    retry: RetryPolicy,
) -> Result<DownloadOutcome, CrawlError> {
    let safe_name = sanitize_filename(filename);
    let path = staging_dir.join(&safe_name);

    if path.exists() {
        info!("File already staged: {}", safe_name);
        return Ok(DownloadOutcome::Cached(path));
    }

    fs::create_dir_all(staging_dir)?;

    let result = retry.run(&format!("Download of {}", safe_name), |attempt| {
        info!("Downloading {} (attempt {}/{})", safe_name, attempt, retry.attempts());
        download_once(client, url, &path, timeout)
    });

    match result {
        Ok(bytes) => {
            info!("Downloaded {} ({} bytes)", safe_name, bytes);
            Ok(DownloadOutcome::Downloaded { path, bytes })
        }
        Err(e) => Err(CrawlError::DownloadFailed {
            file: safe_name,
            attempts: retry.attempts(),
            reason: e.to_string(),
        }),
    }
}

fn download_once<C: HttpClient + ?Sized>(
    client: &C,
    url: &str,
    path: &Path,
    timeout: Duration,
) -> Result<u64, CrawlError> {
    let partial = partial_path(path);
    // Leftover from a killed run.
    remove_partial(&partial);

    let file = File::create(&partial)?;
    let mut writer = scopeguard::guard(BufWriter::new(file), |writer| {
        drop(writer);
        remove_partial(&partial);
    });

    let meta = client.download(url, timeout, &mut *writer)?;
    if !is_csv_content_type(meta.content_type.as_deref()) {
        warn!(
            "Content type of {} may not be CSV: {}",
            url,
            meta.content_type.as_deref().unwrap_or("<none>")
        );
    }
    writer.flush()?;

    let size = fs::metadata(&partial)?.len();
    if size == 0 {
        let name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
        return Err(CrawlError::EmptyDownload(name));
    }

    // Close the file before it takes the staged name.
    drop(ScopeGuard::into_inner(writer));
    if let Err(e) = fs::rename(&partial, path) {
        remove_partial(&partial);
        return Err(e.into());
    }
    Ok(size)
}

fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".");
    name.push(PARTIAL_SUFFIX);
    PathBuf::from(name)
}

fn remove_partial(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => debug!("Removed incomplete file {}", path.display()),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => warn!("Could not remove incomplete file {}: {}", path.display(), e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::http::fake::{FakeClient, FakeResponse};
    use crate::crawler::http::DownloadMeta;
    use crate::error::HttpError;
    use std::cell::Cell;
    use tempfile::tempdir;
    use test_case::test_case;

    const URL: &str = "https://example.test/calendar.csv";

    fn policy() -> RetryPolicy {
        RetryPolicy::new(3, Duration::ZERO)
    }

    #[test_case("114年中華民國政府行政機關辦公日曆表", "114年中華民國政府行政機關辦公日曆表.csv" ; "cjk name kept")]
    #[test_case("a/b\\c:d*e?", "abcde.csv" ; "path characters stripped")]
    #[test_case("calendar 2024 (final) ", "calendar 2024 final.csv" ; "trailing space trimmed")]
    #[test_case("holidays.csv", "holidays.csv" ; "extension not doubled")]
    #[test_case("///", "download.csv" ; "empty after sanitizing")]
    fn test_sanitize_filename(input: &str, expected: &str) {
        assert_eq!(sanitize_filename(input), expected);
    }

    #[test_case(Some("text/csv"), true ; "text csv")]
    #[test_case(Some("Application/CSV; charset=big5"), true ; "application csv mixed case")]
    #[test_case(Some("application/octet-stream"), false ; "octet stream")]
    #[test_case(None, false ; "missing header")]
    fn test_is_csv_content_type(content_type: Option<&str>, expected: bool) {
        assert_eq!(is_csv_content_type(content_type), expected);
    }

    #[test]
    fn test_second_download_is_served_from_staging() {
        let dir = tempdir().unwrap();
        let client = FakeClient::new().respond(URL, FakeResponse::csv("date,week\n"));

        let first = download_file(&client, URL, "cal", dir.path(), Duration::ZERO, policy()).unwrap();
        let second = download_file(&client, URL, "cal", dir.path(), Duration::ZERO, policy()).unwrap();

        assert!(matches!(first, DownloadOutcome::Downloaded { bytes: 10, .. }));
        assert_eq!(second, DownloadOutcome::Cached(dir.path().join("cal.csv")));
        assert_eq!(client.calls_to(URL), 1);
    }

    /// Writes a body and records whether the staged name existed mid-stream.
    struct WatchingClient {
        staged: PathBuf,
        staged_seen_mid_stream: Cell<Option<bool>>,
    }

    impl HttpClient for WatchingClient {
        fn get_text(&self, _url: &str, _timeout: Duration) -> Result<String, HttpError> {
            Err(HttpError::Status(404))
        }

        fn download(
            &self,
            _url: &str,
            _timeout: Duration,
            sink: &mut dyn Write,
        ) -> Result<DownloadMeta, HttpError> {
            let body = vec![b'x'; 20_000];
            sink.write_all(&body).map_err(|e| HttpError::Body(e.to_string()))?;
            sink.flush().map_err(|e| HttpError::Body(e.to_string()))?;
            self.staged_seen_mid_stream.set(Some(self.staged.exists()));
            Ok(DownloadMeta { content_type: Some("text/csv".to_string()), bytes: body.len() as u64 })
        }
    }

    #[test]
    fn test_staged_name_appears_only_when_complete() {
        let dir = tempdir().unwrap();
        let client = WatchingClient {
            staged: dir.path().join("cal.csv"),
            staged_seen_mid_stream: Cell::new(None),
        };

        let outcome =
            download_file(&client, URL, "cal", dir.path(), Duration::ZERO, policy()).unwrap();

        assert_eq!(client.staged_seen_mid_stream.get(), Some(false));
        assert_eq!(outcome, DownloadOutcome::Downloaded { path: dir.path().join("cal.csv"), bytes: 20_000 });
        assert!(!dir.path().join("cal.csv.part").exists());
    }

    #[test]
    fn test_leftover_partial_file_is_not_cached() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("cal.csv.part"), "date,we").unwrap();
        let client = FakeClient::new().respond(URL, FakeResponse::csv("a,b,c,d\n"));

        let outcome =
            download_file(&client, URL, "cal", dir.path(), Duration::ZERO, policy()).unwrap();

        assert!(matches!(outcome, DownloadOutcome::Downloaded { .. }));
        assert_eq!(fs::read_to_string(dir.path().join("cal.csv")).unwrap(), "a,b,c,d\n");
        assert!(!dir.path().join("cal.csv.part").exists());
        assert_eq!(client.calls_to(URL), 1);
    }

    #[test]
    fn test_interrupted_stream_leaves_no_file() {
        let dir = tempdir().unwrap();
        let client = FakeClient::new().respond(
            URL,
            FakeResponse::Partial {
                bytes: b"date,week,isHoliday".to_vec(),
                error: HttpError::Body("connection reset".to_string()),
            },
        );

        let result = download_file(&client, URL, "cal", dir.path(), Duration::ZERO, policy());

        assert!(matches!(result, Err(CrawlError::DownloadFailed { attempts: 3, .. })));
        assert!(!dir.path().join("cal.csv").exists());
        assert!(!dir.path().join("cal.csv.part").exists());
        assert_eq!(client.calls_to(URL), 3);
    }

    #[test]
    fn test_empty_body_is_retried_and_removed() {
        let dir = tempdir().unwrap();
        let client = FakeClient::new().respond(URL, FakeResponse::csv(""));

        let result = download_file(&client, URL, "cal", dir.path(), Duration::ZERO, policy());

        match result {
            Err(CrawlError::DownloadFailed { reason, .. }) => assert!(reason.contains("empty")),
            other => panic!("unexpected result: {:?}", other),
        }
        assert!(!dir.path().join("cal.csv").exists());
        assert_eq!(client.calls_to(URL), 3);
    }

    #[test]
    fn test_transient_failure_then_success() {
        let dir = tempdir().unwrap();
        let client = FakeClient::new()
            .respond(URL, FakeResponse::Fail(HttpError::Status(503)))
            .respond(URL, FakeResponse::csv("a,b,c,d\n"));

        let outcome =
            download_file(&client, URL, "cal", dir.path(), Duration::ZERO, policy()).unwrap();

        assert_eq!(fs::read_to_string(outcome.path()).unwrap(), "a,b,c,d\n");
        assert_eq!(client.calls_to(URL), 2);
    }

    #[test]
    fn test_non_csv_content_type_still_downloads() {
        let dir = tempdir().unwrap();
        let client = FakeClient::new().respond(URL, FakeResponse::html("a,b,c,d\n"));

        let outcome =
            download_file(&client, URL, "cal", dir.path(), Duration::ZERO, policy()).unwrap();

        assert!(outcome.path().exists());
    }

    #[test]
    fn test_creates_missing_staging_dir() {
        let dir = tempdir().unwrap();
        let staging = dir.path().join("origin");
        let client = FakeClient::new().respond(URL, FakeResponse::csv("x\n"));

        download_file(&client, URL, "cal", &staging, Duration::ZERO, policy()).unwrap();

        assert!(staging.join("cal.csv").exists());
    }
}
