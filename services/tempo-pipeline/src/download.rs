//! Earthdata-authenticated granule downloads.
//!
//! Protected granule URLs answer an anonymous request with a redirect to the
//! Earthdata Login host. Following that redirect once with basic auth sets
//! the session cookies, after which the original URL serves the file.

use std::path::{Path, PathBuf};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::StreamExt;
use reqwest::cookie::Jar;
use reqwest::redirect::Policy;
use reqwest::{header, Client, Response, StatusCode};
use tempo_common::granule::file_name_from_url;
use thiserror::Error;
use tokio::fs::{self, File};
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, info, instrument, warn};

use crate::config::DownloadConfig;
use crate::credentials::Credentials;
use crate::retention::{remove_superseded, ProductFamily};

#[derive(Error, Debug)]
pub enum DownloadError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected HTTP {status} from {url}")]
    Status { status: StatusCode, url: String },

    #[error("Earthdata login failed with HTTP {status}")]
    Authentication { status: StatusCode },

    #[error("Redirect from {url} has no usable Location header")]
    MissingLocation { url: String },

    /// No response, or no body data, within the allowed time
    #[error("Timed out after {after:?} waiting for {phase}")]
    Timeout { phase: &'static str, after: Duration },

    #[error("Cannot derive a file name from {0}")]
    InvalidUrl(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type DownloadResult<T> = Result<T, DownloadError>;

/// Two HTTP clients sharing one cookie jar: one that never follows redirects
/// and one that follows up to the configured limit.
///
/// Neither client sets an overall request timeout, since that deadline would
/// also cover streaming the body. Connects are bounded by the handshake
/// timeout; waits for headers and body data are bounded per call.
#[derive(Clone)]
pub struct EarthdataSession {
    no_redirect: Client,
    follow: Client,
    credentials: Credentials,
    jar: Arc<Jar>,
}

impl EarthdataSession {
    pub fn new(credentials: Credentials, config: &DownloadConfig) -> DownloadResult<Self> {
        let jar = Arc::new(Jar::default());

        let no_redirect = Client::builder()
            .cookie_provider(jar.clone())
            .redirect(Policy::none())
            .connect_timeout(config.handshake_timeout)
            .user_agent(&config.user_agent)
            .build()?;
        let follow = Client::builder()
            .cookie_provider(jar.clone())
            .redirect(Policy::limited(config.max_redirects))
            .connect_timeout(config.handshake_timeout)
            .user_agent(&config.user_agent)
            .build()?;

        Ok(Self {
            no_redirect,
            follow,
            credentials,
            jar,
        })
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Whether the jar holds any cookie for `url`.
    pub fn has_cookies_for(&self, url: &str) -> bool {
        use reqwest::cookie::CookieStore;
        reqwest::Url::parse(url)
            .ok()
            .and_then(|u| self.jar.cookies(&u))
            .is_some()
    }

    /// Log whether the login host accepts the credentials. Never fails.
    pub async fn check_login(&self, profile_url: &str, config: &DownloadConfig) -> bool {
        let result = self
            .follow
            .get(profile_url)
            .basic_auth(&self.credentials.username, Some(self.credentials.password()))
            .timeout(config.handshake_timeout)
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => {
                info!(username = %self.credentials.username, "Earthdata credentials accepted");
                true
            }
            Ok(response) => {
                warn!(status = %response.status(), "Earthdata login check was not successful");
                false
            }
            Err(e) => {
                warn!(error = %e, "Earthdata login check failed");
                false
            }
        }
    }
}

/// What a download call produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    Downloaded { path: PathBuf, bytes: u64 },
    /// The file was already present; nothing was fetched
    AlreadyPresent(PathBuf),
}

impl DownloadOutcome {
    pub fn path(&self) -> &Path {
        match self {
            DownloadOutcome::Downloaded { path, .. } => path,
            DownloadOutcome::AlreadyPresent(path) => path,
        }
    }
}

/// Downloads protected granules into one directory.
pub struct AuthenticatedDownloader {
    session: EarthdataSession,
    dest_dir: PathBuf,
    config: DownloadConfig,
    family: Option<ProductFamily>,
}

impl AuthenticatedDownloader {
    pub fn new(session: EarthdataSession, dest_dir: impl Into<PathBuf>, config: DownloadConfig) -> Self {
        Self {
            session,
            dest_dir: dest_dir.into(),
            config,
            family: None,
        }
    }

    /// Delete older files of `family` after each new download.
    pub fn with_retention(mut self, family: ProductFamily) -> Self {
        self.family = Some(family);
        self
    }

    pub fn dest_dir(&self) -> &Path {
        &self.dest_dir
    }

    /// Fetch `url` into the destination directory under its last path segment.
    ///
    /// Returns immediately if that file already exists.
    #[instrument(skip(self), fields(url = %url))]
    pub async fn download(&self, url: &str) -> DownloadResult<DownloadOutcome> {
        let filename =
            file_name_from_url(url).ok_or_else(|| DownloadError::InvalidUrl(url.to_string()))?;
        let path = self.dest_dir.join(filename);

        if fs::try_exists(&path).await? {
            info!(path = %path.display(), "File already exists, skipping download");
            return Ok(DownloadOutcome::AlreadyPresent(path));
        }

        fs::create_dir_all(&self.dest_dir).await?;

        let response = self.authenticate(url).await?;
        let bytes = self.stream_to_file(response, &path).await?;

        if let Some(family) = &self.family {
            remove_superseded(&self.dest_dir, family, &path);
        }

        Ok(DownloadOutcome::Downloaded { path, bytes })
    }

    /// Run the redirect handshake and return a 200 response for `url`.
    ///
    /// The returned body has not been read yet.
    async fn authenticate(&self, url: &str) -> DownloadResult<Response> {
        let handshake = self.config.handshake_timeout;
        let first = within(
            handshake,
            "response headers",
            self.session.no_redirect.get(url).send(),
        )
        .await??;

        match first.status() {
            StatusCode::OK => {
                debug!("No redirect, downloading directly");
                Ok(first)
            }
            StatusCode::MOVED_PERMANENTLY | StatusCode::FOUND => {
                let location = redirect_target(&first)
                    .ok_or_else(|| DownloadError::MissingLocation { url: url.to_string() })?;
                info!(location = %truncate(&location, 100), "Following login redirect");

                let login = self
                    .session
                    .follow
                    .get(location)
                    .basic_auth(
                        &self.session.credentials.username,
                        Some(self.session.credentials.password()),
                    )
                    .timeout(handshake)
                    .send()
                    .await?;
                if login.status() != StatusCode::OK {
                    return Err(DownloadError::Authentication {
                        status: login.status(),
                    });
                }
                info!("Authenticated, requesting granule");

                let response = within(
                    self.config.transfer_timeout,
                    "response headers",
                    self.session.follow.get(url).send(),
                )
                .await??;
                if response.status() != StatusCode::OK {
                    return Err(DownloadError::Status {
                        status: response.status(),
                        url: url.to_string(),
                    });
                }
                Ok(response)
            }
            status => Err(DownloadError::Status {
                status,
                url: url.to_string(),
            }),
        }
    }

    /// Write the body to `path`, removing the file if anything fails.
    async fn stream_to_file(&self, response: Response, path: &Path) -> DownloadResult<u64> {
        let file = File::create(path).await?;
        let result = self.write_body(response, file).await;
        match result {
            Ok(bytes) => Ok(bytes),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Download failed, removing partial file");
                if let Err(remove_err) = fs::remove_file(path).await {
                    warn!(path = %path.display(), error = %remove_err, "Failed to remove partial file");
                }
                Err(e)
            }
        }
    }

    async fn write_body(&self, response: Response, file: File) -> DownloadResult<u64> {
        let total = response.content_length();
        let started = Instant::now();
        info!(total_bytes = ?total, "Starting download");

        let mut writer = BufWriter::with_capacity(self.config.chunk_size, file);
        let mut stream = response.bytes_stream();
        let mut downloaded = 0u64;
        let mut next_report = self.config.progress_interval;

        // The transfer timeout bounds each gap between chunks, not the whole body
        while let Some(chunk) =
            within(self.config.transfer_timeout, "body data", stream.next()).await?
        {
            let chunk = chunk?;
            writer.write_all(&chunk).await?;
            downloaded += chunk.len() as u64;

            if downloaded >= next_report {
                next_report += self.config.progress_interval;
                let mib = downloaded as f64 / (1024.0 * 1024.0);
                match total.filter(|&t| t > 0) {
                    Some(total) => info!(
                        percent = format!("{:.1}%", downloaded as f64 / total as f64 * 100.0),
                        downloaded_mib = format!("{:.1}", mib),
                        "Download progress"
                    ),
                    None => info!(downloaded_mib = format!("{:.1}", mib), "Download progress"),
                }
            }
        }

        writer.flush().await?;
        writer.into_inner().sync_all().await?;

        info!(
            bytes = downloaded,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Download completed"
        );
        Ok(downloaded)
    }
}

/// Await `future`, failing with [`DownloadError::Timeout`] after `limit`.
async fn within<F: Future>(
    limit: Duration,
    phase: &'static str,
    future: F,
) -> DownloadResult<F::Output> {
    tokio::time::timeout(limit, future)
        .await
        .map_err(|_| DownloadError::Timeout { phase, after: limit })
}

/// Absolute target of a redirect response.
fn redirect_target(response: &Response) -> Option<String> {
    let location = response.headers().get(header::LOCATION)?.to_str().ok()?;
    response.url().join(location).ok().map(|u| u.to_string())
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
