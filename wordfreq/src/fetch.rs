//! Retrieval of the raw text to analyze, either over HTTP or from the local filesystem.
use crate::error::{
    FileIoSnafu, HttpClientSnafu, HttpStatusSnafu, InvalidSourceSnafu, InvalidUrlSnafu,
    RetrievalSnafu,
};
use crate::Result;
use async_trait::async_trait;
use reqwest::{Client, Url};
use snafu::ResultExt;
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::*;

/// Sent with every HTTP request
const USER_AGENT: &str = concat!("wordfreq/", env!("CARGO_PKG_VERSION"));

/// How long to wait for a response before giving up
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Possible places we can get text from
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TextSource {
    /// Download the text with an HTTP GET
    Url(Url),

    /// Read the text from a file
    File(PathBuf),
}

impl FromStr for TextSource {
    type Err = crate::error::WordFreqError;

    /// Anything that starts with `http://` or `https://` is a URL, everything else is a path.
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            return InvalidSourceSnafu.fail();
        }

        let lower = s.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            let url = Url::parse(s).map_err(|e| {
                InvalidUrlSnafu {
                    url: s,
                    reason: e.to_string(),
                }
                .build()
            })?;
            Ok(TextSource::Url(url))
        } else {
            Ok(TextSource::File(PathBuf::from(s)))
        }
    }
}

impl Display for TextSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TextSource::Url(url) => write!(f, "{url}"),
            TextSource::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Something that can produce the raw text for a [`TextSource`].
///
/// The rest of the pipeline only sees this trait, so it can be tested without any network or
/// filesystem access.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, source: &TextSource) -> Result<String>;
}

/// Downloads text over HTTP(S)
#[derive(Clone, Debug)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .context(HttpClientSnafu)?;

        Ok(Self { client })
    }

    /// GET `url` and return the body as text.
    ///
    /// Any status other than 2xx is an error, even if the server sent a body along with it.
    #[instrument(skip_all, fields(url = %url))]
    pub async fn fetch_url(&self, url: &Url) -> Result<String> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .context(RetrievalSnafu { url: url.as_str() })?;

        let status = response.status();
        if !status.is_success() {
            return HttpStatusSnafu {
                url: url.as_str(),
                status,
            }
            .fail();
        }

        let text = response
            .text()
            .await
            .context(RetrievalSnafu { url: url.as_str() })?;

        debug!(%status, bytes = text.len(), "Downloaded text");

        Ok(text)
    }
}

/// Read a text file from the filesystem.
///
/// The file might or might not be valid UTF-8.  If it contains invalid sequences, rather than
/// fail, they're replaced with the Unicode replacement character, which is never part of a word.
#[instrument(skip_all, fields(path = %path.display()))]
pub async fn read_file(path: &Path) -> Result<String> {
    let contents = tokio::fs::read(path)
        .await
        .with_context(|_| FileIoSnafu { path })?;

    let text = match String::from_utf8(contents) {
        Ok(text) => text,
        Err(e) => {
            warn!(path = %path.display(),
                "Input file did not decode as clean UTF-8.   \
                Invalid bytes have been replaced with a UTF-8 placeholder sequence");
            String::from_utf8_lossy(e.as_bytes()).into_owned()
        }
    };

    debug!(bytes = text.len(), "Read text file");

    Ok(text)
}

/// The [`Fetcher`] for real runs, which handles both URLs and files.
#[derive(Clone, Debug)]
pub struct SourceFetcher {
    http: HttpFetcher,
}

impl SourceFetcher {
    pub fn new() -> Result<Self> {
        Ok(Self {
            http: HttpFetcher::new()?,
        })
    }

    pub fn with_http(http: HttpFetcher) -> Self {
        Self { http }
    }
}

#[async_trait]
impl Fetcher for SourceFetcher {
    async fn fetch(&self, source: &TextSource) -> Result<String> {
        match source {
            TextSource::Url(url) => self.http.fetch_url(url).await,
            TextSource::File(path) => read_file(path).await,
        }
    }
}
