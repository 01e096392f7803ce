//! Where catalog documents come from.

use crate::error::{ErrorKind, Result};
use async_trait::async_trait;
use exn::ResultExt;
use reqwest::StatusCode;
use reqwest::header::{ETAG, IF_NONE_MATCH, USER_AGENT};
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Outcome of a conditional fetch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Document {
    /// The validator sent along still matches; the local copy is current.
    NotModified,
    /// A new body, with the validator to present next time (if the server
    /// handed one out).
    Fetched { body: Vec<u8>, validator: Option<String> },
}

/// Conditional document fetch.
///
/// A source must treat a "not modified" answer as success and every other
/// non-success status as an error. Timeouts are the source's business.
#[async_trait]
pub trait DocumentSource: Send + Sync {
    async fn fetch(&self, url: &str, validator: Option<&str>) -> Result<Document>;
}

/// [`DocumentSource`] over HTTP, using entity tags as validators.
#[derive(Clone, Debug)]
pub struct HttpSource {
    client: reqwest::Client,
}

impl HttpSource {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .or_raise(|| ErrorKind::Client)?;
        Ok(Self { client })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl DocumentSource for HttpSource {
    #[tracing::instrument(skip(self))]
    async fn fetch(&self, url: &str, validator: Option<&str>) -> Result<Document> {
        let mut request = self
            .client
            .get(url)
            .header(USER_AGENT, concat!("slm/", env!("CARGO_PKG_VERSION")));
        if let Some(validator) = validator {
            request = request.header(IF_NONE_MATCH, validator);
        }
        let response = request.send().await.or_raise(|| ErrorKind::Unreachable(url.to_string()))?;
        let status = response.status();
        if status == StatusCode::NOT_MODIFIED {
            tracing::debug!("Document not modified");
            return Ok(Document::NotModified);
        }
        if !status.is_success() {
            exn::bail!(ErrorKind::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        let validator = response
            .headers()
            .get(ETAG)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.bytes().await.or_raise(|| ErrorKind::Unreachable(url.to_string()))?;
        tracing::debug!(bytes = body.len(), validator = ?validator, "Downloaded document");
        Ok(Document::Fetched {
            body: body.to_vec(),
            validator,
        })
    }
}

/// In-memory [`DocumentSource`] for tests.
///
/// Each registered document has a body and an entity tag; a fetch presenting
/// the current tag gets [`Document::NotModified`]. URLs that were never
/// registered answer with a 404.
#[cfg(feature = "mock")]
#[derive(Debug, Default)]
pub struct MockSource {
    documents: std::sync::Mutex<std::collections::HashMap<String, (Vec<u8>, String)>>,
    fetches: std::sync::atomic::AtomicUsize,
    transfers: std::sync::atomic::AtomicUsize,
}

#[cfg(feature = "mock")]
impl MockSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the document served at `url`.
    pub fn serve(&self, url: impl Into<String>, body: impl Into<Vec<u8>>, etag: impl Into<String>) {
        if let Ok(mut documents) = self.documents.lock() {
            documents.insert(url.into(), (body.into(), etag.into()));
        }
    }

    /// Stop serving `url`; later fetches fail with a 404.
    pub fn remove(&self, url: &str) {
        if let Ok(mut documents) = self.documents.lock() {
            documents.remove(url);
        }
    }

    /// Number of fetches made, whatever their outcome.
    pub fn fetches(&self) -> usize {
        self.fetches.load(std::sync::atomic::Ordering::SeqCst)
    }

    /// Number of fetches that transferred a body.
    pub fn transfers(&self) -> usize {
        self.transfers.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(feature = "mock")]
#[async_trait]
impl DocumentSource for MockSource {
    async fn fetch(&self, url: &str, validator: Option<&str>) -> Result<Document> {
        use std::sync::atomic::Ordering;

        self.fetches.fetch_add(1, Ordering::SeqCst);
        let served = self.documents.lock().ok().and_then(|documents| documents.get(url).cloned());
        let Some((body, etag)) = served else {
            exn::bail!(ErrorKind::Status {
                url: url.to_string(),
                status: 404,
            });
        };
        if validator == Some(etag.as_str()) {
            return Ok(Document::NotModified);
        }
        self.transfers.fetch_add(1, Ordering::SeqCst);
        Ok(Document::Fetched {
            body,
            validator: Some(etag),
        })
    }
}
