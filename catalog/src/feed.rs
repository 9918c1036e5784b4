//! Feed ingestion: turning the external workshop feed into catalog records.
//!
//! The feed is a Collection+JSON document. Every item carries a list of
//! `{name, value}` properties and optionally a link with relation
//! `"slot item"` whose `prompt` encodes the program slot as
//! `"<start>+<end>"` (two ISO-8601 instants).
//!
//! ```text
//! {"collection": {"items": [
//!   {"data": [{"name": "slug", "value": "java-intro"},
//!             {"name": "title", "value": "Intro to Java"},
//!             {"name": "published", "value": true},
//!             {"name": "format", "value": "workshop"}],
//!    "links": [{"rel": "slot item", "href": "...",
//!               "prompt": "2024-06-10T09:00:00Z+2024-06-10T12:00:00Z"}]}
//! ]}}
//! ```
//!
//! Only items that are published *and* have format `"workshop"` become
//! records; everything else is skipped silently.
//!
//! # Failure classes
//!
//! | Error | Class |
//! |-------|-------|
//! | [`FeedError::InvalidLocation`], [`FeedError::Unreachable`], [`FeedError::Io`] | configuration |
//! | [`FeedError::Parse`], [`FeedError::InvalidItem`] | parse |
//!
//! Both are fatal at startup. An unconfigured feed is not an error: it
//! yields an empty catalog.

use chrono::{DateTime, Utc};
use confreg_core::workshop::{Schedule, WorkshopId, WorkshopRecord};
use serde::Deserialize;
use serde_json::Value;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Link relation carrying the program slot.
pub const SLOT_ITEM_REL: &str = "slot item";

/// Format value that marks an item as a workshop.
pub const WORKSHOP_FORMAT: &str = "workshop";

/// How long a feed URL gets to answer at startup.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors raised while resolving, reading or parsing the feed.
#[derive(Error, Debug)]
pub enum FeedError {
    /// The configured location is not a usable URL.
    #[error("Invalid feed location '{location}': {reason}")]
    InvalidLocation {
        /// Location as configured.
        location: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The feed URL could not be fetched.
    #[error("Feed at {location} is unreachable: {reason}")]
    Unreachable {
        /// Requested URL.
        location: String,
        /// Underlying failure.
        reason: String,
    },

    /// The feed file could not be read.
    #[error("Failed to read feed file {path}: {source}")]
    Io {
        /// File that was read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The document is not a Collection+JSON collection.
    #[error("Feed is not a valid collection: {0}")]
    Parse(String),

    /// A workshop item lacks required fields or has a malformed slot.
    #[error("Feed item '{item}' is invalid: {reason}")]
    InvalidItem {
        /// Slug or position of the offending item.
        item: String,
        /// What is wrong with it.
        reason: String,
    },
}

impl FeedError {
    /// `true` for errors caused by where the feed points rather than what it contains.
    #[must_use]
    pub const fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::InvalidLocation { .. } | Self::Unreachable { .. } | Self::Io { .. }
        )
    }
}

#[derive(Debug, Deserialize)]
struct Document {
    collection: Collection,
}

#[derive(Debug, Deserialize)]
struct Collection {
    #[serde(default)]
    items: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    #[serde(default)]
    data: Vec<Property>,
    #[serde(default)]
    links: Vec<Link>,
}

#[derive(Debug, Deserialize)]
struct Property {
    name: String,
    #[serde(default)]
    value: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct Link {
    rel: String,
    #[serde(default)]
    prompt: Option<String>,
}

impl Item {
    /// First property with this name that carries a value.
    fn property(&self, name: &str) -> Option<&Value> {
        self.data
            .iter()
            .filter(|p| p.name == name)
            .find_map(|p| p.value.as_ref().filter(|v| !v.is_null()))
    }

    fn string_property(&self, name: &str) -> Option<&str> {
        self.property(name).and_then(Value::as_str)
    }

    fn is_published_workshop(&self) -> bool {
        let published = matches!(self.property("published"), Some(Value::Bool(true)));
        published && self.string_property("format") == Some(WORKSHOP_FORMAT)
    }

    fn link(&self, rel: &str) -> Option<&Link> {
        self.links.iter().find(|l| l.rel == rel)
    }

    fn to_record(&self, position: usize) -> Result<WorkshopRecord, FeedError> {
        let slug = self.string_property("slug").ok_or_else(|| FeedError::InvalidItem {
            item: format!("#{position}"),
            reason: "missing string property 'slug'".to_string(),
        })?;
        let invalid = |reason: String| FeedError::InvalidItem {
            item: slug.to_string(),
            reason,
        };

        let title = self
            .string_property("title")
            .ok_or_else(|| invalid("missing string property 'title'".to_string()))?;
        let summary = self.string_property("summary").map(str::to_string);
        let id = WorkshopId::new(slug);

        match self.link(SLOT_ITEM_REL) {
            Some(link) => {
                let prompt = link
                    .prompt
                    .as_deref()
                    .ok_or_else(|| invalid("slot item link has no prompt".to_string()))?;
                let schedule = parse_slot(prompt).map_err(invalid)?;
                Ok(WorkshopRecord::scheduled(id, title, summary, schedule))
            },
            None => Ok(WorkshopRecord::unscheduled(id, title, summary)),
        }
    }
}

/// Parse a `"<start>+<end>"` slot prompt.
fn parse_slot(prompt: &str) -> Result<Schedule, String> {
    let (start, end) = prompt
        .split_once('+')
        .ok_or_else(|| format!("slot prompt '{prompt}' is not '<start>+<end>'"))?;
    Ok(Schedule::new(parse_instant(start)?, parse_instant(end)?))
}

fn parse_instant(raw: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(raw.trim())
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| format!("'{raw}' is not an ISO-8601 instant: {e}"))
}

/// Parses feed documents into workshop records.
#[derive(Debug, Clone, Copy, Default)]
pub struct FeedIngestor;

impl FeedIngestor {
    /// Parse a feed document.
    ///
    /// Pure function of `bytes`: items that are not published workshops are
    /// dropped, the rest are mapped to records in feed order.
    ///
    /// # Errors
    ///
    /// - [`FeedError::Parse`] if the document is not a collection
    /// - [`FeedError::InvalidItem`] if a published workshop lacks `slug` or
    ///   `title`, or carries a malformed slot
    ///
    /// # Example
    ///
    /// ```
    /// use confreg_catalog::feed::FeedIngestor;
    ///
    /// let feed = br#"{"collection": {"items": [{"data": [
    ///     {"name": "slug", "value": "java-intro"},
    ///     {"name": "title", "value": "Intro to Java"},
    ///     {"name": "published", "value": true},
    ///     {"name": "format", "value": "workshop"}
    /// ]}]}}"#;
    ///
    /// let records = FeedIngestor::ingest(feed)?;
    /// assert_eq!(records[0].id.as_str(), "java-intro");
    /// assert_eq!(records[0].summary, "Intro to Java");
    /// # Ok::<(), confreg_catalog::feed::FeedError>(())
    /// ```
    pub fn ingest(bytes: &[u8]) -> Result<Vec<WorkshopRecord>, FeedError> {
        let document: Document =
            serde_json::from_slice(bytes).map_err(|e| FeedError::Parse(e.to_string()))?;

        document
            .collection
            .items
            .iter()
            .enumerate()
            .filter(|(_, item)| item.is_published_workshop())
            .map(|(position, item)| item.to_record(position))
            .collect()
    }
}

/// Where the feed comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedSource {
    /// No feed configured; the catalog starts empty.
    Unconfigured,
    /// A local file.
    File(PathBuf),
    /// An `http`/`https` URL.
    Url(reqwest::Url),
}

impl FeedSource {
    /// Resolve the configured location.
    ///
    /// A blank or missing location means [`FeedSource::Unconfigured`], even
    /// when a file override is given. Otherwise the file override wins over
    /// `location`. A location containing `://` must be an `http` or `https`
    /// URL; anything else is taken as a file path.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::InvalidLocation`] for malformed URLs and
    /// unsupported schemes.
    pub fn resolve(location: Option<&str>, file_override: Option<&Path>) -> Result<Self, FeedError> {
        let Some(location) = location.map(str::trim).filter(|l| !l.is_empty()) else {
            if let Some(path) = file_override {
                tracing::warn!(file = %path.display(), "Feed file ignored, no feed location configured");
            }
            return Ok(Self::Unconfigured);
        };

        if let Some(path) = file_override {
            return Ok(Self::File(path.to_path_buf()));
        }

        if !location.contains("://") {
            return Ok(Self::File(PathBuf::from(location)));
        }

        let invalid = |reason: String| FeedError::InvalidLocation {
            location: location.to_string(),
            reason,
        };
        let url = reqwest::Url::parse(location).map_err(|e| invalid(e.to_string()))?;
        match url.scheme() {
            "http" | "https" => Ok(Self::Url(url)),
            scheme => Err(invalid(format!("unsupported scheme '{scheme}'"))),
        }
    }

    /// Read and parse the feed, giving a URL source [`FETCH_TIMEOUT`] to
    /// answer.
    ///
    /// # Errors
    ///
    /// Returns a configuration-class [`FeedError`] if the source cannot be
    /// read, or a parse-class one if its content does not conform.
    pub async fn load(&self) -> Result<Vec<WorkshopRecord>, FeedError> {
        self.load_within(FETCH_TIMEOUT).await
    }

    /// Read and parse the feed, failing a URL fetch that takes longer than
    /// `timeout` with [`FeedError::Unreachable`].
    ///
    /// # Errors
    ///
    /// Returns a configuration-class [`FeedError`] if the source cannot be
    /// read, or a parse-class one if its content does not conform.
    pub async fn load_within(&self, timeout: Duration) -> Result<Vec<WorkshopRecord>, FeedError> {
        let bytes = match self {
            Self::Unconfigured => {
                tracing::info!("No workshop feed configured, starting with an empty catalog");
                return Ok(Vec::new());
            },
            Self::File(path) => tokio::fs::read(path).await.map_err(|source| FeedError::Io {
                path: path.clone(),
                source,
            })?,
            Self::Url(url) => fetch(url, timeout).await?,
        };

        tracing::debug!(source = %self, bytes = bytes.len(), "Workshop feed downloaded");
        FeedIngestor::ingest(&bytes)
    }
}

async fn fetch(url: &reqwest::Url, timeout: Duration) -> Result<Vec<u8>, FeedError> {
    let unreachable = |e: reqwest::Error| FeedError::Unreachable {
        location: url.to_string(),
        reason: if e.is_timeout() {
            format!("no answer within {timeout:?}")
        } else {
            e.to_string()
        },
    };

    let client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(unreachable)?;
    let response = client
        .get(url.clone())
        .send()
        .await
        .and_then(reqwest::Response::error_for_status)
        .map_err(unreachable)?;
    let body = response.bytes().await.map_err(unreachable)?;
    Ok(body.to_vec())
}

impl fmt::Display for FeedSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unconfigured => f.write_str("<unconfigured>"),
            Self::File(path) => write!(f, "file://{}", path.display()),
            Self::Url(url) => write!(f, "{url}"),
        }
    }
}
