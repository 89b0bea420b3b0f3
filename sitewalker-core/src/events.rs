//! Typed events at the controller's two boundaries.
//!
//! [`EngineEvent`] is what the fetch engine pushes in (one variant per
//! lifecycle outcome it can report for a queue item); [`CrawlEvent`] is the
//! simplified notification stream the controller re-emits to consumers.

use crate::path_map::PathMap;
use serde::Serialize;
use std::collections::HashMap;
use url::Url;

/// The originating queue item an engine event refers to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueueItem {
    pub url: String,
    pub referrer: Option<String>,
}

impl QueueItem {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            referrer: None,
        }
    }

    pub fn with_referrer(url: impl Into<String>, referrer: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            referrer: Some(referrer.into()),
        }
    }
}

/// Lifecycle events delivered by the external fetch engine. Each fetched
/// resource produces exactly one terminal outcome, and the engine emits
/// exactly one [`EngineEvent::Complete`] once its queue is exhausted.
#[derive(Debug, Clone)]
pub enum EngineEvent {
    /// The page at `item` was parsed and these raw hrefs were discovered.
    DiscoveryComplete {
        item: QueueItem,
        resources: Vec<String>,
    },
    Redirect {
        item: QueueItem,
        target: Url,
        status: u16,
    },
    NotFound {
        item: QueueItem,
    },
    FetchError {
        item: QueueItem,
        status: u16,
        message: String,
    },
    DataError {
        item: QueueItem,
        status: u16,
        headers: HashMap<String, String>,
    },
    GzipError {
        item: QueueItem,
        error: String,
    },
    ClientError {
        item: QueueItem,
        error: String,
    },
    QueueError {
        error: String,
        url: String,
    },
    FetchComplete {
        item: QueueItem,
        body: String,
    },
    Complete,
}

/// Domain events re-emitted to consumers. Per-URL outcomes surface here and
/// only here; after construction the controller never fails the crawl over
/// a single URL.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum CrawlEvent {
    Redirect {
        url: String,
        target: String,
        status: u16,
    },
    NotFound {
        url: String,
    },
    HttpError {
        url: String,
        status: u16,
        message: String,
    },
    DataError {
        url: String,
        status: u16,
        headers: HashMap<String, String>,
    },
    GzipError {
        url: String,
        error: String,
    },
    ClientError {
        url: String,
        error: String,
    },
    QueueError {
        error: String,
        url: String,
    },
    FragmentNotFound {
        url: String,
    },
    /// Reported against the *referring* page, unlike `fragment_not_found`
    /// which names the page itself.
    BadFragment {
        referrer: Option<String>,
        url: String,
    },
    Complete {
        frontier: PathMap,
    },
}
