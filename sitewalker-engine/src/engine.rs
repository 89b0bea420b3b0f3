//! Queue-driven fetch engine.
//!
//! Workers pull queue items off a shared queue, fetch them, classify the
//! outcome into exactly one [`EngineEvent`], and push it down a channel for
//! serialized consumption. The engine never decides scope itself: every
//! candidate URL goes through the admission filter before it is queued, and
//! discovered links are only queued when the consumer hands them back via
//! [`EngineHandle::queue_url`].

use crate::error::Result;
use crate::html;
use reqwest::{redirect, Client, StatusCode};
use sitewalker_core::events::{EngineEvent, QueueItem};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use url::Url;

/// Admission filter consulted before every candidate fetch.
pub type AdmissionFilter = Arc<dyn Fn(&str) -> bool + Send + Sync>;

pub struct EngineConfig {
    pub start: Url,
    pub workers: usize,
    pub timeout_secs: u64,
    pub cookies: Vec<String>,
}

impl EngineConfig {
    pub fn new(start: Url) -> Self {
        Self {
            start,
            workers: 4,
            timeout_secs: 10,
            cookies: Vec::new(),
        }
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    pub fn with_cookies(mut self, cookies: Vec<String>) -> Self {
        self.cookies = cookies;
        self
    }
}

struct EngineState {
    queue: Mutex<VecDeque<QueueItem>>,
    queued: Mutex<HashSet<String>>,
    in_flight: AtomicUsize,
    /// Events delivered but not yet acknowledged by the consumer. Workers
    /// refuse to shut down while this is non-zero, because any outstanding
    /// event may still hand URLs back to the queue.
    unacked: AtomicUsize,
}

struct EngineInner {
    client: Client,
    config: EngineConfig,
    filter: AdmissionFilter,
    state: EngineState,
    events: UnboundedSender<EngineEvent>,
}

pub struct FetchEngine {
    inner: Arc<EngineInner>,
}

/// Cheap handle for queueing additional URLs against a running engine,
/// e.g. fragment expansion requests coming back from the controller.
#[derive(Clone)]
pub struct EngineHandle {
    inner: Arc<EngineInner>,
}

impl EngineHandle {
    pub async fn queue_url(&self, href: &str, referrer: &QueueItem) {
        self.inner.queue_url(href, Some(referrer)).await;
    }

    /// Marks one received event as fully processed. The consumer must call
    /// this once per event (after any [`queue_url`](Self::queue_url) calls
    /// the event caused); the engine holds its workers open until every
    /// delivered event has been acknowledged.
    pub fn acknowledge(&self) {
        self.inner.state.unacked.fetch_sub(1, Ordering::SeqCst);
    }
}

impl FetchEngine {
    pub fn new(
        config: EngineConfig,
        filter: AdmissionFilter,
        events: UnboundedSender<EngineEvent>,
    ) -> Result<Self> {
        let jar = Arc::new(reqwest::cookie::Jar::default());
        for cookie in &config.cookies {
            jar.add_cookie_str(cookie, &config.start);
        }
        let client = Client::builder()
            .user_agent("Sitewalker/0.1")
            .timeout(Duration::from_secs(config.timeout_secs))
            .redirect(redirect::Policy::none())
            .cookie_provider(jar)
            .build()?;

        Ok(Self {
            inner: Arc::new(EngineInner {
                client,
                config,
                filter,
                state: EngineState {
                    queue: Mutex::new(VecDeque::new()),
                    queued: Mutex::new(HashSet::new()),
                    in_flight: AtomicUsize::new(0),
                    unacked: AtomicUsize::new(0),
                },
                events,
            }),
        })
    }

    pub fn handle(&self) -> EngineHandle {
        EngineHandle {
            inner: self.inner.clone(),
        }
    }

    /// Drains the queue with a pool of fetch workers, then emits exactly
    /// one [`EngineEvent::Complete`].
    pub async fn run(self) -> Result<()> {
        let inner = self.inner;
        inner.enqueue_seed().await;
        info!(start = %inner.config.start, workers = inner.config.workers, "starting crawl");

        let mut handles = Vec::new();
        for worker_id in 0..inner.config.workers.max(1) {
            let inner = inner.clone();
            handles.push(tokio::spawn(async move { inner.worker(worker_id).await }));
        }
        for handle in handles {
            handle.await?;
        }

        info!("queue exhausted, crawl complete");
        inner.emit(EngineEvent::Complete);
        Ok(())
    }
}

impl EngineInner {
    fn emit(&self, event: EngineEvent) {
        if self.events.send(event).is_ok() {
            self.state.unacked.fetch_add(1, Ordering::SeqCst);
        } else {
            warn!("event consumer dropped, discarding engine event");
        }
    }

    /// The start URL skips the admission filter; scope rules gate discovery,
    /// not the seed.
    async fn enqueue_seed(&self) {
        let url = self.config.start.to_string();
        self.state.queued.lock().await.insert(url.clone());
        self.state.queue.lock().await.push_back(QueueItem::new(url));
    }

    async fn queue_url(&self, href: &str, referrer: Option<&QueueItem>) {
        let resolved = match referrer {
            Some(item) => Url::parse(&item.url)
                .ok()
                .and_then(|base| base.join(href).ok()),
            None => Url::parse(href).ok(),
        };
        let Some(resolved) = resolved else {
            self.emit(EngineEvent::QueueError {
                error: "unresolvable URL".to_string(),
                url: href.to_string(),
            });
            return;
        };
        if resolved.scheme() != "http" && resolved.scheme() != "https" {
            return;
        }
        if !(self.filter)(resolved.as_str()) {
            debug!(url = %resolved, "queue candidate denied by admission filter");
            return;
        }
        let url = resolved.to_string();
        {
            let mut queued = self.state.queued.lock().await;
            if !queued.insert(url.clone()) {
                return;
            }
        }
        debug!(url = %url, "queued");
        let item = match referrer {
            Some(item) => QueueItem::with_referrer(url, item.url.clone()),
            None => QueueItem::new(url),
        };
        self.state.queue.lock().await.push_back(item);
    }

    async fn worker(&self, worker_id: usize) {
        debug!(worker_id, "worker started");
        let mut empty_iterations = 0;
        const MAX_EMPTY_ITERATIONS: usize = 10;

        loop {
            let item = { self.state.queue.lock().await.pop_front() };
            let Some(item) = item else {
                // Queue is empty, but another worker or the event consumer
                // may still produce work. Unacknowledged events pin workers
                // open; a closed channel means no consumer is coming back.
                let drained = self.state.unacked.load(Ordering::SeqCst) == 0
                    || self.events.is_closed();
                if self.state.in_flight.load(Ordering::SeqCst) == 0 && drained {
                    empty_iterations += 1;
                    if empty_iterations >= MAX_EMPTY_ITERATIONS {
                        debug!(worker_id, "worker exiting");
                        break;
                    }
                } else {
                    empty_iterations = 0;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
                continue;
            };

            empty_iterations = 0;
            self.state.in_flight.fetch_add(1, Ordering::SeqCst);
            self.fetch_one(item).await;
            self.state.in_flight.fetch_sub(1, Ordering::SeqCst);
        }
    }

    /// Fetches one queue item and classifies it into exactly one terminal
    /// outcome event (HTML pages additionally get a discovery event first).
    async fn fetch_one(&self, item: QueueItem) {
        debug!(url = %item.url, "fetching");
        let url = match Url::parse(&item.url) {
            Ok(url) => url,
            Err(e) => {
                self.emit(EngineEvent::ClientError {
                    item,
                    error: e.to_string(),
                });
                return;
            }
        };

        let response = match self.client.get(url.clone()).send().await {
            Ok(response) => response,
            Err(e) => {
                self.emit(EngineEvent::ClientError {
                    item,
                    error: e.to_string(),
                });
                return;
            }
        };

        let status = response.status();
        if status.is_redirection() {
            let location = response
                .headers()
                .get(reqwest::header::LOCATION)
                .and_then(|value| value.to_str().ok())
                .map(str::to_string);
            match location.and_then(|location| url.join(&location).ok()) {
                Some(target) => self.emit(EngineEvent::Redirect {
                    item,
                    target,
                    status: status.as_u16(),
                }),
                None => self.emit(EngineEvent::FetchError {
                    item,
                    status: status.as_u16(),
                    message: "redirect without usable location".to_string(),
                }),
            }
            return;
        }
        if status == StatusCode::NOT_FOUND {
            self.emit(EngineEvent::NotFound { item });
            return;
        }
        if !status.is_success() {
            self.emit(EngineEvent::FetchError {
                item,
                status: status.as_u16(),
                message: status.canonical_reason().unwrap_or_default().to_string(),
            });
            return;
        }

        let headers: HashMap<String, String> = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();
        let gzip_encoded = headers
            .get("content-encoding")
            .is_some_and(|value| value.contains("gzip"));
        let content_type = headers.get("content-type").cloned();

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                if gzip_encoded {
                    self.emit(EngineEvent::GzipError {
                        item,
                        error: e.to_string(),
                    });
                } else if e.is_decode() {
                    self.emit(EngineEvent::DataError {
                        item,
                        status: status.as_u16(),
                        headers,
                    });
                } else {
                    self.emit(EngineEvent::ClientError {
                        item,
                        error: e.to_string(),
                    });
                }
                return;
            }
        };

        let is_html = content_type
            .as_deref()
            .is_some_and(|ct| ct.contains("text/html"));
        if is_html {
            let resources = html::extract_links(&body);
            debug!(url = %item.url, count = resources.len(), "discovered resources");
            self.emit(EngineEvent::DiscoveryComplete {
                item: item.clone(),
                resources,
            });
        }
        self.emit(EngineEvent::FetchComplete { item, body });
    }
}
