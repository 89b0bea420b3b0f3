//! The frontier controller.
//!
//! Consumes the fetch engine's event stream on a single logical thread of
//! control, keeps the path map consistent as outcomes arrive out of order,
//! and re-emits simplified domain events. No handler blocks or suspends;
//! each event is applied and the resulting actions returned to the caller.

use crate::error::{ControllerError, Result};
use crate::events::{CrawlEvent, EngineEvent, QueueItem};
use crate::fragments::FragmentSource;
use crate::matcher;
use crate::normalize::{normalize, normalize_parsed, resolve_discovered};
use crate::path_map::{PathMap, PathValue};
use tracing::debug;

/// Crawl scope and behavior switches. `host` is the only required field.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    pub host: String,
    pub path: String,
    pub port: u16,
    pub site_name: Option<String>,
    /// When on, first-discovery fetches are restricted to URLs under `path`.
    pub lock_to_path: bool,
    pub check_fragments: bool,
    pub cookies: Vec<String>,
}

impl ControllerConfig {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            path: "/".to_string(),
            port: 80,
            site_name: None,
            lock_to_path: true,
            check_fragments: true,
            cookies: Vec::new(),
        }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_site_name(mut self, name: impl Into<String>) -> Self {
        self.site_name = Some(name.into());
        self
    }

    pub fn with_lock_to_path(mut self, lock: bool) -> Self {
        self.lock_to_path = lock;
        self
    }

    pub fn with_check_fragments(mut self, check: bool) -> Self {
        self.check_fragments = check;
        self
    }

    pub fn with_cookies(mut self, cookies: Vec<String>) -> Self {
        self.cookies = cookies;
        self
    }
}

/// What the caller should do after an event has been applied: surface a
/// notification, or hand a URL back to the engine's queue.
#[derive(Debug, Clone)]
pub enum ControllerAction {
    Notify(CrawlEvent),
    Enqueue { href: String, referrer: QueueItem },
}

#[derive(Debug)]
pub struct CrawlerController {
    config: ControllerConfig,
    frontier: PathMap,
    complete: bool,
}

impl CrawlerController {
    /// Seeds the frontier root with the starting path. Fails only on a
    /// missing host; nothing after construction returns an error.
    pub fn new(config: ControllerConfig) -> Result<Self> {
        if config.host.trim().is_empty() {
            return Err(ControllerError::MissingHost);
        }
        let mut frontier = PathMap::new();
        let root = frontier.root();
        frontier.insert(root, normalize(&config.path), PathValue::Unresolved);
        Ok(Self {
            config,
            frontier,
            complete: false,
        })
    }

    pub fn site_name(&self) -> &str {
        self.config.site_name.as_deref().unwrap_or(&self.config.host)
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    pub fn frontier(&self) -> &PathMap {
        &self.frontier
    }

    fn port(&self) -> Option<u16> {
        Some(self.config.port)
    }

    /// Admission policy consulted by the engine before every candidate
    /// fetch. A URL already known anywhere in the frontier is always
    /// re-admitted; first discovery is gated by scope (path descent in
    /// path-locked mode, host membership otherwise). Denials are silent
    /// filtering, not errors.
    pub fn should_fetch(&self, url: &str) -> bool {
        let formatted = normalize(url);
        let known = self.frontier.contains(&formatted);
        if self.config.lock_to_path
            && !known
            && !matcher::is_on_path(&formatted, &self.config.host, &self.config.path, self.port())
        {
            debug!(url = %formatted, "denied: off-path and not yet known");
            return false;
        }
        if !self.config.lock_to_path
            && !known
            && !matcher::is_on_host(&formatted, &self.config.host)
        {
            debug!(url = %formatted, "denied: off-host and not yet known");
            return false;
        }
        true
    }

    /// Applies one engine event to the frontier and returns the actions it
    /// caused. Callers must deliver events serially; each call is one
    /// non-atomic read-modify-write over the shared tree.
    pub fn handle_event(
        &mut self,
        event: EngineEvent,
        fragments: &dyn FragmentSource,
    ) -> Vec<ControllerAction> {
        match event {
            EngineEvent::DiscoveryComplete { item, resources } => {
                self.on_discovery_complete(item, resources)
            }
            EngineEvent::Redirect { item, target, status } => {
                self.on_redirect(item, &target, status)
            }
            EngineEvent::NotFound { item } => {
                self.set_path_result(&item.url, PathValue::Status(404));
                vec![ControllerAction::Notify(CrawlEvent::NotFound { url: item.url })]
            }
            EngineEvent::FetchError { item, status, message } => {
                self.set_path_result(&item.url, PathValue::Status(status));
                vec![ControllerAction::Notify(CrawlEvent::HttpError {
                    url: item.url,
                    status,
                    message,
                })]
            }
            EngineEvent::DataError { item, status, headers } => {
                self.set_path_result(&item.url, PathValue::DataError);
                vec![ControllerAction::Notify(CrawlEvent::DataError {
                    url: item.url,
                    status,
                    headers,
                })]
            }
            EngineEvent::GzipError { item, error } => {
                self.set_path_result(&item.url, PathValue::GzipError);
                vec![ControllerAction::Notify(CrawlEvent::GzipError {
                    url: item.url,
                    error,
                })]
            }
            EngineEvent::ClientError { item, error } => {
                self.set_path_result(&item.url, PathValue::ClientError);
                vec![ControllerAction::Notify(CrawlEvent::ClientError {
                    url: item.url,
                    error,
                })]
            }
            EngineEvent::QueueError { error, url } => {
                vec![ControllerAction::Notify(CrawlEvent::QueueError { error, url })]
            }
            EngineEvent::FetchComplete { item, body } => {
                self.on_fetch_complete(item, &body, fragments)
            }
            EngineEvent::Complete => {
                self.complete = true;
                vec![ControllerAction::Notify(CrawlEvent::Complete {
                    frontier: self.frontier.clone(),
                })]
            }
        }
    }

    fn on_discovery_complete(
        &mut self,
        item: QueueItem,
        resources: Vec<String>,
    ) -> Vec<ControllerAction> {
        let page_url = normalize(&item.url);
        let links: Vec<String> = resources
            .iter()
            .map(|resource| resolve_discovered(resource, &page_url))
            .collect();
        // Scope is decided before recording: once a link is in the frontier
        // it counts as known and would pass admission unconditionally, so an
        // off-scope link must be refused its fetch here. It still gets
        // recorded below, which is what makes later mentions of it fetchable.
        let admitted: Vec<bool> = links.iter().map(|link| self.should_fetch(link)).collect();
        if !links.is_empty() {
            debug!(page = %page_url, count = links.len(), "recording discovered links");
            if !self.frontier.record_links(&page_url, &links)
                && self.is_root_url(&item.url)
            {
                let root = self.frontier.root();
                self.frontier.insert_links(root, page_url, &links);
            }
        }
        resources
            .into_iter()
            .zip(admitted)
            .filter(|(_, admitted)| *admitted)
            .map(|(href, _)| ControllerAction::Enqueue {
                href,
                referrer: item.clone(),
            })
            .collect()
    }

    fn on_redirect(&mut self, item: QueueItem, target: &url::Url, status: u16) -> Vec<ControllerAction> {
        let redirect_url = normalize_parsed(target);
        let child = self.frontier.alloc_detached();
        self.frontier
            .insert(child, redirect_url.clone(), PathValue::Unresolved);
        self.set_path_result(&item.url, PathValue::Redirect { status, child });
        vec![
            ControllerAction::Notify(CrawlEvent::Redirect {
                url: item.url.clone(),
                target: redirect_url.clone(),
                status,
            }),
            ControllerAction::Enqueue {
                href: redirect_url,
                referrer: item,
            },
        ]
    }

    fn on_fetch_complete(
        &mut self,
        item: QueueItem,
        body: &str,
        fragments: &dyn FragmentSource,
    ) -> Vec<ControllerAction> {
        let mut actions = Vec::new();
        if self.config.check_fragments {
            for href in fragments.fragment_hrefs(body) {
                actions.push(ControllerAction::Enqueue {
                    href,
                    referrer: item.clone(),
                });
            }
            if let Some(hash) = item.url.find('#') {
                let selector = &item.url[hash..];
                match fragments.fragment_exists(body, selector) {
                    Ok(true) => {}
                    Ok(false) => {
                        self.set_path_result(&item.url, PathValue::FragmentNotFound);
                        actions.push(ControllerAction::Notify(CrawlEvent::FragmentNotFound {
                            url: item.url.clone(),
                        }));
                    }
                    Err(_) => {
                        // Malformed selectors are charged to the referring
                        // page; absent targets to the page itself.
                        self.set_path_result(&item.url, PathValue::BadFragment);
                        actions.push(ControllerAction::Notify(CrawlEvent::BadFragment {
                            referrer: item.referrer.clone(),
                            url: item.url.clone(),
                        }));
                    }
                }
            }
        } else {
            // Plain completion only promotes a still-unresolved occurrence;
            // a late completion never clobbers an outcome already recorded.
            self.set_path_result_with(&item.url, |old| {
                if old.is_unresolved() {
                    PathValue::Resolved
                } else {
                    old.clone()
                }
            });
        }
        actions
    }

    fn is_root_url(&self, url: &str) -> bool {
        matcher::is_root_path(url, &self.config.host, &self.config.path, self.port())
    }

    fn set_path_result(&mut self, url: &str, value: PathValue) {
        let formatted = normalize(url);
        if !self.frontier.set_result(&formatted, value.clone()) && self.is_root_url(url) {
            let root = self.frontier.root();
            self.frontier.insert(root, formatted, value);
        }
    }

    fn set_path_result_with<F>(&mut self, url: &str, f: F)
    where
        F: Fn(&PathValue) -> PathValue,
    {
        let formatted = normalize(url);
        if !self.frontier.set_result_with(&formatted, &f) && self.is_root_url(url) {
            let root = self.frontier.root();
            let value = f(&PathValue::Unresolved);
            self.frontier.insert(root, formatted, value);
        }
    }
}
