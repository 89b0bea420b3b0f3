//! Wires a [`CrawlerController`] to a [`FetchEngine`] for a complete crawl.
//!
//! The controller is the single source of truth for scope and results; the
//! engine only fetches. The controller sits behind one mutex shared by the
//! admission filter and the event consumer, and the lock is never held
//! across an await point.

use crate::engine::{AdmissionFilter, EngineConfig, FetchEngine};
use crate::error::{EngineError, Result};
use crate::html::HtmlDocumentSource;
use sitewalker_core::{
    ControllerAction, ControllerConfig, CrawlEvent, CrawlerController, EngineEvent, PathMap,
};
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::mpsc::{self, UnboundedSender};
use tracing::debug;
use url::Url;

pub struct SessionOptions {
    pub workers: usize,
    pub timeout_secs: u64,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            workers: 4,
            timeout_secs: 10,
        }
    }
}

/// Runs a crawl to completion, forwarding controller notifications to
/// `notifications`, and returns the final frontier map.
pub async fn run_crawl(
    start: Url,
    config: ControllerConfig,
    options: SessionOptions,
    notifications: UnboundedSender<CrawlEvent>,
) -> Result<PathMap> {
    let cookies = config.cookies.clone();
    let controller = Arc::new(StdMutex::new(CrawlerController::new(config)?));

    let filter: AdmissionFilter = {
        let controller = controller.clone();
        Arc::new(move |url: &str| controller.lock().unwrap().should_fetch(url))
    };

    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    let engine_config = EngineConfig::new(start)
        .with_workers(options.workers)
        .with_timeout(options.timeout_secs)
        .with_cookies(cookies);
    let engine = FetchEngine::new(engine_config, filter, event_tx)?;
    let handle = engine.handle();
    let engine_task = tokio::spawn(engine.run());

    let parser = HtmlDocumentSource;
    let mut final_frontier = None;
    while let Some(event) = event_rx.recv().await {
        let done = matches!(event, EngineEvent::Complete);
        let actions = { controller.lock().unwrap().handle_event(event, &parser) };
        for action in actions {
            match action {
                ControllerAction::Notify(notification) => {
                    if let CrawlEvent::Complete { frontier } = &notification {
                        final_frontier = Some(frontier.clone());
                    }
                    if notifications.send(notification).is_err() {
                        debug!("notification receiver dropped");
                    }
                }
                ControllerAction::Enqueue { href, referrer } => {
                    handle.queue_url(&href, &referrer).await;
                }
            }
        }
        if done {
            break;
        }
        // Only acknowledged after Enqueue actions have landed, so the
        // engine cannot declare the queue drained while work is pending.
        handle.acknowledge();
    }

    engine_task.await??;
    final_frontier.ok_or(EngineError::NoFinalFrontier)
}
