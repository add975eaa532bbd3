//! Service Worker
//!
//! The worker instance and its dispatch table from event kind to handler.

use std::sync::Arc;

use spin::Mutex;

use crate::cache::CacheStorage;
use crate::config::WorkerConfig;
use crate::error::WorkerError;
use crate::events::{
    EventType, FetchEvent, Lifetime, MessageEvent, NotificationClickEvent, SyncEvent, WorkerEvent,
};
use crate::fetch::{Network, Request, Response};
use crate::lifecycle::{self, ActivationReport, InstallReport, Lifecycle, ServiceWorkerState};
use crate::message::{self, MessageReply, PageMessage};
use crate::notification::{self, ClickOutcome, Clients};
use crate::push::{self, Notifier, PushOutcome};
use crate::router::{self, Route};
use crate::strategy::Strategies;
use crate::sync::{ReplayReport, SyncQueue, SyncRegistry};

/// Platform services the worker calls out to.
#[derive(Clone)]
pub struct Host {
    pub network: Arc<dyn Network>,
    pub clients: Arc<dyn Clients>,
    pub notifier: Arc<dyn Notifier>,
}

/// Result of a sync event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    Wishlist(ReplayReport),
    /// Reserved tag; completes without doing any work.
    Review,
    /// The scan itself failed; every entry is still queued.
    Failed(String),
}

/// What a handler produced for the event it handled.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Installed(InstallReport),
    Activated(ActivationReport),
    /// Response for an intercepted fetch.
    Responded(Response),
    /// The worker left the request to the host's default fetch.
    Passthrough,
    Synced(SyncOutcome),
    Pushed(PushOutcome),
    Clicked(ClickOutcome),
    Closed,
    Replied(MessageReply),
    /// No handler applies to this event payload.
    Ignored,
}

/// A handled event: the handler's outcome plus work still running.
///
/// The host must await `lifetime.settle()` before tearing the worker down.
#[derive(Debug)]
pub struct Dispatched {
    pub outcome: Outcome,
    pub lifetime: Lifetime,
}

impl Dispatched {
    fn done(outcome: Outcome) -> Self {
        Self {
            outcome,
            lifetime: Lifetime::new(),
        }
    }
}

/// Offline cache and sync worker for one origin.
pub struct ServiceWorker {
    config: Arc<WorkerConfig>,
    caches: CacheStorage,
    host: Host,
    strategies: Strategies,
    queue: SyncQueue,
    lifecycle: Mutex<Lifecycle>,
    sync: Mutex<SyncRegistry>,
}

impl ServiceWorker {
    /// Create a worker in the `Parsed` state over existing cache storage.
    pub fn new(config: Arc<WorkerConfig>, caches: CacheStorage, host: Host) -> Self {
        let strategies = Strategies::new(
            caches.clone(),
            host.network.clone(),
            config.static_cache(),
            config.dynamic_cache(),
            config.root_url(),
        );
        let queue = SyncQueue::new(config.clone(), caches.clone(), host.network.clone());
        Self {
            config,
            caches,
            host,
            strategies,
            queue,
            lifecycle: Mutex::new(Lifecycle::new()),
            sync: Mutex::new(SyncRegistry::new()),
        }
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    pub fn caches(&self) -> &CacheStorage {
        &self.caches
    }

    pub fn state(&self) -> ServiceWorkerState {
        self.lifecycle.lock().state()
    }

    pub fn skips_waiting(&self) -> bool {
        self.lifecycle.lock().skips_waiting()
    }

    /// Run `f` against the sync registry.
    pub fn with_sync<R>(&self, f: impl FnOnce(&mut SyncRegistry) -> R) -> R {
        f(&mut self.sync.lock())
    }

    /// Store a failed wishlist mutation for replay on the next sync.
    pub fn defer(&self, request: Request) -> Result<u64, WorkerError> {
        self.queue.defer(request, &mut self.sync.lock())
    }

    /// Deliver one event to its handler.
    pub async fn dispatch(&self, event: WorkerEvent) -> Result<Dispatched, WorkerError> {
        let event_type = event.event_type();
        log::trace!("[SW] Dispatching {}", event_type);

        let result = match event {
            WorkerEvent::Install => self.on_install().await,
            WorkerEvent::Activate => self.on_activate().await,
            WorkerEvent::Fetch(fetch) => Ok(self.on_fetch(fetch).await),
            WorkerEvent::Sync(sync) => Ok(Dispatched::done(self.on_sync(sync).await)),
            WorkerEvent::Push(push) => {
                let outcome =
                    push::handle_push(&push, &self.config, self.host.notifier.as_ref()).await;
                Ok(Dispatched::done(Outcome::Pushed(outcome)))
            }
            WorkerEvent::NotificationClick(click) => self.on_click(click).await,
            WorkerEvent::NotificationClose(close) => {
                notification::handle_close(&close);
                Ok(Dispatched::done(Outcome::Closed))
            }
            WorkerEvent::Message(message) => Ok(Dispatched::done(self.on_message(message))),
        };
        result.map_err(|e| {
            log::error!("[SW] {} handler failed: {}", event_type, e);
            e
        })
    }

    /// Event kinds this worker has handlers for.
    pub fn handled_events() -> &'static [EventType] {
        &[
            EventType::Install,
            EventType::Activate,
            EventType::Fetch,
            EventType::Sync,
            EventType::Push,
            EventType::NotificationClick,
            EventType::NotificationClose,
            EventType::Message,
        ]
    }

    async fn on_install(&self) -> Result<Dispatched, WorkerError> {
        self.lifecycle
            .lock()
            .transition(ServiceWorkerState::Installing)?;

        let report =
            lifecycle::install(&self.config, &self.caches, self.host.network.as_ref()).await;

        {
            let mut lifecycle = self.lifecycle.lock();
            lifecycle.skip_waiting();
            lifecycle.transition(ServiceWorkerState::Installed)?;
        }
        Ok(Dispatched::done(Outcome::Installed(report)))
    }

    async fn on_activate(&self) -> Result<Dispatched, WorkerError> {
        self.lifecycle
            .lock()
            .transition(ServiceWorkerState::Activating)?;

        let report = lifecycle::activate(&self.config, &self.caches);
        self.host.clients.claim().await;

        self.lifecycle
            .lock()
            .transition(ServiceWorkerState::Activated)?;
        log::info!(
            "[SW Activate] Activated; evicted {} old cache(s)",
            report.evicted.len()
        );
        Ok(Dispatched::done(Outcome::Activated(report)))
    }

    async fn on_fetch(&self, event: FetchEvent) -> Dispatched {
        let route = router::classify(&event.request, &self.config);
        let mut lifetime = Lifetime::new();
        let outcome = match self
            .strategies
            .respond(route, &event.request, &mut lifetime)
            .await
        {
            Some(response) => Outcome::Responded(response),
            None => Outcome::Passthrough,
        };
        if let Route::Intercept { strategy, .. } = route {
            log::trace!("[SW Fetch] {} via {}", event.request.url, strategy);
        }
        Dispatched { outcome, lifetime }
    }

    async fn on_sync(&self, event: SyncEvent) -> Outcome {
        let tags = &self.config.sync;

        let outcome = if event.tag == tags.wishlist_tag {
            match self.queue.replay_wishlist().await {
                Ok(report) => {
                    log::info!(
                        "[SW Sync] Wishlist sync: {} replayed, {} retained",
                        report.replayed,
                        report.retained
                    );
                    SyncOutcome::Wishlist(report)
                }
                Err(e) => {
                    log::error!("[SW Sync] Wishlist sync failed: {}", e);
                    SyncOutcome::Failed(e.to_string())
                }
            }
        } else if event.tag == tags.review_tag {
            log::info!("[SW Sync] Review sync completed");
            SyncOutcome::Review
        } else {
            log::debug!("[SW Sync] No handler for tag {}", event.tag);
            return Outcome::Ignored;
        };

        let success = match &outcome {
            SyncOutcome::Wishlist(report) => report.is_complete(),
            SyncOutcome::Review => true,
            SyncOutcome::Failed(_) => false,
        };
        self.sync.lock().complete(&event.tag, success);
        Outcome::Synced(outcome)
    }

    async fn on_click(&self, event: NotificationClickEvent) -> Result<Dispatched, WorkerError> {
        let outcome = notification::handle_click(
            &event,
            &self.config,
            self.host.notifier.as_ref(),
            self.host.clients.as_ref(),
        )
        .await?;
        Ok(Dispatched::done(Outcome::Clicked(outcome)))
    }

    fn on_message(&self, event: MessageEvent) -> Outcome {
        let Some(parsed) = PageMessage::parse(&event.data) else {
            return Outcome::Ignored;
        };

        let reply = match parsed {
            PageMessage::ShareTarget { title, url, .. } => {
                log::info!("[SW Message] Share target received");
                message::share_target_reply(title.as_deref(), url.as_deref())
            }
            PageMessage::QueueRequest { url, method, body } => {
                match message::queued_request(&self.config.origin, &url, &method, body.as_ref()) {
                    Some(request) => match self.defer(request) {
                        Ok(id) => MessageReply::ok(format!("Queued for background sync (#{id})")),
                        Err(e) => MessageReply::failed(e.to_string()),
                    },
                    None => MessageReply::failed(format!("Invalid request: {method} {url}")),
                }
            }
            PageMessage::SkipWaiting => {
                self.lifecycle.lock().skip_waiting();
                MessageReply::ok("Skipping waiting")
            }
        };

        message::send_reply(event.reply, reply.clone());
        Outcome::Replied(reply)
    }
}
