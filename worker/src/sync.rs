//! Background Sync
//!
//! Tag registrations fired when connectivity returns, and the queue of
//! deferred wishlist mutations kept in the dynamic cache until a replay
//! succeeds.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::cache::CacheStorage;
use crate::config::WorkerConfig;
use crate::error::WorkerError;
use crate::events::SyncEvent;
use crate::fetch::{Network, Request, RequestMethod, Response};

/// Sync registration ID counter
static NEXT_SYNC_ID: AtomicU64 = AtomicU64::new(1);

/// Sync registration ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SyncId(u64);

impl SyncId {
    fn new() -> Self {
        Self(NEXT_SYNC_ID.fetch_add(1, Ordering::SeqCst))
    }
}

/// Sync registration state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncState {
    /// Waiting for connectivity
    #[default]
    Pending,
    /// Sync event handed to the host
    Firing,
    /// Last replay left work behind; fires again on the next trigger
    Reregistering,
}

/// Sync registration
#[derive(Debug, Clone)]
pub struct SyncRegistration {
    id: SyncId,
    tag: String,
    state: SyncState,
    attempts: u32,
}

impl SyncRegistration {
    /// Create new registration
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            id: SyncId::new(),
            tag: tag.into(),
            state: SyncState::Pending,
            attempts: 0,
        }
    }

    pub fn id(&self) -> SyncId {
        self.id
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    /// Number of times this tag has fired.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    fn mark_firing(&mut self) {
        self.state = SyncState::Firing;
        self.attempts += 1;
    }
}

/// Registered sync tags. There is no retry limit: a tag stays registered
/// until a sync for it completes successfully.
#[derive(Debug, Default)]
pub struct SyncRegistry {
    registrations: BTreeMap<String, SyncRegistration>,
}

impl SyncRegistry {
    /// Create new registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tag. Registering a tag that is already known returns its
    /// existing ID and re-arms it if it is mid-flight.
    pub fn register(&mut self, tag: impl Into<String>) -> SyncId {
        let tag = tag.into();
        if let Some(existing) = self.registrations.get_mut(&tag) {
            if existing.state == SyncState::Firing {
                existing.state = SyncState::Reregistering;
            }
            return existing.id();
        }

        let registration = SyncRegistration::new(tag.clone());
        let id = registration.id();
        self.registrations.insert(tag, registration);
        id
    }

    pub fn get(&self, tag: &str) -> Option<&SyncRegistration> {
        self.registrations.get(tag)
    }

    pub fn tags(&self) -> Vec<String> {
        self.registrations.keys().cloned().collect()
    }

    pub fn unregister(&mut self, tag: &str) -> bool {
        self.registrations.remove(tag).is_some()
    }

    /// Registrations waiting to fire
    pub fn pending(&self) -> impl Iterator<Item = &SyncRegistration> {
        self.registrations
            .values()
            .filter(|r| matches!(r.state, SyncState::Pending | SyncState::Reregistering))
    }

    /// Mark every waiting registration as firing and return the events the
    /// host should deliver.
    pub fn fire_pending(&mut self) -> Vec<SyncEvent> {
        let mut events = Vec::new();
        for registration in self.registrations.values_mut() {
            if matches!(
                registration.state,
                SyncState::Pending | SyncState::Reregistering
            ) {
                registration.mark_firing();
                events.push(SyncEvent::new(registration.tag.clone()));
            }
        }
        events
    }

    /// Record the end of a sync for `tag`.
    ///
    /// A successful run removes the registration, unless the tag was
    /// registered again while it was firing; that one waits for the next
    /// trigger.
    pub fn complete(&mut self, tag: &str, success: bool) {
        let Some(registration) = self.registrations.get_mut(tag) else {
            return;
        };
        match (success, registration.state) {
            (true, SyncState::Reregistering) => registration.state = SyncState::Pending,
            (true, _) => {
                self.registrations.remove(tag);
            }
            (false, _) => registration.state = SyncState::Reregistering,
        }
    }
}

/// Result of one wishlist replay pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplayReport {
    /// Entries sent successfully and removed from the cache.
    pub replayed: usize,
    /// Entries whose replay failed; kept for the next trigger.
    pub retained: usize,
}

impl ReplayReport {
    pub fn is_complete(&self) -> bool {
        self.retained == 0
    }
}

/// Deferred mutations stored in the dynamic cache.
#[derive(Clone)]
pub struct SyncQueue {
    config: Arc<WorkerConfig>,
    caches: CacheStorage,
    network: Arc<dyn Network>,
}

impl SyncQueue {
    pub fn new(config: Arc<WorkerConfig>, caches: CacheStorage, network: Arc<dyn Network>) -> Self {
        Self {
            config,
            caches,
            network,
        }
    }

    /// Whether `request` is a wishlist mutation replayed by `wishlist-sync`.
    pub fn is_wishlist_mutation(&self, request: &Request) -> bool {
        request.method == RequestMethod::Post
            && request.url.contains(&self.config.sync.wishlist_path)
    }

    /// Store a mutation for later replay and register the wishlist tag.
    ///
    /// Returns the queue ID the entry is stored under.
    pub fn defer(&self, request: Request, registry: &mut SyncRegistry) -> Result<u64, WorkerError> {
        if !self.is_wishlist_mutation(&request) {
            return Err(WorkerError::NotDeferrable {
                method: request.method.to_string(),
                url: request.url,
            });
        }

        let method = request.method;
        let url = request.url.clone();
        let queue_id = self.caches.put_queued(
            &self.config.dynamic_cache(),
            request,
            Response::synthesized(202, "Queued for background sync"),
        );
        log::info!("[SW Sync] Queued {} {} as #{}", method, url, queue_id);

        registry.register(self.config.sync.wishlist_tag.clone());
        Ok(queue_id)
    }

    /// Deferred wishlist mutations, oldest first.
    pub fn pending(&self) -> Result<Vec<Request>, WorkerError> {
        let requests = self.caches.requests_in(&self.config.dynamic_cache())?;
        Ok(requests
            .into_iter()
            .filter(|r| self.is_wishlist_mutation(r))
            .collect())
    }

    /// Re-send every deferred wishlist mutation, one at a time.
    ///
    /// An entry is removed only when its replay returns a 2xx status. A
    /// failed entry is left byte-identical and the scan continues.
    pub async fn replay_wishlist(&self) -> Result<ReplayReport, WorkerError> {
        let dynamic_cache = self.config.dynamic_cache();
        let mut report = ReplayReport::default();

        for stored in self.pending()? {
            let mut outgoing = stored.clone();
            outgoing.queue_id = None;

            match self.network.fetch(&outgoing).await {
                Ok(response) if response.ok() => {
                    self.caches.delete_entry(&dynamic_cache, &stored);
                    report.replayed += 1;
                    log::info!("[SW Sync] Replayed {}", stored.url);
                }
                Ok(response) => {
                    report.retained += 1;
                    log::warn!(
                        "[SW Sync] Replay of {} returned {}; keeping it",
                        stored.url,
                        response.status
                    );
                }
                Err(e) => {
                    report.retained += 1;
                    log::warn!("[SW Sync] Replay of {} failed: {}", stored.url, e);
                }
            }
        }

        Ok(report)
    }
}
