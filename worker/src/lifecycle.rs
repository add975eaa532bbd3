//! Worker Lifecycle
//!
//! State transitions, install-time pre-caching and activate-time eviction of
//! superseded cache namespaces.

use crate::cache::CacheStorage;
use crate::config::WorkerConfig;
use crate::error::{CacheError, LifecycleError};
use crate::fetch::{Network, Request};

/// Worker state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ServiceWorkerState {
    /// Script evaluated, not yet installing
    #[default]
    Parsed,
    /// Install event dispatched
    Installing,
    /// Installed, waiting to activate
    Installed,
    /// Activate event dispatched
    Activating,
    /// Controlling pages
    Activated,
    /// Failed or replaced
    Redundant,
}

/// Tracks the state of one worker instance.
#[derive(Debug, Default)]
pub struct Lifecycle {
    state: ServiceWorkerState,
    skip_waiting: bool,
    history: Vec<(ServiceWorkerState, ServiceWorkerState)>,
}

impl Lifecycle {
    /// Create new lifecycle in the `Parsed` state
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ServiceWorkerState {
        self.state
    }

    /// Transition worker state
    pub fn transition(&mut self, to: ServiceWorkerState) -> Result<(), LifecycleError> {
        let from = self.state;
        if !is_valid_transition(from, to) {
            return Err(LifecycleError::InvalidTransition { from, to });
        }
        log::debug!("[SW Lifecycle] {:?} -> {:?}", from, to);
        self.state = to;
        self.history.push((from, to));
        Ok(())
    }

    /// Ask to replace any waiting worker as soon as installation finishes.
    pub fn skip_waiting(&mut self) {
        self.skip_waiting = true;
    }

    pub fn skips_waiting(&self) -> bool {
        self.skip_waiting
    }

    /// Transitions applied so far, oldest first.
    pub fn history(&self) -> &[(ServiceWorkerState, ServiceWorkerState)] {
        &self.history
    }
}

/// Check if a state transition is valid
pub fn is_valid_transition(from: ServiceWorkerState, to: ServiceWorkerState) -> bool {
    use ServiceWorkerState::*;

    matches!(
        (from, to),
        (Parsed, Installing)
            | (Installing, Installed)
            | (Installing, Redundant)
            | (Installed, Activating)
            | (Installed, Redundant)
            | (Activating, Activated)
            | (Activating, Redundant)
            | (Activated, Redundant)
    )
}

/// Result of the install handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallReport {
    /// Number of resources pre-cached, or why the batch was dropped.
    pub precache: Result<usize, CacheError>,
}

impl InstallReport {
    pub fn precached(&self) -> bool {
        self.precache.is_ok()
    }
}

/// Result of the activate handler.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActivationReport {
    /// Namespaces deleted because they belong to another version.
    pub evicted: Vec<String>,
    /// Namespaces left in place.
    pub retained: Vec<String>,
}

/// Pre-cache the static allowlist into the static namespace.
///
/// The batch is all-or-nothing. A failure is logged and reported but never
/// aborts installation.
pub async fn install(
    config: &WorkerConfig,
    caches: &CacheStorage,
    network: &dyn Network,
) -> InstallReport {
    let static_cache = config.static_cache();
    log::info!("[SW Install] Caching static resources into {}", static_cache);

    let requests = config
        .cache
        .static_resources
        .iter()
        .map(|path| Request::new(config.absolute(path)))
        .collect::<Vec<_>>();
    let count = requests.len();

    let precache = match caches.add_all(&static_cache, requests, network).await {
        Ok(()) => {
            log::info!("[SW Install] Cached {} static resources", count);
            Ok(count)
        }
        Err(e) => {
            log::error!("[SW Install] Static pre-cache failed: {}", e);
            Err(e)
        }
    };

    InstallReport { precache }
}

/// Names from `existing` that activation deletes: everything except the
/// current static and dynamic namespaces.
pub fn evictable(existing: &[String], config: &WorkerConfig) -> Vec<String> {
    let canonical = config.canonical_caches();
    existing
        .iter()
        .filter(|name| !canonical.contains(*name))
        .cloned()
        .collect()
}

/// Delete every non-canonical namespace and make sure both canonical ones
/// exist.
pub fn activate(config: &WorkerConfig, caches: &CacheStorage) -> ActivationReport {
    let existing = caches.keys();
    let evicted = evictable(&existing, config);

    for name in &evicted {
        log::info!("[SW Activate] Deleting old cache: {}", name);
        caches.delete(name);
    }
    for name in config.canonical_caches() {
        caches.open(&name);
    }

    ActivationReport {
        evicted,
        retained: caches.keys(),
    }
}
