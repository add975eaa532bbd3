//! Cache Storage
//!
//! Named, versioned caches of request/response pairs. [`CacheStorage`] is a
//! cheap cloneable handle: every fetch handler, the lifecycle manager and the
//! sync replay share the same namespaces through it.
//!
//! There is no eviction policy and no transaction spanning several
//! operations. Concurrent writes to the same key are last-write-wins.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use spin::RwLock;

use crate::error::CacheError;
use crate::fetch::{Network, Request, Response};

/// Insertion counter; keeps `entries()` in the order entries were written.
static NEXT_SEQUENCE: AtomicU64 = AtomicU64::new(1);

/// Key a request is stored under: `METHOD:URL`, plus `#<queue_id>` for
/// deferred mutations so several queued POSTs to one endpoint coexist.
pub fn cache_key(request: &Request) -> String {
    match request.queue_id {
        Some(id) => format!("{}:{}#{}", request.method.as_str(), request.url, id),
        None => format!("{}:{}", request.method.as_str(), request.url),
    }
}

/// A cached request-response pair
#[derive(Debug, Clone)]
struct CacheEntry {
    request: Request,
    response: Response,
    sequence: u64,
}

/// A single named cache.
#[derive(Debug, Clone)]
pub struct Cache {
    name: String,
    entries: BTreeMap<String, CacheEntry>,
}

impl Cache {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: BTreeMap::new(),
        }
    }

    /// Cache name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Store a pair, overwriting any entry with the same key.
    pub fn put(&mut self, request: Request, response: Response) {
        let key = cache_key(&request);
        let sequence = NEXT_SEQUENCE.fetch_add(1, Ordering::Relaxed);
        self.entries.insert(
            key,
            CacheEntry {
                request,
                response,
                sequence,
            },
        );
    }

    pub fn match_request(&self, request: &Request) -> Option<&Response> {
        self.entries.get(&cache_key(request)).map(|e| &e.response)
    }

    /// Remove the entry stored for `request`.
    pub fn delete(&mut self, request: &Request) -> bool {
        self.entries.remove(&cache_key(request)).is_some()
    }

    /// Stored pairs in insertion order.
    pub fn entries(&self) -> Vec<(&Request, &Response)> {
        let mut entries: Vec<&CacheEntry> = self.entries.values().collect();
        entries.sort_by_key(|e| e.sequence);
        entries
            .into_iter()
            .map(|e| (&e.request, &e.response))
            .collect()
    }

    /// Stored requests in insertion order.
    pub fn requests(&self) -> Vec<Request> {
        self.entries().into_iter().map(|(r, _)| r.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Handle to all cache namespaces of the worker's origin.
///
/// Namespaces are kept in creation order, which is the order cross-cache
/// lookups search them in.
#[derive(Debug, Clone, Default)]
pub struct CacheStorage {
    caches: Arc<RwLock<Vec<Cache>>>,
}

impl CacheStorage {
    /// Create an empty storage
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a namespace, creating it if missing.
    pub fn open(&self, name: &str) {
        let mut caches = self.caches.write();
        if !caches.iter().any(|c| c.name == name) {
            caches.push(Cache::new(name));
        }
    }

    pub fn has(&self, name: &str) -> bool {
        self.caches.read().iter().any(|c| c.name == name)
    }

    /// Delete a namespace and all of its entries.
    pub fn delete(&self, name: &str) -> bool {
        let mut caches = self.caches.write();
        let before = caches.len();
        caches.retain(|c| c.name != name);
        caches.len() != before
    }

    /// Namespace names in creation order.
    pub fn keys(&self) -> Vec<String> {
        self.caches.read().iter().map(|c| c.name.clone()).collect()
    }

    /// Store a pair into `name`, opening the namespace if needed.
    pub fn put(&self, name: &str, request: Request, response: Response) {
        let mut caches = self.caches.write();
        match caches.iter_mut().find(|c| c.name == name) {
            Some(cache) => cache.put(request, response),
            None => {
                let mut cache = Cache::new(name);
                cache.put(request, response);
                caches.push(cache);
            }
        }
    }

    /// Store a deferred request into `name` under the next free queue id
    /// (one past the highest id already stored there) and return that id.
    pub fn put_queued(&self, name: &str, mut request: Request, response: Response) -> u64 {
        let mut caches = self.caches.write();
        let index = match caches.iter().position(|c| c.name == name) {
            Some(index) => index,
            None => {
                caches.push(Cache::new(name));
                caches.len() - 1
            }
        };
        let cache = &mut caches[index];
        let queue_id = cache
            .entries
            .values()
            .filter_map(|e| e.request.queue_id)
            .max()
            .unwrap_or(0)
            + 1;
        request.queue_id = Some(queue_id);
        cache.put(request, response);
        queue_id
    }

    /// Look a request up in every namespace; first hit wins.
    pub fn match_request(&self, request: &Request) -> Option<Response> {
        self.caches
            .read()
            .iter()
            .find_map(|c| c.match_request(request).cloned())
    }

    /// Look a request up in one namespace.
    pub fn match_in(&self, name: &str, request: &Request) -> Option<Response> {
        self.caches
            .read()
            .iter()
            .find(|c| c.name == name)
            .and_then(|c| c.match_request(request).cloned())
    }

    /// Look a request up in `name` first, then in every namespace.
    pub fn match_preferring(&self, name: &str, request: &Request) -> Option<Response> {
        self.match_in(name, request)
            .or_else(|| self.match_request(request))
    }

    /// Requests stored in `name`, in insertion order.
    pub fn requests_in(&self, name: &str) -> Result<Vec<Request>, CacheError> {
        self.caches
            .read()
            .iter()
            .find(|c| c.name == name)
            .map(Cache::requests)
            .ok_or_else(|| CacheError::NotFound(name.to_string()))
    }

    /// Remove one entry from `name`.
    pub fn delete_entry(&self, name: &str, request: &Request) -> bool {
        self.caches
            .write()
            .iter_mut()
            .find(|c| c.name == name)
            .map(|c| c.delete(request))
            .unwrap_or(false)
    }

    /// Number of entries in `name`, if the namespace exists.
    pub fn entry_count(&self, name: &str) -> Option<usize> {
        self.caches
            .read()
            .iter()
            .find(|c| c.name == name)
            .map(Cache::len)
    }

    /// Fetch every request and store the whole batch into `name`, or store
    /// nothing if any fetch is rejected or returns a non-2xx status.
    pub async fn add_all(
        &self,
        name: &str,
        requests: Vec<Request>,
        network: &dyn Network,
    ) -> Result<(), CacheError> {
        let mut fetched = Vec::with_capacity(requests.len());
        for request in requests {
            match network.fetch(&request).await {
                Ok(response) if response.ok() => fetched.push((request, response)),
                Ok(response) => {
                    return Err(CacheError::AddAllFailed {
                        url: request.url,
                        reason: format!("status {}", response.status),
                    })
                }
                Err(e) => {
                    return Err(CacheError::AddAllFailed {
                        url: request.url,
                        reason: e.to_string(),
                    })
                }
            }
        }

        self.open(name);
        for (request, response) in fetched {
            self.put(name, request, response);
        }
        Ok(())
    }

    /// Serializable copy of every namespace.
    pub fn snapshot(&self) -> CacheSnapshot {
        let caches = self
            .caches
            .read()
            .iter()
            .map(|cache| NamespaceSnapshot {
                name: cache.name.clone(),
                entries: cache
                    .entries()
                    .into_iter()
                    .map(|(request, response)| StoredExchange {
                        request: request.clone(),
                        response: response.clone(),
                    })
                    .collect(),
            })
            .collect();
        CacheSnapshot { caches }
    }

    /// Rebuild a storage from a snapshot.
    pub fn from_snapshot(snapshot: CacheSnapshot) -> Self {
        let storage = Self::new();
        for namespace in snapshot.caches {
            storage.open(&namespace.name);
            for exchange in namespace.entries {
                storage.put(&namespace.name, exchange.request, exchange.response);
            }
        }
        storage
    }
}

/// Serializable form of a [`CacheStorage`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheSnapshot {
    pub caches: Vec<NamespaceSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamespaceSnapshot {
    pub name: String,
    #[serde(default)]
    pub entries: Vec<StoredExchange>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredExchange {
    pub request: Request,
    pub response: Response,
}

impl CacheSnapshot {
    /// Read a JSON snapshot file.
    pub fn load(path: &Path) -> Result<Self, CacheError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| CacheError::Snapshot(format!("{}: {e}", path.display())))?;
        serde_json::from_str(&content)
            .map_err(|e| CacheError::Snapshot(format!("{}: {e}", path.display())))
    }

    /// Write this snapshot as pretty-printed JSON.
    pub fn save(&self, path: &Path) -> Result<(), CacheError> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| CacheError::Snapshot(e.to_string()))?;
        std::fs::write(path, json)
            .map_err(|e| CacheError::Snapshot(format!("{}: {e}", path.display())))
    }
}
