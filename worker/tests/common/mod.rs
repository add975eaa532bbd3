//! Shared fakes for the worker integration tests.

#![allow(dead_code)]

use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use spin::Mutex;

use flatscout_worker::{
    CacheStorage, ClientError, Clients, Host, Network, NetworkError, NotificationOptions, Notifier,
    Request, Response, ServiceWorker, WindowClient, WorkerConfig,
};

/// Network answering from a per-URL script; unscripted URLs are offline.
#[derive(Default)]
pub struct FakeNetwork {
    scripts: Mutex<BTreeMap<String, VecDeque<Result<Response, NetworkError>>>>,
    sticky: Mutex<BTreeMap<String, Result<Response, NetworkError>>>,
    calls: Mutex<Vec<Request>>,
}

impl FakeNetwork {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Always answer `url` with `result`.
    pub fn always(&self, url: &str, result: Result<Response, NetworkError>) {
        self.sticky.lock().insert(url.to_string(), result);
    }

    /// Answer the next fetch of `url` with `result`, before any sticky answer.
    pub fn once(&self, url: &str, result: Result<Response, NetworkError>) {
        self.scripts
            .lock()
            .entry(url.to_string())
            .or_default()
            .push_back(result);
    }

    pub fn ok(&self, url: &str, body: &str) {
        self.always(
            url,
            Ok(Response::new(200).with_body(body.as_bytes().to_vec())),
        );
    }

    pub fn calls(&self) -> Vec<Request> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

#[async_trait]
impl Network for FakeNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response, NetworkError> {
        self.calls.lock().push(request.clone());
        if let Some(next) = self
            .scripts
            .lock()
            .get_mut(&request.url)
            .and_then(VecDeque::pop_front)
        {
            return next;
        }
        self.sticky
            .lock()
            .get(&request.url)
            .cloned()
            .unwrap_or(Err(NetworkError::Offline))
    }
}

/// Records every notification shown or closed.
#[derive(Default)]
pub struct FakeNotifier {
    pub shown: Mutex<Vec<(String, NotificationOptions)>>,
    pub closed: Mutex<Vec<String>>,
}

#[async_trait]
impl Notifier for FakeNotifier {
    async fn show(&self, title: &str, options: &NotificationOptions) {
        self.shown.lock().push((title.to_string(), options.clone()));
    }

    async fn close(&self, tag: &str) {
        self.closed.lock().push(tag.to_string());
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientCall {
    Focus(String),
    Navigate(String, String),
    Open(String),
    Claim,
}

/// Window list plus a log of every client operation.
#[derive(Default)]
pub struct FakeClients {
    pub windows: Mutex<Vec<WindowClient>>,
    pub calls: Mutex<Vec<ClientCall>>,
}

impl FakeClients {
    pub fn with_windows(windows: Vec<WindowClient>) -> Self {
        Self {
            windows: Mutex::new(windows),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<ClientCall> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl Clients for FakeClients {
    async fn match_windows(&self) -> Vec<WindowClient> {
        self.windows.lock().clone()
    }

    async fn focus(&self, id: &str) -> Result<(), ClientError> {
        if !self.windows.lock().iter().any(|w| w.id == id) {
            return Err(ClientError::NotFound(id.to_string()));
        }
        self.calls.lock().push(ClientCall::Focus(id.to_string()));
        Ok(())
    }

    async fn navigate(&self, id: &str, url: &str) -> Result<(), ClientError> {
        self.calls
            .lock()
            .push(ClientCall::Navigate(id.to_string(), url.to_string()));
        Ok(())
    }

    async fn open_window(&self, url: &str) -> Result<(), ClientError> {
        self.calls.lock().push(ClientCall::Open(url.to_string()));
        Ok(())
    }

    async fn claim(&self) {
        self.calls.lock().push(ClientCall::Claim);
    }
}

/// A worker wired to fresh fakes.
pub struct Harness {
    pub worker: ServiceWorker,
    pub network: Arc<FakeNetwork>,
    pub notifier: Arc<FakeNotifier>,
    pub clients: Arc<FakeClients>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_clients(FakeClients::default())
    }

    pub fn with_clients(clients: FakeClients) -> Self {
        Self::build(WorkerConfig::default(), CacheStorage::new(), clients)
    }

    pub fn with_caches(caches: CacheStorage) -> Self {
        Self::build(WorkerConfig::default(), caches, FakeClients::default())
    }

    pub fn build(config: WorkerConfig, caches: CacheStorage, clients: FakeClients) -> Self {
        let network = FakeNetwork::new();
        let notifier = Arc::new(FakeNotifier::default());
        let clients = Arc::new(clients);
        let host = Host {
            network: network.clone(),
            clients: clients.clone(),
            notifier: notifier.clone(),
        };
        let worker = ServiceWorker::new(Arc::new(config), caches, host);
        Self {
            worker,
            network,
            notifier,
            clients,
        }
    }

    pub fn url(&self, path: &str) -> String {
        self.worker.config().absolute(path)
    }
}
