//! FlatScout Offline Worker
//!
//! Offline caching, background sync and push notification handling for the
//! FlatScout web app, written against small host seams ([`Network`],
//! [`Clients`], [`Notifier`]) so any runtime that can deliver service worker
//! events can drive it.
//!
//! The host builds one [`ServiceWorker`] per registration, feeds it
//! [`WorkerEvent`]s through [`ServiceWorker::dispatch`], and awaits the
//! returned [`Lifetime`] before tearing the worker down.

pub mod cache;
pub mod config;
pub mod error;
pub mod events;
pub mod fetch;
pub mod lifecycle;
pub mod message;
pub mod notification;
pub mod push;
pub mod router;
pub mod strategy;
pub mod sync;
pub mod worker;

pub use cache::{CacheSnapshot, CacheStorage};
pub use config::WorkerConfig;
pub use error::{CacheError, ClientError, ConfigError, LifecycleError, NetworkError, WorkerError};
pub use events::{Lifetime, WorkerEvent};
pub use fetch::{Network, Request, RequestMethod, Response};
pub use lifecycle::ServiceWorkerState;
pub use notification::{Clients, WindowClient};
pub use push::{NotificationOptions, Notifier, PushPayload};
pub use router::{classify, Route};
pub use worker::{Dispatched, Host, Outcome, ServiceWorker};
