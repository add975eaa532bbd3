//! Worker Events
//!
//! Event payloads delivered by the host, and the [`Lifetime`] a handler
//! extends with work that must finish before the worker may be torn down.

use std::fmt;
use std::future::Future;

use futures::future::{self, BoxFuture, FutureExt};

use crate::fetch::Request;
use crate::message::ReplyPort;
use crate::push::NotificationData;

/// Event type identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventType {
    /// Install event
    Install,
    /// Activate event
    Activate,
    /// Fetch event
    Fetch,
    /// Sync event
    Sync,
    /// Push event
    Push,
    /// Notification click event
    NotificationClick,
    /// Notification close event
    NotificationClose,
    /// Message event
    Message,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Install => "install",
            Self::Activate => "activate",
            Self::Fetch => "fetch",
            Self::Sync => "sync",
            Self::Push => "push",
            Self::NotificationClick => "notificationclick",
            Self::NotificationClose => "notificationclose",
            Self::Message => "message",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Work registered through `wait_until`.
///
/// The host must await [`Lifetime::settle`] before terminating the worker;
/// nothing in a lifetime can be cancelled once registered.
#[derive(Default)]
pub struct Lifetime {
    pending: Vec<BoxFuture<'static, ()>>,
}

impl Lifetime {
    /// Create an empty lifetime
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep the worker alive until `work` completes.
    pub fn wait_until<F>(&mut self, work: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.pending.push(work.boxed());
    }

    /// Number of registered, not yet settled tasks.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Drive every registered task to completion.
    pub async fn settle(self) {
        future::join_all(self.pending).await;
    }
}

impl fmt::Debug for Lifetime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lifetime")
            .field("pending", &self.pending.len())
            .finish()
    }
}

/// An intercepted page request
#[derive(Debug, Clone)]
pub struct FetchEvent {
    pub request: Request,
}

impl FetchEvent {
    /// Create new fetch event
    pub fn new(request: Request) -> Self {
        Self { request }
    }
}

/// Sync event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncEvent {
    /// Registration tag
    pub tag: String,
    /// Whether the host will not retry this tag again
    pub last_chance: bool,
}

impl SyncEvent {
    /// Create new sync event
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            last_chance: false,
        }
    }
}

/// Push event data
#[derive(Debug, Clone, Default)]
pub struct PushEvent {
    data: Option<Vec<u8>>,
}

impl PushEvent {
    /// Create new push event
    pub fn new(data: Option<Vec<u8>>) -> Self {
        Self { data }
    }

    /// Push event carrying a text payload
    pub fn with_text(text: &str) -> Self {
        Self::new(Some(text.as_bytes().to_vec()))
    }

    /// Get data
    pub fn data(&self) -> Option<&[u8]> {
        self.data.as_deref()
    }
}

/// The user clicked a notification or one of its actions.
#[derive(Debug, Clone)]
pub struct NotificationClickEvent {
    /// Tag of the clicked notification
    pub tag: String,
    /// Data attached when the notification was shown
    pub data: NotificationData,
    /// Action button, if one was clicked instead of the body
    pub action: Option<String>,
}

impl NotificationClickEvent {
    /// Create new notification click event
    pub fn new(tag: impl Into<String>, data: NotificationData) -> Self {
        Self {
            tag: tag.into(),
            data,
            action: None,
        }
    }

    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }
}

/// The user dismissed a notification.
#[derive(Debug, Clone)]
pub struct NotificationCloseEvent {
    pub tag: String,
}

/// A page posted a message to the worker.
#[derive(Debug)]
pub struct MessageEvent {
    /// Raw message body (JSON)
    pub data: serde_json::Value,
    /// Reply channel, when the page attached one
    pub reply: Option<ReplyPort>,
}

impl MessageEvent {
    /// Create new message event
    pub fn new(data: serde_json::Value) -> Self {
        Self { data, reply: None }
    }

    pub fn with_reply(mut self, reply: ReplyPort) -> Self {
        self.reply = Some(reply);
        self
    }
}

/// Every event the host can dispatch to the worker.
#[derive(Debug)]
pub enum WorkerEvent {
    Install,
    Activate,
    Fetch(FetchEvent),
    Sync(SyncEvent),
    Push(PushEvent),
    NotificationClick(NotificationClickEvent),
    NotificationClose(NotificationCloseEvent),
    Message(MessageEvent),
}

impl WorkerEvent {
    /// Get event type
    pub fn event_type(&self) -> EventType {
        match self {
            Self::Install => EventType::Install,
            Self::Activate => EventType::Activate,
            Self::Fetch(_) => EventType::Fetch,
            Self::Sync(_) => EventType::Sync,
            Self::Push(_) => EventType::Push,
            Self::NotificationClick(_) => EventType::NotificationClick,
            Self::NotificationClose(_) => EventType::NotificationClose,
            Self::Message(_) => EventType::Message,
        }
    }
}
