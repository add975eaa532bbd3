//! Notification click routing
//!
//! Resolves where a clicked notification should take the user and focuses or
//! opens a window there.

use async_trait::async_trait;

use crate::config::WorkerConfig;
use crate::error::{ClientError, WorkerError};
use crate::events::{NotificationClickEvent, NotificationCloseEvent};
use crate::fetch::Url;
use crate::push::{NotificationData, Notifier};

/// Action id that closes the notification without routing.
pub const DISMISS_ACTION: &str = "dismiss";

/// An open page window controlled by (or visible to) the worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowClient {
    pub id: String,
    pub url: String,
    pub focused: bool,
}

impl WindowClient {
    /// Create new window client
    pub fn new(id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
            focused: false,
        }
    }
}

/// Page windows of the worker's origin.
#[async_trait]
pub trait Clients: Send + Sync {
    /// Every open window, including ones the worker does not control yet.
    async fn match_windows(&self) -> Vec<WindowClient>;

    async fn focus(&self, id: &str) -> Result<(), ClientError>;

    async fn navigate(&self, id: &str, url: &str) -> Result<(), ClientError>;

    async fn open_window(&self, url: &str) -> Result<(), ClientError>;

    /// Take control of every open page.
    async fn claim(&self);
}

/// What happened after a click.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickOutcome {
    /// The dismiss action only closes the notification.
    Dismissed,
    /// An existing window was focused, and navigated if it showed another URL.
    Focused {
        client_id: String,
        url: String,
        navigated: bool,
    },
    /// No window of the origin was open.
    Opened { url: String },
}

/// Path for a notification `type`, with `{flatId}` interpolated.
///
/// A template that needs a flat id the data does not carry yields `None`.
pub fn route_for(data: &NotificationData, config: &WorkerConfig) -> Option<String> {
    let template = config.notifications.routes.get(data.kind.as_deref()?)?;
    if template.contains("{flatId}") {
        let flat_id = data.flat_id.as_deref().filter(|id| !id.is_empty())?;
        Some(template.replace("{flatId}", flat_id))
    } else {
        Some(template.clone())
    }
}

/// Absolute URL a click navigates to.
///
/// Order: `data.url`, `data.actionUrl`, the route for `data.type`, the
/// default route. Unparsable candidates are skipped.
pub fn resolve_target(data: &NotificationData, config: &WorkerConfig) -> String {
    let candidates = [
        data.url.clone(),
        data.action_url.clone(),
        route_for(data, config),
    ];

    candidates
        .into_iter()
        .flatten()
        .filter(|candidate| !candidate.is_empty())
        .find_map(|candidate| Url::resolve(&config.origin, &candidate).ok())
        .unwrap_or_else(|| config.absolute(&config.notifications.default_route))
}

/// Handle a notification click.
pub async fn handle_click(
    event: &NotificationClickEvent,
    config: &WorkerConfig,
    notifier: &dyn Notifier,
    clients: &dyn Clients,
) -> Result<ClickOutcome, WorkerError> {
    notifier.close(&event.tag).await;

    if event.action.as_deref() == Some(DISMISS_ACTION) {
        log::debug!("[SW Notification] Dismissed {}", event.tag);
        return Ok(ClickOutcome::Dismissed);
    }

    let target = resolve_target(&event.data, config);
    let origin = Url::parse(&config.origin)?.origin();

    let windows = clients.match_windows().await;
    let existing = windows.into_iter().find(|client| {
        Url::parse(&client.url)
            .map(|url| url.origin() == origin)
            .unwrap_or(false)
    });

    match existing {
        Some(client) => {
            clients.focus(&client.id).await?;
            let navigated = client.url != target;
            if navigated {
                clients.navigate(&client.id, &target).await?;
            }
            log::info!("[SW Notification] Focused {} at {}", client.id, target);
            Ok(ClickOutcome::Focused {
                client_id: client.id,
                url: target,
                navigated,
            })
        }
        None => {
            clients.open_window(&target).await?;
            log::info!("[SW Notification] Opened window at {}", target);
            Ok(ClickOutcome::Opened { url: target })
        }
    }
}

pub fn handle_close(event: &NotificationCloseEvent) {
    log::debug!("[SW Notification] Closed {}", event.tag);
}
