//! Push Notifications
//!
//! Typed push payloads, the single normalization step that turns a payload
//! into fully populated notification options, and the push handler.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};

use crate::config::{NotificationDefaults, WorkerConfig};
use crate::events::PushEvent;

/// Payload priority. Strings other than `high` and `urgent` are `Normal`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Priority {
    High,
    Urgent,
    #[default]
    Normal,
}

impl From<String> for Priority {
    fn from(value: String) -> Self {
        match value.as_str() {
            "high" => Self::High,
            "urgent" => Self::Urgent,
            _ => Self::Normal,
        }
    }
}

impl From<Priority> for String {
    fn from(value: Priority) -> Self {
        match value {
            Priority::High => "high",
            Priority::Urgent => "urgent",
            Priority::Normal => "normal",
        }
        .to_string()
    }
}

impl Priority {
    /// High and urgent notifications stay on screen until the user acts.
    pub fn requires_interaction(&self) -> bool {
        matches!(self, Self::High | Self::Urgent)
    }
}

/// Notification action button
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationAction {
    /// Action identifier reported back on click
    pub action: String,
    /// Button label
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

impl NotificationAction {
    /// Create new action
    pub fn new(action: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            title: title.into(),
            icon: None,
        }
    }
}

/// Data attached to a notification and handed back on click.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Routing key, e.g. `new_flat`
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Servers send flat ids as strings or numbers.
    #[serde(
        default,
        deserialize_with = "string_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub flat_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_url: Option<String>,
    /// Fields the worker does not interpret, passed through untouched.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(Option::<Id>::deserialize(deserializer)?.map(|id| match id {
        Id::Text(text) => text,
        Id::Number(number) => number.to_string(),
    }))
}

/// JSON body of a push message. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PushPayload {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub badge: Option<String>,
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default)]
    pub data: Option<NotificationData>,
    #[serde(default)]
    pub actions: Option<Vec<NotificationAction>>,
    #[serde(default)]
    pub priority: Option<Priority>,
}

impl PushPayload {
    pub fn from_slice(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}

/// Fully populated options handed to the notifier.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationOptions {
    pub body: String,
    pub icon: String,
    pub badge: String,
    pub tag: String,
    pub data: NotificationData,
    pub actions: Vec<NotificationAction>,
    pub require_interaction: bool,
    pub vibrate: Vec<u32>,
}

impl NotificationOptions {
    /// Apply `defaults` to every field the payload leaves out. Empty strings
    /// count as missing.
    pub fn normalize(payload: &PushPayload, defaults: &NotificationDefaults) -> Self {
        let priority = payload.priority.unwrap_or_default();
        let vibrate = match priority {
            Priority::Urgent => defaults.urgent_vibration.clone(),
            _ => defaults.default_vibration.clone(),
        };

        Self {
            body: or_default(&payload.body, &defaults.body),
            icon: or_default(&payload.icon, &defaults.icon),
            badge: or_default(&payload.badge, &defaults.badge),
            tag: or_default(&payload.tag, &defaults.tag),
            data: payload.data.clone().unwrap_or_default(),
            actions: payload
                .actions
                .clone()
                .unwrap_or_else(|| defaults.actions.clone()),
            require_interaction: priority.requires_interaction(),
            vibrate,
        }
    }

    /// Minimal notification shown when a payload cannot be parsed.
    pub fn fallback(defaults: &NotificationDefaults) -> Self {
        Self {
            body: defaults.fallback_body.clone(),
            icon: defaults.icon.clone(),
            badge: defaults.badge.clone(),
            tag: defaults.tag.clone(),
            data: NotificationData::default(),
            actions: Vec::new(),
            require_interaction: false,
            vibrate: defaults.default_vibration.clone(),
        }
    }
}

fn or_default(value: &Option<String>, default: &str) -> String {
    match value.as_deref() {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => default.to_string(),
    }
}

/// Title shown for a payload: its own title, or the application name.
pub fn title_for(payload: &PushPayload, app_name: &str) -> String {
    or_default(&payload.title, app_name)
}

/// Platform notification display.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn show(&self, title: &str, options: &NotificationOptions);

    /// Close every visible notification with `tag`.
    async fn close(&self, tag: &str);
}

/// What the push handler displayed.
#[derive(Debug, Clone, PartialEq)]
pub enum PushOutcome {
    /// The push carried no data.
    Ignored,
    /// A notification built from the payload.
    Shown {
        title: String,
        options: NotificationOptions,
    },
    /// The payload was malformed; the fixed fallback was shown instead.
    Fallback {
        title: String,
        options: NotificationOptions,
    },
}

/// Build the notification for a push event without displaying it.
pub fn prepare(event: &PushEvent, config: &WorkerConfig) -> PushOutcome {
    let Some(bytes) = event.data() else {
        return PushOutcome::Ignored;
    };

    match PushPayload::from_slice(bytes) {
        Ok(payload) => PushOutcome::Shown {
            title: title_for(&payload, &config.app_name),
            options: NotificationOptions::normalize(&payload, &config.notifications),
        },
        Err(e) => {
            log::warn!("[SW Push] Could not parse push payload: {}", e);
            PushOutcome::Fallback {
                title: config.notifications.fallback_title.clone(),
                options: NotificationOptions::fallback(&config.notifications),
            }
        }
    }
}

/// Handle a push event: display exactly one notification unless the push
/// is empty.
pub async fn handle_push(
    event: &PushEvent,
    config: &WorkerConfig,
    notifier: &dyn Notifier,
) -> PushOutcome {
    let outcome = prepare(event, config);
    match &outcome {
        PushOutcome::Ignored => log::debug!("[SW Push] Push event without data"),
        PushOutcome::Shown { title, options } | PushOutcome::Fallback { title, options } => {
            log::info!("[SW Push] Showing notification '{}' ({})", title, options.tag);
            notifier.show(title, options).await;
        }
    }
    outcome
}
