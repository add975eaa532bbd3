//! Page Messages
//!
//! Messages posted by pages to the worker and the `{ success, message }`
//! replies sent back on the page's reply channel.

use futures::channel::oneshot;
use serde::{Deserialize, Serialize};

use crate::fetch::{Request, RequestMethod};

/// Sending half of a page's reply channel.
pub type ReplyPort = oneshot::Sender<MessageReply>;

/// Create a reply channel; the page keeps the receiver.
pub fn reply_channel() -> (ReplyPort, oneshot::Receiver<MessageReply>) {
    oneshot::channel()
}

/// Messages the worker understands, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PageMessage {
    /// Content shared into the app through the OS share sheet.
    ShareTarget {
        #[serde(default)]
        title: Option<String>,
        #[serde(default)]
        text: Option<String>,
        #[serde(default)]
        url: Option<String>,
    },
    /// A mutation the page could not send; replay it on the next sync.
    QueueRequest {
        url: String,
        #[serde(default = "default_method")]
        method: String,
        #[serde(default)]
        body: Option<serde_json::Value>,
    },
    /// Activate this worker without waiting for old tabs to close.
    SkipWaiting,
}

fn default_method() -> String {
    "POST".to_string()
}

impl PageMessage {
    /// Parse a raw message. Unknown or malformed messages yield `None`.
    pub fn parse(data: &serde_json::Value) -> Option<Self> {
        match serde_json::from_value(data.clone()) {
            Ok(message) => Some(message),
            Err(e) => {
                log::debug!("[SW Message] Ignoring message: {}", e);
                None
            }
        }
    }
}

/// Reply to a page message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageReply {
    pub success: bool,
    pub message: String,
}

impl MessageReply {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

/// Send `reply` if the page attached a port. A page that dropped its
/// receiver is not an error.
pub fn send_reply(port: Option<ReplyPort>, reply: MessageReply) {
    if let Some(port) = port {
        if port.send(reply).is_err() {
            log::debug!("[SW Message] Reply channel closed");
        }
    }
}

/// Reply text for shared content.
pub fn share_target_reply(title: Option<&str>, url: Option<&str>) -> MessageReply {
    let subject = title.filter(|t| !t.is_empty()).or(url).unwrap_or("content");
    MessageReply::ok(format!("Received shared {subject}"))
}

/// Build the request a `QUEUE_REQUEST` message describes, resolving the URL
/// against `origin`.
pub fn queued_request(
    origin: &str,
    url: &str,
    method: &str,
    body: Option<&serde_json::Value>,
) -> Option<Request> {
    let method = RequestMethod::parse(method)?;
    let url = crate::fetch::Url::resolve(origin, url).ok()?;
    let mut request = Request::new(url).with_method(method);
    match body {
        Some(serde_json::Value::String(text)) => {
            request = request.with_body(text.as_bytes().to_vec());
        }
        Some(serde_json::Value::Null) | None => {}
        Some(value) => {
            request = request
                .with_header("Content-Type", "application/json")
                .with_body(value.to_string().into_bytes());
        }
    }
    Some(request)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_share_target() {
        let message = PageMessage::parse(&json!({
            "type": "SHARE_TARGET",
            "title": "Flat in Hyde Park",
            "text": "Look at this",
            "url": "https://flatscout.example/flat-details/9"
        }));
        assert_eq!(
            message,
            Some(PageMessage::ShareTarget {
                title: Some("Flat in Hyde Park".into()),
                text: Some("Look at this".into()),
                url: Some("https://flatscout.example/flat-details/9".into()),
            })
        );
    }

    #[test]
    fn parse_queue_request_defaults_to_post() {
        let message = PageMessage::parse(&json!({
            "type": "QUEUE_REQUEST",
            "url": "/api/wishlist/add"
        }));
        assert_eq!(
            message,
            Some(PageMessage::QueueRequest {
                url: "/api/wishlist/add".into(),
                method: "POST".into(),
                body: None,
            })
        );
    }

    #[test]
    fn unknown_messages_are_ignored() {
        assert_eq!(PageMessage::parse(&json!({"type": "PING"})), None);
        assert_eq!(PageMessage::parse(&json!("hello")), None);
        assert_eq!(PageMessage::parse(&json!({"type": "QUEUE_REQUEST"})), None);
    }

    #[test]
    fn skip_waiting_parses() {
        assert_eq!(
            PageMessage::parse(&json!({"type": "SKIP_WAITING"})),
            Some(PageMessage::SkipWaiting)
        );
    }

    #[test]
    fn reply_reaches_receiver() {
        let (port, rx) = reply_channel();
        send_reply(Some(port), MessageReply::ok("done"));
        let reply = futures::executor::block_on(rx).unwrap();
        assert!(reply.success);
        assert_eq!(reply.message, "done");
    }

    #[test]
    fn reply_to_dropped_receiver_is_silent() {
        let (port, rx) = reply_channel();
        drop(rx);
        send_reply(Some(port), MessageReply::ok("nobody listens"));
    }

    #[test]
    fn share_reply_mentions_title() {
        let reply = share_target_reply(Some("Flat"), None);
        assert_eq!(reply.message, "Received shared Flat");
        let reply = share_target_reply(None, Some("https://x.example/"));
        assert_eq!(reply.message, "Received shared https://x.example/");
    }

    #[test]
    fn queued_request_encodes_json_body() {
        let request = queued_request(
            "http://localhost:3000",
            "/api/wishlist/add",
            "post",
            Some(&json!({"flatId": "abc"})),
        )
        .unwrap();
        assert_eq!(request.url, "http://localhost:3000/api/wishlist/add");
        assert_eq!(request.method, RequestMethod::Post);
        assert_eq!(request.body.as_deref(), Some(&br#"{"flatId":"abc"}"#[..]));
        assert_eq!(
            request.headers.get("Content-Type").map(String::as_str),
            Some("application/json")
        );
    }

    #[test]
    fn queued_request_rejects_bad_method() {
        assert!(queued_request("http://localhost:3000", "/api/wishlist", "BREW", None).is_none());
    }
}
