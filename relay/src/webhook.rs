use crate::error::UpstreamError;
use crate::submission::{Submission, SubmissionKind};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::Value;
use url::Url;

/// Upper bound, in characters, on the operator-facing excerpt of a raw
/// upstream body.
pub const DIAGNOSTIC_LIMIT: usize = 500;

/// Channel tag stamped on every outbound payload.
const SOURCE: &str = "launch-site";

/// JSON body sent to the spreadsheet webhook.
#[derive(Debug, Serialize)]
pub struct WebhookPayload {
    #[serde(rename = "type")]
    pub kind: SubmissionKind,
    pub name: String,
    pub email: String,
    /// Present only for demo submissions; waitlist payloads omit the field.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referrer: Option<String>,
    #[serde(rename = "createdAt")]
    pub created_at: String,
    pub source: &'static str,
    /// Shared secret, only when one is configured. Never invented.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
}

impl WebhookPayload {
    /// Assemble the outbound body, stamping the submission time.
    pub fn assemble(submission: Submission, secret: Option<&str>) -> Self {
        let created_at = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        let secret = secret.map(str::to_owned);
        match submission {
            Submission::Waitlist { name, email } => WebhookPayload {
                kind: SubmissionKind::Waitlist,
                name,
                email,
                referrer: None,
                created_at,
                source: SOURCE,
                secret,
            },
            Submission::Demo {
                name,
                email,
                referrer,
            } => WebhookPayload {
                kind: SubmissionKind::Demo,
                name,
                email,
                referrer: Some(referrer),
                created_at,
                source: SOURCE,
                secret,
            },
        }
    }
}

/// Client for the spreadsheet-backed webhook.
///
/// The inner `reqwest::Client` is reference-counted, so clones share one
/// connection pool.
#[derive(Clone)]
pub struct WebhookClient {
    client: reqwest::Client,
    url: Url,
    secret: Option<String>,
}

impl WebhookClient {
    pub fn new(url: Url, secret: Option<String>) -> Self {
        WebhookClient {
            client: reqwest::Client::new(),
            url,
            secret,
        }
    }

    pub fn secret(&self) -> Option<&str> {
        self.secret.as_deref()
    }

    /// Post a payload and interpret the webhook's answer.
    ///
    /// One outbound call, never retried. Transport failures carry no body
    /// excerpt; every failure past the status line carries the first
    /// [`DIAGNOSTIC_LIMIT`] characters of the raw body.
    ///
    /// The acknowledgement check is strict: the body's `ok` field must be
    /// the JSON boolean `true`. Truthy strings and numbers do not count.
    pub async fn deliver(&self, payload: &WebhookPayload) -> Result<(), UpstreamError> {
        let response = self
            .client
            .post(self.url.clone())
            .header(reqwest::header::CACHE_CONTROL, "no-store")
            .json(payload)
            .send()
            .await
            .map_err(UpstreamError::Network)?;

        let status = response.status();
        // A body that cannot be read is interpreted as empty, like a
        // webhook that answered with no content.
        let text = response.text().await.unwrap_or_default();

        if !status.is_success() {
            return Err(UpstreamError::WriteFailed {
                detail: excerpt(&text),
            });
        }

        let body: Value = match serde_json::from_str(&text) {
            Ok(body) => body,
            Err(_) => {
                return Err(UpstreamError::UnexpectedResponse {
                    detail: excerpt(&text),
                });
            }
        };

        if body.get("ok").and_then(Value::as_bool) == Some(true) {
            return Ok(());
        }

        let message = body
            .get("error")
            .and_then(Value::as_str)
            .map(str::to_owned)
            .unwrap_or_else(|| "Webhook returned an error.".to_owned());
        Err(UpstreamError::Refused {
            message,
            detail: excerpt(&text),
        })
    }
}

/// First [`DIAGNOSTIC_LIMIT`] characters of a raw upstream body. Counted in
/// characters, not bytes, so truncation never splits a UTF-8 sequence.
fn excerpt(body: &str) -> String {
    body.chars().take(DIAGNOSTIC_LIMIT).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::State;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;
    use axum::{Json, Router};
    use std::sync::{Arc, Mutex};
    use tokio::net::TcpListener;

    fn demo() -> Submission {
        Submission::Demo {
            name: "Ada Lovelace".into(),
            email: "ada@example.com".into(),
            referrer: "partner-site".into(),
        }
    }

    fn waitlist() -> Submission {
        Submission::Waitlist {
            name: "Ada Lovelace".into(),
            email: "ada@example.com".into(),
        }
    }

    #[test]
    fn test_waitlist_payload_shape() {
        let payload = WebhookPayload::assemble(waitlist(), None);
        let json = serde_json::to_value(&payload).unwrap();

        assert_eq!(json["type"], "waitlist");
        assert_eq!(json["name"], "Ada Lovelace");
        assert_eq!(json["email"], "ada@example.com");
        assert_eq!(json["source"], "launch-site");
        assert!(json["createdAt"].as_str().unwrap().ends_with('Z'));
        // Omitted, not null
        assert!(json.get("referrer").is_none());
        assert!(json.get("secret").is_none());
    }

    #[test]
    fn test_demo_payload_keeps_referrer() {
        let payload = WebhookPayload::assemble(demo(), Some("s3cret"));
        let json = serde_json::to_value(&payload).unwrap();

        assert_eq!(json["type"], "demo");
        assert_eq!(json["referrer"], "partner-site");
        assert_eq!(json["secret"], "s3cret");
    }

    #[test]
    fn test_excerpt_truncates_to_limit() {
        let body = "x".repeat(10_000);
        let detail = excerpt(&body);
        assert_eq!(detail.chars().count(), DIAGNOSTIC_LIMIT);
        assert_eq!(detail, "x".repeat(DIAGNOSTIC_LIMIT));

        // Multi-byte characters count as one
        let body = "é".repeat(600);
        assert_eq!(excerpt(&body).chars().count(), DIAGNOSTIC_LIMIT);
    }

    /// Start a webhook double that always answers with the given status and
    /// body, recording what it received.
    async fn start_webhook(
        status: StatusCode,
        body: &'static str,
    ) -> (Url, Arc<Mutex<Vec<(HeaderMap, Value)>>>) {
        let received: Arc<Mutex<Vec<(HeaderMap, Value)>>> = Arc::default();

        let state = received.clone();
        let app = Router::new()
            .route(
                "/",
                post(
                    move |State(seen): State<Arc<Mutex<Vec<(HeaderMap, Value)>>>>,
                          headers: HeaderMap,
                          Json(payload): Json<Value>| async move {
                        seen.lock().unwrap().push((headers, payload));
                        (status, body)
                    },
                ),
            )
            .with_state(state);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/", listener.local_addr().unwrap())
            .parse()
            .unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        (url, received)
    }

    #[tokio::test]
    async fn test_deliver_acknowledged() {
        let (url, received) = start_webhook(StatusCode::OK, r#"{"ok": true}"#).await;
        let client = WebhookClient::new(url, None);

        client
            .deliver(&WebhookPayload::assemble(demo(), client.secret()))
            .await
            .unwrap();

        let seen = received.lock().unwrap();
        let (headers, payload) = &seen[0];
        assert_eq!(headers.get("cache-control").unwrap(), "no-store");
        assert_eq!(payload["type"], "demo");
        assert_eq!(payload["referrer"], "partner-site");
    }

    #[tokio::test]
    async fn test_deliver_non_success_status() {
        let (url, _) = start_webhook(StatusCode::INTERNAL_SERVER_ERROR, "server error").await;
        let client = WebhookClient::new(url, None);

        let err = client
            .deliver(&WebhookPayload::assemble(waitlist(), None))
            .await
            .unwrap_err();
        let UpstreamError::WriteFailed { detail } = err else {
            panic!("expected WriteFailed, got {err:?}");
        };
        assert_eq!(detail, "server error");
    }

    #[tokio::test]
    async fn test_deliver_unparseable_body() {
        let (url, _) = start_webhook(StatusCode::OK, "not json").await;
        let client = WebhookClient::new(url, None);

        let err = client
            .deliver(&WebhookPayload::assemble(waitlist(), None))
            .await
            .unwrap_err();
        let UpstreamError::UnexpectedResponse { detail } = err else {
            panic!("expected UnexpectedResponse, got {err:?}");
        };
        assert_eq!(detail, "not json");
    }

    #[tokio::test]
    async fn test_deliver_refused_with_upstream_message() {
        let (url, _) =
            start_webhook(StatusCode::OK, r#"{"ok": false, "error": "duplicate"}"#).await;
        let client = WebhookClient::new(url, None);

        let err = client
            .deliver(&WebhookPayload::assemble(waitlist(), None))
            .await
            .unwrap_err();
        let UpstreamError::Refused { message, detail } = err else {
            panic!("expected Refused, got {err:?}");
        };
        assert_eq!(message, "duplicate");
        assert_eq!(detail, r#"{"ok": false, "error": "duplicate"}"#);
    }

    #[tokio::test]
    async fn test_deliver_truthy_string_is_not_an_ack() {
        let (url, _) = start_webhook(StatusCode::OK, r#"{"ok": "true"}"#).await;
        let client = WebhookClient::new(url, None);

        let err = client
            .deliver(&WebhookPayload::assemble(waitlist(), None))
            .await
            .unwrap_err();
        let UpstreamError::Refused { message, .. } = err else {
            panic!("expected Refused, got {err:?}");
        };
        assert_eq!(message, "Webhook returned an error.");
    }

    #[tokio::test]
    async fn test_deliver_network_error() {
        // Bind and immediately drop to get a port with nothing listening.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url: Url = format!("http://{}/", listener.local_addr().unwrap())
            .parse()
            .unwrap();
        drop(listener);

        let client = WebhookClient::new(url, None);
        let err = client
            .deliver(&WebhookPayload::assemble(waitlist(), None))
            .await
            .unwrap_err();
        assert!(matches!(err, UpstreamError::Network(_)));
        assert!(err.detail().is_none());
    }

    #[tokio::test]
    async fn test_deliver_truncates_long_error_body() {
        let body: &'static str = Box::leak("e".repeat(10_000).into_boxed_str());
        let (url, _) = start_webhook(StatusCode::BAD_GATEWAY, body).await;
        let client = WebhookClient::new(url, None);

        let err = client
            .deliver(&WebhookPayload::assemble(waitlist(), None))
            .await
            .unwrap_err();
        assert_eq!(err.detail().unwrap().chars().count(), DIAGNOSTIC_LIMIT);
    }
}
