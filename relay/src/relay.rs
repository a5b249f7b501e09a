use crate::config::WebhookConfig;
use crate::error::SubmitError;
use crate::submission;
use crate::webhook::{WebhookClient, WebhookPayload};
use tracing::{debug, warn};

/// Validates submissions and forwards them to the configured webhook.
///
/// Stateless across calls: each submission is validated, serialized once,
/// and dropped when the outbound call completes. Concurrent calls are fully
/// independent, so a `Relay` can be cloned freely into handlers.
#[derive(Clone)]
pub struct Relay {
    webhook: Option<WebhookClient>,
}

impl Relay {
    pub fn new(config: &WebhookConfig) -> Self {
        let webhook = config
            .url
            .clone()
            .map(|url| WebhookClient::new(url, config.secret.clone()));
        Relay { webhook }
    }

    /// Validate a raw request body and forward it to the webhook.
    ///
    /// Exactly one outbound call is made when validation passes and none
    /// otherwise. Failures are never retried here; callers may re-submit.
    pub async fn submit(&self, body: &[u8]) -> Result<(), SubmitError> {
        let Some(webhook) = &self.webhook else {
            warn!("submission refused: no webhook url configured");
            return Err(SubmitError::Misconfigured);
        };

        let submission = submission::validate(body).inspect_err(|reason| {
            debug!(%reason, "submission rejected");
        })?;
        debug!(kind = ?submission.kind(), "submission validated");

        let payload = WebhookPayload::assemble(submission, webhook.secret());
        webhook.deliver(&payload).await.map_err(|err| {
            warn!(
                error = %err,
                detail = err.detail().unwrap_or_default(),
                "webhook delivery failed"
            );
            SubmitError::Upstream(err)
        })
    }
}
