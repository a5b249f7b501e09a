use thiserror::Error;

/// Why a submission was refused before any outbound call was made.
///
/// The display strings are the caller-facing messages; the HTTP layer serves
/// them verbatim.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    #[error("Invalid JSON body")]
    InvalidBody,

    #[error("Invalid request type.")]
    InvalidKind,

    #[error("Please enter your name.")]
    InvalidName,

    #[error("Please enter a valid email.")]
    InvalidEmail,
}

/// Failure of the forwarding leg, after validation passed.
///
/// Every variant past the transport level carries `detail`, an excerpt of the
/// raw upstream body bounded by [`crate::webhook::DIAGNOSTIC_LIMIT`]. The
/// excerpt is for operators; the display string is what callers see.
#[derive(Error, Debug)]
pub enum UpstreamError {
    /// The request never completed at the transport level (DNS, connect,
    /// timeout). There is no response body to excerpt.
    #[error("Network error writing to the webhook.")]
    Network(#[source] reqwest::Error),

    /// The webhook answered with a non-success status.
    #[error("Failed to write to the webhook.")]
    WriteFailed { detail: String },

    /// The webhook answered 2xx but the body was not JSON.
    #[error("Webhook returned an unexpected response.")]
    UnexpectedResponse { detail: String },

    /// The webhook answered 2xx with JSON that did not acknowledge the write.
    #[error("{message}")]
    Refused { message: String, detail: String },
}

impl UpstreamError {
    /// Operator-facing excerpt of the raw upstream body, when one exists.
    pub fn detail(&self) -> Option<&str> {
        match self {
            UpstreamError::Network(_) => None,
            UpstreamError::WriteFailed { detail }
            | UpstreamError::UnexpectedResponse { detail }
            | UpstreamError::Refused { detail, .. } => Some(detail),
        }
    }
}

/// Everything `Relay::submit` can report. All failure paths come back as
/// values; nothing panics past the relay boundary.
#[derive(Error, Debug)]
pub enum SubmitError {
    /// No webhook URL is configured. The display string is deliberately
    /// generic; the missing setting is logged, never returned to callers.
    #[error("Server is not configured to accept submissions.")]
    Misconfigured,

    #[error(transparent)]
    Rejected(#[from] RejectReason),

    #[error(transparent)]
    Upstream(#[from] UpstreamError),
}
