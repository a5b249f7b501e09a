pub mod config;
pub mod error;
pub mod relay;
pub mod submission;
pub mod webhook;

pub use error::{RejectReason, SubmitError, UpstreamError};
pub use relay::Relay;
