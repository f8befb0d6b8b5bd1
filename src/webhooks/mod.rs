//! Webhook event dispatch.
//!
//! Status changes are POSTed as JSON to every registered subscriber:
//! - `POST <subscriber>/v1/status` with a [`HealthEvent`] body
//! - concurrent, best-effort, no retry

pub mod client;
pub mod event;
pub mod transport;

pub use client::{Dispatch, WebhookClient};
pub use event::{HealthEvent, STATUS_PATH};
pub use transport::{HttpTransport, WebhookError, WebhookTransport};
