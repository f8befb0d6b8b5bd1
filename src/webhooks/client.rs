//! Best-effort status fan-out to webhook subscribers.
//!
//! Each [`WebhookClient::update_status`] call serializes one event and spawns
//! one independent send per subscriber. Sends are never retried and failures
//! never leave this module.

use parking_lot::RwLock;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::status::WorkerStatus;

use super::event::HealthEvent;
use super::transport::{WebhookError, WebhookTransport};

pub struct WebhookClient {
    jibri_id: String,
    transport: Arc<dyn WebhookTransport>,
    /// Executor for sends, kept apart from the thread publishing status
    runtime: Handle,
    subscribers: RwLock<HashSet<String>>,
}

impl WebhookClient {
    pub fn new(
        jibri_id: impl Into<String>,
        transport: Arc<dyn WebhookTransport>,
        runtime: Handle,
    ) -> Self {
        Self {
            jibri_id: jibri_id.into(),
            transport,
            runtime,
            subscribers: RwLock::new(HashSet::new()),
        }
    }

    pub fn jibri_id(&self) -> &str {
        &self.jibri_id
    }

    pub fn add_subscriber(&self, url: impl Into<String>) {
        let url = url.into();
        info!("Adding webhook subscriber {}", url);
        self.subscribers.write().insert(url);
    }

    pub fn remove_subscriber(&self, url: &str) {
        if self.subscribers.write().remove(url) {
            info!("Removed webhook subscriber {}", url);
        }
    }

    /// Current subscribers, sorted.
    pub fn subscribers(&self) -> Vec<String> {
        let mut subscribers: Vec<String> = self.subscribers.read().iter().cloned().collect();
        subscribers.sort();
        subscribers
    }

    /// Schedule one POST per current subscriber and return without waiting.
    pub fn update_status(&self, status: WorkerStatus) -> Dispatch {
        let event = HealthEvent::new(self.jibri_id.clone(), status);
        let body = match event.to_json().map_err(WebhookError::from) {
            Ok(body) => body,
            Err(e) => {
                error!("{}", e);
                return Dispatch::default();
            }
        };

        let targets = self.subscribers();
        debug!("Sending status to {} subscribers", targets.len());

        let handles = targets
            .into_iter()
            .map(|subscriber| {
                let transport = Arc::clone(&self.transport);
                let url = HealthEvent::url_for(&subscriber);
                let body = body.clone();
                self.runtime.spawn(async move {
                    match transport.post_json(&url, body).await {
                        Ok(()) => debug!("Delivered status to {}", url),
                        Err(e) => warn!("Failed to deliver status to {}: {}", url, e),
                    }
                })
            })
            .collect();

        Dispatch { handles }
    }
}

/// Sends scheduled by one [`WebhookClient::update_status`] call.
///
/// Dropping it leaves the sends running.
#[derive(Default)]
pub struct Dispatch {
    handles: Vec<JoinHandle<()>>,
}

impl Dispatch {
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Wait for every send in this batch to finish.
    pub async fn join(self) {
        for handle in self.handles {
            if let Err(e) = handle.await {
                warn!("Webhook send task failed: {}", e);
            }
        }
    }
}
