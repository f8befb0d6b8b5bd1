use crate::cli::load_config;
use crate::config::{Config, DispatcherUrlSources};
use crate::session::{CaptureJob, SessionAutomation, WebRecordingParams, WebRecordingService};
use crate::status::StatusManager;
use crate::webhooks::{Dispatch, HttpTransport, WebhookClient, WebhookTransport};
use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tracing::{info, warn};

/// Worker-wide wiring: health manager → webhook client → subscribers.
pub struct Worker {
    status: Arc<StatusManager>,
    webhooks: Arc<WebhookClient>,
    dispatcher: DispatcherUrlSources,
}

impl Worker {
    pub fn new(config: &Config, runtime: Handle) -> Result<Self> {
        let timeout = Duration::from_secs(config.webhook.request_timeout_seconds);
        let transport = HttpTransport::new(timeout).context("Failed to build webhook HTTP client")?;
        Self::with_transport(config, Arc::new(transport), runtime)
    }

    pub fn with_transport(
        config: &Config,
        transport: Arc<dyn WebhookTransport>,
        runtime: Handle,
    ) -> Result<Self> {
        let webhooks = Arc::new(WebhookClient::new(
            config.worker.id.clone(),
            transport,
            runtime,
        ));
        for subscriber in &config.webhook.subscribers {
            webhooks.add_subscriber(subscriber.clone());
        }

        let status = Arc::new(StatusManager::new());
        let sink = Arc::clone(&webhooks);
        status.add_status_handler(move |worker_status| {
            // Sends run detached; delivery is best-effort
            sink.update_status(worker_status.clone());
        });

        let dispatcher = config.dispatcher_sources()?;
        match dispatcher.resolve() {
            Ok(url) => info!("Analysis dispatcher: {}", url),
            Err(e) => warn!("{}; web recordings cannot start", e),
        }

        Ok(Self {
            status,
            webhooks,
            dispatcher,
        })
    }

    pub fn status(&self) -> &Arc<StatusManager> {
        &self.status
    }

    pub fn webhooks(&self) -> &Arc<WebhookClient> {
        &self.webhooks
    }

    /// Push the current status to every subscriber.
    pub fn report_status(&self) -> Dispatch {
        self.webhooks.update_status(self.status.overall_status())
    }

    /// Build a web recording job, track its status and start it.
    pub fn start_web_recording(
        &self,
        params: WebRecordingParams,
        automation: Arc<dyn SessionAutomation>,
    ) -> Result<WebRecordingService> {
        let service = WebRecordingService::new(params, automation, &self.dispatcher)?;
        self.status.track_service(service.status());
        service.start()?;
        Ok(service)
    }
}

pub async fn run_service(config_path: Option<&Path>) -> Result<()> {
    info!("Starting capture worker");

    let config = load_config(config_path)?;
    let worker = Worker::new(&config, Handle::current())?;

    worker.report_status();
    info!(
        "Capture worker {} is ready, reporting to {} subscribers",
        worker.webhooks().jibri_id(),
        worker.webhooks().subscribers().len()
    );

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;

    info!("Shutting down capture worker");
    Ok(())
}
