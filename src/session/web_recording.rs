//! Web recording job.
//!
//! Joins a call through the automation backend, and once the backend reports
//! `Running` announces the session in presence and starts capture towards the
//! analysis dispatcher:
//! join → (Running) → add session id → add mode → send presence → start capture
//!
//! Stopping runs: stop capture → leave call and release the backend.

use anyhow::{Context, Result};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::config::{ConfigError, DispatcherUrlSources};
use crate::status::{ComponentState, ErrorKind, StatusAggregator};

use super::automation::{
    CallParams, Credentials, SessionAutomation, AUTOMATION_COMPONENT_ID, RECORDING_URL_OPTIONS,
};
use super::job::CaptureJob;

pub const SESSION_ID_PRESENCE_KEY: &str = "session_id";
pub const MODE_PRESENCE_KEY: &str = "mode";
/// Recording mode announced for web recordings.
pub const FILE_RECORDING_MODE: &str = "file";

/// Parameters needed for starting a [`WebRecordingService`].
#[derive(Debug, Clone)]
pub struct WebRecordingParams {
    /// Which call we'll join
    pub call_params: CallParams,
    /// The id of this session
    pub session_id: String,
    /// Login that lets the recorder appear invisible in the call
    pub call_login_params: Credentials,
}

/// One step of the announce-and-capture sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresenceStep {
    AddSessionId,
    AddMode,
    SendPresence,
    StartCapture,
}

impl fmt::Display for PresenceStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::AddSessionId => "adding session id to presence",
            Self::AddMode => "adding mode to presence",
            Self::SendPresence => "sending presence",
            Self::StartCapture => "starting capture",
        })
    }
}

#[derive(Error, Debug)]
#[error("{step} failed")]
pub struct PresenceError {
    pub step: PresenceStep,
    #[source]
    pub source: anyhow::Error,
}

impl PresenceError {
    fn at(step: PresenceStep) -> impl FnOnce(anyhow::Error) -> Self {
        move |source| Self { step, source }
    }
}

/// Run every step in order, stopping at the first failure.
pub fn announce_and_capture(
    automation: &dyn SessionAutomation,
    session_id: &str,
    dispatcher_url: &str,
) -> std::result::Result<(), PresenceError> {
    automation
        .add_to_presence(SESSION_ID_PRESENCE_KEY, session_id)
        .map_err(PresenceError::at(PresenceStep::AddSessionId))?;
    automation
        .add_to_presence(MODE_PRESENCE_KEY, FILE_RECORDING_MODE)
        .map_err(PresenceError::at(PresenceStep::AddMode))?;
    automation
        .send_presence()
        .map_err(PresenceError::at(PresenceStep::SendPresence))?;
    automation
        .start_capturing(dispatcher_url)
        .map_err(PresenceError::at(PresenceStep::StartCapture))?;

    Ok(())
}

pub struct WebRecordingService {
    params: WebRecordingParams,
    automation: Arc<dyn SessionAutomation>,
    status: StatusAggregator,
    /// Where captured data goes for analysis process creation
    dispatcher_url: String,
}

impl WebRecordingService {
    pub fn new(
        params: WebRecordingParams,
        automation: Arc<dyn SessionAutomation>,
        sources: &DispatcherUrlSources,
    ) -> std::result::Result<Self, ConfigError> {
        let dispatcher_url = sources.resolve()?;
        info!(
            "Dispatcher url for analysis processes creation: {}",
            dispatcher_url
        );

        let status = StatusAggregator::new("Web recording");
        status.register_sub_component(AUTOMATION_COMPONENT_ID, automation.status());

        Ok(Self {
            params,
            automation,
            status,
            dispatcher_url,
        })
    }

    pub fn dispatcher_url(&self) -> &str {
        &self.dispatcher_url
    }

    fn watch_for_joined(&self) {
        let automation = Arc::clone(&self.automation);
        let status = self.status.clone();
        let session_id = self.params.session_id.clone();
        let dispatcher_url = self.dispatcher_url.clone();

        self.status
            .whenever(AUTOMATION_COMPONENT_ID)
            .transitions_to(ComponentState::Running, move || {
                info!("Automation joined the call, starting the capturer");
                if let Err(e) = announce_and_capture(automation.as_ref(), &session_id, &dispatcher_url)
                {
                    error!("Error while setting fields in presence: {:#}", anyhow::Error::new(e));
                    status.publish_status(ComponentState::Error(ErrorKind::SettingPresenceFields));
                }
                Ok(())
            });
    }
}

impl CaptureJob for WebRecordingService {
    fn start(&self) -> Result<()> {
        // Watch first so a backend that reports Running inside join is not missed
        self.watch_for_joined();

        let call = self
            .params
            .call_params
            .call_url_info
            .with_url_params(RECORDING_URL_OPTIONS);
        info!("Joining call {}", call.call_url());

        if let Err(e) = self
            .automation
            .join_session(&call, &self.params.call_login_params)
        {
            self.status.clear_watchers();
            self.status
                .publish_status(ComponentState::Error(ErrorKind::FailedToJoinSession));
            return Err(e).context("Failed to request session join");
        }

        Ok(())
    }

    fn stop(&self) -> Result<()> {
        info!("Stopping capturer and quitting automation");
        self.status.clear_watchers();

        let capture = self.automation.stop_capturing();
        if let Err(e) = &capture {
            warn!("Failed to stop capturing, releasing session anyway: {:#}", e);
        }

        let release = self.automation.leave_session_and_release();
        if let Err(e) = &release {
            warn!("Failed to leave call and release automation: {:#}", e);
        }

        capture.context("Failed to stop capturing")?;
        release.context("Failed to leave call and release automation")
    }

    fn status(&self) -> &StatusAggregator {
        &self.status
    }
}

impl Drop for WebRecordingService {
    fn drop(&mut self) {
        self.status.clear_watchers();
    }
}
