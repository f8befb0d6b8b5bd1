//! Narrow surface of the browser-automation backend the coordinator drives.

use anyhow::Result;
use std::fmt;

use crate::status::{ComponentState, StatusPublisher};

/// Id under which the automation backend is registered with the aggregator.
pub const AUTOMATION_COMPONENT_ID: &str = "automation";

/// URL fragment options that make the participant a silent recorder.
pub const RECORDING_URL_OPTIONS: &[&str] = &[
    "config.iAmRecorder=true",
    "config.externalConnectUrl=null",
    "config.startWithAudioMuted=true",
    "config.startWithVideoMuted=true",
    "interfaceConfig.APP_NAME=\"Jibri\"",
    "config.analytics.disabled=true",
    "config.p2p.enabled=false",
    "config.prejoinPageEnabled=false",
    "config.requireDisplayName=false",
];

/// Locates a call: `<base_url>/<call_name>#<url_params joined by &>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallUrlInfo {
    pub base_url: String,
    pub call_name: String,
    pub url_params: Vec<String>,
}

impl CallUrlInfo {
    pub fn new(base_url: impl Into<String>, call_name: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            call_name: call_name.into(),
            url_params: Vec::new(),
        }
    }

    /// Copy of this locator with `params` replacing the url params.
    pub fn with_url_params(&self, params: &[&str]) -> Self {
        Self {
            url_params: params.iter().map(|p| p.to_string()).collect(),
            ..self.clone()
        }
    }

    pub fn call_url(&self) -> String {
        let base = format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            self.call_name
        );
        if self.url_params.is_empty() {
            base
        } else {
            format!("{}#{}", base, self.url_params.join("&"))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallParams {
    pub call_url_info: CallUrlInfo,
}

/// Login used to join the session invisibly.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub domain: String,
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("domain", &self.domain)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// The automated participant (browser) plus its capture hook.
///
/// Calls block until the backend has accepted the request; resulting state
/// changes arrive later through [`SessionAutomation::status`].
pub trait SessionAutomation: Send + Sync {
    fn join_session(&self, call: &CallUrlInfo, credentials: &Credentials) -> Result<()>;

    fn add_to_presence(&self, key: &str, value: &str) -> Result<()>;

    fn send_presence(&self) -> Result<()>;

    fn start_capturing(&self, destination_url: &str) -> Result<()>;

    fn stop_capturing(&self) -> Result<()>;

    fn leave_session_and_release(&self) -> Result<()>;

    fn status(&self) -> &StatusPublisher<ComponentState>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_call_url_without_params() {
        let info = CallUrlInfo::new("https://meet.example.com/", "standup");
        assert_eq!(info.call_url(), "https://meet.example.com/standup");
    }

    #[test]
    fn test_call_url_with_recording_options() {
        let info = CallUrlInfo::new("https://meet.example.com", "standup")
            .with_url_params(&["config.iAmRecorder=true", "config.p2p.enabled=false"]);
        assert_eq!(
            info.call_url(),
            "https://meet.example.com/standup#config.iAmRecorder=true&config.p2p.enabled=false"
        );
    }

    #[test]
    fn test_credentials_debug_hides_password() {
        let creds = Credentials {
            domain: "recorder.example.com".into(),
            username: "recorder".into(),
            password: "hunter2".into(),
        };
        let printed = format!("{:?}", creds);
        assert!(printed.contains("recorder.example.com"));
        assert!(!printed.contains("hunter2"));
    }
}
