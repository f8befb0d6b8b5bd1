//! Capture jobs and the automation surface they drive.

pub mod automation;
pub mod job;
pub mod web_recording;

pub use automation::{
    CallParams, CallUrlInfo, Credentials, SessionAutomation, AUTOMATION_COMPONENT_ID,
    RECORDING_URL_OPTIONS,
};
pub use job::CaptureJob;
pub use web_recording::{
    announce_and_capture, PresenceError, PresenceStep, WebRecordingParams, WebRecordingService,
};
