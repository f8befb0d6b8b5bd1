//! Lifecycle states shared by every tracked component and the service itself.

use std::fmt;
use thiserror::Error;

/// How far an error reaches.
///
/// A session error fails the current session only; a system error means the
/// worker itself is no longer fit to take sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorScope {
    Session,
    System,
}

/// Reasons a component (or the service) entered [`ComponentState::Error`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    #[error("Error setting presence fields")]
    SettingPresenceFields,

    #[error("Failed to join the session")]
    FailedToJoinSession,

    /// Opaque error reported by a sub-component, passed through untouched.
    #[error("{detail}")]
    Backend { scope: ErrorScope, detail: String },
}

impl ErrorKind {
    pub fn scope(&self) -> ErrorScope {
        match self {
            Self::SettingPresenceFields | Self::FailedToJoinSession => ErrorScope::Session,
            Self::Backend { scope, .. } => *scope,
        }
    }

    pub fn backend(scope: ErrorScope, detail: impl Into<String>) -> Self {
        Self::Backend {
            scope,
            detail: detail.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComponentState {
    Starting,
    Running,
    Finished(Option<String>),
    Error(ErrorKind),
}

impl ComponentState {
    /// `Finished` and `Error` accept no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished(_) | Self::Error(_))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Finished(_) => "finished",
            Self::Error(_) => "error",
        }
    }
}

impl fmt::Display for ComponentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Finished(Some(reason)) => write!(f, "finished ({reason})"),
            Self::Error(kind) => write!(f, "error ({kind})"),
            other => f.write_str(other.as_str()),
        }
    }
}
