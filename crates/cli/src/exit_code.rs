// Consistent exit codes for the ghtasks CLI.
//
//   0  = success
//   1  = general error
//   2  = usage/argument error (reported by clap)
//   10 = tasks note not found
//   11 = authentication error
//   12 = configuration error
//   13 = network error

use std::process;

use ghtasks_common::settings::SettingsError;

use crate::config::ConfigError;
use crate::credentials::MissingToken;
use crate::github::GitHubError;
use crate::sync::NoteError;

/// Named exit codes for the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    Success = 0,
    Error = 1,
    NoteNotFound = 10,
    Auth = 11,
    Config = 12,
    Network = 13,
}

impl ExitCode {
    pub fn code(self) -> i32 {
        self as i32
    }

    /// Short machine-readable name, used in JSON error output.
    pub fn label(self) -> &'static str {
        match self {
            Self::Success => "OK",
            Self::Error => "ERROR",
            Self::NoteNotFound => "NOTE_NOT_FOUND",
            Self::Auth => "AUTH_FAILURE",
            Self::Config => "CONFIG_ERROR",
            Self::Network => "NETWORK_ERROR",
        }
    }

    /// Map an anyhow error to an exit code by inspecting the error chain.
    pub fn from_error(err: &anyhow::Error) -> Self {
        for cause in err.chain() {
            if cause.is::<MissingToken>() {
                return Self::Auth;
            }
            if let Some(github) = cause.downcast_ref::<GitHubError>() {
                return match github {
                    GitHubError::Unauthorized { .. } => Self::Auth,
                    GitHubError::InvalidUrl { .. } => Self::Config,
                    other if other.is_network() => Self::Network,
                    _ => Self::Error,
                };
            }
            if let Some(note) = cause.downcast_ref::<NoteError>() {
                return match note {
                    NoteError::NotFound(_) => Self::NoteNotFound,
                    NoteError::Io { .. } => Self::Error,
                };
            }
            if cause.is::<ConfigError>() || cause.is::<SettingsError>() {
                return Self::Config;
            }
            if let Some(io_err) = cause.downcast_ref::<std::io::Error>() {
                return match io_err.kind() {
                    std::io::ErrorKind::ConnectionRefused | std::io::ErrorKind::TimedOut => {
                        Self::Network
                    }
                    _ => Self::Error,
                };
            }
        }

        Self::Error
    }
}

impl From<ExitCode> for process::ExitCode {
    fn from(code: ExitCode) -> Self {
        process::ExitCode::from(code.code() as u8)
    }
}
