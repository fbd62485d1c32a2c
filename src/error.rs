#![allow(non_shorthand_field_patterns)]
#![doc = "Error handling primitives shared across the relnotes crate."]
// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
//
// SPDX-License-Identifier: MIT

//! The derive emitted by [`masterror::Error`] expands pattern matches that
//! trigger the `non_shorthand_field_patterns` lint. The lint is disabled for
//! the module to keep the generated implementations warning-free.
//!
//! Rate-limit responses and dropped connections never show up here: the
//! client absorbs both by waiting and retrying. Unresolved identities are
//! reported through `tracing` warnings and are not errors either.

use std::path::{Path, PathBuf};

/// Unified error type returned by the library and the CLI.
///
/// Every variant renders as a single human readable line so the binary can
/// print it without a backtrace.
#[derive(Debug, masterror::Error)]
pub enum Error {
    /// Wraps I/O errors raised while reading or writing local files.
    #[error("failed to access {path:?}: {source}")]
    Io {
        /// Location of the file.
        path:   PathBuf,
        /// Underlying I/O error.
        source: std::io::Error
    },
    /// Wraps YAML decoding errors for the settings document.
    #[error("failed to parse configuration: {source}")]
    Parse {
        /// Source decoding error from serde_yaml.
        source: serde_yaml::Error
    },
    /// Wraps JSON decoding errors for API payloads.
    #[error("failed to decode API payload: {source}")]
    Decode {
        /// Underlying decoding error.
        source: serde_json::Error
    },
    /// Returned when settings or arguments violate invariants.
    #[error("invalid configuration: {message}")]
    Validation {
        /// Human readable message describing the validation problem.
        message: String
    },
    /// A commit log line lacks the trailing `(email)` annotation.
    #[error("malformed log line (expected a trailing `(email)` token): {line:?}")]
    MalformedLogLine {
        /// The offending raw line.
        line: String
    },
    /// Credentials are missing or were rejected by the remote API.
    #[error("authentication failed: {message}")]
    Authentication {
        /// Human readable reason.
        message: String
    },
    /// No open milestone carries the requested title.
    #[error("milestone {title} not found. Open milestones: {available}")]
    MilestoneNotFound {
        /// Requested milestone title.
        title:     String,
        /// Comma separated titles of the open milestones.
        available: String
    },
    /// The repository has no open milestone with a version title.
    #[error("no open version milestones found in {repository}")]
    NoOpenMilestones {
        /// Repository that was searched, as `owner/name`.
        repository: String
    },
    /// The remote API answered a metadata request with a non-success status.
    #[error("request to {url} failed with status {status}: {message}")]
    Remote {
        /// Requested endpoint.
        url:     String,
        /// HTTP status code.
        status:  u16,
        /// Message reported by the API, if any.
        message: String
    },
    /// A local git invocation failed.
    #[error("{message}")]
    Git {
        /// Description naming the likely misconfiguration.
        message: String
    },
    /// The credits template could not be rendered.
    #[error("failed to render credits template: {message}")]
    Template {
        /// Renderer diagnostic.
        message: String
    },
    /// Service errors raised at the transport seam.
    #[error("service error: {message}")]
    Service {
        /// Human readable message describing the service error.
        message: String
    }
}

impl Error {
    /// Constructs a validation error from the provided displayable value.
    ///
    /// # Parameters
    ///
    /// * `message` - Human-readable description of the validation failure.
    pub fn validation<M>(message: M) -> Self
    where
        M: Into<String>
    {
        Self::Validation {
            message: message.into()
        }
    }

    /// Constructs an authentication error.
    pub fn authentication<M>(message: M) -> Self
    where
        M: Into<String>
    {
        Self::Authentication {
            message: message.into()
        }
    }

    /// Constructs a git collaborator error.
    pub fn git<M>(message: M) -> Self
    where
        M: Into<String>
    {
        Self::Git {
            message: message.into()
        }
    }

    /// Formats the error for diagnostics without the variant name.
    ///
    /// This method is primarily intended for CLI contexts where the variant
    /// name does not add value to end users. The returned string matches the
    /// [`std::fmt::Display`] implementation.
    pub fn to_display_string(&self) -> String {
        format!("{self}")
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(source: serde_yaml::Error) -> Self {
        Self::Parse {
            source
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(source: serde_json::Error) -> Self {
        Self::Decode {
            source
        }
    }
}

impl From<tera::Error> for Error {
    fn from(error: tera::Error) -> Self {
        let mut message = error.to_string();
        let mut cause = std::error::Error::source(&error);
        while let Some(inner) = cause {
            message.push_str(": ");
            message.push_str(&inner.to_string());
            cause = inner.source();
        }
        Self::Template {
            message
        }
    }
}

impl From<masterror::AppError> for Error {
    fn from(error: masterror::AppError) -> Self {
        Self::Service {
            message: error.to_string()
        }
    }
}

/// Creates an [`Error::Io`] variant capturing the failing path and source.
///
/// # Parameters
///
/// * `path` - Location of the file that triggered the error.
/// * `source` - I/O error reported by the operating system.
pub fn io_error(path: &Path, source: std::io::Error) -> Error {
    Error::Io {
        path: path.to_path_buf(),
        source
    }
}
