//! Errors raised by commands while preparing or executing work.
//!
//! A [`CommandError`] always knows which wire code it maps to, so the
//! dispatcher can turn it into an error response without inspecting the
//! variant. Plugin processes may report codes outside the known taxonomy;
//! those travel as [`CommandError::Reported`] with the raw integer intact.

use hostbridge_protocol::{ErrorCode, ErrorObject};
use serde_json::Value;
use thiserror::Error;

/// Failure surfaced by a command.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CommandError {
    /// Parameters have the wrong shape or fail validation.
    #[error("invalid parameters: {message}")]
    InvalidParams {
        /// Explanation of the rejected parameter.
        message: String,
    },
    /// Parameters could not be converted into the command's input type.
    #[error("failed to parse parameters: {message}")]
    ParameterParsing {
        /// Parser diagnostic.
        message: String,
    },
    /// The host rejected or failed an operation.
    #[error("{message}")]
    Host {
        /// Taxonomy code describing the failure.
        code: ErrorCode,
        /// Human-readable message.
        message: String,
        /// Optional structured detail.
        data: Option<Value>,
    },
    /// An external module reported a failure with its own code.
    #[error("{message}")]
    Reported {
        /// Raw wire code supplied by the module.
        code: i32,
        /// Human-readable message.
        message: String,
        /// Optional structured detail.
        data: Option<Value>,
    },
    /// Unexpected failure inside the command.
    #[error("{message}")]
    Internal {
        /// Description of the failure.
        message: String,
    },
}

impl CommandError {
    /// Builds an [`CommandError::InvalidParams`] error.
    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::InvalidParams {
            message: message.into(),
        }
    }

    /// Wraps a parameter deserialisation failure.
    #[must_use]
    pub fn from_params_error(error: &serde_json::Error) -> Self {
        Self::ParameterParsing {
            message: error.to_string(),
        }
    }

    /// Builds a host failure carrying a taxonomy code.
    pub fn host(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Host {
            code,
            message: message.into(),
            data: None,
        }
    }

    /// Builds an [`CommandError::Internal`] error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Attaches structured detail to host and reported failures.
    ///
    /// Other variants are returned unchanged.
    #[must_use]
    pub fn with_data(self, detail: Value) -> Self {
        match self {
            Self::Host { code, message, .. } => Self::Host {
                code,
                message,
                data: Some(detail),
            },
            Self::Reported { code, message, .. } => Self::Reported {
                code,
                message,
                data: Some(detail),
            },
            other => other,
        }
    }

    /// Returns the wire code for this failure.
    #[must_use]
    pub const fn code(&self) -> i32 {
        match self {
            Self::InvalidParams { .. } => ErrorCode::InvalidParams.code(),
            Self::ParameterParsing { .. } => ErrorCode::CommandParameterParsingFailed.code(),
            Self::Host { code, .. } => code.code(),
            Self::Reported { code, .. } => *code,
            Self::Internal { .. } => ErrorCode::InternalError.code(),
        }
    }

    /// Returns the structured detail, if any.
    #[must_use]
    pub const fn data(&self) -> Option<&Value> {
        match self {
            Self::Host { data, .. } | Self::Reported { data, .. } => data.as_ref(),
            Self::InvalidParams { .. } | Self::ParameterParsing { .. } | Self::Internal { .. } => {
                None
            }
        }
    }

    /// Converts the failure into a wire error payload.
    #[must_use]
    pub fn to_error_object(&self) -> ErrorObject {
        ErrorObject {
            code: self.code(),
            message: self.to_string(),
            data: self.data().cloned(),
        }
    }
}

#[cfg(test)]
mod tests;
