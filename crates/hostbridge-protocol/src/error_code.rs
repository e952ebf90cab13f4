//! Error code taxonomy carried in error responses.

use std::fmt;

/// First code of the range reserved for implementation-defined server errors.
const SERVER_ERROR_START: i32 = -32099;
/// Last code of the range reserved for implementation-defined server errors.
const SERVER_ERROR_END: i32 = -32000;

/// Closed set of error codes understood by the daemon.
///
/// The standard JSON-RPC codes occupy `-32768..=-32000`. Host document
/// failures use `-33000..=-33099`, plugin and bridge failures
/// `-33100..=-33199`, and general application failures `-33200..=-33299`.
///
/// # Example
///
/// ```
/// use hostbridge_protocol::ErrorCode;
///
/// assert_eq!(ErrorCode::MethodNotFound.code(), -32601);
/// assert_eq!(ErrorCode::from_code(-33001), Some(ErrorCode::CommandExecutionTimeout));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// The server received bytes that are not valid JSON.
    ParseError,
    /// The JSON is not a valid request object.
    InvalidRequest,
    /// The method does not exist or is not available.
    MethodNotFound,
    /// Invalid method parameters.
    InvalidParams,
    /// Generic internal failure.
    InternalError,
    /// The host API rejected an operation.
    HostApiError,
    /// The host did not finish the command within its timeout.
    CommandExecutionTimeout,
    /// No document is open on the host.
    DocumentNotAvailable,
    /// A document transaction could not be committed.
    TransactionFailed,
    /// The referenced element does not exist.
    ElementNotFound,
    /// The element could not be created.
    ElementCreationFailed,
    /// The element could not be modified.
    ElementModificationFailed,
    /// The element could not be deleted.
    ElementDeletionFailed,
    /// Geometry data was invalid or malformed.
    InvalidGeometryData,
    /// The referenced view does not exist.
    ViewNotFound,
    /// A command could not be registered.
    CommandRegistrationFailed,
    /// The service failed to start.
    ServiceStartupFailed,
    /// Work could not be handed to the host context.
    ExternalEventCreationFailed,
    /// The host context failed to run the submitted work.
    ExternalEventExecutionFailed,
    /// The command was cancelled.
    CommandCancelled,
    /// Command parameters could not be parsed.
    CommandParameterParsingFailed,
    /// The client is not allowed to perform the operation.
    Unauthorized,
    /// A required resource is unavailable.
    ResourceUnavailable,
    /// The request timed out.
    RequestTimeout,
    /// The session is invalid or expired.
    InvalidSession,
    /// Configuration is invalid.
    ConfigurationError,
    /// File or network I/O failed.
    IoError,
}

impl ErrorCode {
    const ALL: [Self; 27] = [
        Self::ParseError,
        Self::InvalidRequest,
        Self::MethodNotFound,
        Self::InvalidParams,
        Self::InternalError,
        Self::HostApiError,
        Self::CommandExecutionTimeout,
        Self::DocumentNotAvailable,
        Self::TransactionFailed,
        Self::ElementNotFound,
        Self::ElementCreationFailed,
        Self::ElementModificationFailed,
        Self::ElementDeletionFailed,
        Self::InvalidGeometryData,
        Self::ViewNotFound,
        Self::CommandRegistrationFailed,
        Self::ServiceStartupFailed,
        Self::ExternalEventCreationFailed,
        Self::ExternalEventExecutionFailed,
        Self::CommandCancelled,
        Self::CommandParameterParsingFailed,
        Self::Unauthorized,
        Self::ResourceUnavailable,
        Self::RequestTimeout,
        Self::InvalidSession,
        Self::ConfigurationError,
        Self::IoError,
    ];

    /// Returns the integer sent on the wire.
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::ParseError => -32700,
            Self::InvalidRequest => -32600,
            Self::MethodNotFound => -32601,
            Self::InvalidParams => -32602,
            Self::InternalError => -32603,
            Self::HostApiError => -33000,
            Self::CommandExecutionTimeout => -33001,
            Self::DocumentNotAvailable => -33002,
            Self::TransactionFailed => -33003,
            Self::ElementNotFound => -33004,
            Self::ElementCreationFailed => -33005,
            Self::ElementModificationFailed => -33006,
            Self::ElementDeletionFailed => -33007,
            Self::InvalidGeometryData => -33008,
            Self::ViewNotFound => -33009,
            Self::CommandRegistrationFailed => -33100,
            Self::ServiceStartupFailed => -33101,
            Self::ExternalEventCreationFailed => -33102,
            Self::ExternalEventExecutionFailed => -33103,
            Self::CommandCancelled => -33104,
            Self::CommandParameterParsingFailed => -33105,
            Self::Unauthorized => -33200,
            Self::ResourceUnavailable => -33201,
            Self::RequestTimeout => -33202,
            Self::InvalidSession => -33203,
            Self::ConfigurationError => -33204,
            Self::IoError => -33205,
        }
    }

    /// Maps a wire integer back onto the taxonomy.
    #[must_use]
    pub fn from_code(code: i32) -> Option<Self> {
        Self::ALL.into_iter().find(|candidate| candidate.code() == code)
    }

    /// Returns the fixed human-readable description for this code.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::ParseError => "Invalid JSON was received by the server.",
            Self::InvalidRequest => "The JSON sent is not a valid Request object.",
            Self::MethodNotFound => "The method does not exist / is not available.",
            Self::InvalidParams => "Invalid method parameter(s).",
            Self::InternalError => "Internal JSON-RPC error.",
            Self::HostApiError => "Host API operation failed.",
            Self::CommandExecutionTimeout => "Command execution timed out.",
            Self::DocumentNotAvailable => "Host document is not available.",
            Self::TransactionFailed => "Host transaction failed.",
            Self::ElementNotFound => "Element not found.",
            Self::ElementCreationFailed => "Failed to create element.",
            Self::ElementModificationFailed => "Failed to modify element.",
            Self::ElementDeletionFailed => "Failed to delete element.",
            Self::InvalidGeometryData => "Invalid geometry data.",
            Self::ViewNotFound => "View not found.",
            Self::CommandRegistrationFailed => "Failed to register command.",
            Self::ServiceStartupFailed => "Failed to start service.",
            Self::ExternalEventCreationFailed => "Failed to create external event.",
            Self::ExternalEventExecutionFailed => "External event execution failed.",
            Self::CommandCancelled => "Command was cancelled.",
            Self::CommandParameterParsingFailed => "Failed to parse command parameters.",
            Self::Unauthorized => "Unauthorized access.",
            Self::ResourceUnavailable => "Resource is unavailable.",
            Self::RequestTimeout => "Request timed out.",
            Self::InvalidSession => "Invalid session.",
            Self::ConfigurationError => "Configuration error.",
            Self::IoError => "I/O error.",
        }
    }

    /// Describes an arbitrary wire code, including ones outside the taxonomy.
    #[must_use]
    pub fn describe(code: i32) -> &'static str {
        match Self::from_code(code) {
            Some(known) => known.description(),
            None if (SERVER_ERROR_START..=SERVER_ERROR_END).contains(&code) => "Server error.",
            None => "Unknown error.",
        }
    }
}

impl From<ErrorCode> for i32 {
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.code(), self.description())
    }
}
