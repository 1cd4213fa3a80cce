use thiserror::Error;

use crate::structs::status::StatusCode;

/// Pingdom Errors.
#[derive(Debug, Error)]
pub enum PingdomError {
    /// The username passed in `ClientOptions` was empty.
    #[error("Invalid username. Must not be empty.")]
    InvalidUsername,
    /// The API key passed in `ClientOptions` was empty.
    #[error("Invalid API key. Must not be empty.")]
    InvalidApiKey,

    /// The Pingdom API answered with a non-zero status code.
    #[error("{0}")]
    Service(StatusCode),

    /// A caller-supplied argument failed local validation. No request was sent.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    /// The requested check is not part of the account's check list.
    #[error("No such check available: {0}")]
    CheckNotFound(String),
    /// A required argument was absent.
    #[error("Invalid type: {0} is missing")]
    MissingArgument(&'static str),

    /// An authenticated call was attempted without a session.
    #[error("Not logged in.")]
    NotLoggedIn,

    /// Failed to send a request to the Pingdom API.
    #[error("Failed to send a request to the Pingdom API: {0}")]
    RequestFailed(String),
    /// The Pingdom API answered with a SOAP fault.
    #[error("SOAP fault {code}: {message}")]
    Fault { code: String, message: String },
    /// Failed to decode Pingdom API response.
    #[error("Failed to decode Pingdom API response: {0}")]
    FailedToDecode(String),
}

impl PingdomError {
    /// The status code returned by the service, if this error came from one.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Service(status) => Some(*status),
            _ => None,
        }
    }

    /// Whether the error was raised locally before any request was sent.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidUsername
                | Self::InvalidApiKey
                | Self::InvalidArgument(_)
                | Self::CheckNotFound(_)
                | Self::MissingArgument(_)
        )
    }
}

/// Result type alias for Pingdom operations.
pub type Result<T> = std::result::Result<T, PingdomError>;
