use thiserror::Error;

/// Problems with user input, caught before any remote call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Invalid repository '{0}'. Expected owner/name.")]
    InvalidRepository(String),
}

/// Errors returned by a [`RunClient`](crate::client::RunClient).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// The request never produced an HTTP response.
    #[error("Network error during {operation} ({target}): {message}")]
    Network {
        operation: &'static str,
        target: String,
        message: String,
    },

    /// The server answered with a non-2xx status.
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    /// The response body did not match the expected shape.
    #[error("Failed to decode {operation} response: {message}")]
    Decode {
        operation: &'static str,
        message: String,
    },

    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The active client does not implement an optional capability.
    #[error("Operation not supported by this backend: {0}")]
    Unsupported(&'static str),
}

impl ApiError {
    /// Whether the user can meaningfully go back and try again.
    ///
    /// A resource that is gone (404/410) or a rejected credential (401) will
    /// not get better by retrying from the previous screen.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Api { status, .. } => !matches!(status, 401 | 404 | 410),
            Self::Unsupported(_) => false,
            _ => true,
        }
    }

    /// Whether a poller should keep trying after this error.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network { .. } => true,
            Self::Api { status, .. } => *status == 408 || *status == 429 || *status >= 500,
            Self::Decode { .. } | Self::Validation(_) | Self::Unsupported(_) => false,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}
