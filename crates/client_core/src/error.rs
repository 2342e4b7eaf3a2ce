use thiserror::Error;

/// Local form problems; these never reach the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please fill in all fields")]
    MissingField,
    #[error("Age must be a positive number")]
    InvalidAge,
}

/// Why a backend call did not produce a usable success response.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiFailure {
    /// The server answered with a non-2xx status.
    #[error("server returned {status}: {detail}")]
    Server { status: u16, detail: String },
    /// The request or its response body could not be completed.
    #[error("transport failure: {0}")]
    Transport(String),
}

impl From<reqwest::Error> for ApiFailure {
    fn from(value: reqwest::Error) -> Self {
        ApiFailure::Transport(value.to_string())
    }
}
