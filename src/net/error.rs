use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum NetError {
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Network unreachable")]
    Unreachable,

    #[error("Network error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Invalid request URL: {0}")]
    InvalidUrl(String),
}

impl NetError {
    /// Classify a transport-level failure from the HTTP client.
    pub fn from_reqwest(error: reqwest::Error, timeout: Duration) -> Self {
        if error.is_timeout() {
            NetError::Timeout(timeout)
        } else if error.is_connect() {
            NetError::Unreachable
        } else {
            NetError::Transport(error)
        }
    }
}
