/// Client-side errors for the cache-and-sync layer
#[derive(thiserror::Error, Debug)]
pub enum ClientError {
    /// Local storage read/write/delete failure. Never fatal: callers log it
    /// and treat the affected entry as a cache miss.
    #[error("Storage failure: {0}")]
    Storage(String),

    /// No access credential could be obtained
    #[error("Authentication required")]
    AuthenticationRequired,

    /// The server rejected the current access credential (HTTP 401)
    #[error("Authorization expired")]
    AuthorizationExpired,

    /// Non-success HTTP status or network-level failure
    #[error("Request failed: {0}")]
    RequestFailed(String),

    /// Success-shaped response missing expected fields
    #[error("Invalid server response: {0}")]
    InvalidServerResponse(String),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type ClientResult<T> = Result<T, ClientError>;

impl ClientError {
    /// Whether this error is the 401 signal that triggers the gateway's
    /// one-time reauthentication retry.
    pub fn is_authorization_expired(&self) -> bool {
        matches!(self, ClientError::AuthorizationExpired)
    }
}
