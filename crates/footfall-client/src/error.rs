use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    /// The server answered with a non-2xx status.
    #[error("HTTP error: status {0}")]
    Status(u16),

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
}
