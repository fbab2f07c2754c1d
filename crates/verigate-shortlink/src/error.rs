use thiserror::Error;

/// Type alias for shortlink results.
pub type Result<T> = std::result::Result<T, ShortlinkError>;

/// Why a single call to the shortening API did not yield a usable URL.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AttemptError {
    #[error("shortener transport error: {0}")]
    Transport(String),
    #[error("shortener returned status {0}")]
    Status(u16),
    #[error("shortener response body is malformed: {0}")]
    MalformedBody(String),
    #[error("shortener returned an invalid url: {0}")]
    InvalidShortUrl(String),
}

#[derive(Debug, Clone, Error)]
pub enum ShortlinkError {
    /// The long URL failed validation; no request was made.
    #[error("url rejected before shortening")]
    InvalidUrl,
    #[error("shortener failed after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: AttemptError },
}
