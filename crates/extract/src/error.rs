//! Extraction error types.

use {chatspout_relay::SourceError, thiserror::Error};

/// Errors from the headless-browser extraction layer.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("browser not available: {0}")]
    BrowserNotAvailable(String),

    #[error("browser launch failed: {0}")]
    LaunchFailed(String),

    #[error("browser already shut down")]
    BrowserClosed,

    #[error("navigation failed: {0}")]
    NavigationFailed(String),

    #[error("timeout: {0}")]
    Timeout(String),

    #[error("extraction failed: {0}")]
    Extraction(String),

    #[error("CDP error: {0}")]
    Cdp(String),
}

impl From<chromiumoxide::error::CdpError> for ExtractError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        ExtractError::Cdp(err.to_string())
    }
}

/// Map into the relay's collaborator-boundary error: anything that happens
/// before a page is usable is a navigation failure, everything after is an
/// extraction failure.
impl From<ExtractError> for SourceError {
    fn from(err: ExtractError) -> Self {
        match err {
            ExtractError::Timeout(msg) => SourceError::Timeout(msg),
            ExtractError::BrowserNotAvailable(msg)
            | ExtractError::LaunchFailed(msg)
            | ExtractError::NavigationFailed(msg) => SourceError::Navigation(msg),
            ExtractError::BrowserClosed => SourceError::Navigation("browser already shut down".into()),
            ExtractError::Extraction(msg) | ExtractError::Cdp(msg) => SourceError::Extraction(msg),
        }
    }
}
