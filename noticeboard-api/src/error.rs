//! Errors returned by `NoticeClient` and `NoticeBrowser`
//!
use std::path::PathBuf;

use snafu::prelude::*;

/// Errors returned by noticeboard crate
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum NoticeError {
    // Http connection or timeout error
    #[snafu(display("HTTP error {method} url:{url}"))]
    Http {
        method: String,
        url: String,
        source: reqwest::Error,
    },

    /// Server responded with an error status.
    #[snafu(display("Api Server reported error ({code}) {method} {url}: {message}"))]
    ApiError {
        code: u16,
        method: String,
        url: String,
        message: String,
    },

    /// The notice list endpoint answered, but reported `success: false`.
    #[snafu(display("{message}"))]
    LoadFailed { message: String },

    /// Sign-in or sign-up was rejected.
    #[snafu(display("Authentication failed: {message}"))]
    Auth { message: String },

    /// Client has no token. Sign in first.
    #[snafu(display("Client is not authenticated. Sign in first."))]
    Unauthorized,

    /// Token was accepted but the user may not read the resource
    #[snafu(display("Permission denied"))]
    Forbidden,

    #[snafu(display("{what} not found"))]
    NotFound { what: String },

    /// Request was rejected as invalid (http 400), or a parameter failed a local check.
    #[snafu(display("Validation error: {message}"))]
    Validation { message: String },

    /// Server response did not have the expected shape.
    #[snafu(display("Deserialization: {source}"))]
    Deserialization { source: serde_json::Error },

    /// Serialization error. unlikely to occur.
    #[snafu(display("Serialization: {source}"))]
    Serialization { source: serde_json::Error },

    /// Server kept answering 429 beyond the configured retry cap.
    #[snafu(display("Rate limit exceeded: \"{header}\" (parsed wait_time: {} secs)", duration.as_secs()))]
    RateLimitExceeded {
        header: String,
        duration: std::time::Duration,
    },

    /// Error encountered by the token store.
    #[snafu(display("KeyStore: {source}"))]
    KeyStore { source: KeyStoreError },

    /// Some other error occurred
    #[snafu(display("{message}"))]
    Other { message: String },
}

/// Errors arising from `KeyStore`
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum KeyStoreError {
    /// Problem accessing the token file
    #[snafu(display("keystore file {path:?} {source}"))]
    File {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("keystore configuration error: {message}"))]
    Config { message: String },
}

impl From<KeyStoreError> for NoticeError {
    fn from(source: KeyStoreError) -> Self {
        Self::KeyStore { source }
    }
}

/// Rejected browser navigation. The browser state is unchanged when one of these is returned.
#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum BrowseError {
    /// `open` was called with an index outside the filtered list.
    #[snafu(display("index {index} out of range for {len} notices"))]
    InvalidIndex { index: usize, len: usize },

    /// `previous` or `next` was called with no notice open.
    #[snafu(display("no notice is open"))]
    NotOpen,
}
