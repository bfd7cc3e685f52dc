/*
 * Noticeboard rust client
 *
 * SPDX-FileCopyrightText: 2026 Noticeboard contributors
 * SPDX-License-Identifier: Apache-2.0
 */
//! # Noticeboard Rust Client
//!
//! Client for a departmental notice board REST API (`/signup`, `/signin`, `/notices`).
//!
//! ## Features
//!
//! - sign up, sign in, and token persistence
//! - notice ingestion with defaults for malformed records
//! - category-filtered browsing with wraparound master/detail navigation
//! - image / attachment classification for notice files
//! - background reloads where the newest request wins
//! - http pipeline with retry logic and metrics
//! - axum mock server for tests and demos
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use noticeboard::prelude::*;
//! # async fn example() -> Result<(), NoticeError> {
//!
//! let client = NoticeClient::new("my-app")?;
//! client
//!     .sign_in(SignInRequest::new("ada@example.edu", "correct horse"))
//!     .await?;
//!
//! let mut browser = client.open_browser().await?;
//! browser.set_category(Category::label("Academic"));
//! for notice in browser.filtered() {
//!     println!("{} {}", notice.display_date().unwrap_or_default(), notice.title);
//! }
//!
//! browser.open(0).ok();
//! browser.next().ok();
//! if let Some(sel) = browser.selection() {
//!     println!("{} / {}: {}", sel.position, sel.total, sel.notice.title);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Structure
//!
//! - [`browser::NoticeBrowser`] owns the loaded notices, the category filter and
//!   the selection. All transitions are synchronous and never touch the network.
//! - [`source::NoticeSource`] is the async seam that supplies notices.
//!   [`client::NoticeClient`] implements it over HTTP.
//! - [`source::Reloader`] runs fetches in the background, cancelling a
//!   superseded fetch so only the newest result is applied.
//! - [`media::classify`] splits a notice's files into carousel images and attachments.
//!
#![allow(clippy::missing_errors_doc)] // pedantic
#![allow(clippy::missing_const_for_fn)] //  nursery function
#![allow(clippy::must_use_candidate)] // pedantic
#![warn(clippy::default_trait_access)]
#![warn(clippy::doc_markdown)]
#![warn(clippy::explicit_iter_loop)]
#![warn(clippy::implicit_clone)]
#![warn(clippy::match_same_arms)]
#![warn(clippy::needless_raw_strings)]
#![warn(clippy::redundant_clone)]
#![warn(clippy::redundant_closure)]
#![warn(clippy::uninlined_format_args)]
#![warn(clippy::unused_async)]

pub mod auth;
pub mod browser;
pub mod client;
pub mod error;
mod http_client;
pub mod keystore;
pub mod media;
#[cfg(feature = "mock")]
#[doc(hidden)]
pub mod mock;
pub mod notices;
pub mod source;

/// Result type alias using `NoticeError` as the default error.
pub type Result<T, E = crate::error::NoticeError> = std::result::Result<T, E>;

/// Prelude module - import the common types with `use noticeboard::prelude::*;`
pub mod prelude {
    pub use super::DEFAULT_API_URL;
    pub use crate::error::*;
    pub use crate::{
        // Auth
        auth::{AuthResponse, AuthStatus, SignInRequest, SignUpRequest},
        // Browsing
        browser::{Category, NoticeBrowser, Selection, ViewState},
        // Client
        client::{ClientConfig, NoticeClient},
        // HTTP metrics
        http_client::HttpMetricsSnapshot,
        // Token storage
        keystore::{Credentials, KeyStore},
        // Images and attachments
        media::{Attachment, Carousel, ImageRef, Media, classify},
        // Notices
        notices::{FileKind, Notice, NoticeFile},
        // Notice sources
        source::{NoticeSource, Reloader},
    };
}

// ============================================================================
// CONSTANTS
// ============================================================================

/// Default API endpoint, used when `NOTICEBOARD_URL` is not set
pub const DEFAULT_API_URL: &str = "http://127.0.0.1:4000";

pub(crate) mod config {
    /// Environment variable for default endpoint URL
    pub const NOTICEBOARD_URL_ENV: &str = "NOTICEBOARD_URL";

    /// Environment variable holding a token; takes precedence over the keystore
    pub const NOTICEBOARD_TOKEN_ENV: &str = "NOTICEBOARD_TOKEN";

    /// Request header carrying the auth token
    pub const TOKEN_HEADER: &str = "token";

    /// Service name for keystore
    pub const DEFAULT_SERVICE_NAME: &str = "noticeboard";

    /// Warn when the rate-limit wait exceeds this duration (seconds).
    pub const RATE_LIMIT_WAIT_WARN_SECS: u64 = 5;

    /// Fail when the rate-limit wait exceeds this duration (seconds).
    pub const RATE_LIMIT_WAIT_MAX_SECS: u64 = 30;

    /// Environment variable to override rate-limit retry cap (0 disables the cap).
    pub const RATE_LIMIT_MAX_RETRIES_ENV: &str = "NOTICEBOARD_RATE_LIMIT_MAX_RETRIES";

    /// Maximum consecutive 429 retries before failing.
    pub const RATE_LIMIT_MAX_RETRIES_DEFAULT: u32 = 5;

    /// Max retries for HTTP client
    pub const MAX_RETRIES: u32 = 3;
}
