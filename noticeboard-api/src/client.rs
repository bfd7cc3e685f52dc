//! Notice board Rust API Client
//!
//! # Creating new api client
//!
//! - [new](NoticeClient::new) - create new client
//! - [with_config](NoticeClient::with_config) - create client with custom configuration
//! - [with_client](NoticeClient::with_client) - create client with configuration and custom reqwest client
//!
//! # Notices
//!
//! - [fetch_notices](NoticeClient::fetch_notices) - load the current notice list
//! - [open_browser](NoticeClient::open_browser) - load notices into a [`NoticeBrowser`]
//!

use std::{path::PathBuf, sync::Arc};

use tracing::debug;

use crate::{
    DEFAULT_API_URL, Result,
    config::{
        DEFAULT_SERVICE_NAME, NOTICEBOARD_URL_ENV, RATE_LIMIT_MAX_RETRIES_DEFAULT,
        RATE_LIMIT_MAX_RETRIES_ENV,
    },
    http_client::HttpClient,
    notices::NoticeListResponse,
    prelude::*,
};

/// Message reported when the server rejects a notice fetch without saying why
const LOAD_FAILED_MESSAGE: &str = "Failed to fetch notices";

/// Configuration for the notice board client.
///
/// ```rust,no_run
/// use noticeboard::prelude::*;
/// # fn create_client() -> Result<NoticeClient, NoticeError> {
/// let config = ClientConfig::default()
///     .app_name("my-app")
///     .base_url("https://notices.example.edu");
/// let client = NoticeClient::with_config(config)?;
/// # Ok(client)
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base url for all api requests.
    /// If not provided in config, url is determined by:
    /// * The environment variable NOTICEBOARD_URL, if defined, or
    /// * "http://127.0.0.1:4000" `noticeboard::DEFAULT_API_URL`
    pub base_url: String,

    /// Application name. Used as the keystore service name.
    pub app_name: String,

    /// Token file override. Defaults to `<config_dir>/noticeboard/<app_name>.token`
    pub keystore_path: Option<PathBuf>,

    /// Do not persist the token
    pub disable_keystore: bool,

    /// Maximum consecutive 429 retries before failing (0 disables the cap).
    ///
    /// Defaults to RATE_LIMIT_MAX_RETRIES_DEFAULT, or the env override if set:
    /// NOTICEBOARD_RATE_LIMIT_MAX_RETRIES.
    pub rate_limit_max_retries: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            base_url: std::env::var(NOTICEBOARD_URL_ENV)
                .unwrap_or_else(|_| DEFAULT_API_URL.to_string()),
            app_name: DEFAULT_SERVICE_NAME.to_string(),
            keystore_path: None,
            disable_keystore: false,
            rate_limit_max_retries: std::env::var(RATE_LIMIT_MAX_RETRIES_ENV)
                .ok()
                .and_then(|value| value.parse::<u32>().ok())
                .unwrap_or(RATE_LIMIT_MAX_RETRIES_DEFAULT),
        }
    }
}

impl ClientConfig {
    /// Sets the app_name.
    pub fn app_name(self, app_name: &str) -> Self {
        ClientConfig {
            app_name: app_name.to_string(),
            ..self
        }
    }

    pub fn base_url(self, base_url: impl Into<String>) -> Self {
        ClientConfig {
            base_url: base_url.into(),
            ..self
        }
    }

    pub fn keystore_path(self, path: impl Into<PathBuf>) -> Self {
        ClientConfig {
            keystore_path: Some(path.into()),
            ..self
        }
    }

    pub fn disable_keystore(self, disable_keystore: bool) -> Self {
        ClientConfig {
            disable_keystore,
            ..self
        }
    }

    /// Sets the cap on consecutive 429 retries. 0 disables the cap.
    pub fn rate_limit_max_retries(self, rate_limit_max_retries: u32) -> Self {
        ClientConfig {
            rate_limit_max_retries,
            ..self
        }
    }
}

/// Notice board API client. Cheap to clone; clones share the token and metrics.
#[derive(Clone)]
pub struct NoticeClient {
    pub(crate) client: Arc<HttpClient>,
    pub(crate) config: ClientConfig,
    pub(crate) keystore: Option<KeyStore>,
}

impl std::fmt::Debug for NoticeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NoticeClient")
            .field("config", &self.config)
            .field("keystore", &self.keystore)
            .finish()
    }
}

impl NoticeClient {
    /// Creates a new client with default configuration.
    ///
    /// # Example
    /// ```rust,no_run
    /// use noticeboard::prelude::*;
    /// # fn create_client() -> Result<NoticeClient, NoticeError> {
    /// let client = NoticeClient::new("my-app")?;
    /// # Ok(client)
    /// # }
    /// ```
    pub fn new(app_name: &str) -> Result<Self> {
        Self::with_config(ClientConfig::default().app_name(app_name))
    }

    /// Creates a new client with the provided configuration.
    pub fn with_config(config: ClientConfig) -> Result<Self> {
        let client = reqwest::Client::builder().no_proxy();
        Self::with_client(client, config)
    }

    /// Creates a client from a `reqwest::ClientBuilder` and configuration.
    /// ClientBuilder can be customized with timeouts, proxies, dns servers, user_agent, etc.
    ///
    /// # Example
    /// ```rust,no_run
    /// use noticeboard::prelude::*;
    /// # fn create_client() -> Result<NoticeClient, NoticeError> {
    /// let config = ClientConfig::default().app_name("my-app");
    /// let builder = reqwest::Client::builder().timeout(std::time::Duration::from_secs(10));
    /// let client = NoticeClient::with_client(builder, config)?;
    /// # Ok(client)
    /// # }
    /// ```
    pub fn with_client(client: reqwest::ClientBuilder, config: ClientConfig) -> Result<Self> {
        debug!(url=?config.base_url, "new client");
        let client = HttpClient::new(
            client,
            config.base_url.clone(),
            config.rate_limit_max_retries,
        )?;
        let keystore = match (&config.keystore_path, config.disable_keystore) {
            (_, true) => None,
            (Some(path), false) => Some(KeyStore::with_path(&config.app_name, path)),
            (None, false) => Some(KeyStore::new(&config.app_name)?),
        };
        Ok(Self {
            client: Arc::new(client),
            config,
            keystore,
        })
    }

    /// Returns the configuration.
    pub fn get_config(&self) -> &ClientConfig {
        &self.config
    }

    /// Returns a snapshot of current HTTP metrics.
    ///
    /// - `total_requests`: Number of HTTP requests sent
    /// - `successful_responses`: Number of successful (2xx) responses
    /// - `errors`: Number of error responses (excluding rate limit errors)
    /// - `retries`: Number of retry attempts
    /// - `bytes_sent`: Total bytes sent in request bodies
    /// - `bytes_received`: Total bytes received in response bodies
    /// - `rate_limit_errors`: Number of rate limit (429) responses received
    /// - `rate_limit_delay_secs`: Total seconds spent waiting for rate limit backoff
    pub fn http_metrics(&self) -> HttpMetricsSnapshot {
        self.client.metrics_snapshot()
    }

    /// Fetches all notices, in server order.
    ///
    /// Records with missing or mistyped fields are given defaults; entries that
    /// are not objects are skipped. A `success: false` reply becomes
    /// `NoticeError::LoadFailed` with the server's message.
    pub async fn fetch_notices(&self) -> Result<Vec<Notice>> {
        let response: NoticeListResponse = self.client.get_request("/notices").await?;
        if !response.success {
            let message = response
                .message
                .filter(|msg| !msg.trim().is_empty())
                .unwrap_or_else(|| LOAD_FAILED_MESSAGE.to_string());
            return Err(NoticeError::LoadFailed { message });
        }
        let notices = response.into_notices();
        debug!(count = notices.len(), "fetched notices");
        Ok(notices)
    }

    /// Fetches notices and returns a browser loaded with them.
    ///
    /// Fails with `Unauthorized` before touching the network if there is no token.
    pub async fn open_browser(&self) -> Result<NoticeBrowser> {
        if !self.client.has_token() {
            return Err(NoticeError::Unauthorized);
        }
        let mut browser = NoticeBrowser::new();
        browser.load(self.fetch_notices().await?);
        Ok(browser)
    }
}

impl NoticeSource for NoticeClient {
    fn fetch_notices(&self) -> impl Future<Output = Result<Vec<Notice>>> + Send {
        NoticeClient::fetch_notices(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builders() {
        let config = ClientConfig::default()
            .app_name("demo")
            .base_url("http://localhost:9999/")
            .keystore_path("/tmp/demo.token")
            .disable_keystore(true);
        assert_eq!(config.app_name, "demo");
        assert_eq!(config.base_url, "http://localhost:9999/");
        assert!(config.disable_keystore);
    }

    #[test]
    fn test_disabled_keystore() -> Result<()> {
        let client = NoticeClient::with_config(ClientConfig::default().disable_keystore(true))?;
        assert!(client.get_key_store().is_none());
        assert!(!client.has_token());
        assert!(client.auth_status().keystore.is_none());
        Ok(())
    }

    #[test]
    fn test_keystore_path_override() -> Result<()> {
        let config = ClientConfig::default()
            .app_name("demo")
            .keystore_path("/tmp/nb-test/demo.token");
        let client = NoticeClient::with_config(config)?;
        let keystore = client.get_key_store().expect("keystore");
        assert_eq!(keystore.path(), std::path::Path::new("/tmp/nb-test/demo.token"));
        assert_eq!(keystore.service(), "demo");
        Ok(())
    }
}
