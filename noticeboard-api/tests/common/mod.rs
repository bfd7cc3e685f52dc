//! Shared test utilities for noticeboard integration tests
//!
//! Every test gets its own mock server on a free port, and a client whose
//! keystore lives in a temporary directory.
#![cfg(test)]
#![allow(dead_code)]

use std::net::SocketAddr;

use noticeboard::mock::{DEMO_EMAIL, DEMO_PASSWORD, MockNoticeServer, MockNoticeServerHandle};
use noticeboard::prelude::*;

pub type TestResult<T = ()> = Result<T, anyhow::Error>;

/// Mock server, client, and the temp dir holding the client's token file
pub struct TestContext {
    pub server: MockNoticeServerHandle,
    pub client: NoticeClient,
    pub dir: tempfile::TempDir,
}

impl TestContext {
    pub async fn new() -> TestResult<Self> {
        let addr: SocketAddr = "127.0.0.1:0".parse()?;
        let server = MockNoticeServer::start(addr).await?;
        let dir = tempfile::tempdir()?;
        let client = client_for(&server, &dir)?;
        Ok(Self {
            server,
            client,
            dir,
        })
    }

    /// Context with the demo user already signed in
    pub async fn signed_in() -> TestResult<Self> {
        let ctx = Self::new().await?;
        ctx.client
            .sign_in(SignInRequest::new(DEMO_EMAIL, DEMO_PASSWORD))
            .await?;
        Ok(ctx)
    }

    /// A second client sharing the same token file
    pub fn another_client(&self) -> TestResult<NoticeClient> {
        client_for(&self.server, &self.dir)
    }

    pub fn token_path(&self) -> std::path::PathBuf {
        self.dir.path().join("test.token")
    }
}

fn client_for(server: &MockNoticeServerHandle, dir: &tempfile::TempDir) -> TestResult<NoticeClient> {
    let config = ClientConfig::default()
        .app_name("test")
        .base_url(server.url())
        .keystore_path(dir.path().join("test.token"));
    Ok(NoticeClient::with_config(config)?)
}
