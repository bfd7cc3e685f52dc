use std::net::SocketAddr;
use std::str::FromStr;

use noticeboard::mock::{DEMO_EMAIL, DEMO_PASSWORD, MockNoticeServer};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let addr = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "127.0.0.1:4000".to_string());
    let addr = SocketAddr::from_str(&addr)?;
    let handle = MockNoticeServer::start(addr).await?;
    println!(
        "mock notice server listening on {} (sign in with {DEMO_EMAIL} / {DEMO_PASSWORD})",
        handle.url()
    );
    tokio::signal::ctrl_c().await?;
    handle.shutdown().await;
    Ok(())
}
