//! Interactive notice browser
//!
//! The first load happens before the terminal is taken over, so a missing
//! token or an unreachable server is reported like any other command error.
//! Later reloads (`r`) run in the background and never block input.

mod app;
mod keys;
mod ui;

use std::sync::Arc;

use anyhow::Result;

use crate::cli::AppContext;

pub async fn run(ctx: &AppContext) -> Result<()> {
    eprintln!("Loading notices...");
    let browser = ctx.client.open_browser().await?;
    let source = Arc::new(ctx.client.clone());
    let mut app = app::App::new(browser, source, ctx.date_format.clone());
    tokio::task::block_in_place(|| app.run())
}
