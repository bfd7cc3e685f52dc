// Opens the first notice and steps through the list with wraparound,
// then reloads in the background.
//
//   NOTICEBOARD_URL=http://127.0.0.1:4000 cargo run --example walk_notices

use std::sync::Arc;

use noticeboard::prelude::*;

#[tokio::main]
async fn main() -> Result<(), NoticeError> {
    let client = NoticeClient::with_config(
        ClientConfig::default()
            .app_name("noticeboard-examples")
            .disable_keystore(true),
    )?;
    client
        .sign_in(SignInRequest::new("demo@example.edu", "password"))
        .await?;

    let mut browser = client.open_browser().await?;
    if browser.open(0).is_err() {
        println!("no notices");
        return Ok(());
    }
    for _ in 0..=browser.filtered_len() {
        if let Some(sel) = browser.selection() {
            println!("{} / {}: {}", sel.position, sel.total, sel.notice.title);
        }
        browser.next().ok();
    }

    let mut reloader = Reloader::new(Arc::new(client));
    reloader.request();
    // the second request supersedes the first; only its result arrives
    reloader.request();
    if let Some(outcome) = reloader.next_outcome().await {
        browser.apply(outcome);
    }
    println!("reloaded {} notices", browser.notices().len());

    Ok(())
}
