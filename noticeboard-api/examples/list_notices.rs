// Signs in and lists notices by category.
//
// Start the demo server first:
//   cargo run --bin noticeboard-mock-server
// then:
//   NOTICEBOARD_URL=http://127.0.0.1:4000 cargo run --example list_notices

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
    let categories = browser.categories().to_vec();
    for category in categories {
        browser.set_category(Category::label(category.as_str()));
        println!("{category}");
        for notice in browser.filtered() {
            let media = classify(notice);
            println!(
                "  {:<12} {} ({} images, {} attachments)",
                notice.display_date().unwrap_or_default(),
                notice.title,
                media.images.len(),
                media.attachments.len()
            );
        }
    }

    Ok(())
}
