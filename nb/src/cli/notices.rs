use anyhow::{Context, Result, bail};
use noticeboard::prelude::*;
use serde_json::json;

use crate::{
    cli::AppContext,
    output::{CategoryRow, NoticeRow, render_fields},
    text::html_to_text,
};

pub async fn handle(ctx: &AppContext, args: super::NoticesArgs) -> Result<()> {
    let mut browser = ctx.client.open_browser().await?;
    match args.command {
        super::NoticesCommands::List { category } => {
            select_category(&mut browser, category.as_deref())?;
            list(ctx, &browser)
        }
        super::NoticesCommands::Show { position, category } => {
            select_category(&mut browser, category.as_deref())?;
            show(ctx, &mut browser, position)
        }
        super::NoticesCommands::Categories => categories(ctx, &browser),
    }
}

/// Applies a category filter, failing on labels no loaded notice has.
fn select_category(browser: &mut NoticeBrowser, category: Option<&str>) -> Result<()> {
    let Some(category) = category.map(Category::parse) else {
        return Ok(());
    };
    if let Category::Label(label) = &category
        && !browser.categories().contains(label)
    {
        bail!(
            "unknown category '{label}' (available: {})",
            browser.categories().join(", ")
        );
    }
    browser.set_category(category);
    Ok(())
}

fn list(ctx: &AppContext, browser: &NoticeBrowser) -> Result<()> {
    let rows: Vec<NoticeRow<'_>> = browser
        .filtered()
        .enumerate()
        .map(|(index, notice)| NoticeRow {
            position: index + 1,
            notice,
            date: ctx.format_date(notice),
        })
        .collect();
    ctx.output.emit_table(&rows)
}

fn show(ctx: &AppContext, browser: &mut NoticeBrowser, position: usize) -> Result<()> {
    let total = browser.filtered_len();
    let index = position
        .checked_sub(1)
        .with_context(|| format!("positions start at 1 (there are {total} notices)"))?;
    browser
        .open(index)
        .with_context(|| format!("no notice at position {position}"))?;
    let Some(selection) = browser.selection() else {
        bail!("no notice at position {position}");
    };
    let notice = selection.notice;
    let media = classify(notice);
    let text = html_to_text(&notice.content);

    let mut fields = vec![
        ("title", notice.title.clone()),
        (
            "position",
            format!("{} / {}", selection.position, selection.total),
        ),
        ("category", notice.category_label().to_string()),
        ("date", ctx.format_date(notice)),
    ];
    if notice.important {
        fields.push(("important", "yes".to_string()));
    }
    for (n, image) in media.images.iter().enumerate() {
        let label = if n == 0 { "images" } else { "" };
        fields.push((label, image.url.clone()));
    }
    for (n, attachment) in media.attachments.iter().enumerate() {
        let label = if n == 0 { "attachments" } else { "" };
        let url = attachment.url.as_deref().unwrap_or("(no link)");
        fields.push((label, format!("{}  {url}", attachment.name)));
    }
    fields.push(("", String::new()));
    fields.push(("", text.clone()));

    ctx.output.emit_record(
        &json!({
            "position": selection.position,
            "total": selection.total,
            "notice": notice,
            "text": text,
            "media": media,
        }),
        &render_fields(&fields),
    )
}

fn categories(ctx: &AppContext, browser: &NoticeBrowser) -> Result<()> {
    let rows: Vec<CategoryRow> = browser
        .categories()
        .iter()
        .map(|label| CategoryRow {
            category: label.clone(),
            notices: browser
                .notices()
                .iter()
                .filter(|notice| notice.category.as_deref() == Some(label.as_str()))
                .count(),
        })
        .collect();
    ctx.output.emit_table(&rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn browser() -> NoticeBrowser {
        let mut browser = NoticeBrowser::new();
        browser.load(vec![
            Notice::new("1", "Exam schedule", Some("Academic")),
            Notice::new("2", "Spring fair", Some("Events")),
            Notice::new("3", "Library hours", Some("Academic")),
        ]);
        browser
    }

    #[test]
    fn category_filter_applies() -> Result<()> {
        let mut browser = browser();
        select_category(&mut browser, Some("Academic"))?;
        let ids: Vec<&str> = browser.filtered().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, ["1", "3"]);

        select_category(&mut browser, Some("all"))?;
        assert_eq!(browser.filtered_len(), 3);
        Ok(())
    }

    #[test]
    fn unknown_category_is_an_error() {
        let mut browser = browser();
        let err = select_category(&mut browser, Some("Sports")).unwrap_err();
        assert!(err.to_string().contains("Academic, Events"));
        assert_eq!(*browser.selected_category(), Category::All);
    }

    #[test]
    fn no_category_keeps_all() -> Result<()> {
        let mut browser = browser();
        select_category(&mut browser, None)?;
        assert_eq!(browser.filtered_len(), 3);
        Ok(())
    }
}
