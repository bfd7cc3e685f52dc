//! Notice content as terminal text
//!
//! Notice bodies arrive as HTML fragments. The browser and `notices show`
//! render them as plain text: tags are dropped, `<br>`, `</p>` and list items
//! break lines, and the common entities are decoded.

use std::fmt::Write as _;

use noticeboard::prelude::Notice;

const ENTITIES: &[(&str, &str)] = &[
    ("&amp;", "&"),
    ("&lt;", "<"),
    ("&gt;", ">"),
    ("&quot;", "\""),
    ("&#39;", "'"),
    ("&nbsp;", " "),
];

/// Converts an HTML fragment to plain text.
///
/// Quoted attribute values may contain `>`. The contents of `<script>` and
/// `<style>` elements are dropped.
pub fn html_to_text(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut rest = html;
    while let Some(start) = rest.find('<') {
        out.push_str(&rest[..start]);
        let Some(len) = tag_len(&rest[start + 1..]) else {
            // unterminated tag: keep the text as-is
            out.push_str(&rest[start..]);
            rest = "";
            break;
        };
        let tag = &rest[start + 1..start + 1 + len];
        rest = &rest[start + len + 2..];
        let name = tag_name(tag);
        if breaks_line(tag, &name) && !out.ends_with('\n') {
            out.push('\n');
        }
        if !tag.starts_with('/') && matches!(name.as_str(), "script" | "style") {
            rest = skip_element(rest, &name);
        }
    }
    out.push_str(rest);
    tidy(&decode_entities(&out))
}

// length of the tag body up to its closing '>', skipping quoted values
fn tag_len(body: &str) -> Option<usize> {
    let mut quote = None;
    for (i, c) in body.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '>') => return Some(i),
            _ => {}
        }
    }
    None
}

fn tag_name(tag: &str) -> String {
    tag.trim_start_matches('/')
        .split(|c: char| c.is_whitespace() || c == '/')
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase()
}

fn breaks_line(tag: &str, name: &str) -> bool {
    match name {
        "br" => true,
        "p" | "div" | "li" | "h1" | "h2" | "h3" | "h4" | "tr" => tag.starts_with('/'),
        _ => false,
    }
}

// text after the closing tag of `name`, or "" when it never closes
fn skip_element<'a>(rest: &'a str, name: &str) -> &'a str {
    let closing = format!("</{name}");
    let lower = rest.to_ascii_lowercase();
    let Some(at) = lower.find(&closing) else {
        return "";
    };
    match rest[at..].find('>') {
        Some(end) => &rest[at + end + 1..],
        None => "",
    }
}

fn decode_entities(text: &str) -> String {
    // &amp; last, so "&amp;lt;" stays "&lt;"
    let mut out = text.to_string();
    for (entity, ch) in ENTITIES.iter().skip(1) {
        out = out.replace(entity, ch);
    }
    out.replace(ENTITIES[0].0, ENTITIES[0].1)
}

/// Formats the notice date with a strftime format. Missing dates give "",
/// and a format chrono rejects falls back to RFC 3339.
pub fn format_date(notice: &Notice, format: &str) -> String {
    let Some(created_at) = notice.created_at else {
        return String::new();
    };
    let mut out = String::new();
    if write!(out, "{}", created_at.format(format)).is_err() {
        return created_at.to_rfc3339();
    }
    out
}

// trim trailing spaces and collapse runs of blank lines
fn tidy(text: &str) -> String {
    let mut lines: Vec<&str> = Vec::new();
    for line in text.lines().map(str::trim_end) {
        if line.is_empty() && lines.last().is_none_or(|last| last.is_empty()) {
            continue;
        }
        lines.push(line);
    }
    while lines.last().is_some_and(|last| last.is_empty()) {
        lines.pop();
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_tags_and_breaks_paragraphs() {
        let html = "<p>Exams run from <b>March 10</b> to March 14.</p><p>Seating plans &amp; rooms are attached.</p>";
        assert_eq!(
            html_to_text(html),
            "Exams run from March 10 to March 14.\nSeating plans & rooms are attached."
        );
    }

    #[test]
    fn line_breaks() {
        assert_eq!(html_to_text("one<br>two<BR/>three<br />"), "one\ntwo\nthree");
    }

    #[test]
    fn decodes_entities() {
        assert_eq!(
            html_to_text("&lt;b&gt; &quot;quoted&quot; it&#39;s&nbsp;here"),
            "<b> \"quoted\" it's here"
        );
        assert_eq!(html_to_text("&amp;lt;"), "&lt;");
    }

    #[test]
    fn plain_text_unchanged() {
        let text = "The library stays open until midnight during exam week.";
        assert_eq!(html_to_text(text), text);
    }

    #[test]
    fn unterminated_tag_kept() {
        assert_eq!(html_to_text("a < b"), "a < b");
    }

    #[test]
    fn quoted_attributes_may_hold_angle_brackets() {
        assert_eq!(
            html_to_text(r#"<a title="a>b" href='x>y'>link</a> after"#),
            "link after"
        );
    }

    #[test]
    fn script_and_style_contents_dropped() {
        let html = "<style>p { color: red; }</style><p>Visible</p><SCRIPT>alert('x')</SCRIPT>tail";
        assert_eq!(html_to_text(html), "Visible\ntail");
        assert_eq!(html_to_text("before<script>never closed"), "before");
    }

    #[test]
    fn dates_use_format_and_survive_bad_formats() {
        let mut notice = Notice::new("1", "Exam", None);
        assert_eq!(format_date(&notice, Notice::DATE_FORMAT), "");
        notice.created_at = "2026-03-01T09:30:00Z".parse().ok();
        assert_eq!(format_date(&notice, Notice::DATE_FORMAT), "Mar 1, 2026");
        assert_eq!(format_date(&notice, "%Y-%m-%d"), "2026-03-01");
        assert_eq!(format_date(&notice, "%Q"), "2026-03-01T09:30:00+00:00");
    }

    #[test]
    fn list_items_on_own_lines() {
        assert_eq!(
            html_to_text("<ul><li>first</li><li>second</li></ul>"),
            "first\nsecond"
        );
    }
}
