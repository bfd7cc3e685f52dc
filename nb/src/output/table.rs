use std::fmt::Write as _;

use noticeboard::prelude::*;
use serde::Serialize;

pub trait TableRow {
    fn headers() -> &'static [&'static str];
    fn row(&self) -> Vec<String>;
}

pub fn render_table<T: TableRow>(items: &[T]) -> String {
    let headers = T::headers();
    let rows: Vec<Vec<String>> = items.iter().map(TableRow::row).collect();
    let widths = column_widths(headers, &rows);

    let mut out = String::new();
    out.push_str(&format_row(
        &headers.iter().map(ToString::to_string).collect::<Vec<_>>(),
        &widths,
    ));
    out.push('\n');
    out.push_str(&format_separator(&widths));

    for row in rows {
        out.push('\n');
        out.push_str(&format_row(&row, &widths));
    }

    out
}

/// Two-column `label  value` block. Multi-line values are indented under the first line.
pub fn render_fields(fields: &[(&str, String)]) -> String {
    let width = fields.iter().map(|(label, _)| label.chars().count()).max().unwrap_or(0);
    let mut out = String::new();
    for (label, value) in fields {
        let mut lines = value.lines();
        let _ = writeln!(out, "{label:<width$}  {}", lines.next().unwrap_or_default());
        for line in lines {
            let _ = writeln!(out, "{:<width$}  {line}", "");
        }
    }
    out
}

fn column_widths(headers: &[&str], rows: &[Vec<String>]) -> Vec<usize> {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (idx, cell) in row.iter().enumerate() {
            let len = cell.chars().count();
            if idx >= widths.len() {
                widths.push(len);
            } else {
                widths[idx] = widths[idx].max(len);
            }
        }
    }
    widths
}

fn format_row(row: &[String], widths: &[usize]) -> String {
    let mut out = String::new();
    for (idx, cell) in row.iter().enumerate() {
        if idx > 0 {
            out.push_str("  ");
        }
        let width = widths.get(idx).copied().unwrap_or(0);
        let _ = write!(out, "{cell:<width$}");
    }
    out.trim_end().to_string()
}

fn format_separator(widths: &[usize]) -> String {
    let mut out = String::new();
    for (idx, width) in widths.iter().enumerate() {
        if idx > 0 {
            out.push_str("  ");
        }
        out.push_str(&"-".repeat(*width));
    }
    out
}

/// A notice in a listing, with its 1-based position in the filtered list
#[derive(Debug, Serialize)]
pub struct NoticeRow<'a> {
    pub position: usize,
    #[serde(flatten)]
    pub notice: &'a Notice,
    #[serde(skip)]
    pub date: String,
}

impl TableRow for NoticeRow<'_> {
    fn headers() -> &'static [&'static str] {
        &["#", "date", "category", "!", "title", "files"]
    }

    fn row(&self) -> Vec<String> {
        let media = classify(self.notice);
        let files = match (media.images.len(), media.attachments.len()) {
            (0, 0) => String::new(),
            (images, attachments) => format!("{images} img, {attachments} att"),
        };
        vec![
            self.position.to_string(),
            self.date.clone(),
            self.notice.category_label().to_string(),
            if self.notice.important { "!" } else { "" }.to_string(),
            self.notice.title.clone(),
            files,
        ]
    }
}

/// A category and the number of notices in it
#[derive(Debug, Serialize)]
pub struct CategoryRow {
    pub category: String,
    pub notices: usize,
}

impl TableRow for CategoryRow {
    fn headers() -> &'static [&'static str] {
        &["category", "notices"]
    }

    fn row(&self) -> Vec<String> {
        vec![self.category.clone(), self.notices.to_string()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notice_rows_align() {
        let mut exam = Notice::new("n1", "Exam schedule", Some("Academic"));
        exam.important = true;
        let fair = Notice::new("n2", "Spring fair", None);
        let rows = [
            NoticeRow {
                position: 1,
                notice: &exam,
                date: "Mar 1, 2026".into(),
            },
            NoticeRow {
                position: 2,
                notice: &fair,
                date: String::new(),
            },
        ];
        let table = render_table(&rows);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("#  date"));
        assert!(lines[2].contains("Academic"));
        assert!(lines[2].contains("!  Exam schedule"));
        assert!(lines[3].ends_with("Spring fair"));
    }

    #[test]
    fn notice_row_json_is_flat() {
        let notice = Notice::new("n1", "Exam schedule", Some("Academic"));
        let row = NoticeRow {
            position: 3,
            notice: &notice,
            date: "ignored".into(),
        };
        let value = serde_json::to_value(&row).expect("serialize");
        assert_eq!(value["position"], 3);
        assert_eq!(value["title"], "Exam schedule");
        assert!(value.get("date").is_none());
    }

    #[test]
    fn fields_indent_continuation_lines() {
        let text = render_fields(&[
            ("title", "Exam".to_string()),
            ("content", "line one\nline two".to_string()),
        ]);
        assert_eq!(text, "title    Exam\ncontent  line one\n         line two\n");
    }
}
