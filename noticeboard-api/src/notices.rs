//! Notices and their files
//!
//! The server's notice objects are loosely typed: every field may be missing,
//! and `files` may hold anything. [`RawNotice`] accepts whatever arrives, and
//! [`Notice::from_raw`] is the one place where defaults are applied, so that
//! the browser and the classification helpers only ever see well-formed data.
//!
//! # Wire format
//!
//! ```json
//! { "success": true,
//!   "data": [ { "_id": "65f0", "title": "Exam schedule", "content": "<p>..</p>",
//!               "category": "Academic", "isImportant": true,
//!               "createdAt": "2026-03-01T09:30:00.000Z",
//!               "fileUrl": "https://cdn/x.png", "fileType": "image",
//!               "files": [ { "url": "https://cdn/a.pdf", "originalName": "a.pdf",
//!                            "fileType": "document", "mimetype": "application/pdf" } ] } ] }
//! ```

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// Kind tag attached to a file by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, strum::EnumString, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FileKind {
    File,
    Image,
    Video,
    Audio,
    Pdf,
    /// catch-all for kinds the server may add
    #[serde(untagged)]
    #[strum(default)]
    Other(String),
}

impl FileKind {
    /// Parses a kind tag. Matching is case-insensitive; blank tags yield None.
    pub fn parse(tag: &str) -> Option<Self> {
        let tag = tag.trim();
        if tag.is_empty() {
            return None;
        }
        tag.to_ascii_lowercase().parse().ok()
    }
}

/// A file attached to a notice.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NoticeFile {
    pub url: Option<String>,
    pub original_name: Option<String>,
    pub kind: Option<FileKind>,
    pub mime_type: Option<String>,
}

impl NoticeFile {
    /// Returns the url if it is present and non-empty.
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref().filter(|url| !url.is_empty())
    }
}

/// A single posted announcement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub id: String,
    pub title: String,
    /// Body content as sent by the server. May contain markup; never modified here.
    pub content: String,
    pub category: Option<String>,
    pub important: bool,
    pub created_at: Option<DateTime<Utc>>,
    /// The notice's single primary file (`fileUrl` / `fileType` on the wire)
    pub primary_file: Option<NoticeFile>,
    pub files: Vec<NoticeFile>,
}

impl Notice {
    /// Title shown for notices that arrive without one
    pub const UNTITLED: &'static str = "(untitled)";

    /// Date format used by `display_date`
    pub const DATE_FORMAT: &'static str = "%b %-d, %Y";

    /// Builds a notice with just an id, title and category. Other fields are empty.
    pub fn new(id: impl Into<String>, title: impl Into<String>, category: Option<&str>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            content: String::new(),
            category: category.map(ToString::to_string),
            important: false,
            created_at: None,
            primary_file: None,
            files: Vec::new(),
        }
    }

    /// Validates a wire record. `position` is used to synthesize an id when the record has none.
    pub fn from_raw(raw: RawNotice, position: usize) -> Self {
        let id = raw
            .id
            .as_ref()
            .and_then(id_string)
            .unwrap_or_else(|| format!("notice-{position}"));
        let title = non_blank(raw.title).unwrap_or_else(|| Self::UNTITLED.to_string());
        let created_at = raw.created_at.as_deref().and_then(|date| {
            DateTime::parse_from_rfc3339(date)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|err| debug!(%id, date, "ignoring createdAt: {err}"))
                .ok()
        });
        let primary_file = non_blank(raw.file_url).map(|url| NoticeFile {
            url: Some(url),
            original_name: None,
            kind: raw.file_type.as_deref().and_then(FileKind::parse),
            mime_type: None,
        });
        let files = match raw.files {
            Some(Value::Array(items)) => items.iter().filter_map(file_from_value).collect(),
            Some(Value::Null) | None => Vec::new(),
            Some(other) => {
                debug!(%id, "ignoring files: expected array, got {other}");
                Vec::new()
            }
        };

        Self {
            id,
            title,
            content: raw.content.unwrap_or_default(),
            category: raw.category.filter(|label| !label.trim().is_empty()),
            important: raw.is_important.unwrap_or(false),
            created_at,
            primary_file,
            files,
        }
    }

    /// Creation date formatted for display, e.g. "Mar 1, 2026". None when the date is missing.
    pub fn display_date(&self) -> Option<String> {
        self.created_at
            .map(|dt| dt.format(Self::DATE_FORMAT).to_string())
    }

    /// Category label, or "" for uncategorized notices.
    pub fn category_label(&self) -> &str {
        self.category.as_deref().unwrap_or_default()
    }
}

/// A notice as it appears on the wire. Every field is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawNotice {
    #[serde(alias = "_id")]
    pub id: Option<Value>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub content: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub category: Option<String>,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub is_important: Option<bool>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub created_at: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub file_url: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub file_type: Option<String>,
    pub files: Option<Value>,
}

/// Response envelope for `GET /notices`
#[derive(Debug, Deserialize)]
pub(crate) struct NoticeListResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub data: Vec<Value>,
    #[serde(default)]
    pub message: Option<String>,
}

impl NoticeListResponse {
    /// Converts every element of `data` to a Notice. Elements that are not
    /// objects are skipped; missing fields get defaults. A record whose id
    /// repeats an earlier one is skipped, and synthesized ids never reuse a
    /// server id.
    pub(crate) fn into_notices(self) -> Vec<Notice> {
        let raws: Vec<(usize, RawNotice)> = self
            .data
            .into_iter()
            .enumerate()
            .filter_map(|(position, value)| match serde_json::from_value::<RawNotice>(value) {
                Ok(raw) => Some((position, raw)),
                Err(err) => {
                    debug!(position, "skipping notice: {err}");
                    None
                }
            })
            .collect();
        let server_ids: HashSet<String> = raws
            .iter()
            .filter_map(|(_, raw)| raw.id.as_ref().and_then(id_string))
            .collect();

        let mut seen = HashSet::with_capacity(raws.len());
        let mut notices = Vec::with_capacity(raws.len());
        for (position, mut raw) in raws {
            let id = raw
                .id
                .as_ref()
                .and_then(id_string)
                .unwrap_or_else(|| synthesize_id(position, &server_ids));
            if !seen.insert(id.clone()) {
                debug!(position, %id, "skipping notice with repeated id");
                continue;
            }
            raw.id = Some(Value::String(id));
            notices.push(Notice::from_raw(raw, position));
        }
        notices
    }
}

// `notice-<position>`, suffixed until it is not a server id
fn synthesize_id(position: usize, taken: &HashSet<String>) -> String {
    let mut id = format!("notice-{position}");
    let mut suffix = 1;
    while taken.contains(&id) {
        id = format!("notice-{position}-{suffix}");
        suffix += 1;
    }
    id
}

fn file_from_value(value: &Value) -> Option<NoticeFile> {
    let obj = value.as_object()?;
    let text = |key: &str| {
        obj.get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(ToString::to_string)
    };
    Some(NoticeFile {
        url: text("url"),
        original_name: text("originalName"),
        kind: text("fileType").as_deref().and_then(FileKind::parse),
        mime_type: text("mimetype"),
    })
}

fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

// Accept strings, and tolerate anything else as "missing"
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        _ => None,
    })
}

fn lenient_bool<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Bool(b) => Some(b),
        Value::String(s) => Some(s.eq_ignore_ascii_case("true")),
        _ => None,
    })
}
