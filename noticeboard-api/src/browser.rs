//! Category-filtered notice browsing with wraparound master/detail navigation
//!
//! [`NoticeBrowser`] holds the last loaded notices, the active [`Category`] filter,
//! and the index of the open notice (if any) within the *filtered* list.
//!
//! The browser is in one of two states:
//!
//! - **Listing**: no notice open
//! - **Viewing**: `index` refers to a valid position in the filtered list
//!
//! `open` moves Listing to Viewing, `close` moves back, and `previous` / `next`
//! step through the filtered list with wraparound at both ends. `load` and
//! `set_category` always return to Listing, because the filtered list may have
//! changed shape and an old index could point at a different notice.
//!
//! ```rust
//! use noticeboard::prelude::*;
//!
//! let mut browser = NoticeBrowser::new();
//! browser.load(vec![
//!     Notice::new("1", "Exam schedule", Some("Academic")),
//!     Notice::new("2", "Spring fair", Some("Events")),
//!     Notice::new("3", "Library hours", Some("Academic")),
//! ]);
//! browser.set_category(Category::label("Academic"));
//! browser.open(1).unwrap();
//! browser.next().unwrap();
//! assert_eq!(browser.selection().unwrap().notice.id, "1");
//! ```

use std::fmt;

use serde::{Serialize, Serializer};
use snafu::prelude::*;
use tracing::debug;

use crate::{
    error::{BrowseError, InvalidIndexSnafu, NotOpenSnafu},
    notices::Notice,
};

/// Category filter: every notice, or notices with one label.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Category {
    #[default]
    All,
    Label(String),
}

impl Category {
    /// Label used for the "no filter" choice
    pub const ALL_LABEL: &'static str = "All";

    pub fn label(label: impl Into<String>) -> Self {
        Self::Label(label.into())
    }

    /// Parses user input: "All" (any case) is the sentinel, anything else is a label.
    pub fn parse(input: &str) -> Self {
        if input.eq_ignore_ascii_case(Self::ALL_LABEL) {
            Self::All
        } else {
            Self::Label(input.to_string())
        }
    }

    pub fn matches(&self, notice: &Notice) -> bool {
        match self {
            Self::All => true,
            Self::Label(label) => notice.category.as_deref() == Some(label.as_str()),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str(Self::ALL_LABEL),
            Self::Label(label) => f.write_str(label),
        }
    }
}

impl Serialize for Category {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Listing or Viewing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewState {
    Listing,
    Viewing { index: usize },
}

/// The open notice, with its 1-based position in the filtered list.
#[derive(Debug, Clone, Copy)]
pub struct Selection<'a> {
    pub notice: &'a Notice,
    pub index: usize,
    /// 1-based, for "position / total" display
    pub position: usize,
    pub total: usize,
}

/// Owns the browsing state. All transitions are synchronous.
#[derive(Debug, Clone, Default)]
pub struct NoticeBrowser {
    notices: Vec<Notice>,
    categories: Vec<String>,
    selected_category: Category,
    selected: Option<usize>,
    load_error: Option<String>,
}

impl NoticeBrowser {
    /// Creates an empty browser in the Listing state with the "All" filter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces all notices.
    ///
    /// The category filter is kept if its label is still present, and otherwise
    /// falls back to `All`. Any open notice is closed.
    pub fn load(&mut self, notices: Vec<Notice>) {
        self.notices = notices;
        self.categories = distinct_categories(&self.notices);
        if let Category::Label(label) = &self.selected_category
            && !self.categories.contains(label)
        {
            debug!(%label, "category no longer present, showing all");
            self.selected_category = Category::All;
        }
        self.selected = None;
        debug!(
            notices = self.notices.len(),
            categories = self.categories.len(),
            "loaded"
        );
    }

    /// Applies the outcome of a fetch.
    ///
    /// On success, this is `load` and clears any previous load error. On
    /// failure the message is kept for display and nothing else changes.
    pub fn apply<E: fmt::Display>(&mut self, result: Result<Vec<Notice>, E>) {
        match result {
            Ok(notices) => {
                self.load(notices);
                self.load_error = None;
            }
            Err(err) => {
                debug!("load failed, keeping previous notices: {err}");
                self.load_error = Some(err.to_string());
            }
        }
    }

    /// Selects a category filter. Unknown labels leave the filter unchanged.
    /// The open notice is closed either way.
    pub fn set_category(&mut self, category: Category) {
        let known = match &category {
            Category::All => true,
            Category::Label(label) => self.categories.contains(label),
        };
        if known {
            self.selected_category = category;
        } else {
            debug!(%category, "ignoring unknown category");
        }
        self.selected = None;
    }

    /// Opens the notice at `index` in the filtered list.
    pub fn open(&mut self, index: usize) -> Result<(), BrowseError> {
        let len = self.filtered_len();
        ensure!(index < len, InvalidIndexSnafu { index, len });
        self.selected = Some(index);
        Ok(())
    }

    /// Closes the open notice, if any.
    pub fn close(&mut self) {
        self.selected = None;
    }

    /// Steps to the previous notice, wrapping from the first to the last.
    pub fn previous(&mut self) -> Result<(), BrowseError> {
        let index = self.selected.context(NotOpenSnafu)?;
        self.selected = Some(wrap_prev(index, self.filtered_len()));
        Ok(())
    }

    /// Steps to the next notice, wrapping from the last to the first.
    pub fn next(&mut self) -> Result<(), BrowseError> {
        let index = self.selected.context(NotOpenSnafu)?;
        self.selected = Some(wrap_next(index, self.filtered_len()));
        Ok(())
    }

    /// All loaded notices, in server order
    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    /// Distinct categories in order of first appearance
    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    pub fn selected_category(&self) -> &Category {
        &self.selected_category
    }

    /// Notices matching the category filter, in server order
    pub fn filtered(&self) -> impl Iterator<Item = &Notice> {
        self.notices
            .iter()
            .filter(|notice| self.selected_category.matches(notice))
    }

    pub fn filtered_len(&self) -> usize {
        self.filtered().count()
    }

    pub fn state(&self) -> ViewState {
        match self.selected {
            Some(index) => ViewState::Viewing { index },
            None => ViewState::Listing,
        }
    }

    pub fn is_viewing(&self) -> bool {
        self.selected.is_some()
    }

    /// The open notice, or None when Listing
    pub fn selection(&self) -> Option<Selection<'_>> {
        let index = self.selected?;
        let total = self.filtered_len();
        self.filtered().nth(index).map(|notice| Selection {
            notice,
            index,
            position: index + 1,
            total,
        })
    }

    /// Message from the most recent failed load, cleared by the next successful one
    pub fn load_error(&self) -> Option<&str> {
        self.load_error.as_deref()
    }
}

/// Index before `index` in a list of `len`, wrapping to the end.
pub fn wrap_prev(index: usize, len: usize) -> usize {
    if len == 0 {
        0
    } else if index == 0 {
        len - 1
    } else {
        (index - 1).min(len - 1)
    }
}

/// Index after `index` in a list of `len`, wrapping to the start.
pub fn wrap_next(index: usize, len: usize) -> usize {
    if index >= len.saturating_sub(1) { 0 } else { index + 1 }
}

fn distinct_categories(notices: &[Notice]) -> Vec<String> {
    let mut categories: Vec<String> = Vec::new();
    for label in notices.iter().filter_map(|n| n.category.as_deref()) {
        if !categories.iter().any(|c| c == label) {
            categories.push(label.to_string());
        }
    }
    categories
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notice(id: &str, category: &str) -> Notice {
        Notice::new(id, format!("notice {id}"), Some(category))
    }

    fn sample() -> Vec<Notice> {
        vec![
            notice("1", "Academic"),
            notice("2", "Events"),
            notice("3", "Academic"),
        ]
    }

    fn ids(browser: &NoticeBrowser) -> Vec<&str> {
        browser.filtered().map(|n| n.id.as_str()).collect()
    }

    fn selected_id(browser: &NoticeBrowser) -> Option<&str> {
        browser.selection().map(|s| s.notice.id.as_str())
    }

    #[test]
    fn test_new_browser_is_listing_all() {
        let browser = NoticeBrowser::new();
        assert_eq!(browser.state(), ViewState::Listing);
        assert_eq!(browser.selected_category(), &Category::All);
        assert!(browser.categories().is_empty());
        assert_eq!(browser.filtered_len(), 0);
    }

    #[test]
    fn test_categories_first_appearance_order() {
        let mut browser = NoticeBrowser::new();
        browser.load(vec![
            notice("1", "Events"),
            Notice::new("2", "none", None),
            notice("3", "Academic"),
            notice("4", "Events"),
            notice("5", "events"),
        ]);
        assert_eq!(browser.categories(), ["Events", "Academic", "events"]);
    }

    #[test]
    fn test_empty_load() {
        let mut browser = NoticeBrowser::new();
        browser.load(Vec::new());
        assert!(browser.categories().is_empty());
        assert_eq!(
            browser.open(0),
            Err(BrowseError::InvalidIndex { index: 0, len: 0 })
        );
        assert_eq!(browser.next(), Err(BrowseError::NotOpen));
    }

    #[test]
    fn test_walkthrough() {
        let mut browser = NoticeBrowser::new();
        browser.load(sample());
        browser.set_category(Category::label("Academic"));
        assert_eq!(ids(&browser), ["1", "3"]);

        browser.open(1).unwrap();
        assert_eq!(selected_id(&browser), Some("3"));
        browser.next().unwrap();
        assert_eq!(browser.state(), ViewState::Viewing { index: 0 });
        assert_eq!(selected_id(&browser), Some("1"));
        browser.previous().unwrap();
        assert_eq!(browser.state(), ViewState::Viewing { index: 1 });
        assert_eq!(selected_id(&browser), Some("3"));
    }

    #[test]
    fn test_filter_preserves_order() {
        let mut browser = NoticeBrowser::new();
        browser.load(sample());
        browser.set_category(Category::label("Events"));
        assert_eq!(ids(&browser), ["2"]);
        browser.set_category(Category::All);
        assert_eq!(ids(&browser), ["1", "2", "3"]);
    }

    #[test]
    fn test_unknown_category_keeps_filter_but_closes() {
        let mut browser = NoticeBrowser::new();
        browser.load(sample());
        browser.set_category(Category::label("Events"));
        browser.open(0).unwrap();

        browser.set_category(Category::label("Sports"));
        assert_eq!(browser.selected_category(), &Category::label("Events"));
        assert_eq!(browser.state(), ViewState::Listing);
    }

    #[test]
    fn test_same_category_still_closes() {
        let mut browser = NoticeBrowser::new();
        browser.load(sample());
        browser.open(2).unwrap();
        browser.set_category(Category::All);
        assert!(!browser.is_viewing());
    }

    #[test]
    fn test_open_out_of_range_is_rejected() {
        let mut browser = NoticeBrowser::new();
        browser.load(sample());
        browser.set_category(Category::label("Academic"));
        browser.open(1).unwrap();

        assert_eq!(
            browser.open(2),
            Err(BrowseError::InvalidIndex { index: 2, len: 2 })
        );
        assert_eq!(browser.state(), ViewState::Viewing { index: 1 });

        browser.close();
        assert!(browser.open(usize::MAX).is_err());
        assert_eq!(browser.state(), ViewState::Listing);
    }

    #[test]
    fn test_navigation_requires_open() {
        let mut browser = NoticeBrowser::new();
        browser.load(sample());
        assert_eq!(browser.previous(), Err(BrowseError::NotOpen));
        assert_eq!(browser.next(), Err(BrowseError::NotOpen));
        assert_eq!(browser.state(), ViewState::Listing);
    }

    #[test]
    fn test_close_is_idempotent() {
        let mut browser = NoticeBrowser::new();
        browser.load(sample());
        browser.open(0).unwrap();
        browser.close();
        browser.close();
        assert_eq!(browser.state(), ViewState::Listing);
    }

    #[test]
    fn test_next_cycles_back_to_start() {
        let mut browser = NoticeBrowser::new();
        let many: Vec<Notice> = (0..7).map(|i| notice(&i.to_string(), "A")).collect();
        browser.load(many);
        for start in 0..7 {
            browser.open(start).unwrap();
            for _ in 0..7 {
                browser.next().unwrap();
            }
            assert_eq!(browser.state(), ViewState::Viewing { index: start });
        }
    }

    #[test]
    fn test_wrap_at_both_ends() {
        let mut browser = NoticeBrowser::new();
        browser.load(sample());
        browser.open(0).unwrap();
        browser.previous().unwrap();
        assert_eq!(browser.state(), ViewState::Viewing { index: 2 });
        browser.next().unwrap();
        assert_eq!(browser.state(), ViewState::Viewing { index: 0 });
    }

    #[test]
    fn test_single_notice_wraps_to_itself() {
        let mut browser = NoticeBrowser::new();
        browser.load(vec![notice("only", "A")]);
        browser.open(0).unwrap();
        browser.next().unwrap();
        browser.previous().unwrap();
        assert_eq!(selected_id(&browser), Some("only"));
    }

    #[test]
    fn test_reload_keeps_present_category() {
        let mut browser = NoticeBrowser::new();
        browser.load(sample());
        browser.set_category(Category::label("Events"));
        browser.open(0).unwrap();

        browser.load(vec![notice("9", "Events"), notice("10", "Sports")]);
        assert_eq!(browser.selected_category(), &Category::label("Events"));
        assert_eq!(browser.state(), ViewState::Listing);
        assert_eq!(ids(&browser), ["9"]);
    }

    #[test]
    fn test_reload_drops_stale_category() {
        let mut browser = NoticeBrowser::new();
        browser.load(sample());
        browser.set_category(Category::label("Events"));

        browser.load(vec![notice("9", "Academic")]);
        assert_eq!(browser.selected_category(), &Category::All);
        assert_eq!(ids(&browser), ["9"]);
    }

    #[test]
    fn test_failed_apply_changes_nothing() {
        let mut browser = NoticeBrowser::new();
        browser.load(sample());
        browser.set_category(Category::label("Academic"));
        browser.open(1).unwrap();

        browser.apply(Err::<Vec<Notice>, _>("Failed to fetch notices"));
        assert_eq!(browser.load_error(), Some("Failed to fetch notices"));
        assert_eq!(browser.notices(), sample().as_slice());
        assert_eq!(browser.selected_category(), &Category::label("Academic"));
        assert_eq!(browser.state(), ViewState::Viewing { index: 1 });

        browser.apply(Ok::<_, String>(sample()));
        assert_eq!(browser.load_error(), None);
        assert_eq!(browser.state(), ViewState::Listing);
    }

    #[test]
    fn test_selection_position() {
        let mut browser = NoticeBrowser::new();
        browser.load(sample());
        assert!(browser.selection().is_none());
        browser.open(2).unwrap();
        let sel = browser.selection().unwrap();
        assert_eq!((sel.position, sel.total), (3, 3));
        assert_eq!(sel.notice.id, "3");
    }

    #[test]
    fn test_category_parse_and_display() {
        assert_eq!(Category::parse("all"), Category::All);
        assert_eq!(Category::parse("Events"), Category::label("Events"));
        assert_eq!(Category::All.to_string(), "All");
        assert_eq!(Category::label("Events").to_string(), "Events");
    }

    #[test]
    fn test_wrap_helpers() {
        assert_eq!(wrap_prev(0, 4), 3);
        assert_eq!(wrap_prev(2, 4), 1);
        assert_eq!(wrap_next(3, 4), 0);
        assert_eq!(wrap_next(1, 4), 2);
        assert_eq!(wrap_next(0, 0), 0);
        assert_eq!(wrap_prev(0, 0), 0);
    }

    #[test]
    fn test_wrap_helpers_total_at_extremes() {
        assert_eq!(wrap_next(usize::MAX, 4), 0);
        assert_eq!(wrap_next(usize::MAX, usize::MAX), 0);
        assert_eq!(wrap_next(usize::MAX - 1, usize::MAX), 0);
        assert_eq!(wrap_prev(usize::MAX, 4), 3);
    }
}
