use std::{io, sync::Arc, time::Duration};

use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use noticeboard::{
    browser::{wrap_next, wrap_prev},
    prelude::*,
};
use ratatui::{Terminal, backend::CrosstermBackend, widgets::TableState};
use tracing::debug;

use super::keys::{KeyAction, map_key};
use super::ui;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

pub struct App<S: NoticeSource> {
    pub browser: NoticeBrowser,
    reloader: Reloader<S>,
    /// list cursor, an index into the filtered list
    pub list_state: TableState,
    /// images and attachments of the open notice
    pub media: Media,
    pub carousel: Carousel,
    pub detail_scroll: u16,
    pub show_help: bool,
    pub should_quit: bool,
    pub status_message: Option<String>,
    pub date_format: String,
}

impl<S: NoticeSource> App<S> {
    pub fn new(browser: NoticeBrowser, source: Arc<S>, date_format: impl Into<String>) -> Self {
        let mut app = Self {
            browser,
            reloader: Reloader::new(source),
            list_state: TableState::default(),
            media: Media::default(),
            carousel: Carousel::default(),
            detail_scroll: 0,
            show_help: false,
            should_quit: false,
            status_message: None,
            date_format: date_format.into(),
        };
        app.sync_list_cursor();
        app
    }

    /// Takes over the terminal until the user quits.
    pub fn run(&mut self) -> Result<()> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;

        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        let original_hook = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            let _ = disable_raw_mode();
            let _ = execute!(io::stdout(), LeaveAlternateScreen);
            original_hook(info);
        }));

        let result = self.event_loop(&mut terminal);

        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;

        result
    }

    fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
        loop {
            self.poll_reload();
            terminal.draw(|frame| ui::draw(frame, self))?;

            if event::poll(POLL_INTERVAL)?
                && let Event::Key(key) = event::read()?
                && key.kind == KeyEventKind::Press
            {
                self.handle_action(map_key(key));
            }

            if self.should_quit {
                return Ok(());
            }
        }
    }

    pub fn is_loading(&self) -> bool {
        self.reloader.is_loading()
    }

    /// Starts a background reload. A reload already in flight is abandoned.
    pub fn reload(&mut self) {
        self.reloader.request();
        self.status_message = Some("Loading notices...".to_string());
    }

    /// Applies a finished reload, if one has arrived.
    pub fn poll_reload(&mut self) {
        if let Some(outcome) = self.reloader.try_next() {
            self.apply_outcome(outcome);
        }
    }

    fn apply_outcome(&mut self, outcome: noticeboard::Result<Vec<Notice>>) {
        let loaded = outcome.is_ok();
        self.browser.apply(outcome);
        if let Some(message) = self.browser.load_error() {
            self.status_message = Some(format!("Reload failed: {message}"));
        } else {
            self.status_message = Some(format!("Loaded {} notices", self.browser.notices().len()));
        }
        if loaded {
            self.sync_list_cursor();
            self.refresh_media();
        }
    }

    pub(crate) fn handle_action(&mut self, action: KeyAction) {
        if self.show_help {
            match action {
                KeyAction::ToggleHelp | KeyAction::Back => self.show_help = false,
                KeyAction::Quit => {
                    self.show_help = false;
                    self.should_quit = true;
                }
                _ => {}
            }
            return;
        }

        match action {
            KeyAction::Quit => self.should_quit = true,
            KeyAction::ToggleHelp => self.show_help = true,
            KeyAction::MoveDown => self.move_down(),
            KeyAction::MoveUp => self.move_up(),
            KeyAction::Open => self.open_at_cursor(),
            KeyAction::Back => self.close(),
            KeyAction::PrevNotice => self.step(false),
            KeyAction::NextNotice => self.step(true),
            KeyAction::PrevImage => self.carousel.previous(),
            KeyAction::NextImage => self.carousel.next(),
            KeyAction::NextCategory => self.cycle_category(true),
            KeyAction::PrevCategory => self.cycle_category(false),
            KeyAction::AllCategories => self.select_category(Category::All),
            KeyAction::Reload => self.reload(),
            KeyAction::Noop => {}
        }
    }

    fn move_down(&mut self) {
        if self.browser.is_viewing() {
            self.detail_scroll = self.detail_scroll.saturating_add(1);
            return;
        }
        let len = self.browser.filtered_len();
        if let Some(cursor) = self.list_state.selected() {
            self.list_state.select(Some(wrap_next(cursor, len)));
        }
    }

    fn move_up(&mut self) {
        if self.browser.is_viewing() {
            self.detail_scroll = self.detail_scroll.saturating_sub(1);
            return;
        }
        let len = self.browser.filtered_len();
        if let Some(cursor) = self.list_state.selected() {
            self.list_state.select(Some(wrap_prev(cursor, len)));
        }
    }

    fn open_at_cursor(&mut self) {
        if self.browser.is_viewing() {
            return;
        }
        let Some(cursor) = self.list_state.selected() else {
            return;
        };
        match self.browser.open(cursor) {
            Ok(()) => self.refresh_media(),
            Err(err) => self.status_message = Some(err.to_string()),
        }
    }

    fn close(&mut self) {
        if self.browser.is_viewing() {
            self.browser.close();
            self.refresh_media();
        }
    }

    fn step(&mut self, forward: bool) {
        let stepped = if forward {
            self.browser.next()
        } else {
            self.browser.previous()
        };
        if stepped.is_ok() {
            self.sync_list_cursor();
            self.refresh_media();
        }
    }

    /// Categories in display order: All, then labels by first appearance
    pub fn category_choices(&self) -> Vec<Category> {
        std::iter::once(Category::All)
            .chain(self.browser.categories().iter().map(Category::label))
            .collect()
    }

    fn cycle_category(&mut self, forward: bool) {
        let choices = self.category_choices();
        let current = choices
            .iter()
            .position(|choice| choice == self.browser.selected_category())
            .unwrap_or(0);
        let next = if forward {
            wrap_next(current, choices.len())
        } else {
            wrap_prev(current, choices.len())
        };
        if let Some(choice) = choices.into_iter().nth(next) {
            self.select_category(choice);
        }
    }

    fn select_category(&mut self, category: Category) {
        debug!(%category, "category selected");
        self.browser.set_category(category);
        self.list_state.select(None);
        self.sync_list_cursor();
        self.refresh_media();
    }

    // keeps the list cursor on the open notice, or inside the filtered list
    fn sync_list_cursor(&mut self) {
        let len = self.browser.filtered_len();
        let cursor = match self.browser.state() {
            ViewState::Viewing { index } => Some(index),
            ViewState::Listing if len == 0 => None,
            ViewState::Listing => Some(self.list_state.selected().unwrap_or(0).min(len - 1)),
        };
        self.list_state.select(cursor);
    }

    // the carousel restarts whenever the open notice changes
    fn refresh_media(&mut self) {
        self.media = self
            .browser
            .selection()
            .map(|selection| classify(selection.notice))
            .unwrap_or_default();
        self.carousel = Carousel::new(self.media.images.len());
        self.detail_scroll = 0;
    }

    /// Formats a notice date with the configured format; "" when missing.
    pub fn format_date(&self, notice: &Notice) -> String {
        crate::text::format_date(notice, &self.date_format)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use noticeboard::notices::NoticeFile;

    /// Serves a fixed list, or fails when `fail` is set
    struct FixedSource {
        notices: Vec<Notice>,
        fail: bool,
    }

    impl NoticeSource for FixedSource {
        async fn fetch_notices(&self) -> noticeboard::Result<Vec<Notice>> {
            if self.fail {
                Err(NoticeError::LoadFailed {
                    message: "Failed to fetch notices".into(),
                })
            } else {
                Ok(self.notices.clone())
            }
        }
    }

    fn image(url: &str) -> NoticeFile {
        NoticeFile {
            url: Some(url.to_string()),
            ..NoticeFile::default()
        }
    }

    fn fixture_notices() -> Vec<Notice> {
        let mut exam = Notice::new("1", "Exam schedule", Some("Academic"));
        exam.files = vec![image("https://cdn/a.png"), image("https://cdn/b.png")];
        vec![
            exam,
            Notice::new("2", "Spring fair", Some("Events")),
            Notice::new("3", "Library hours", Some("Academic")),
        ]
    }

    fn fixture_app(fail: bool) -> App<FixedSource> {
        let mut browser = NoticeBrowser::new();
        browser.load(fixture_notices());
        let source = FixedSource {
            notices: fixture_notices(),
            fail,
        };
        App::new(browser, Arc::new(source), Notice::DATE_FORMAT)
    }

    fn open_id(app: &App<FixedSource>) -> Option<String> {
        app.browser.selection().map(|sel| sel.notice.id.clone())
    }

    async fn finish_reload(app: &mut App<FixedSource>) {
        while app.is_loading() {
            tokio::time::sleep(Duration::from_millis(5)).await;
            app.poll_reload();
        }
    }

    #[test]
    fn cursor_wraps_in_list() {
        let mut app = fixture_app(false);
        assert_eq!(app.list_state.selected(), Some(0));
        app.handle_action(KeyAction::MoveUp);
        assert_eq!(app.list_state.selected(), Some(2));
        app.handle_action(KeyAction::MoveDown);
        assert_eq!(app.list_state.selected(), Some(0));
    }

    #[test]
    fn open_step_and_close() {
        let mut app = fixture_app(false);
        app.handle_action(KeyAction::Open);
        assert_eq!(open_id(&app).as_deref(), Some("1"));
        assert_eq!(app.carousel.position(), Some((1, 2)));

        app.handle_action(KeyAction::PrevNotice);
        assert_eq!(open_id(&app).as_deref(), Some("3"));
        assert_eq!(app.list_state.selected(), Some(2));
        assert!(app.carousel.is_empty());

        app.handle_action(KeyAction::NextNotice);
        assert_eq!(open_id(&app).as_deref(), Some("1"));

        app.handle_action(KeyAction::Back);
        assert!(!app.browser.is_viewing());
        assert_eq!(app.list_state.selected(), Some(0));
        assert!(app.media.is_empty());
    }

    #[test]
    fn image_keys_wrap() {
        let mut app = fixture_app(false);
        app.handle_action(KeyAction::Open);
        app.handle_action(KeyAction::PrevImage);
        assert_eq!(app.carousel.position(), Some((2, 2)));
        app.handle_action(KeyAction::NextImage);
        assert_eq!(app.carousel.position(), Some((1, 2)));
    }

    #[test]
    fn category_cycle_filters_and_closes() {
        let mut app = fixture_app(false);
        app.handle_action(KeyAction::Open);

        app.handle_action(KeyAction::NextCategory);
        assert_eq!(*app.browser.selected_category(), Category::label("Academic"));
        assert!(!app.browser.is_viewing());
        assert_eq!(app.browser.filtered_len(), 2);

        app.handle_action(KeyAction::NextCategory);
        assert_eq!(*app.browser.selected_category(), Category::label("Events"));
        app.handle_action(KeyAction::NextCategory);
        assert_eq!(*app.browser.selected_category(), Category::All);
        app.handle_action(KeyAction::PrevCategory);
        assert_eq!(*app.browser.selected_category(), Category::label("Events"));

        app.handle_action(KeyAction::AllCategories);
        assert_eq!(*app.browser.selected_category(), Category::All);
        assert_eq!(app.list_state.selected(), Some(0));
    }

    #[test]
    fn help_swallows_keys() {
        let mut app = fixture_app(false);
        app.handle_action(KeyAction::ToggleHelp);
        app.handle_action(KeyAction::Open);
        assert!(!app.browser.is_viewing());
        app.handle_action(KeyAction::Back);
        assert!(!app.show_help);
        app.handle_action(KeyAction::ToggleHelp);
        app.handle_action(KeyAction::Quit);
        assert!(app.should_quit);
    }

    #[test]
    fn empty_list_has_no_cursor() {
        let source = FixedSource {
            notices: Vec::new(),
            fail: false,
        };
        let mut app = App::new(NoticeBrowser::new(), Arc::new(source), "%Y");
        assert_eq!(app.list_state.selected(), None);
        app.handle_action(KeyAction::MoveDown);
        app.handle_action(KeyAction::Open);
        assert!(!app.browser.is_viewing());
    }

    #[tokio::test]
    async fn reload_returns_to_listing() {
        let mut app = fixture_app(false);
        app.handle_action(KeyAction::MoveDown);
        app.handle_action(KeyAction::Open);
        app.handle_action(KeyAction::Reload);
        assert!(app.is_loading());
        finish_reload(&mut app).await;

        assert!(!app.browser.is_viewing());
        assert_eq!(app.list_state.selected(), Some(1));
        assert_eq!(app.status_message.as_deref(), Some("Loaded 3 notices"));
    }

    #[tokio::test]
    async fn failed_reload_keeps_view() {
        let mut app = fixture_app(true);
        app.handle_action(KeyAction::NextCategory);
        app.handle_action(KeyAction::Open);
        app.handle_action(KeyAction::NextImage);
        app.handle_action(KeyAction::Reload);
        finish_reload(&mut app).await;

        assert_eq!(open_id(&app).as_deref(), Some("1"));
        assert_eq!(*app.browser.selected_category(), Category::label("Academic"));
        assert_eq!(app.carousel.position(), Some((2, 2)));
        assert_eq!(
            app.status_message.as_deref(),
            Some("Reload failed: Failed to fetch notices")
        );
    }
}
