use noticeboard::prelude::*;
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, Wrap},
};

use super::app::App;
use crate::text::html_to_text;

const HELP_TEXT: &[(&str, &str)] = &[
    ("j / Down", "Move down (scroll when reading)"),
    ("k / Up", "Move up (scroll when reading)"),
    ("Enter", "Open notice"),
    ("Esc / b", "Back to list"),
    ("h / Left", "Previous notice"),
    ("l / Right", "Next notice"),
    ("[ / ]", "Previous / next image"),
    ("Tab / BackTab", "Next / previous category"),
    ("a", "All categories"),
    ("r", "Reload"),
    ("?", "Toggle help"),
    ("q", "Quit"),
];

const LIST_HINT: &str = " j/k:move  Enter:open  Tab:category  a:all  r:reload  ?:help  q:quit";
const DETAIL_HINT: &str = " h/l:prev/next  [/]:image  j/k:scroll  Esc:back  r:reload  ?:help  q:quit";

pub fn draw<S: NoticeSource>(frame: &mut Frame, app: &mut App<S>) {
    let outer = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(5),
            Constraint::Length(1),
        ])
        .split(frame.area());

    draw_category_bar(frame, app, outer[0]);
    if app.browser.is_viewing() {
        draw_detail(frame, app, outer[1]);
    } else {
        draw_list(frame, app, outer[1]);
    }
    draw_footer(frame, app, outer[2]);

    if app.show_help {
        draw_help_overlay(frame, frame.area());
    }
}

fn draw_category_bar<S: NoticeSource>(frame: &mut Frame, app: &App<S>, area: Rect) {
    let bar_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let selected = app.browser.selected_category();
    let mut spans = vec![Span::styled(
        " Notices ",
        bar_style.add_modifier(Modifier::BOLD),
    )];
    for choice in app.category_choices() {
        let style = if &choice == selected {
            Style::default()
                .bg(Color::Cyan)
                .fg(Color::Black)
                .add_modifier(Modifier::BOLD)
        } else {
            bar_style
        };
        spans.push(Span::styled(" ", bar_style));
        spans.push(Span::styled(format!(" {choice} "), style));
    }
    if app.is_loading() {
        spans.push(Span::styled("  loading...", bar_style.fg(Color::Yellow)));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)).style(bar_style), area);
}

fn draw_list<S: NoticeSource>(frame: &mut Frame, app: &mut App<S>, area: Rect) {
    let total = app.browser.notices().len();
    let shown = app.browser.filtered_len();
    let title = if shown == total {
        format!(" Notices ({total}) ")
    } else {
        format!(
            " {} ({shown}/{total}) ",
            app.browser.selected_category()
        )
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .title(title)
        .border_style(Style::default().fg(Color::Cyan));

    if shown == 0 {
        let message = app
            .browser
            .load_error()
            .map_or_else(|| "No notices".to_string(), |err| format!("Could not load notices: {err}"));
        frame.render_widget(
            Paragraph::new(message)
                .style(Style::default().fg(Color::DarkGray))
                .block(block),
            area,
        );
        return;
    }

    let header = Row::new([
        Cell::from("Date"),
        Cell::from("Category"),
        Cell::from(""),
        Cell::from("Title"),
    ])
    .style(
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD),
    )
    .height(1);

    let rows: Vec<Row> = app
        .browser
        .filtered()
        .map(|notice| {
            let flag = if notice.important {
                Cell::from("!").style(Style::default().fg(Color::Red).add_modifier(Modifier::BOLD))
            } else {
                Cell::from("")
            };
            Row::new([
                Cell::from(app.format_date(notice)),
                Cell::from(notice.category_label().to_string()),
                flag,
                Cell::from(notice.title.clone()),
            ])
        })
        .collect();

    let widths = [
        Constraint::Length(14),
        Constraint::Length(16),
        Constraint::Length(1),
        Constraint::Min(20),
    ];

    let table = Table::new(rows, widths)
        .header(header)
        .block(block)
        .row_highlight_style(
            Style::default()
                .bg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");
    frame.render_stateful_widget(table, area, &mut app.list_state);
}

fn draw_detail<S: NoticeSource>(frame: &mut Frame, app: &App<S>, area: Rect) {
    let Some(selection) = app.browser.selection() else {
        return;
    };
    let notice = selection.notice;
    let media_height = if app.media.is_empty() {
        0
    } else {
        // border plus the carousel line plus one line per attachment
        u16::try_from(app.media.attachments.len() + 3)
            .unwrap_or(u16::MAX)
            .min(area.height / 2)
    };
    let parts = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(media_height)])
        .split(area);

    let mut lines = vec![
        Line::from(Span::styled(
            notice.title.clone(),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        meta_line(app, notice),
        Line::default(),
    ];
    lines.extend(
        html_to_text(&notice.content)
            .lines()
            .map(|line| Line::from(line.to_string())),
    );

    let title = format!(" {} / {} ", selection.position, selection.total);
    let body = Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(title)
                .border_style(Style::default().fg(Color::Cyan)),
        )
        .wrap(Wrap { trim: false })
        .scroll((app.detail_scroll, 0));
    frame.render_widget(body, parts[0]);

    if media_height > 0 {
        draw_media(frame, app, parts[1]);
    }
}

fn meta_line<'a, S: NoticeSource>(app: &App<S>, notice: &'a Notice) -> Line<'a> {
    let mut spans = Vec::new();
    if let Some(category) = notice.category.as_deref() {
        spans.push(Span::styled(category, Style::default().fg(Color::Cyan)));
    }
    let date = app.format_date(notice);
    if !date.is_empty() {
        if !spans.is_empty() {
            spans.push(Span::raw("  "));
        }
        spans.push(Span::styled(date, Style::default().fg(Color::DarkGray)));
    }
    if notice.important {
        spans.push(Span::styled(
            "  IMPORTANT",
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        ));
    }
    Line::from(spans)
}

fn draw_media<S: NoticeSource>(frame: &mut Frame, app: &App<S>, area: Rect) {
    let mut lines = Vec::new();
    if let (Some((position, total)), Some(image)) = (
        app.carousel.position(),
        app.carousel.current(&app.media.images),
    ) {
        let name = image.name.as_deref().map(|n| format!("{n}  ")).unwrap_or_default();
        lines.push(Line::from(vec![
            Span::styled(
                format!("Image {position}/{total}  "),
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            ),
            Span::raw(name),
            Span::styled(image.url.clone(), Style::default().fg(Color::Blue)),
        ]));
    }
    for attachment in &app.media.attachments {
        let url = attachment.url.clone().unwrap_or_else(|| "(no link)".to_string());
        lines.push(Line::from(vec![
            Span::styled(
                format!("{}  ", attachment.name),
                Style::default().add_modifier(Modifier::BOLD),
            ),
            Span::styled(url, Style::default().fg(Color::Blue)),
        ]));
    }
    let media = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Images & Attachments ")
            .border_style(Style::default().fg(Color::DarkGray)),
    );
    frame.render_widget(media, area);
}

fn draw_footer<S: NoticeSource>(frame: &mut Frame, app: &App<S>, area: Rect) {
    let hint = if app.browser.is_viewing() {
        DETAIL_HINT
    } else {
        LIST_HINT
    };
    let text = app
        .status_message
        .as_ref()
        .map_or_else(|| hint.to_string(), |status| format!(" {status}"));
    frame.render_widget(
        Paragraph::new(text).style(Style::default().fg(Color::DarkGray)),
        area,
    );
}

#[allow(clippy::cast_possible_truncation)]
fn draw_help_overlay(frame: &mut Frame, area: Rect) {
    let width = 52.min(area.width.saturating_sub(4));
    let height = (HELP_TEXT.len() as u16 + 2).min(area.height.saturating_sub(2));
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    let popup_area = Rect::new(x, y, width, height);

    frame.render_widget(Clear, popup_area);

    let lines: Vec<Line> = HELP_TEXT
        .iter()
        .map(|(key, desc)| {
            Line::from(vec![
                Span::styled(
                    format!("  {key:<16}"),
                    Style::default()
                        .fg(Color::Cyan)
                        .add_modifier(Modifier::BOLD),
                ),
                Span::raw(*desc),
            ])
        })
        .collect();

    let help = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Keybindings ")
            .border_style(Style::default().fg(Color::Cyan)),
    );
    frame.render_widget(help, popup_area);
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::browse::keys::KeyAction;
    use noticeboard::notices::NoticeFile;
    use ratatui::{Terminal, backend::TestBackend};

    struct NoSource;

    impl NoticeSource for NoSource {
        async fn fetch_notices(&self) -> noticeboard::Result<Vec<Notice>> {
            Ok(Vec::new())
        }
    }

    fn fixture_app() -> App<NoSource> {
        let mut exam = Notice::new("1", "Exam schedule", Some("Academic"));
        exam.content = "<p>Exams run from <b>March 10</b>.</p>".into();
        exam.important = true;
        exam.files = vec![
            NoticeFile {
                url: Some("https://cdn/poster.png".into()),
                ..NoticeFile::default()
            },
            NoticeFile {
                url: Some("https://cdn/seating.pdf".into()),
                original_name: Some("seating.pdf".into()),
                ..NoticeFile::default()
            },
        ];
        let mut browser = NoticeBrowser::new();
        browser.load(vec![exam, Notice::new("2", "Spring fair", Some("Events"))]);
        App::new(browser, Arc::new(NoSource), Notice::DATE_FORMAT)
    }

    fn screen(app: &mut App<NoSource>) -> String {
        let mut terminal = Terminal::new(TestBackend::new(100, 24)).expect("terminal");
        terminal.draw(|frame| draw(frame, app)).expect("draw");
        let buf = terminal.backend().buffer();
        let area = buf.area();
        (0..area.height)
            .map(|y| {
                (0..area.width)
                    .map(|x| buf[(x, y)].symbol())
                    .collect::<String>()
                    .trim_end()
                    .to_string()
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn list_shows_categories_and_titles() {
        let mut app = fixture_app();
        let screen = screen(&mut app);
        assert!(screen.contains(" All "));
        assert!(screen.contains(" Academic "));
        assert!(screen.contains(" Events "));
        assert!(screen.contains("Notices (2)"));
        assert!(screen.contains("Exam schedule"));
        assert!(screen.contains("Spring fair"));
        assert!(screen.contains("Enter:open"));
    }

    #[test]
    fn detail_shows_text_and_media() {
        let mut app = fixture_app();
        app.handle_action(KeyAction::Open);
        let screen = screen(&mut app);
        assert!(screen.contains("1 / 2"));
        assert!(screen.contains("Exams run from March 10."));
        assert!(!screen.contains("<b>"));
        assert!(screen.contains("IMPORTANT"));
        assert!(screen.contains("Image 1/1"));
        assert!(screen.contains("https://cdn/poster.png"));
        assert!(screen.contains("seating.pdf"));
    }

    #[test]
    fn filtered_title_and_help_overlay() {
        let mut app = fixture_app();
        app.handle_action(KeyAction::NextCategory);
        app.handle_action(KeyAction::ToggleHelp);
        let screen = screen(&mut app);
        assert!(screen.contains("Academic (1/2)"));
        assert!(screen.contains("Keybindings"));
        assert!(screen.contains("Previous / next image"));
    }
}
