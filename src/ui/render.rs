//! Render functions for the TUI.
//!
//! Rendering also measures the viewport: whether the end-of-list sentinel
//! line is on screen is recorded in `app.viewport` for the visibility trigger.

use crate::app::{App, Mode};
use crate::feed::FeedState;
use crate::filter::CATEGORIES;
use crate::util::truncate_to_width;
use chrono::Utc;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use super::{posts, status};

/// Minimum terminal dimensions required for normal operation.
pub(super) const MIN_WIDTH: u16 = 40;
pub(super) const MIN_HEIGHT: u16 = 10;

/// Columns used by the selection gutter in front of each card line.
const GUTTER: usize = 2;

/// Main render dispatch function.
pub(super) fn render(f: &mut Frame, app: &mut App) {
    let area = f.area();

    if area.width < 1 || area.height < 1 {
        return;
    }

    if area.width < MIN_WIDTH || area.height < MIN_HEIGHT {
        let msg = if area.height < 3 || area.width < 20 {
            Paragraph::new("Too small")
        } else {
            Paragraph::new(format!(
                "Terminal too small\n\nMinimum: {}x{}\nCurrent: {}x{}",
                MIN_WIDTH, MIN_HEIGHT, area.width, area.height
            ))
            .alignment(Alignment::Center)
        };
        f.render_widget(msg, area);
        app.viewport.sentinel_ratio = None;
        return;
    }

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(area);

    render_filter_bar(f, app, chunks[0]);
    render_feed(f, app, chunks[1]);
    status::render(f, app, chunks[2]);
}

/// Query line plus the numbered category chips.
fn render_filter_bar(f: &mut Frame, app: &App, area: Rect) {
    let width = area.width.saturating_sub(2) as usize;

    let input_line = match &app.mode {
        Mode::Subject { input } => Line::from(vec![
            Span::styled("Subject: ", Style::default().fg(Color::Yellow)),
            Span::raw(format!("{}_", input)),
        ]),
        mode => {
            let cursor = if matches!(mode, Mode::Search { .. }) { "_" } else { "" };
            Line::from(vec![
                Span::styled("Search: ", Style::default().fg(Color::Yellow)),
                Span::raw(format!(
                    "{}{}",
                    truncate_to_width(app.filter.query(), width.saturating_sub(10)),
                    cursor
                )),
            ])
        }
    };

    let mut chips = Vec::new();
    for (i, category) in CATEGORIES.iter().enumerate() {
        let style = if app.filter.is_selected(category.key) {
            Style::default().fg(Color::Black).bg(Color::Cyan)
        } else {
            Style::default().fg(Color::Gray)
        };
        chips.push(Span::styled(format!("{}{}", i + 1, category.icon), style));
        chips.push(Span::raw(" "));
    }

    let border_style = if matches!(app.mode, Mode::Browse) {
        Style::default()
    } else {
        Style::default().fg(Color::Cyan)
    };

    let paragraph = Paragraph::new(vec![input_line, Line::from(chips)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(border_style)
            .title(format!("Posts - {}", app.subject())),
    );
    f.render_widget(paragraph, area);
}

fn render_feed(f: &mut Frame, app: &mut App, area: Rect) {
    if app.controller().post_count() == 0 {
        let (text, style) = match app.feed_state() {
            FeedState::Error { message } => (
                format!("Error: {}\n\nPress r to retry", message),
                Style::default().fg(Color::Red),
            ),
            FeedState::EmptyConfirmed { .. } => {
                ("No posts found".to_string(), Style::default().fg(Color::DarkGray))
            }
            FeedState::Loading | FeedState::HasResults { .. } => {
                ("Loading posts...".to_string(), Style::default().fg(Color::DarkGray))
            }
        };
        let paragraph = Paragraph::new(text)
            .style(style)
            .alignment(Alignment::Center);
        let message_area = centered_rows(area, 3);
        f.render_widget(paragraph, message_area);

        // Pages came back empty but the cursor chain continues
        let controller = app.controller();
        let keeps_loading = !controller.chain().is_empty()
            && controller.has_next_page()
            && controller.error().is_none();
        let sentinel_y = message_area.y + message_area.height;
        let ratio = if keeps_loading && sentinel_y < area.y + area.height {
            let sentinel_area = Rect {
                y: sentinel_y,
                height: 1,
                ..area
            };
            f.render_widget(Paragraph::new(sentinel_line(app)), sentinel_area);
            Some(1.0)
        } else {
            None
        };
        app.viewport.sentinel_ratio = ratio;
        return;
    }

    let height = area.height as usize;
    let text_width = (area.width as usize).saturating_sub(GUTTER).max(1);
    let now = Utc::now();

    let mut lines: Vec<Line> = Vec::new();
    let mut selected_span = (0, 0);

    {
        let visible = app.visible_posts();
        if visible.is_empty() {
            let message = match app.feed_state() {
                FeedState::EmptyConfirmed { filtered: true } => "No posts match the current filter",
                _ => "",
            };
            lines.push(Line::from(Span::styled(
                message,
                Style::default().fg(Color::DarkGray),
            )));
        }

        for (i, post) in visible.iter().enumerate() {
            let start = lines.len();
            let selected = i == app.selected;
            let gutter = if selected {
                Span::styled("▌ ", Style::default().fg(Color::Cyan))
            } else {
                Span::raw("  ")
            };
            for line in posts::card_lines(post, text_width, now) {
                let mut spans = vec![gutter.clone()];
                spans.extend(line.spans);
                lines.push(Line::from(spans));
            }
            lines.push(Line::default());
            if selected {
                selected_span = (start, lines.len() - start);
            }
        }
    }

    lines.push(sentinel_line(app));
    let sentinel = lines.len() - 1;

    // Keep the selected card on screen; the last card pulls the sentinel in
    let (start, mut len) = selected_span;
    if start + len == sentinel {
        len += 1;
    }
    if start < app.scroll_offset {
        app.scroll_offset = start;
    } else if start + len > app.scroll_offset + height {
        app.scroll_offset = (start + len).saturating_sub(height).min(start);
    }
    app.scroll_offset = app.scroll_offset.min(lines.len().saturating_sub(1));

    let in_view = sentinel >= app.scroll_offset && sentinel < app.scroll_offset + height;
    app.viewport.sentinel_ratio = Some(if in_view { 1.0 } else { 0.0 });

    let window: Vec<Line> = lines.into_iter().skip(app.scroll_offset).take(height).collect();
    f.render_widget(Paragraph::new(window), area);
}

/// The line after the last post that drives infinite scroll.
fn sentinel_line(app: &App) -> Line<'static> {
    let controller = app.controller();
    let (text, style) = if !controller.has_next_page() {
        (
            "No more posts to show".to_string(),
            Style::default().fg(Color::DarkGray),
        )
    } else if controller.is_fetching_next_page() {
        (
            "Loading more posts...".to_string(),
            Style::default().add_modifier(Modifier::ITALIC),
        )
    } else if let Some(error) = controller.error() {
        (
            format!("Failed to load more posts: {} (press r to retry)", error.user_message()),
            Style::default().fg(Color::Red),
        )
    } else {
        ("Load more by scrolling down".to_string(), Style::default())
    };
    Line::from(Span::styled(text, style)).alignment(Alignment::Center)
}

/// A band of `rows` rows vertically centered in `area`.
fn centered_rows(area: Rect, rows: u16) -> Rect {
    let rows = rows.min(area.height);
    Rect {
        y: area.y + (area.height - rows) / 2,
        height: rows,
        ..area
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::AppSettings;
    use crate::feed::{Cursor, FeedSource, FetchError, FetchKind, Page, SubjectId};
    use crate::session::MemorySessionStore;
    use async_trait::async_trait;
    use ratatui::{backend::TestBackend, Terminal};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::time::{self, Instant};

    struct NoSource;

    #[async_trait]
    impl FeedSource for NoSource {
        async fn fetch_page(
            &self,
            _subject: &SubjectId,
            _cursor: Option<&Cursor>,
        ) -> Result<Page, FetchError> {
            Err(FetchError::HttpStatus(503))
        }
    }

    fn app_with_seed(seed: Option<Page>) -> App {
        App::new(
            Arc::new(NoSource),
            Box::leak(Box::new(MemorySessionStore::new())),
            &AppSettings::default(),
            SubjectId::new("u1"),
            seed,
            Instant::now(),
        )
        .0
    }

    fn draw(app: &mut App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(60, 20)).unwrap();
        terminal.draw(|f| render(f, app)).unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_page_with_cursor_keeps_loading() {
        let mut app = app_with_seed(Some(Page::new(vec![], Some(Cursor::new("c1")))));

        // Past the grace delay the feed reads empty, yet more pages exist
        time::advance(Duration::from_millis(400)).await;
        app.refresh_state(Instant::now());
        let screen = draw(&mut app);

        assert!(screen.contains("No posts found"));
        assert!(screen.contains("Load more by scrolling down"));
        assert_eq!(app.viewport.sentinel_ratio, Some(1.0));

        let request = app.poll_trigger().expect("sentinel drives the next page");
        assert_eq!(request.kind, FetchKind::NextPage);
        assert_eq!(request.cursor, Some(Cursor::new("c1")));
    }

    #[tokio::test]
    async fn test_no_sentinel_while_first_page_loads() {
        let mut app = app_with_seed(None);
        let screen = draw(&mut app);

        assert!(screen.contains("Loading posts..."));
        assert_eq!(app.viewport.sentinel_ratio, None);
        assert!(app.poll_trigger().is_none());
    }

    #[tokio::test]
    async fn test_exhausted_empty_feed_has_no_sentinel() {
        let mut app = app_with_seed(Some(Page::new(vec![], None)));
        draw(&mut app);
        assert_eq!(app.viewport.sentinel_ratio, None);
        assert!(app.poll_trigger().is_none());
    }
}
