//! Input handling for the TUI.
//!
//! Keys are interpreted according to [`Mode`]: browsing the feed, editing the
//! filter query, or typing a subject id.

use crate::app::{App, AppEvent, Mode};
use crate::feed::SubjectId;
use crate::util::MAX_SEARCH_QUERY_LENGTH;
use anyhow::Result;
use crossterm::event::{KeyCode, KeyModifiers};
use tokio::sync::mpsc;
use tokio::time::Instant;

use super::helpers::{dispatch, open_selected_attachment};
use super::Action;

/// Maximum subject id length accepted from the prompt.
const MAX_SUBJECT_LENGTH: usize = 128;

/// Main input dispatch function.
pub(super) fn handle_input(
    app: &mut App,
    code: KeyCode,
    modifiers: KeyModifiers,
    event_tx: &mpsc::Sender<AppEvent>,
) -> Result<Action> {
    if modifiers.contains(KeyModifiers::CONTROL) && code == KeyCode::Char('c') {
        return Ok(Action::Quit);
    }

    match app.mode {
        Mode::Browse => handle_browse_input(app, code, event_tx),
        Mode::Search { .. } => Ok(handle_search_input(app, code)),
        Mode::Subject { .. } => Ok(handle_subject_input(app, code, event_tx)),
    }
}

fn handle_browse_input(
    app: &mut App,
    code: KeyCode,
    event_tx: &mpsc::Sender<AppEvent>,
) -> Result<Action> {
    let now = Instant::now();
    match code {
        KeyCode::Char('q') => return Ok(Action::Quit),
        KeyCode::Char('j') | KeyCode::Down => app.select_next(),
        KeyCode::Char('k') | KeyCode::Up => app.select_previous(),
        KeyCode::Char('g') | KeyCode::Home => app.select_first(),
        KeyCode::Char('G') | KeyCode::End => app.select_last(),
        KeyCode::Char('/') => {
            app.mode = Mode::Search {
                previous: app.filter.query().to_string(),
            };
        }
        KeyCode::Char(c @ '1'..='9') => {
            let n = c.to_digit(10).unwrap_or(0) as usize;
            app.toggle_category_number(n, now);
        }
        KeyCode::Char('0') => {
            app.clear_categories(now);
            app.set_status("Category filter cleared");
        }
        KeyCode::Char('c') => {
            app.clear_filters(now);
            app.set_status("Filters cleared");
        }
        KeyCode::Char('u') => {
            app.mode = Mode::Subject {
                input: String::new(),
            };
        }
        KeyCode::Char('r') => {
            let request = app.retry();
            dispatch(app, request, event_tx);
        }
        KeyCode::Char('o') => open_selected_attachment(app),
        _ => {}
    }
    Ok(Action::Continue)
}

/// The query filters live while typing; Esc restores what it was before.
fn handle_search_input(app: &mut App, code: KeyCode) -> Action {
    let now = Instant::now();
    match code {
        KeyCode::Esc => {
            if let Mode::Search { previous } = std::mem::replace(&mut app.mode, Mode::Browse) {
                app.set_query(&previous, now);
            }
        }
        KeyCode::Enter => app.mode = Mode::Browse,
        KeyCode::Backspace => {
            let mut query = app.filter.query().to_string();
            query.pop();
            app.set_query(&query, now);
        }
        KeyCode::Char(c) => {
            let query = app.filter.query();
            if query.chars().count() >= MAX_SEARCH_QUERY_LENGTH {
                app.set_status(format!(
                    "Search query at max length ({} chars)",
                    MAX_SEARCH_QUERY_LENGTH
                ));
                return Action::Continue;
            }
            let query = format!("{}{}", query, c);
            app.set_query(&query, now);
        }
        _ => {}
    }
    Action::Continue
}

fn handle_subject_input(app: &mut App, code: KeyCode, event_tx: &mpsc::Sender<AppEvent>) -> Action {
    let Mode::Subject { input } = &mut app.mode else {
        return Action::Continue;
    };
    match code {
        KeyCode::Esc => app.mode = Mode::Browse,
        KeyCode::Backspace => {
            input.pop();
        }
        KeyCode::Char(c) if !c.is_control() => {
            if input.chars().count() < MAX_SUBJECT_LENGTH {
                input.push(c);
            }
        }
        KeyCode::Enter => {
            let subject = input.trim().to_string();
            app.mode = Mode::Browse;
            if subject.is_empty() {
                app.set_status("Subject unchanged");
            } else if subject == app.subject().as_str() {
                app.set_status(format!("Already showing {}", subject));
            } else {
                let request = app.switch_subject(SubjectId::new(&subject), Instant::now());
                dispatch(app, request, event_tx);
            }
        }
        _ => {}
    }
    Action::Continue
}
