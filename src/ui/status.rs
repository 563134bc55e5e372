use crate::app::{App, Mode};
use ratatui::{
    layout::Rect,
    style::{Color, Style},
    widgets::Paragraph,
    Frame,
};
use std::borrow::Cow;

/// Render the status bar
pub fn render(f: &mut Frame, app: &App, area: Rect) {
    if area.width < 1 || area.height < 1 {
        return;
    }

    let text: Cow<'_, str> = if let Some((msg, _)) = &app.status_message {
        Cow::Borrowed(msg.as_ref())
    } else {
        match &app.mode {
            Mode::Search { .. } => Cow::Borrowed("Type to filter | ESC cancel | ENTER keep"),
            Mode::Subject { .. } => Cow::Borrowed("Subject id | ESC cancel | ENTER switch"),
            Mode::Browse => {
                let controller = app.controller();
                Cow::Owned(format!(
                    "{} · {} loaded · {} shown | [j/k]move [/]filter [1-9]category [c]lear [u]ser [r]etry [o]pen [q]uit",
                    app.subject(),
                    controller.post_count(),
                    app.visible_posts().len(),
                ))
            }
        }
    };

    let style = Style::default().bg(Color::DarkGray).fg(Color::White);
    f.render_widget(Paragraph::new(text).style(style), area);
}
