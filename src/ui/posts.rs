use crate::feed::Post;
use crate::filter::category;
use crate::util::{strip_control_chars, wrap_to_width};
use chrono::{DateTime, Utc};
use ratatui::{
    style::{Color, Modifier, Style},
    text::{Line, Span},
};

const MINUTES_PER_DAY: i64 = 1440;
const MINUTES_PER_MONTH: i64 = 43_200;
const MINUTES_PER_YEAR: i64 = 525_600;

fn plural(n: i64, unit: &str) -> String {
    if n == 1 {
        format!("1 {unit}")
    } else {
        format!("{n} {unit}s")
    }
}

fn rounded_div(n: i64, d: i64) -> i64 {
    (n + d / 2) / d
}

/// Human distance between two instants ("5 minutes", "about 2 hours").
fn distance(seconds: i64) -> String {
    let minutes = rounded_div(seconds, 60);

    if minutes < 1 {
        return "less than a minute".to_string();
    }
    if minutes < 45 {
        return plural(minutes, "minute");
    }
    if minutes < 90 {
        return "about 1 hour".to_string();
    }
    if minutes < MINUTES_PER_DAY {
        return format!("about {}", plural(rounded_div(minutes, 60), "hour"));
    }
    if minutes < 2520 {
        return "1 day".to_string();
    }
    if minutes < MINUTES_PER_MONTH {
        return plural(rounded_div(minutes, MINUTES_PER_DAY), "day");
    }
    if minutes < 2 * MINUTES_PER_MONTH {
        return format!("about {}", plural(rounded_div(minutes, MINUTES_PER_MONTH), "month"));
    }
    if minutes < MINUTES_PER_YEAR {
        return plural(minutes / MINUTES_PER_MONTH, "month");
    }

    let years = minutes / MINUTES_PER_YEAR;
    let months_over = (minutes % MINUTES_PER_YEAR) / MINUTES_PER_MONTH;
    if months_over < 3 {
        format!("about {}", plural(years, "year"))
    } else if months_over < 9 {
        format!("over {}", plural(years, "year"))
    } else {
        format!("almost {}", plural(years + 1, "year"))
    }
}

/// Format `then` relative to `now`: "5 minutes ago", "in about 1 hour".
pub fn format_relative_time(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let seconds = (now - then).num_seconds();
    if seconds >= 0 {
        format!("{} ago", distance(seconds))
    } else {
        format!("in {}", distance(-seconds))
    }
}

/// Lines making up one post card, `width` columns wide (excluding the gutter).
pub fn card_lines(post: &Post, width: usize, now: DateTime<Utc>) -> Vec<Line<'static>> {
    let dim = Style::default().fg(Color::DarkGray);
    let mut lines = Vec::new();

    let mut header = vec![Span::styled(
        strip_control_chars(post.author_name()).into_owned(),
        Style::default().add_modifier(Modifier::BOLD),
    )];
    for key in &post.categories {
        if let Some(c) = category::lookup(key) {
            header.push(Span::raw(" "));
            header.push(Span::styled(
                format!("[{} {}]", c.icon, c.label),
                Style::default().fg(Color::Cyan),
            ));
        }
    }
    lines.push(Line::from(header));

    let mut meta = vec![Span::styled(format_relative_time(post.created_at, now), dim)];
    if let Some(edited) = post.edit_at {
        meta.push(Span::styled(
            format!(" · edited {}", format_relative_time(edited, now)),
            dim,
        ));
    }
    lines.push(Line::from(meta));

    let text = strip_control_chars(&post.text);
    if !text.trim().is_empty() {
        lines.extend(wrap_to_width(&text, width).into_iter().map(Line::from));
    }

    if let Some(file) = post.attachment() {
        lines.push(Line::from(Span::styled(
            format!(
                "📎 {} ({})",
                strip_control_chars(file.display_name()),
                strip_control_chars(&file.kind)
            ),
            Style::default().fg(Color::Blue),
        )));
    }

    let heart = if post.has_liked {
        Span::styled(format!("♥ {}", post.likes_count), Style::default().fg(Color::Red))
    } else {
        Span::styled(format!("♡ {}", post.likes_count), dim)
    };
    lines.push(Line::from(vec![
        heart,
        Span::styled(format!("   💬 {}", post.comments_count), dim),
    ]));

    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::{Attachment, Author};
    use chrono::{Duration, TimeZone};
    use std::collections::BTreeSet;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn ago(d: Duration) -> String {
        format_relative_time(now() - d, now())
    }

    #[test]
    fn test_relative_minutes_and_hours() {
        assert_eq!(ago(Duration::seconds(10)), "less than a minute ago");
        assert_eq!(ago(Duration::seconds(60)), "1 minute ago");
        assert_eq!(ago(Duration::minutes(5)), "5 minutes ago");
        assert_eq!(ago(Duration::minutes(50)), "about 1 hour ago");
        assert_eq!(ago(Duration::hours(3)), "about 3 hours ago");
    }

    #[test]
    fn test_relative_days_months_years() {
        assert_eq!(ago(Duration::hours(30)), "1 day ago");
        assert_eq!(ago(Duration::days(4)), "4 days ago");
        assert_eq!(ago(Duration::days(35)), "about 1 month ago");
        assert_eq!(ago(Duration::days(100)), "3 months ago");
        assert_eq!(ago(Duration::days(370)), "about 1 year ago");
        assert_eq!(ago(Duration::days(365 + 180)), "over 1 year ago");
        assert_eq!(ago(Duration::days(365 + 330)), "almost 2 years ago");
    }

    #[test]
    fn test_relative_future() {
        assert_eq!(
            format_relative_time(now() + Duration::minutes(5), now()),
            "in 5 minutes"
        );
    }

    fn text_of(lines: &[Line]) -> Vec<String> {
        lines
            .iter()
            .map(|l| l.spans.iter().map(|s| s.content.as_ref()).collect())
            .collect()
    }

    #[test]
    fn test_card_contents() {
        let post = Post {
            id: "p1".to_string(),
            author: Some(Author {
                id: "u1".to_string(),
                name: "Ada".to_string(),
                profile_img: None,
            }),
            created_at: now() - Duration::minutes(5),
            text: "Hello \x1b[31mworld".to_string(),
            file: Some(Attachment {
                url: "https://cdn.example.com/cat.png".to_string(),
                kind: "image".to_string(),
                name: None,
            }),
            has_liked: true,
            categories: BTreeSet::from(["tech".to_string(), "cooking".to_string()]),
            edit_at: Some(now() - Duration::minutes(2)),
            likes_count: 3,
            comments_count: 1,
        };

        let lines = text_of(&card_lines(&post, 40, now()));
        assert_eq!(
            lines,
            vec![
                "Ada [💻 Technology]".to_string(),
                "5 minutes ago · edited 2 minutes ago".to_string(),
                "Hello world".to_string(),
                "📎 cat.png (image)".to_string(),
                "♥ 3   💬 1".to_string(),
            ]
        );
    }
}
