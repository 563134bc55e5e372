use std::borrow::Cow;

use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

const ELLIPSIS: &str = "...";
const ELLIPSIS_WIDTH: usize = 3;

/// Terminal columns occupied by `s` (CJK and emoji count as 2).
pub fn display_width(s: &str) -> usize {
    UnicodeWidthStr::width(s)
}

fn char_width(c: char) -> usize {
    UnicodeWidthChar::width(c).unwrap_or(0)
}

/// Cut `s` to at most `max_width` columns, appending "..." when shortened.
///
/// Widths of 3 or less have no room for an ellipsis and are hard-cut instead.
/// Returns borrowed input when nothing had to be removed.
pub fn truncate_to_width(s: &str, max_width: usize) -> Cow<'_, str> {
    if display_width(s) <= max_width {
        return Cow::Borrowed(s);
    }

    let (budget, suffix) = if max_width <= ELLIPSIS_WIDTH {
        (max_width, "")
    } else {
        (max_width - ELLIPSIS_WIDTH, ELLIPSIS)
    };

    let mut used = 0;
    let mut end = 0;
    for (idx, c) in s.char_indices() {
        let w = char_width(c);
        if used + w > budget {
            break;
        }
        used += w;
        end = idx + c.len_utf8();
    }

    Cow::Owned(format!("{}{}", &s[..end], suffix))
}

/// Greedy word wrap to `width` columns.
///
/// Existing line breaks are kept; words wider than a line are split by
/// character. Always returns at least one line.
pub fn wrap_to_width(s: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = Vec::new();

    for paragraph in s.split('\n') {
        let mut line = String::new();
        let mut line_width = 0;

        for word in paragraph.split_whitespace() {
            let word_width = display_width(word);
            let gap = usize::from(!line.is_empty());

            if line_width + gap + word_width <= width {
                if gap == 1 {
                    line.push(' ');
                }
                line.push_str(word);
                line_width += gap + word_width;
                continue;
            }

            if !line.is_empty() {
                lines.push(std::mem::take(&mut line));
                line_width = 0;
            }

            if word_width <= width {
                line.push_str(word);
                line_width = word_width;
                continue;
            }

            // Split an overlong word across lines
            for c in word.chars() {
                let w = char_width(c);
                if line_width + w > width && !line.is_empty() {
                    lines.push(std::mem::take(&mut line));
                    line_width = 0;
                }
                line.push(c);
                line_width += w;
            }
        }

        lines.push(line);
    }

    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

fn is_stripped_control(c: char) -> bool {
    c == '\u{7f}' || (c < ' ' && !matches!(c, '\t' | '\n' | '\r'))
}

/// Remove ANSI escape sequences and C0 control characters from server text.
///
/// Post bodies and author names come from other users; rendering them raw
/// would let them move the cursor or retitle the terminal. Tab, newline and
/// carriage return survive. Clean input is returned borrowed.
pub fn strip_control_chars(s: &str) -> Cow<'_, str> {
    if !s.chars().any(|c| c == '\x1b' || is_stripped_control(c)) {
        return Cow::Borrowed(s);
    }

    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '\x1b' {
            match chars.peek() {
                // CSI: parameters up to a final byte in '@'..='~'
                Some('[') => {
                    chars.next();
                    for c in chars.by_ref() {
                        if ('@'..='~').contains(&c) {
                            break;
                        }
                    }
                }
                // OSC: terminated by BEL or ESC '\'
                Some(']') => {
                    chars.next();
                    while let Some(c) = chars.next() {
                        if c == '\x07' {
                            break;
                        }
                        if c == '\x1b' && chars.peek() == Some(&'\\') {
                            chars.next();
                            break;
                        }
                    }
                }
                _ => {}
            }
        } else if !is_stripped_control(c) {
            out.push(c);
        }
    }

    Cow::Owned(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_truncate_fits() {
        assert!(matches!(truncate_to_width("Short", 10), Cow::Borrowed(_)));
        assert_eq!(truncate_to_width("12345", 5), "12345");
    }

    #[test]
    fn test_truncate_adds_ellipsis() {
        assert_eq!(truncate_to_width("Hello World", 8), "Hello...");
        assert_eq!(truncate_to_width("Testing", 4), "T...");
    }

    #[test]
    fn test_truncate_wide_chars() {
        assert_eq!(truncate_to_width("日本語テスト", 7), "日本...");
        assert_eq!(truncate_to_width("Hi 😂 there", 7), "Hi ...");
    }

    #[test]
    fn test_truncate_narrow_widths() {
        assert_eq!(truncate_to_width("Test", 0), "");
        assert_eq!(truncate_to_width("Test", 2), "Te");
        assert_eq!(truncate_to_width("日本", 3), "日");
    }

    #[test]
    fn test_wrap_words() {
        assert_eq!(
            wrap_to_width("the quick brown fox jumps", 10),
            vec!["the quick", "brown fox", "jumps"]
        );
    }

    #[test]
    fn test_wrap_keeps_paragraphs() {
        assert_eq!(wrap_to_width("one\n\ntwo", 20), vec!["one", "", "two"]);
    }

    #[test]
    fn test_wrap_splits_long_word() {
        assert_eq!(wrap_to_width("abcdefgh", 3), vec!["abc", "def", "gh"]);
    }

    #[test]
    fn test_wrap_empty() {
        assert_eq!(wrap_to_width("", 10), vec![""]);
    }

    #[test]
    fn test_strip_clean_is_borrowed() {
        let input = "plain text\twith tab\nand newline";
        let result = strip_control_chars(input);
        assert!(matches!(result, Cow::Borrowed(_)));
        assert_eq!(result, input);
    }

    #[test]
    fn test_strip_controls_and_del() {
        assert_eq!(strip_control_chars("a\x00b\x07c\x7fd"), "abcd");
    }

    #[test]
    fn test_strip_csi() {
        assert_eq!(strip_control_chars("\x1b[1;31mloud\x1b[0m"), "loud");
        assert_eq!(strip_control_chars("up\x1b[2Adown"), "updown");
    }

    #[test]
    fn test_strip_osc() {
        assert_eq!(strip_control_chars("\x1b]0;pwned\x07after"), "after");
        assert_eq!(strip_control_chars("\x1b]0;pwned\x1b\\after"), "after");
    }

    #[test]
    fn test_strip_bare_esc_and_unicode() {
        assert_eq!(strip_control_chars("📚 a\x1bb"), "📚 ab");
    }
}
