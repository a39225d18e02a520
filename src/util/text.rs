use std::borrow::Cow;

use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

const ELLIPSIS: char = '…';

/// Bidi embedding, override and isolate controls (U+202A..=U+202E,
/// U+2066..=U+2069). They are format characters, not controls, but reorder
/// everything printed after them on the row.
fn is_bidi_control(c: char) -> bool {
    matches!(c, '\u{202a}'..='\u{202e}' | '\u{2066}'..='\u{2069}')
}

/// Display width of a string in terminal columns (CJK and emoji count 2).
pub fn display_width(s: &str) -> usize {
    UnicodeWidthStr::width(s)
}

/// Make server-provided text safe to print as a single terminal line.
///
/// Topic titles come straight from other forum users. This drops ANSI
/// escape sequences (CSI `ESC [ ... final`, OSC `ESC ] ... BEL|ST`, bare
/// `ESC`), C0/DEL control characters and bidi overrides, and folds newlines
/// and tabs into single spaces so one topic always renders as one row.
///
/// Returns `Cow::Borrowed` when nothing needed changing.
///
/// # Examples
///
/// ```
/// use mistree::util::sanitize_line;
///
/// assert_eq!(sanitize_line("plain title"), "plain title");
/// assert_eq!(sanitize_line("\x1b[31mred\x1b[0m\ntitle"), "red title");
/// ```
pub fn sanitize_line(s: &str) -> Cow<'_, str> {
    let dirty = s.chars().any(|c| c.is_control() || is_bidi_control(c));
    if !dirty {
        return Cow::Borrowed(s);
    }

    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    let mut pending_space = false;

    while let Some(c) = chars.next() {
        match c {
            '\u{1b}' => match chars.peek() {
                Some('[') => {
                    chars.next();
                    // Parameters and intermediates, up to the final byte.
                    for c in chars.by_ref() {
                        if ('\u{40}'..='\u{7e}').contains(&c) {
                            break;
                        }
                    }
                }
                Some(']') => {
                    chars.next();
                    while let Some(c) = chars.next() {
                        if c == '\u{07}' {
                            break;
                        }
                        if c == '\u{1b}' && chars.peek() == Some(&'\\') {
                            chars.next();
                            break;
                        }
                    }
                }
                _ => {}
            },
            '\n' | '\r' | '\t' => pending_space = !out.is_empty(),
            c if c.is_control() || is_bidi_control(c) => {}
            c => {
                if pending_space && !c.is_whitespace() && !out.ends_with(' ') {
                    out.push(' ');
                }
                pending_space = false;
                out.push(c);
            }
        }
    }

    Cow::Owned(out)
}

/// Truncate `s` to at most `max_width` columns, ending in `…` when cut.
///
/// Never splits a character. A double-width character that would straddle
/// the limit is dropped rather than half-drawn.
///
/// # Examples
///
/// ```
/// use mistree::util::truncate_to_width;
///
/// assert_eq!(truncate_to_width("Short", 10), "Short");
/// assert_eq!(truncate_to_width("Hello World", 8), "Hello W…");
/// assert_eq!(truncate_to_width("你好世界", 5), "你好…");
/// assert_eq!(truncate_to_width("Test", 0), "");
/// ```
pub fn truncate_to_width(s: &str, max_width: usize) -> Cow<'_, str> {
    if display_width(s) <= max_width {
        return Cow::Borrowed(s);
    }
    if max_width == 0 {
        return Cow::Borrowed("");
    }

    let budget = max_width - 1; // room for the ellipsis
    let mut used = 0;
    let mut end = 0;
    for (idx, c) in s.char_indices() {
        let w = UnicodeWidthChar::width(c).unwrap_or(0);
        if used + w > budget {
            break;
        }
        used += w;
        end = idx + c.len_utf8();
    }

    let mut out = String::with_capacity(end + ELLIPSIS.len_utf8());
    out.push_str(&s[..end]);
    out.push(ELLIPSIS);
    Cow::Owned(out)
}

/// Truncate, then right-pad with spaces to exactly `width` columns, so rows
/// of mixed-script titles line up.
pub fn fit_to_width(s: &str, width: usize) -> String {
    let truncated = truncate_to_width(s, width);
    let pad = width.saturating_sub(display_width(&truncated));
    let mut out = String::with_capacity(truncated.len() + pad);
    out.push_str(&truncated);
    out.extend(std::iter::repeat(' ').take(pad));
    out
}
