//! Built-in source stages

use once_cell::sync::Lazy;
use regex::Regex;

const BOM: char = '\u{feff}';

static SCRIPT_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<script\b[^>]*>(.*?)</script\s*>").unwrap());

/// Drop a leading byte order mark
pub fn strip_bom(text: &str) -> String {
    text.strip_prefix(BOM).unwrap_or(text).to_string()
}

/// Rewrite CRLF and lone CR line endings to LF
pub fn normalize_newlines(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n")
}

/// Keep only the contents of `<script>` blocks
///
/// Everything outside a block is replaced by spaces, newlines excepted, so reported
/// line and column numbers still point into the original file. Text without any
/// script block is returned untouched (plain `.js` files pass through).
pub fn vue_script(text: &str) -> String {
    let mut keep = Vec::new();
    for captures in SCRIPT_BLOCK.captures_iter(text) {
        if let Some(body) = captures.get(1) {
            keep.push(body.range());
        }
    }
    if keep.is_empty() {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len());
    let mut ranges = keep.iter().peekable();
    for (offset, c) in text.char_indices() {
        while ranges.peek().is_some_and(|range| range.end <= offset) {
            ranges.next();
        }
        let inside = ranges.peek().is_some_and(|range| range.contains(&offset));
        if inside || c == '\n' {
            out.push(c);
        } else {
            out.push(' ');
        }
    }
    out
}
