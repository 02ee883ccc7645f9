//! Converts the reply markup convention into display HTML.
//!
//! Replies carry `**bold**`, lines starting with `• ` and line breaks. The
//! composer never emits tags; this is the only place HTML is produced, and
//! all text is escaped first.

use std::sync::LazyLock;

use regex::Regex;

static BOLD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*(.+?)\*\*").expect("Invalid bold regex"));

const BULLET: &str = "• ";

/// Render markup text as HTML.
///
/// Consecutive bullet lines become one `<ul>`; other lines are separated by
/// `<br>`.
pub fn to_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 32);
    let mut in_list = false;
    let mut needs_break = false;

    for line in text.lines() {
        if let Some(item) = line.trim_start().strip_prefix(BULLET) {
            if !in_list {
                out.push_str("<ul>");
                in_list = true;
            }
            out.push_str("<li>");
            out.push_str(&inline(item));
            out.push_str("</li>");
            needs_break = false;
        } else {
            if in_list {
                out.push_str("</ul>");
                in_list = false;
            } else if needs_break {
                out.push_str("<br>");
            }
            out.push_str(&inline(line));
            needs_break = true;
        }
    }
    if in_list {
        out.push_str("</ul>");
    }
    out
}

fn inline(text: &str) -> String {
    let escaped = escape(text);
    BOLD_RE
        .replace_all(&escaped, "<strong>$1</strong>")
        .into_owned()
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
