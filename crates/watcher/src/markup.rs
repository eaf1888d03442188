//! Telegram HTML helpers shared by the batch message and the cycle report

/// Longest file name shown verbatim
pub const MAX_DISPLAY_NAME: usize = 50;

pub const SEPARATOR: &str = "—————————";

/// Escape text for Telegram's HTML parse mode
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Shorten long names to 47 characters plus `...`, then escape
pub fn display_name(name: &str) -> String {
    if name.chars().count() <= MAX_DISPLAY_NAME {
        return escape_html(name);
    }
    let head: String = name.chars().take(MAX_DISPLAY_NAME - 3).collect();
    escape_html(&format!("{head}..."))
}
