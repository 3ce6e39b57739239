const FENCE: &str = "```";

pub trait StripCodeBlock {
    /// Body of the first fenced block, skipping the info string (`json`, ...).
    fn fenced_block(&self) -> Option<&str>;

    fn strip_code_block(&self) -> &str;
}

impl StripCodeBlock for str {
    fn fenced_block(&self) -> Option<&str> {
        let start = self.find(FENCE)?;
        let after_open = &self[start + FENCE.len()..];
        // A fence without a newline is inline code like ```{...}```.
        let body_start = match after_open.find('\n') {
            Some(pos) if !after_open[..pos].contains(FENCE) => pos + 1,
            _ => 0,
        };
        let body = &after_open[body_start..];
        let end = body.find(FENCE)?;
        Some(body[..end].trim())
    }

    fn strip_code_block(&self) -> &str {
        let trimmed = self.trim();
        if trimmed.starts_with(FENCE)
            && let Some(inner) = trimmed.fenced_block()
        {
            return inner;
        }
        trimmed
    }
}

pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// First `max_chars` characters, with an ellipsis when something was cut.
pub fn excerpt(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

/// Longest prefix of at most `max_chars` characters that does not end inside a
/// word: the character following the cut in `text` is whitespace, or nothing
/// was cut at all. Trailing whitespace of the prefix is dropped.
pub fn truncate_word_safe(text: &str, max_chars: usize) -> &str {
    let Some((cut, _)) = text.char_indices().nth(max_chars) else {
        return text;
    };
    let head = &text[..cut];
    if text[cut..].starts_with(char::is_whitespace) {
        return head.trim_end();
    }
    match head.rfind(char::is_whitespace) {
        Some(pos) => head[..pos].trim_end(),
        None => "",
    }
}
