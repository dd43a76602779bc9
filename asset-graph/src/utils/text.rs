//! Text processing utilities.

use regex::Regex;
use std::sync::OnceLock;

static WHITESPACE_RE: OnceLock<Regex> = OnceLock::new();
static TOKEN_RE: OnceLock<Regex> = OnceLock::new();

fn whitespace_re() -> &'static Regex {
    WHITESPACE_RE.get_or_init(|| Regex::new(r"\s+").expect("static regex is valid"))
}

fn token_re() -> &'static Regex {
    TOKEN_RE.get_or_init(|| Regex::new(r"[\p{L}\p{N}]+").expect("static regex is valid"))
}

/// Collapse runs of whitespace into a single space and trim the ends.
pub fn normalize_whitespace(s: &str) -> String {
    whitespace_re().replace_all(s, " ").trim().to_string()
}

/// Lowercased alphanumeric tokens of `s`, in order of appearance.
pub fn tokenize(s: &str) -> Vec<String> {
    token_re()
        .find_iter(s)
        .map(|m| m.as_str().to_lowercase())
        .collect()
}

/// Truncate `s` to at most `max_len` characters, appending `"..."` if
/// truncation occurred. Counts chars, not bytes.
pub fn truncate_with_ellipsis(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        return s.to_string();
    }
    if max_len <= 3 {
        return ".".repeat(max_len);
    }

    let cut = s
        .char_indices()
        .nth(max_len - 3)
        .map_or(s.len(), |(i, _)| i);
    format!("{}...", &s[..cut])
}

/// Extract the first JSON object or array from a potentially markdown-wrapped
/// LLM response.
///
/// Tries a ```` ```json ```` fence, then a bare ```` ``` ```` fence, then the
/// span between the first `{` and the last `}`, then the same for `[`/`]`.
pub fn extract_json_from_response(s: &str) -> Option<&str> {
    fenced_block(s, "```json")
        .or_else(|| fenced_block(s, "```"))
        .or_else(|| delimited(s, '{', '}'))
        .or_else(|| delimited(s, '[', ']'))
}

fn fenced_block<'a>(s: &'a str, fence: &str) -> Option<&'a str> {
    let after_fence = s.find(fence)? + fence.len();
    let content_start = after_fence + s[after_fence..].find('\n')? + 1;
    let close = s[content_start..].find("```")?;
    let content = s[content_start..content_start + close].trim();
    (!content.is_empty()).then_some(content)
}

fn delimited(s: &str, open: char, close: char) -> Option<&str> {
    let start = s.find(open)?;
    let end = s.rfind(close)?;
    (end > start).then(|| &s[start..=end])
}

/// Escape Lucene special characters for safe use in Neo4j full-text index queries.
///
/// Escapes `+ - ! ( ) { } [ ] ^ " ~ * ? : \ /` and the operators `&&` and `||`.
pub fn lucene_sanitize(s: &str) -> String {
    const SPECIAL: &[char] = &[
        '+', '-', '!', '(', ')', '{', '}', '[', ']', '^', '"', '~', '*', '?', ':', '\\', '/',
    ];

    let mut out = String::with_capacity(s.len() * 2);
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        if (c == '&' || c == '|') && chars.peek() == Some(&c) {
            chars.next();
            out.push('\\');
            out.push(c);
            out.push(c);
        } else {
            if SPECIAL.contains(&c) {
                out.push('\\');
            }
            out.push(c);
        }
    }
    out
}
