//! Splits a raw input line into an argument vector.

use tracing::warn;

/// Trim the line terminator and cap the line at `max_len` bytes.
///
/// The cut lands on a char boundary so a multibyte character is never split.
pub fn clean_line(raw: &str, max_len: usize) -> &str {
    let line = raw.trim_end_matches(['\n', '\r']);
    if line.len() <= max_len {
        return line;
    }
    let mut end = max_len;
    while !line.is_char_boundary(end) {
        end -= 1;
    }
    warn!(len = line.len(), max_len, "input line truncated");
    &line[..end]
}

/// Split a line on runs of whitespace, keeping at most `max_args` tokens.
///
/// No quoting, escaping or globbing: every token is exactly the text between
/// separators. Tokens past `max_args` are dropped with a warning.
pub fn tokenize(line: &str, max_args: usize) -> Vec<String> {
    let mut words = line.split_whitespace();
    let argv: Vec<String> = words.by_ref().take(max_args).map(str::to_owned).collect();
    let dropped = words.count();
    if dropped > 0 {
        warn!(max_args, dropped, "too many arguments, extra tokens ignored");
    }
    argv
}
