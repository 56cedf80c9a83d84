//! Shell quoting for tokens that end up on a `sh -c` or ssh command line.

/// Wrap `s` in single quotes, escaping embedded single quotes.
///
/// Always quotes, so the result is one shell word whatever `s` contains.
pub fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', "'\\''"))
}

/// Quote `s` only when it contains characters the shell would interpret.
pub fn shell_escape(s: &str) -> String {
    if !s.is_empty() && s.chars().all(is_shell_safe) {
        s.to_string()
    } else {
        shell_quote(s)
    }
}

fn is_shell_safe(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '@' | '%' | '+' | '=' | ':' | ',' | '.' | '/' | '-')
}
