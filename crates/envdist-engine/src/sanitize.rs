//! Line-level cleanup of a merged document.
//!
//! Production artifacts must not carry author comments or stray whitespace
//! that could confuse downstream parsers or shell sourcing.

/// Strip an inline comment from an assignment line: a `#` at line start or
/// preceded by whitespace, and everything after it.
///
/// A `#` inside a quoted value is truncated like any other comment marker;
/// callers depend on this behavior staying as-is.
fn strip_inline_comment(line: &str) -> &str {
    let bytes = line.as_bytes();
    for (i, &b) in bytes.iter().enumerate() {
        if b == b'#' && (i == 0 || bytes[i - 1].is_ascii_whitespace()) {
            return &line[..i];
        }
    }
    line
}

/// Sanitize merged lines, per physical line:
///
/// - blank lines are dropped;
/// - a line containing `=` has its inline comment and trailing whitespace
///   stripped, and is dropped entirely if no `=` survives;
/// - a line without `=` is preserved verbatim minus trailing whitespace.
///
/// Sanitization is idempotent.
pub fn sanitize<S: AsRef<str>>(lines: &[S]) -> Vec<String> {
    let mut out = Vec::with_capacity(lines.len());
    for line in lines {
        let line = line.as_ref();
        if line.trim().is_empty() {
            continue;
        }
        if line.contains('=') {
            let stripped = strip_inline_comment(line).trim_end();
            if stripped.contains('=') {
                out.push(stripped.to_string());
            }
        } else {
            out.push(line.trim_end().to_string());
        }
    }
    out
}
