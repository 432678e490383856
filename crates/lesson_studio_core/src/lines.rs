//! crates/lesson_studio_core/src/lines.rs
//!
//! Splits section text into the pseudo-lines that timing entries are aligned to.
//!
//! A line ends at a newline, at `//`, or at `\\`. Segments are trimmed and
//! empty ones are dropped, so trailing or repeated delimiters never produce
//! extra lines.

use regex::Regex;
use std::sync::LazyLock;

static LINE_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\r\n|\n|//|\\\\").expect("line break pattern is valid"));

/// Returns the non-empty, trimmed lines of `text`, in order.
///
/// Absent text has no lines. The result borrows from `text`; call again to
/// iterate a second time.
pub fn tokenize<'a>(text: impl Into<Option<&'a str>>) -> impl Iterator<Item = &'a str> + 'a {
    text.into()
        .into_iter()
        .flat_map(|t| LINE_BREAK.split(t))
        .map(str::trim)
        .filter(|line| !line.is_empty())
}

/// Number of lines `tokenize` would produce.
pub fn count_lines<'a>(text: impl Into<Option<&'a str>>) -> usize {
    tokenize(text).count()
}
