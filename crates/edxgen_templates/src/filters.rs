//! Filters registered on top of the minijinja built-ins.

use minijinja::{Error, ErrorKind};

/// Widest indentation `indent` accepts.
pub const MAX_INDENT_WIDTH: usize = u16::MAX as usize;

/// `indent(width=4, first=false, blank=false)`.
///
/// Indents every line but the first (unless `first`) by `width` spaces.
/// Blank lines stay empty unless `blank` is set.
pub fn indent(
    value: String,
    width: Option<usize>,
    first: Option<bool>,
    blank: Option<bool>,
) -> Result<String, Error> {
    let width = width.unwrap_or(4);
    if width > MAX_INDENT_WIDTH {
        return Err(Error::new(
            ErrorKind::InvalidOperation,
            format!("indent width {} exceeds {}", width, MAX_INDENT_WIDTH),
        ));
    }
    Ok(indent_lines(
        &value,
        width,
        first.unwrap_or(false),
        blank.unwrap_or(false),
    ))
}

fn indent_lines(text: &str, width: usize, first: bool, blank: bool) -> String {
    if !first && !text.contains('\n') {
        return text.to_string();
    }
    let padding = " ".repeat(width);
    text.split('\n')
        .enumerate()
        .map(|(i, line)| {
            if (i == 0 && !first) || (!blank && line.trim().is_empty()) {
                line.to_string()
            } else {
                format!("{}{}", padding, line)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}
