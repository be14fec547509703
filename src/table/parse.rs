use tracing::{debug, instrument};

use super::{ParsedTable, Row};
use crate::error::{Result, TrialError};

const BOM: char = '\u{feff}';

/// Iterate the non-blank lines of `text`. `\r\n`, `\r` and `\n` all end a line.
///
/// Splitting on either character alone is enough: the empty piece between
/// `\r` and `\n` is blank and gets dropped with the other blank lines.
pub fn split_lines(text: &str) -> impl Iterator<Item = &str> {
    text.split(['\r', '\n']).filter(|line| !line.trim().is_empty())
}

/// Tokenize a single line into trimmed cells.
///
/// - `"` toggles quoting; `""` inside a quoted field is one literal quote
/// - `,` ends a field only outside quotes
/// - an unterminated quote just runs to the end of the line
///
/// Every cell is trimmed, quoted or not, so leading or trailing whitespace
/// (including `\r` and `\n` inside quotes) does not survive a round trip
/// through [`serialize_row`](super::serialize_row).
pub fn parse_line(line: &str) -> Row {
    let mut cells = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                cells.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(c),
        }
    }
    cells.push(current.trim().to_string());
    cells
}

/// Parse a whole document.
///
/// With `has_header`, the first non-blank line becomes the header and the rest
/// become rows; otherwise the header is empty and every line is a row. Cells
/// stay strings, nothing is type-checked here.
#[instrument(level = "debug", skip(text), fields(bytes = text.len()))]
pub fn parse(text: &str, has_header: bool) -> Result<ParsedTable> {
    let text = text.strip_prefix(BOM).unwrap_or(text);
    if text.trim().is_empty() {
        return Err(TrialError::EmptyInput);
    }

    let mut lines = split_lines(text).map(parse_line);
    let headers = if has_header {
        lines.next().unwrap_or_default()
    } else {
        Vec::new()
    };
    let rows: Vec<Row> = lines.collect();

    debug!(columns = headers.len(), rows = rows.len(), "parsed table");
    Ok(ParsedTable { headers, rows })
}
