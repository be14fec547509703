use std::borrow::Cow;

/// A cell is quoted iff it contains a comma, a double quote, `\n` or `\r`.
pub fn needs_quoting(cell: &str) -> bool {
    cell.contains([',', '"', '\n', '\r'])
}

/// Escape one cell: wrap in quotes and double inner quotes when needed,
/// otherwise borrow it unchanged.
///
/// Surrounding whitespace is kept as-is, but [`parse_line`](super::parse_line)
/// trims it, so only cells with `cell.trim() == cell` read back identically.
pub fn escape_cell(cell: &str) -> Cow<'_, str> {
    if needs_quoting(cell) {
        Cow::Owned(format!("\"{}\"", cell.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(cell)
    }
}

/// Join escaped cells with `,`. No line terminator is added.
pub fn serialize_row<S: AsRef<str>>(cells: &[S]) -> String {
    let mut line = String::with_capacity(cells.iter().map(|c| c.as_ref().len() + 1).sum());
    for (i, cell) in cells.iter().enumerate() {
        if i > 0 {
            line.push(',');
        }
        line.push_str(&escape_cell(cell.as_ref()));
    }
    line
}
