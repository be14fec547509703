pub mod escape;
pub mod parse;

pub use escape::{escape_cell, needs_quoting, serialize_row};
pub use parse::{parse, parse_line, split_lines};

/// Ordered column names. Defines cell positions for both reading and writing.
pub type Header = Vec<String>;

/// One record, one string cell per header position.
pub type Row = Vec<String>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedTable {
    /// Column names from the first non-blank line; empty when parsed without a header.
    pub headers: Header,
    /// Every remaining non-blank line, in file order.
    pub rows: Vec<Row>,
}
