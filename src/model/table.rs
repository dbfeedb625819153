//! Table content.

use serde::{Deserialize, Serialize};

/// Structured table content of a `table` block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Table {
    /// Rows in reading order
    pub rows: Vec<TableRow>,

    /// Number of columns
    pub column_count: usize,

    /// Whether the first row is a header
    pub has_header: bool,
}

impl Table {
    /// Create an empty table with the given column count.
    pub fn new(column_count: usize) -> Self {
        Self {
            rows: Vec::new(),
            column_count,
            has_header: false,
        }
    }

    /// Build a table from cell strings. Short rows are padded with empty cells.
    pub fn from_rows<S: Into<String>>(rows: Vec<Vec<S>>, has_header: bool) -> Self {
        let column_count = rows.iter().map(Vec::len).max().unwrap_or(0);
        let mut table = Self::new(column_count);
        for (i, cells) in rows.into_iter().enumerate() {
            let mut row = TableRow::from_strings(cells);
            row.cells.resize_with(column_count, TableCell::empty);
            row.is_header = has_header && i == 0;
            table.rows.push(row);
        }
        table.has_header = has_header && !table.rows.is_empty();
        table
    }

    /// Add a row to the table.
    pub fn add_row(&mut self, row: TableRow) {
        self.column_count = self.column_count.max(row.cells.len());
        self.rows.push(row);
    }

    /// Get the number of rows.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Check if the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Header row, when present.
    pub fn header(&self) -> Option<&TableRow> {
        self.rows.first().filter(|_| self.has_header)
    }

    /// Rows after the header.
    pub fn body(&self) -> &[TableRow] {
        let skip = usize::from(self.has_header).min(self.rows.len());
        &self.rows[skip..]
    }

    /// Tab-separated text, one line per row.
    pub fn plain_text(&self) -> String {
        self.rows
            .iter()
            .map(|row| row.joined("\t"))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// A table row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableRow {
    /// Cells in the row
    pub cells: Vec<TableCell>,

    /// Whether this is a header row
    #[serde(default)]
    pub is_header: bool,
}

impl TableRow {
    /// Create a body row with cells.
    pub fn new(cells: Vec<TableCell>) -> Self {
        Self {
            cells,
            is_header: false,
        }
    }

    /// Create a row from text values.
    pub fn from_strings<S: Into<String>>(values: impl IntoIterator<Item = S>) -> Self {
        Self::new(values.into_iter().map(TableCell::text).collect())
    }

    /// Cell texts joined with `separator`.
    pub fn joined(&self, separator: &str) -> String {
        self.cells
            .iter()
            .map(|c| c.text.as_str())
            .collect::<Vec<_>>()
            .join(separator)
    }
}

/// A table cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableCell {
    /// Cell text
    pub text: String,

    /// Number of columns this cell spans
    #[serde(default = "default_span")]
    pub colspan: u8,
}

fn default_span() -> u8 {
    1
}

impl TableCell {
    /// Create a new cell with text content.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            colspan: 1,
        }
    }

    /// Create an empty cell.
    pub fn empty() -> Self {
        Self::text(String::new())
    }

    /// Check if the cell is blank.
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_rows_pads_short_rows() {
        let table = Table::from_rows(
            vec![vec!["Name", "Age", "City"], vec!["Alice", "30"]],
            true,
        );
        assert_eq!(table.column_count, 3);
        assert_eq!(table.rows[1].cells.len(), 3);
        assert!(table.rows[1].cells[2].is_empty());
        assert!(table.rows[0].is_header);
        assert!(!table.rows[1].is_header);
    }

    #[test]
    fn test_header_and_body() {
        let table = Table::from_rows(vec![vec!["Name", "Age"], vec!["Bob", "25"]], true);
        assert_eq!(table.header().unwrap().joined(","), "Name,Age");
        assert_eq!(table.body().len(), 1);

        let plain = Table::from_rows(vec![vec!["1", "2"]], false);
        assert!(plain.header().is_none());
        assert_eq!(plain.body().len(), 1);
    }

    #[test]
    fn test_plain_text() {
        let table = Table::from_rows(vec![vec!["A", "B"], vec!["C", "D"]], false);
        assert_eq!(table.plain_text(), "A\tB\nC\tD");
    }
}
