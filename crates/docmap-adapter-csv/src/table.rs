//! In-memory CSV table

/// Header plus rows of optional cells; `None` is a null cell
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CsvTable {
    headers: Vec<String>,
    rows: Vec<Vec<Option<String>>>,
}

impl CsvTable {
    /// Create an empty table with the given header.
    #[must_use]
    pub fn new(headers: Vec<String>) -> Self {
        Self {
            headers,
            rows: Vec::new(),
        }
    }

    /// Append a row.
    pub fn push_row(&mut self, row: Vec<Option<String>>) {
        self.rows.push(row);
    }

    /// Column names in order.
    #[must_use]
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// All rows.
    #[must_use]
    pub fn rows(&self) -> &[Vec<Option<String>>] {
        &self.rows
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether there are no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of the named column.
    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Position of the named column, appending it to the header if absent.
    pub fn ensure_column(&mut self, name: &str) -> usize {
        match self.column_index(name) {
            Some(index) => index,
            None => {
                self.headers.push(name.to_string());
                self.headers.len() - 1
            }
        }
    }

    /// Cell at `row`/`column`; `None` when the row or cell is missing,
    /// `Some(None)` for a null cell.
    #[must_use]
    pub fn cell(&self, row: usize, column: usize) -> Option<Option<&str>> {
        self.rows
            .get(row)
            .and_then(|cells| cells.get(column))
            .map(Option::as_deref)
    }

    /// Set a cell, adding rows and cells as needed.
    pub fn set(&mut self, row: usize, column: usize, value: Option<String>) {
        if self.rows.len() <= row {
            self.rows.resize_with(row + 1, Vec::new);
        }
        let cells = &mut self.rows[row];
        if cells.len() <= column {
            cells.resize(column + 1, None);
        }
        cells[column] = value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_pads_rows_and_cells() {
        let mut table = CsvTable::new(vec!["a".to_string()]);
        let b = table.ensure_column("b");
        table.set(2, b, Some("x".to_string()));

        assert_eq!(table.len(), 3);
        assert_eq!(table.cell(2, b), Some(Some("x")));
        assert_eq!(table.cell(2, 0), Some(None));
        assert_eq!(table.cell(0, b), None);
        assert_eq!(table.headers(), &["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_ensure_column_is_stable() {
        let mut table = CsvTable::new(vec!["a".to_string(), "b".to_string()]);
        assert_eq!(table.ensure_column("b"), 1);
        assert_eq!(table.headers().len(), 2);
    }
}
