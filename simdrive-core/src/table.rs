//! Two-dimensional tabular data exchanged with host tables.

use crate::error::{Error, Result};
use crate::host::AutomationSession;
use crate::value::Value;

/// Rectangular table with named columns.
///
/// Every row holds exactly one value per column.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    /// Creates a new table, checking that all rows match the column count.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Result<Self> {
        if let Some((n, row)) = rows
            .iter()
            .enumerate()
            .find(|(_, r)| r.len() != columns.len())
        {
            return Err(Error::DimensionMismatch(format!(
                "row {} has {} values, expected {}",
                n,
                row.len(),
                columns.len()
            )));
        }
        Ok(Table { columns, rows })
    }

    /// Convenience constructor taking column names as string slices.
    pub fn with_columns(columns: &[&str], rows: Vec<Vec<Value>>) -> Result<Self> {
        Table::new(columns.iter().map(|c| c.to_string()).collect(), rows)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Returns the cell at the given 0-based row in the named column.
    pub fn get(&self, row: usize, column: &str) -> Option<&Value> {
        let col = self.column_index(column)?;
        self.rows.get(row).map(|r| &r[col])
    }
}

/// Reads a whole table from the host.
///
/// Column names come from the header row. A header cell without a value
/// yields an empty name.
pub fn to_table<S: AutomationSession + ?Sized>(session: &mut S, name: &str) -> Result<Table> {
    let (cols, rows) = session.table_dimensions(name)?;
    let mut columns = Vec::with_capacity(cols);
    for col in 1..=cols {
        columns.push(match session.get_table_cell(name, col, 0)? {
            Value::Null => String::new(),
            Value::Str(s) => s,
            other => other.to_string(),
        });
    }
    let mut data = Vec::with_capacity(rows);
    for row in 1..=rows {
        let mut values = Vec::with_capacity(cols);
        for col in 1..=cols {
            values.push(session.get_table_cell(name, col, row)?);
        }
        data.push(values);
    }
    Table::new(columns, data)
}

/// Replaces the contents of a host table.
///
/// The host table is resized to the exact dimensions first. If the host
/// refuses the resize, nothing is written. A failure while writing cells
/// leaves the host table partially written.
pub fn from_table<S: AutomationSession + ?Sized>(
    session: &mut S,
    name: &str,
    table: &Table,
) -> Result<()> {
    session.resize_table(name, table.width(), table.height())?;
    for (n, column) in table.columns.iter().enumerate() {
        session.set_table_cell(name, n + 1, 0, &Value::Str(column.clone()))?;
    }
    for (r, row) in table.rows.iter().enumerate() {
        for (c, value) in row.iter().enumerate() {
            session.set_table_cell(name, c + 1, r + 1, value)?;
        }
    }
    Ok(())
}

#[test]
fn ragged_rows_are_rejected() {
    let result = Table::with_columns(
        &["a", "b"],
        vec![vec![Value::Int(1), Value::Int(2)], vec![Value::Int(3)]],
    );
    match result {
        Err(Error::DimensionMismatch(_)) => (),
        other => panic!("unexpected: {:?}", other),
    }
}

#[test]
fn cell_lookup_by_column_name() {
    let table = Table::with_columns(
        &["Column1", "Column2"],
        vec![
            vec![Value::Int(1), Value::Int(3)],
            vec![Value::Int(2), Value::Int(4)],
        ],
    )
    .unwrap();
    assert_eq!(table.get(1, "Column2"), Some(&Value::Int(4)));
    assert_eq!(table.get(2, "Column2"), None);
    assert_eq!(table.get(0, "Column3"), None);
    assert_eq!(table.width(), 2);
    assert_eq!(table.height(), 2);
}
