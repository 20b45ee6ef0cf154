use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use serde_json::Value;

//==============================================================================
// Cell Values
//==============================================================================

/// A single cell of a table
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    /// Missing value (NA)
    Empty,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

impl CellValue {
    /// True for missing values: `Empty` and NaN floats
    pub fn is_na(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Float(f) => f.is_nan(),
            _ => false,
        }
    }

    /// Convert a JSON scalar into a cell.
    ///
    /// Arrays and objects are kept as their JSON text.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => CellValue::Empty,
            Value::Bool(b) => CellValue::Bool(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => CellValue::Int(i),
                None => CellValue::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Value::String(s) => CellValue::Text(s.clone()),
            other => CellValue::Text(other.to_string()),
        }
    }

    /// Display text used for plain-text rendering
    pub fn display(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Bool(b) => b.to_string(),
            CellValue::Int(i) => i.to_string(),
            CellValue::Float(f) => f.to_string(),
            CellValue::Text(s) => s.clone(),
            CellValue::Date(d) => d.format("%Y-%m-%d").to_string(),
            CellValue::DateTime(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Float(value)
    }
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        CellValue::Int(value)
    }
}

impl From<bool> for CellValue {
    fn from(value: bool) -> Self {
        CellValue::Bool(value)
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::Text(value)
    }
}

impl From<NaiveDate> for CellValue {
    fn from(value: NaiveDate) -> Self {
        CellValue::Date(value)
    }
}

impl From<NaiveDateTime> for CellValue {
    fn from(value: NaiveDateTime) -> Self {
        CellValue::DateTime(value)
    }
}

//==============================================================================
// Columns and Tables
//==============================================================================

/// A column with a (possibly multi-level) label
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    /// Label levels, outermost first. A plain column has exactly one level.
    pub label: Vec<String>,
    pub values: Vec<CellValue>,
}

impl Column {
    pub fn new(name: impl Into<String>, values: Vec<CellValue>) -> Self {
        Self {
            label: vec![name.into()],
            values,
        }
    }

    /// Column under a hierarchical header, e.g. `["sales", "q1"]`
    pub fn with_levels<S: Into<String>>(levels: Vec<S>, values: Vec<CellValue>) -> Self {
        Self {
            label: levels.into_iter().map(Into::into).collect(),
            values,
        }
    }

    /// Label levels joined with '.'
    pub fn name(&self) -> String {
        self.label.join(".")
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Row labels of a table
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Index {
    pub name: Option<String>,
    pub values: Vec<CellValue>,
}

/// In-memory tabular result: ordered columns plus optional row labels.
///
/// Without an explicit index, rows are labelled `0..row_count()`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    pub columns: Vec<Column>,
    pub index: Option<Index>,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_column(&mut self, column: Column) {
        self.columns.push(column);
    }

    pub fn with_index(mut self, name: Option<String>, values: Vec<CellValue>) -> Self {
        self.index = Some(Index { name, values });
        self
    }

    /// Number of data rows (longest column or index)
    pub fn row_count(&self) -> usize {
        let column_rows = self.columns.iter().map(Column::len).max().unwrap_or(0);
        let index_rows = self.index.as_ref().map(|i| i.values.len()).unwrap_or(0);
        column_rows.max(index_rows)
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Depth of the column header (1 for plain labels)
    pub fn header_levels(&self) -> usize {
        self.columns
            .iter()
            .map(|c| c.label.len())
            .max()
            .unwrap_or(1)
            .max(1)
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(Column::name).collect()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name() == name)
    }

    /// Cell at (row, col); short columns read as `Empty`
    pub fn cell(&self, row: usize, col: usize) -> &CellValue {
        self.columns
            .get(col)
            .and_then(|c| c.values.get(row))
            .unwrap_or(&CellValue::Empty)
    }

    /// Row label at `row`: index value, or the row position
    pub fn index_value(&self, row: usize) -> CellValue {
        match &self.index {
            Some(index) => index.values.get(row).cloned().unwrap_or(CellValue::Empty),
            None => CellValue::Int(row as i64),
        }
    }

    /// Build a table from a JSON array of record objects.
    ///
    /// Columns appear in first-seen key order; records missing a key get `Empty`.
    pub fn from_json_records(records: &Value) -> Option<Self> {
        let rows = records.as_array()?;
        let mut names: Vec<String> = Vec::new();
        for row in rows {
            for key in row.as_object()?.keys() {
                if !names.contains(key) {
                    names.push(key.clone());
                }
            }
        }

        let mut table = Table::new();
        for name in names {
            let values = rows
                .iter()
                .map(|row| {
                    row.get(&name)
                        .map(CellValue::from_json)
                        .unwrap_or(CellValue::Empty)
                })
                .collect();
            table.add_column(Column::new(name, values));
        }
        Some(table)
    }

    /// Rows as JSON objects keyed by column name
    pub fn to_json_records(&self) -> Value {
        let names = self.column_names();
        let rows = (0..self.row_count())
            .map(|row| {
                let record = names
                    .iter()
                    .enumerate()
                    .map(|(col, name)| {
                        let value = serde_json::to_value(self.cell(row, col)).unwrap_or(Value::Null);
                        (name.clone(), value)
                    })
                    .collect::<serde_json::Map<String, Value>>();
                Value::Object(record)
            })
            .collect();
        Value::Array(rows)
    }
}
