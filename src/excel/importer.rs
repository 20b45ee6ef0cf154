//! Excel importer implementation - workbook sheet → Table

use crate::error::{PluginError, PluginResult};
use crate::plugin::SheetSelector;
use crate::storage::{self, Location};
use crate::types::{CellValue, Column, Table};
use calamine::{open_workbook_auto, open_workbook_auto_from_rs, Data, Range, Reader, Sheets};
use chrono::{NaiveDate, NaiveDateTime};
use std::collections::HashMap;
use std::io::{Cursor, Read, Seek};
use tracing::debug;

/// Reads one sheet of a local or remote workbook into a `Table`.
///
/// The first non-blank row is the header; blank rows are skipped.
pub struct ExcelImporter {
    location: Location,
}

impl ExcelImporter {
    pub fn new(location: Location) -> Self {
        Self { location }
    }

    pub fn location(&self) -> &Location {
        &self.location
    }

    /// Import the selected sheet
    pub fn import(&self, selector: &SheetSelector) -> PluginResult<Table> {
        debug!("Reading sheet {} of {}", selector, self.location);
        match &self.location {
            Location::Local(path) => {
                let mut workbook = open_workbook_auto(path)?;
                Self::read_sheet(&mut workbook, selector)
            }
            Location::Remote(uri) => {
                let bytes = storage::fetch_remote(uri)?;
                let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))?;
                Self::read_sheet(&mut workbook, selector)
            }
        }
    }

    /// Sheet names in workbook order
    pub fn sheet_names(&self) -> PluginResult<Vec<String>> {
        match &self.location {
            Location::Local(path) => Ok(open_workbook_auto(path)?.sheet_names()),
            Location::Remote(uri) => {
                let bytes = storage::fetch_remote(uri)?;
                Ok(open_workbook_auto_from_rs(Cursor::new(bytes))?.sheet_names())
            }
        }
    }

    fn read_sheet<RS: Read + Seek>(
        workbook: &mut Sheets<RS>,
        selector: &SheetSelector,
    ) -> PluginResult<Table> {
        let names = workbook.sheet_names();
        let sheet_name = match selector {
            SheetSelector::Name(name) => names
                .iter()
                .find(|n| *n == name)
                .cloned()
                .ok_or_else(|| PluginError::SheetNotFound(format!("'{}'", name)))?,
            SheetSelector::Index(index) => names.get(*index).cloned().ok_or_else(|| {
                PluginError::SheetNotFound(format!(
                    "index {} (workbook has {} sheets)",
                    index,
                    names.len()
                ))
            })?,
        };

        let range = workbook.worksheet_range(&sheet_name)?;
        let table = table_from_range(&range);
        debug!(
            "Read {} rows x {} columns from sheet '{}'",
            table.row_count(),
            table.column_count(),
            sheet_name
        );
        Ok(table)
    }
}

/// Convert a sheet range into a table.
///
/// Columns are counted from column A, so leading blank columns survive as
/// all-empty `Unnamed: i` columns even though calamine ranges start at the
/// first used cell.
pub(crate) fn table_from_range(range: &Range<Data>) -> Table {
    let Some((_, first_col)) = range.start() else {
        return Table::new();
    };
    let offset = first_col as usize;
    let width = offset + range.width();
    let mut rows = range
        .rows()
        .filter(|row| !row.iter().all(|cell| matches!(cell, Data::Empty)));

    let Some(header) = rows.next() else {
        return Table::new();
    };
    let header: Vec<Data> = std::iter::repeat(Data::Empty)
        .take(offset)
        .chain(header.iter().cloned())
        .collect();
    let names = column_names(&header, width);

    let mut columns: Vec<Vec<CellValue>> = vec![Vec::new(); width];
    for row in rows {
        for (col, values) in columns.iter_mut().enumerate() {
            let value = col
                .checked_sub(offset)
                .and_then(|col| row.get(col))
                .map(convert_cell)
                .unwrap_or(CellValue::Empty);
            values.push(value);
        }
    }

    let mut table = Table::new();
    for (name, values) in names.into_iter().zip(columns) {
        table.add_column(Column::new(name, values));
    }
    table
}

/// Header names: blank cells become "Unnamed: {i}", repeats get ".1", ".2", ...
fn column_names(header: &[Data], width: usize) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut names = Vec::with_capacity(width);

    for col in 0..width {
        let base = match header.get(col) {
            None | Some(Data::Empty) => format!("Unnamed: {}", col),
            Some(cell) => header_text(cell),
        };

        let mut name = base.clone();
        if let Some(&last) = seen.get(&base) {
            let mut count = last;
            while seen.contains_key(&name) {
                count += 1;
                name = format!("{}.{}", base, count);
            }
            seen.insert(base, count);
        }
        seen.insert(name.clone(), 0);
        names.push(name);
    }
    names
}

fn header_text(cell: &Data) -> String {
    match cell {
        Data::String(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => f.to_string(),
        Data::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

/// Convert a single calamine cell
fn convert_cell(cell: &Data) -> CellValue {
    match cell {
        Data::Empty => CellValue::Empty,
        Data::Int(i) => CellValue::Int(*i),
        Data::Float(f) => CellValue::Float(*f),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::String(s) => CellValue::Text(s.clone()),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(datetime) => CellValue::DateTime(datetime),
            None => CellValue::Float(dt.as_f64()),
        },
        Data::DateTimeIso(s) => parse_iso_datetime(s)
            .map(CellValue::DateTime)
            .unwrap_or_else(|| CellValue::Text(s.clone())),
        other => CellValue::Text(other.to_string()),
    }
}

fn parse_iso_datetime(text: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}
