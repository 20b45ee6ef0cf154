//! Excel exporter implementation - Table → worksheet of a shared workbook

use crate::config::{HeaderOption, Options, OutputConfig, SheetOptions, DEFAULT_ENGINE};
use crate::error::{PluginError, PluginResult};
use crate::excel::float_format::FloatFormat;
use crate::excel::header_style;
use crate::types::{CellValue, Table};
use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};
use rust_xlsxwriter::{ExcelDateTime, Format, Workbook, Worksheet, XlsxError};
use serde_json::Value;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Workbook writer bound to one destination file.
///
/// Sheets accumulate in memory and reach the file only on `close()`.
pub struct WorkbookWriter {
    path: PathBuf,
    file: File,
    workbook: Workbook,
    sheet_names: Vec<String>,
    date_format: Format,
    datetime_format: Format,
}

impl WorkbookWriter {
    /// Open a writer for `config.file`.
    ///
    /// Mode "w" creates (or truncates) the destination immediately.
    pub fn open(config: &OutputConfig) -> PluginResult<Self> {
        if config.engine != DEFAULT_ENGINE {
            return Err(PluginError::Config(format!(
                "Unsupported engine '{}': only '{}' is available",
                config.engine, DEFAULT_ENGINE
            )));
        }
        if config.mode != "w" {
            return Err(PluginError::Config(format!(
                "Unsupported mode '{}': the '{}' engine only writes new files (mode 'w')",
                config.mode, DEFAULT_ENGINE
            )));
        }

        let mut workbook = Workbook::new();
        apply_engine_kwargs(&mut workbook, &config.engine_kwargs)?;

        let file = File::create(&config.file)?;
        debug!("Opened workbook writer for {}", config.file.display());

        Ok(Self {
            path: config.file.clone(),
            file,
            workbook,
            sheet_names: Vec::new(),
            date_format: Format::new().set_num_format(config.date_format()),
            datetime_format: Format::new().set_num_format(config.datetime_format()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Names of the sheets written so far, in order
    pub fn sheet_names(&self) -> &[String] {
        &self.sheet_names
    }

    /// Add `table` as a new sheet.
    ///
    /// `options.sheet_name` must be set; reusing a sheet name is an error.
    pub fn write_sheet(&mut self, table: &Table, options: &SheetOptions) -> PluginResult<()> {
        let name = options
            .sheet_name
            .clone()
            .ok_or_else(|| PluginError::MissingKey("sheet_name".to_string()))?;

        if self
            .sheet_names
            .iter()
            .any(|existing| existing.eq_ignore_ascii_case(&name))
        {
            return Err(PluginError::Write(XlsxError::SheetnameReused(name)));
        }

        let mut worksheet = Worksheet::new();
        worksheet.set_name(&name)?;

        let writer = SheetWriter {
            table,
            options,
            float_format: options
                .float_format
                .as_deref()
                .map(FloatFormat::parse)
                .transpose()?,
            header_format: header_style::header_format(),
            date_format: &self.date_format,
            datetime_format: &self.datetime_format,
            plain: Format::new(),
        };
        writer.write(&mut worksheet)?;

        self.workbook.push_worksheet(worksheet);
        self.sheet_names.push(name.clone());
        debug!(
            "Wrote sheet '{}' ({} rows) to {}",
            name,
            table.row_count(),
            self.path.display()
        );
        Ok(())
    }

    /// Serialize the workbook into the destination file and flush it
    pub fn close(mut self) -> PluginResult<()> {
        self.workbook.save_to_writer(&mut self.file)?;
        self.file.flush()?;
        Ok(())
    }
}

/// Apply `engine_kwargs`, which take the xlsxwriter shape `{options: {...}}`
fn apply_engine_kwargs(workbook: &mut Workbook, kwargs: &Options) -> PluginResult<()> {
    for (key, value) in kwargs {
        match key.as_str() {
            "options" => {
                let options = value.as_object().ok_or_else(|| {
                    PluginError::Config(format!(
                        "engine_kwargs 'options' must be a mapping, got {}",
                        value
                    ))
                })?;
                apply_workbook_options(workbook, options)?;
            }
            other => {
                return Err(PluginError::Config(format!(
                    "Unsupported engine_kwargs key '{}': only 'options' is accepted",
                    other
                )))
            }
        }
    }
    Ok(())
}

/// Workbook constructor options this writer can honour
fn apply_workbook_options(workbook: &mut Workbook, options: &Options) -> PluginResult<()> {
    for (key, value) in options {
        match key.as_str() {
            "use_zip64" => {
                workbook.use_zip_large_file(expect_bool(key, value)?);
            }
            // workbooks are always assembled in memory
            "in_memory" | "tmpdir" => {}
            // strings are always written as plain text
            "strings_to_numbers" | "strings_to_formulas" | "strings_to_urls" => {
                if expect_bool(key, value)? {
                    return Err(PluginError::Config(format!(
                        "Workbook option '{}: true' is not supported",
                        key
                    )));
                }
            }
            other => {
                return Err(PluginError::Config(format!(
                    "Unsupported workbook option '{}'",
                    other
                )))
            }
        }
    }
    Ok(())
}

fn expect_bool(key: &str, value: &Value) -> PluginResult<bool> {
    value
        .as_bool()
        .ok_or_else(|| PluginError::Config(format!("'{}' must be a boolean, got {}", key, value)))
}

//==============================================================================
// Sheet layout
//==============================================================================

/// Lays out one table on a worksheet: header rows, index column, data cells
struct SheetWriter<'a> {
    table: &'a Table,
    options: &'a SheetOptions,
    float_format: Option<FloatFormat>,
    header_format: Option<Format>,
    date_format: &'a Format,
    datetime_format: &'a Format,
    plain: Format,
}

impl SheetWriter<'_> {
    fn write(&self, worksheet: &mut Worksheet) -> PluginResult<()> {
        let levels = self.table.header_levels();
        let multi_level = levels > 1;

        if multi_level && !self.options.index {
            return Err(PluginError::NotImplemented(
                "writing multi-level column headers without an index column".to_string(),
            ));
        }

        let col_offset: u16 = if self.options.index { 1 } else { 0 };

        // last header row written; data starts below it
        let mut row_counter: u32 = match &self.options.header {
            HeaderOption::Enabled(false) => 0,
            HeaderOption::Aliases(aliases) => {
                self.write_aliases(worksheet, aliases, col_offset)?;
                0
            }
            HeaderOption::Enabled(true) => {
                if multi_level && self.options.merge_cells {
                    self.write_merged_header(worksheet, levels, col_offset)?
                } else {
                    self.write_flat_header(worksheet, col_offset)?;
                    0
                }
            }
        };

        if self.options.header.is_enabled() {
            row_counter += 1;
        }

        if self.options.index {
            if multi_level {
                row_counter += 1;
            }
            let index_name = self.table.index.as_ref().and_then(|i| i.name.as_deref());
            if let (Some(name), true) = (index_name, self.options.header.is_enabled()) {
                worksheet.write_string_with_format(row_counter - 1, 0, name, self.header())?;
            }
            for row in 0..self.table.row_count() {
                let value = self.table.index_value(row);
                let sheet_row = row_index(row_counter, row)?;
                self.write_value(worksheet, sheet_row, 0, &value, self.header())?;
            }
        }

        for row in 0..self.table.row_count() {
            let sheet_row = row_index(row_counter, row)?;
            for col in 0..self.table.column_count() {
                self.write_value(
                    worksheet,
                    sheet_row,
                    column_index(col_offset, col)?,
                    self.table.cell(row, col),
                    &self.plain,
                )?;
            }
        }

        Ok(())
    }

    fn header(&self) -> &Format {
        self.header_format.as_ref().unwrap_or(&self.plain)
    }

    fn write_aliases(
        &self,
        worksheet: &mut Worksheet,
        aliases: &[String],
        col_offset: u16,
    ) -> PluginResult<()> {
        if self.table.header_levels() > 1 {
            return Err(PluginError::Config(
                "header aliases cannot be used with multi-level column headers".to_string(),
            ));
        }
        if aliases.len() != self.table.column_count() {
            return Err(PluginError::Config(format!(
                "Writing {} cols but got {} aliases",
                self.table.column_count(),
                aliases.len()
            )));
        }
        for (col, alias) in aliases.iter().enumerate() {
            worksheet.write_string_with_format(
                0,
                column_index(col_offset, col)?,
                alias,
                self.header(),
            )?;
        }
        Ok(())
    }

    /// One header row; multi-level labels are joined with '.'
    fn write_flat_header(&self, worksheet: &mut Worksheet, col_offset: u16) -> PluginResult<()> {
        for (col, column) in self.table.columns.iter().enumerate() {
            worksheet.write_string_with_format(
                0,
                column_index(col_offset, col)?,
                column.name(),
                self.header(),
            )?;
        }
        Ok(())
    }

    /// One row per label level with repeated labels merged. Returns the last header row.
    fn write_merged_header(
        &self,
        worksheet: &mut Worksheet,
        levels: usize,
        col_offset: u16,
    ) -> PluginResult<u32> {
        let labels: Vec<Vec<&str>> = self
            .table
            .columns
            .iter()
            .map(|c| {
                (0..levels)
                    .map(|level| c.label.get(level).map(String::as_str).unwrap_or(""))
                    .collect()
            })
            .collect();

        for level in 0..levels {
            let row = level as u32;
            for (start, span) in label_spans(&labels, level) {
                let first_col = column_index(col_offset, start)?;
                let text = labels[start][level];
                if span > 1 {
                    let last_col = column_index(col_offset, start + span - 1)?;
                    worksheet.merge_range(row, first_col, row, last_col, text, self.header())?;
                } else {
                    worksheet.write_string_with_format(row, first_col, text, self.header())?;
                }
            }
        }

        Ok(levels as u32 - 1)
    }

    fn write_value(
        &self,
        worksheet: &mut Worksheet,
        row: u32,
        col: u16,
        value: &CellValue,
        format: &Format,
    ) -> PluginResult<()> {
        if value.is_na() {
            if !self.options.na_rep.is_empty() {
                worksheet.write_string_with_format(row, col, &self.options.na_rep, format)?;
            }
            return Ok(());
        }

        match value {
            CellValue::Float(f) if f.is_infinite() => {
                let text = if *f > 0.0 {
                    self.options.inf_rep.clone()
                } else {
                    format!("-{}", self.options.inf_rep)
                };
                worksheet.write_string_with_format(row, col, text, format)?;
            }
            CellValue::Float(f) => {
                let number = match &self.float_format {
                    Some(float_format) => float_format.apply(*f),
                    None => *f,
                };
                worksheet.write_number_with_format(row, col, number, format)?;
            }
            CellValue::Int(i) => {
                worksheet.write_number_with_format(row, col, *i as f64, format)?;
            }
            CellValue::Bool(b) => {
                worksheet.write_boolean_with_format(row, col, *b, format)?;
            }
            CellValue::Text(s) => {
                worksheet.write_string_with_format(row, col, s, format)?;
            }
            CellValue::Date(d) => {
                worksheet.write_datetime_with_format(row, col, &excel_date(*d)?, self.date_format)?;
            }
            CellValue::DateTime(dt) => {
                worksheet.write_datetime_with_format(
                    row,
                    col,
                    &excel_datetime(*dt)?,
                    self.datetime_format,
                )?;
            }
            CellValue::Empty => {}
        }
        Ok(())
    }
}

/// (first column, width) of each run of equal labels at `level`.
///
/// A run continues only while all outer levels match too.
fn label_spans(labels: &[Vec<&str>], level: usize) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut start = 0;
    while start < labels.len() {
        let mut end = start + 1;
        while end < labels.len() && labels[end][..=level] == labels[start][..=level] {
            end += 1;
        }
        spans.push((start, end - start));
        start = end;
    }
    spans
}

/// Worksheet column for table column `col`, failing instead of wrapping
fn column_index(offset: u16, col: usize) -> PluginResult<u16> {
    u16::try_from(col)
        .ok()
        .and_then(|col| offset.checked_add(col))
        .ok_or(PluginError::Write(XlsxError::RowColumnLimitError))
}

fn row_index(offset: u32, row: usize) -> PluginResult<u32> {
    u32::try_from(row)
        .ok()
        .and_then(|row| offset.checked_add(row))
        .ok_or(PluginError::Write(XlsxError::RowColumnLimitError))
}

fn excel_date(date: NaiveDate) -> PluginResult<ExcelDateTime> {
    let year = u16::try_from(date.year()).map_err(|_| {
        PluginError::Config(format!("Date {} is outside the Excel date range", date))
    })?;
    Ok(ExcelDateTime::from_ymd(year, date.month() as u8, date.day() as u8)?)
}

fn excel_datetime(datetime: NaiveDateTime) -> PluginResult<ExcelDateTime> {
    let seconds = f64::from(datetime.second()) + f64::from(datetime.nanosecond()) / 1e9;
    Ok(excel_date(datetime.date())?.and_hms(
        datetime.hour() as u16,
        datetime.minute() as u8,
        seconds,
    )?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_spans_top_level() {
        let labels = vec![
            vec!["sales", "q1"],
            vec!["sales", "q2"],
            vec!["cost", "q1"],
        ];
        assert_eq!(label_spans(&labels, 0), vec![(0, 2), (2, 1)]);
        assert_eq!(label_spans(&labels, 1), vec![(0, 1), (1, 1), (2, 1)]);
    }

    #[test]
    fn test_label_spans_respect_outer_levels() {
        let labels = vec![vec!["a", "x"], vec!["b", "x"]];
        assert_eq!(label_spans(&labels, 1), vec![(0, 1), (1, 1)]);
    }

    #[test]
    fn test_label_spans_empty() {
        let labels: Vec<Vec<&str>> = Vec::new();
        assert!(label_spans(&labels, 0).is_empty());
    }

    #[test]
    fn test_column_index_overflow() {
        assert_eq!(column_index(1, 3).unwrap(), 4);
        assert!(column_index(0, 65_535).is_ok());
        assert!(column_index(0, 65_536).is_err());
        assert!(column_index(1, 65_535).is_err());
        assert!(row_index(2, 10).is_ok());
        assert!(row_index(1, u32::MAX as usize).is_err());
    }

    #[test]
    fn test_write_sheet_too_many_columns() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = OutputConfig::new(dir.path().join("out.xlsx"));
        let mut writer = WorkbookWriter::open(&config).unwrap();
        let mut table = Table::new();
        for i in 0..65_537 {
            table.add_column(crate::types::Column::new(format!("c{}", i), Vec::new()));
        }
        let options = SheetOptions {
            sheet_name: Some("wide".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            writer.write_sheet(&table, &options),
            Err(PluginError::Write(_))
        ));
        assert!(writer.sheet_names().is_empty());
    }

    #[test]
    fn test_excel_date_rejects_years_before_1900() {
        let date = NaiveDate::from_ymd_opt(1899, 12, 31).unwrap();
        assert!(excel_date(date).is_err());
        let negative = NaiveDate::from_ymd_opt(-5, 1, 1).unwrap();
        assert!(matches!(excel_date(negative), Err(PluginError::Config(_))));
    }

    #[test]
    fn test_excel_datetime_accepts_fractional_seconds() {
        let dt = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_milli_opt(12, 30, 15, 250)
            .unwrap();
        assert!(excel_datetime(dt).is_ok());
    }

    #[test]
    fn test_open_rejects_other_engine() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut config = OutputConfig::new(dir.path().join("out.xlsx"));
        config.engine = "openpyxl".to_string();
        assert!(matches!(
            WorkbookWriter::open(&config),
            Err(PluginError::Config(_))
        ));
        assert!(!dir.path().join("out.xlsx").exists());
    }

    #[test]
    fn test_open_rejects_append_mode() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut config = OutputConfig::new(dir.path().join("out.xlsx"));
        config.mode = "a".to_string();
        assert!(WorkbookWriter::open(&config).is_err());
    }

    fn kwargs(value: Value) -> Options {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_engine_kwargs_options() {
        let mut workbook = Workbook::new();
        let accepted = kwargs(serde_json::json!({
            "options": {"use_zip64": true, "in_memory": true, "strings_to_urls": false}
        }));
        assert!(apply_engine_kwargs(&mut workbook, &accepted).is_ok());
        assert!(apply_engine_kwargs(&mut workbook, &Options::new()).is_ok());
    }

    #[test]
    fn test_engine_kwargs_rejects_unsupported() {
        let mut workbook = Workbook::new();
        for value in [
            serde_json::json!({"use_zip64": true}),
            serde_json::json!({"options": true}),
            serde_json::json!({"options": {"constant_memory": true}}),
            serde_json::json!({"options": {"strings_to_numbers": true}}),
            serde_json::json!({"options": {"use_zip64": "yes"}}),
        ] {
            let result = apply_engine_kwargs(&mut workbook, &kwargs(value));
            assert!(matches!(result, Err(PluginError::Config(_))));
        }
    }

    #[test]
    fn test_open_rejects_unknown_engine_kwargs() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut config = OutputConfig::new(dir.path().join("out.xlsx"));
        config
            .engine_kwargs
            .insert("constant_memory".to_string(), Value::Bool(true));
        assert!(WorkbookWriter::open(&config).is_err());
        assert!(!dir.path().join("out.xlsx").exists());
    }

    #[test]
    fn test_write_sheet_requires_name() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = OutputConfig::new(dir.path().join("out.xlsx"));
        let mut writer = WorkbookWriter::open(&config).unwrap();
        let result = writer.write_sheet(&Table::new(), &SheetOptions::default());
        assert!(matches!(result, Err(PluginError::MissingKey(_))));
    }

    #[test]
    fn test_write_sheet_rejects_duplicate_name() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = OutputConfig::new(dir.path().join("out.xlsx"));
        let mut writer = WorkbookWriter::open(&config).unwrap();
        let options = SheetOptions {
            sheet_name: Some("orders".to_string()),
            ..Default::default()
        };
        writer.write_sheet(&Table::new(), &options).unwrap();

        let again = SheetOptions {
            sheet_name: Some("ORDERS".to_string()),
            ..Default::default()
        };
        let result = writer.write_sheet(&Table::new(), &again);
        assert!(matches!(
            result,
            Err(PluginError::Write(XlsxError::SheetnameReused(_)))
        ));
        assert_eq!(writer.sheet_names(), &["orders".to_string()]);
    }

    #[test]
    fn test_write_sheet_rejects_invalid_name() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = OutputConfig::new(dir.path().join("out.xlsx"));
        let mut writer = WorkbookWriter::open(&config).unwrap();
        let options = SheetOptions {
            sheet_name: Some("a/b".to_string()),
            ..Default::default()
        };
        assert!(writer.write_sheet(&Table::new(), &options).is_err());
        assert!(writer.sheet_names().is_empty());
    }
}
