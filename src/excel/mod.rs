//! Excel import/export for the plugin
//!
//! - Import: workbook sheet (.xlsx/.xlsm/.xlsb/.xls/.ods) → Table
//! - Export: Table → sheet of a lazily opened .xlsx writer

mod exporter;
pub mod float_format;
pub mod header_style;
mod importer;

pub use exporter::WorkbookWriter;
pub use float_format::FloatFormat;
pub use header_style::{disable_header_styling, header_styling_enabled};
pub use importer::ExcelImporter;
