//! Excel plugin - workbook source and sink for SQL data tools
//!
//! This library lets a host tool read a sheet of an Excel workbook into a
//! table (`load`) and write query results back out as sheets of one workbook
//! (`store`).
//!
//! # Features
//!
//! - Templated source locations (`data/{name}.xlsx`)
//! - Local files and `s3://` objects (credentials from plugin config)
//! - Sheet selection by name or position
//! - One lazily opened output workbook per plugin, one sheet per stored relation
//! - Per-relation overrides for sheet name, NA/inf representation, float format,
//!   header, index and merged headers
//!
//! # Example
//!
//! ```no_run
//! use excel_plugin::config::PluginConfig;
//! use excel_plugin::plugin::{ExcelPlugin, Plugin, SourceRequest, TargetRequest};
//!
//! let config = PluginConfig::from_yaml_str("output:\n  file: results.xlsx\n")?;
//! let mut plugin = ExcelPlugin::with_config(config)?;
//!
//! let request = SourceRequest::with_location("data/{month}.xlsx").set("month", "jan");
//! let table = plugin.load(&request)?;
//!
//! plugin.store(&TargetRequest::new("jan_summary", table))?;
//! plugin.close()?;
//! # Ok::<(), excel_plugin::error::PluginError>(())
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod excel;
pub mod plugin;
pub mod storage;
pub mod template;
pub mod types;

// Re-export commonly used types
pub use config::{OutputConfig, PluginConfig, SheetOptions};
pub use error::{PluginError, PluginResult};
pub use plugin::{ExcelPlugin, Plugin, SheetSelector, SourceRequest, TargetRequest};
pub use types::{CellValue, Column, Table};
