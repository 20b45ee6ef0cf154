//! Excel source/sink plugin
//!
//! `load` reads one sheet of a workbook named by a templated location.
//! `store` appends a sheet to a single workbook that is opened on the first
//! store and written out by `close()`.

use crate::config::{Options, PluginConfig, SheetOptions};
use crate::error::{PluginError, PluginResult};
use crate::excel::{disable_header_styling, ExcelImporter, WorkbookWriter};
use crate::storage::Location;
use crate::template;
use crate::types::Table;
use serde_json::Value;
use std::env;
use std::fmt;
use tracing::{debug, error, info};

//==============================================================================
// Host interface
//==============================================================================

/// Data source/sink plugin driven by the host tool.
///
/// Hosts call `initialize` once, then any number of `load`/`store`, then
/// `close`.
pub trait Plugin {
    fn name(&self) -> &str;

    fn initialize(&mut self, config: PluginConfig) -> PluginResult<()>;

    fn load(&self, _request: &SourceRequest) -> PluginResult<Table> {
        Err(PluginError::NotImplemented(format!(
            "load method not implemented for {}",
            self.name()
        )))
    }

    fn store(&mut self, _request: &TargetRequest) -> PluginResult<()> {
        Err(PluginError::NotImplemented(format!(
            "store method not implemented for {}",
            self.name()
        )))
    }

    fn close(&mut self) -> PluginResult<()> {
        Ok(())
    }
}

/// Which sheet to read
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SheetSelector {
    Name(String),
    Index(usize),
}

impl SheetSelector {
    pub fn from_value(value: &Value) -> PluginResult<Self> {
        match value {
            Value::String(name) => Ok(SheetSelector::Name(name.clone())),
            Value::Number(n) => n
                .as_u64()
                .map(|i| SheetSelector::Index(i as usize))
                .ok_or_else(|| {
                    PluginError::Config(format!("sheet_name index must be >= 0, got {}", n))
                }),
            other => Err(PluginError::Config(format!(
                "sheet_name must be a name or an index, got {}",
                other
            ))),
        }
    }
}

impl Default for SheetSelector {
    fn default() -> Self {
        SheetSelector::Index(0)
    }
}

impl fmt::Display for SheetSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SheetSelector::Name(name) => write!(f, "'{}'", name),
            SheetSelector::Index(index) => write!(f, "#{}", index),
        }
    }
}

/// Fields of one load request
#[derive(Debug, Clone, Default)]
pub struct SourceRequest {
    fields: Options,
}

impl SourceRequest {
    pub fn new(fields: Options) -> Self {
        Self { fields }
    }

    /// Request with just a location template
    pub fn with_location(template: impl Into<String>) -> Self {
        let mut fields = Options::new();
        fields.insert(
            "external_location".to_string(),
            Value::String(template.into()),
        );
        Self { fields }
    }

    pub fn set(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn fields(&self) -> &Options {
        &self.fields
    }

    /// The unresolved `external_location` template
    pub fn external_location(&self) -> PluginResult<&str> {
        match self.fields.get("external_location") {
            Some(Value::String(s)) => Ok(s),
            Some(other) => Err(PluginError::Config(format!(
                "external_location must be a string, got {}",
                other
            ))),
            None => Err(PluginError::MissingKey("external_location".to_string())),
        }
    }

    /// `external_location` with `{field}` placeholders filled from this request
    pub fn resolved_location(&self) -> PluginResult<String> {
        template::render(self.external_location()?, &self.fields)
    }

    /// `sheet_name` if present, else the first sheet
    pub fn sheet_selector(&self) -> PluginResult<SheetSelector> {
        match self.fields.get("sheet_name") {
            None | Some(Value::Null) => Ok(SheetSelector::default()),
            Some(value) => SheetSelector::from_value(value),
        }
    }
}

/// One store request: a relation and the table produced for it
#[derive(Debug, Clone)]
pub struct TargetRequest {
    identifier: String,
    config: Options,
    table: Table,
}

impl TargetRequest {
    pub fn new(identifier: impl Into<String>, table: Table) -> Self {
        Self {
            identifier: identifier.into(),
            config: Options::new(),
            table,
        }
    }

    /// Per-call options merged over the plugin's `output` settings
    pub fn with_overrides(mut self, overrides: Options) -> Self {
        self.config
            .insert("overrides".to_string(), Value::Object(overrides));
        self
    }

    pub fn with_config(mut self, config: Options) -> Self {
        self.config = config;
        self
    }

    /// Relation identifier, the default sheet name
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn overrides(&self) -> PluginResult<Options> {
        match self.config.get("overrides") {
            None | Some(Value::Null) => Ok(Options::new()),
            Some(Value::Object(map)) => Ok(map.clone()),
            Some(other) => Err(PluginError::Config(format!(
                "overrides must be a mapping, got {}",
                other
            ))),
        }
    }
}

//==============================================================================
// Excel plugin
//==============================================================================

/// Writer lifecycle: Pending → Open → Closed, never back
enum WriterState {
    Pending,
    Open(WorkbookWriter),
    Closed,
}

/// Reads sheets from Excel workbooks and writes results to one output workbook
pub struct ExcelPlugin {
    config: Option<PluginConfig>,
    writer: WriterState,
}

impl ExcelPlugin {
    pub fn new() -> Self {
        Self {
            config: None,
            writer: WriterState::Pending,
        }
    }

    /// Create and initialize in one step
    pub fn with_config(config: PluginConfig) -> PluginResult<Self> {
        let mut plugin = Self::new();
        plugin.initialize(config)?;
        Ok(plugin)
    }

    pub fn config(&self) -> Option<&PluginConfig> {
        self.config.as_ref()
    }

    /// The open writer, once a store has happened
    pub fn writer(&self) -> Option<&WorkbookWriter> {
        match &self.writer {
            WriterState::Open(writer) => Some(writer),
            _ => None,
        }
    }

    pub fn is_closed(&self) -> bool {
        matches!(self.writer, WriterState::Closed)
    }
}

impl Default for ExcelPlugin {
    fn default() -> Self {
        Self::new()
    }
}

impl Plugin for ExcelPlugin {
    fn name(&self) -> &str {
        "excel"
    }

    fn initialize(&mut self, config: PluginConfig) -> PluginResult<()> {
        // process-wide; read back by the S3 client, never reset
        for (var, value) in config.credentials()? {
            debug!("Setting {}", var);
            env::set_var(var, value);
        }
        self.config = Some(config);
        Ok(())
    }

    fn load(&self, request: &SourceRequest) -> PluginResult<Table> {
        let location = Location::parse(&request.resolved_location()?);
        let selector = request.sheet_selector()?;
        debug!("Loading sheet {} from {}", selector, location);
        ExcelImporter::new(location).import(&selector)
    }

    fn store(&mut self, request: &TargetRequest) -> PluginResult<()> {
        let config = self
            .config
            .as_ref()
            .ok_or_else(|| PluginError::NotInitialized("excel".to_string()))?;
        let output = config
            .output()
            .ok_or_else(|| PluginError::MissingKey("output".to_string()))?;

        match self.writer {
            WriterState::Closed => {
                return Err(PluginError::WriterClosed(output.file.display().to_string()))
            }
            WriterState::Pending => {
                let writer = WorkbookWriter::open(output)?;
                if output.disables_header_styling() {
                    disable_header_styling();
                }
                self.writer = WriterState::Open(writer);
            }
            WriterState::Open(_) => {}
        }

        let mut options = SheetOptions::merged(config.output_options(), &request.overrides()?)?;
        if options.sheet_name.is_none() {
            options.sheet_name = Some(request.identifier().to_string());
        }

        if let WriterState::Open(writer) = &mut self.writer {
            writer.write_sheet(request.table(), &options)?;
        }
        Ok(())
    }

    fn close(&mut self) -> PluginResult<()> {
        match std::mem::replace(&mut self.writer, WriterState::Closed) {
            WriterState::Open(writer) => {
                info!("Closing {}", writer.path().display());
                writer.close()
            }
            WriterState::Pending | WriterState::Closed => Ok(()),
        }
    }
}

impl Drop for ExcelPlugin {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            error!("Failed to close Excel output: {}", e);
        }
    }
}
