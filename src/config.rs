//! Plugin configuration
//!
//! The host hands the plugin a flat option mapping once, at initialization.
//! The optional `output` mapping configures the workbook writer and also
//! provides the base options for every sheet written by `store`.

use crate::error::{PluginError, PluginResult};
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};

/// Option mapping as supplied by the host tool
pub type Options = Map<String, Value>;

/// Plugin option → process environment variable read by the storage layer
pub const CREDENTIAL_VARS: [(&str, &str); 3] = [
    ("s3_access_key_id", "AWS_ACCESS_KEY_ID"),
    ("s3_secret_access_key", "AWS_SECRET_ACCESS_KEY"),
    ("s3_region", "AWS_DEFAULT_REGION"),
];

pub const DEFAULT_MODE: &str = "w";
pub const DEFAULT_ENGINE: &str = "xlsxwriter";
pub const DEFAULT_DATE_FORMAT: &str = "YYYY-MM-DD";
pub const DEFAULT_DATETIME_FORMAT: &str = "YYYY-MM-DD HH:MM:SS";

//==============================================================================
// Plugin configuration
//==============================================================================

/// Validated plugin configuration
#[derive(Debug, Clone, Default)]
pub struct PluginConfig {
    options: Options,
    output: Option<OutputConfig>,
}

impl PluginConfig {
    /// Validate an option mapping.
    ///
    /// Fails when `output` is present but is not a mapping with a `file` key.
    pub fn from_options(options: Options) -> PluginResult<Self> {
        let output = match options.get("output") {
            None => None,
            Some(Value::Object(map)) => {
                if !map.contains_key("file") {
                    return Err(PluginError::Config(
                        "'output' must contain a 'file' key".to_string(),
                    ));
                }
                Some(serde_json::from_value::<OutputConfig>(Value::Object(map.clone()))?)
            }
            Some(other) => {
                return Err(PluginError::Config(format!(
                    "'output' must be a mapping, got {}",
                    other
                )))
            }
        };

        Ok(Self { options, output })
    }

    /// Parse a YAML (or JSON) mapping
    pub fn from_yaml_str(content: &str) -> PluginResult<Self> {
        let value: Value = serde_yaml::from_str(content)?;
        match value {
            Value::Object(options) => Self::from_options(options),
            Value::Null => Self::from_options(Options::new()),
            other => Err(PluginError::Config(format!(
                "plugin configuration must be a mapping, got {}",
                other
            ))),
        }
    }

    pub fn from_file(path: &Path) -> PluginResult<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.options.get(key)
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Typed view of the `output` mapping
    pub fn output(&self) -> Option<&OutputConfig> {
        self.output.as_ref()
    }

    /// Raw `output` mapping, including keys the writer itself ignores
    pub fn output_options(&self) -> Option<&Options> {
        self.options.get("output").and_then(Value::as_object)
    }

    /// Environment assignments for the credential options that are present
    pub fn credentials(&self) -> PluginResult<Vec<(&'static str, String)>> {
        let mut vars = Vec::new();
        for (key, var) in CREDENTIAL_VARS {
            match self.options.get(key) {
                None => {}
                Some(Value::String(s)) => vars.push((var, s.clone())),
                Some(other) => {
                    return Err(PluginError::Config(format!(
                        "'{}' must be a string, got {}",
                        key, other
                    )))
                }
            }
        }
        Ok(vars)
    }
}

//==============================================================================
// Output (writer) configuration
//==============================================================================

/// Settings used once, when the workbook writer is opened
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    pub file: PathBuf,
    #[serde(default = "default_mode")]
    pub mode: String,
    #[serde(default = "default_engine")]
    pub engine: String,
    #[serde(default)]
    pub engine_kwargs: Options,
    #[serde(default)]
    pub date_format: Option<String>,
    #[serde(default)]
    pub datetime_format: Option<String>,
    #[serde(default)]
    pub header_styling: Option<bool>,
}

impl OutputConfig {
    pub fn new(file: impl Into<PathBuf>) -> Self {
        Self {
            file: file.into(),
            mode: default_mode(),
            engine: default_engine(),
            engine_kwargs: Options::new(),
            date_format: None,
            datetime_format: None,
            header_styling: None,
        }
    }

    pub fn date_format(&self) -> &str {
        self.date_format.as_deref().unwrap_or(DEFAULT_DATE_FORMAT)
    }

    pub fn datetime_format(&self) -> &str {
        self.datetime_format
            .as_deref()
            .unwrap_or(DEFAULT_DATETIME_FORMAT)
    }

    /// Only an explicit `false` turns header styling off
    pub fn disables_header_styling(&self) -> bool {
        self.header_styling == Some(false)
    }
}

fn default_mode() -> String {
    DEFAULT_MODE.to_string()
}

fn default_engine() -> String {
    DEFAULT_ENGINE.to_string()
}

//==============================================================================
// Per-sheet options
//==============================================================================

/// Header row setting: on/off, or replacement names for the columns
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum HeaderOption {
    Enabled(bool),
    Aliases(Vec<String>),
}

impl HeaderOption {
    pub fn is_enabled(&self) -> bool {
        !matches!(self, HeaderOption::Enabled(false))
    }
}

impl Default for HeaderOption {
    fn default() -> Self {
        HeaderOption::Enabled(true)
    }
}

/// Options for writing one sheet, after merging `output` with per-call overrides
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SheetOptions {
    #[serde(default, deserialize_with = "string_or_number")]
    pub sheet_name: Option<String>,
    #[serde(default)]
    pub na_rep: String,
    #[serde(default)]
    pub float_format: Option<String>,
    #[serde(default)]
    pub header: HeaderOption,
    #[serde(default = "default_true")]
    pub index: bool,
    #[serde(default = "default_true")]
    pub merge_cells: bool,
    #[serde(default = "default_inf_rep")]
    pub inf_rep: String,
}

impl SheetOptions {
    /// Merge `overrides` over `base` (overrides win) and parse the result
    pub fn merged(base: Option<&Options>, overrides: &Options) -> PluginResult<Self> {
        let mut merged = base.cloned().unwrap_or_default();
        merged.extend(overrides.iter().map(|(k, v)| (k.clone(), v.clone())));
        Ok(serde_json::from_value(Value::Object(merged))?)
    }
}

impl Default for SheetOptions {
    fn default() -> Self {
        Self {
            sheet_name: None,
            na_rep: String::new(),
            float_format: None,
            header: HeaderOption::default(),
            index: true,
            merge_cells: true,
            inf_rep: default_inf_rep(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_inf_rep() -> String {
    "inf".to_string()
}

/// Sheet names may be written as numbers in YAML
fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(serde::de::Error::custom(format!(
            "sheet_name must be a string, got {}",
            other
        ))),
    }
}
