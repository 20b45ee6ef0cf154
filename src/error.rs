use thiserror::Error;

pub type PluginResult<T> = Result<T, PluginError>;

#[derive(Error, Debug)]
pub enum PluginError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Missing required key: {0}")]
    MissingKey(String),

    #[error("Template error: {0}")]
    Template(String),

    #[error("Excel read error: {0}")]
    Read(#[from] calamine::Error),

    #[error("Excel write error: {0}")]
    Write(#[from] rust_xlsxwriter::XlsxError),

    #[error("Remote storage error: {0}")]
    Storage(#[from] object_store::Error),

    #[error("Sheet not found: {0}")]
    SheetNotFound(String),

    #[error("Not implemented: {0}")]
    NotImplemented(String),

    #[error("Plugin '{0}' used before initialize()")]
    NotInitialized(String),

    #[error("Workbook writer for {0} is already closed")]
    WriterClosed(String),
}
