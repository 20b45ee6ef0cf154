use crate::config::{Options, PluginConfig};
use crate::error::{PluginError, PluginResult};
use crate::excel::ExcelImporter;
use crate::plugin::{ExcelPlugin, Plugin, SourceRequest, TargetRequest};
use crate::storage::Location;
use crate::template;
use crate::types::Table;
use colored::Colorize;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

/// Output format for `load`
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum LoadFormat {
    Json,
    Table,
}

/// Parse `key=value`; the value is read as a YAML scalar (`false` → bool, `3` → number)
pub fn parse_key_value(pair: &str) -> PluginResult<(String, Value)> {
    let (key, raw) = pair
        .split_once('=')
        .ok_or_else(|| PluginError::Config(format!("Expected key=value, got '{}'", pair)))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(PluginError::Config(format!("Empty key in '{}'", pair)));
    }
    let value = if raw.trim().is_empty() {
        Value::String(String::new())
    } else {
        match serde_yaml::from_str::<Value>(raw) {
            Ok(value @ (Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_))) => value,
            _ => Value::String(raw.to_string()),
        }
    };
    Ok((key.to_string(), value))
}

fn collect_pairs(pairs: &[String]) -> PluginResult<Options> {
    let mut options = Options::new();
    for pair in pairs {
        let (key, value) = parse_key_value(pair)?;
        options.insert(key, value);
    }
    Ok(options)
}

fn load_config(config: Option<&Path>) -> PluginResult<PluginConfig> {
    match config {
        Some(path) => PluginConfig::from_file(path),
        None => Ok(PluginConfig::default()),
    }
}

/// Execute the load command
pub fn load(
    location: String,
    sheet: Option<String>,
    fields: Vec<String>,
    config: Option<PathBuf>,
    format: LoadFormat,
) -> PluginResult<()> {
    let plugin = ExcelPlugin::with_config(load_config(config.as_deref())?)?;

    let mut request = SourceRequest::new(collect_pairs(&fields)?)
        .set("external_location", location);
    if let Some(sheet) = sheet {
        let selector = match sheet.parse::<u64>() {
            Ok(index) => Value::from(index),
            Err(_) => Value::String(sheet),
        };
        request = request.set("sheet_name", selector);
    }

    let table = plugin.load(&request)?;

    match format {
        LoadFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&table.to_json_records())?);
        }
        LoadFormat::Table => print_table(&table),
    }
    Ok(())
}

/// Execute the sheets command
pub fn sheets(location: String, fields: Vec<String>) -> PluginResult<()> {
    let resolved = template::render(&location, &collect_pairs(&fields)?)?;
    let importer = ExcelImporter::new(Location::parse(&resolved));
    for (index, name) in importer.sheet_names()?.iter().enumerate() {
        println!("{:>3}  {}", index, name);
    }
    Ok(())
}

/// Execute the store command
pub fn store(
    config: PathBuf,
    inputs: Vec<PathBuf>,
    relation: Option<String>,
    overrides: Vec<String>,
    verbose: bool,
) -> PluginResult<()> {
    if relation.is_some() && inputs.len() > 1 {
        return Err(PluginError::Config(
            "--relation can only be used with a single input".to_string(),
        ));
    }

    let plugin_config = PluginConfig::from_file(&config)?;
    let output = plugin_config
        .output()
        .map(|o| o.file.display().to_string())
        .ok_or_else(|| PluginError::MissingKey("output".to_string()))?;

    println!("{}", "📊 Excel Plugin - Store".bold().green());
    println!("   Config: {}", config.display());
    println!("   Output: {}\n", output);

    let overrides = collect_pairs(&overrides)?;
    let mut plugin = ExcelPlugin::with_config(plugin_config)?;

    for input in &inputs {
        let identifier = match &relation {
            Some(name) => name.clone(),
            None => relation_name(input)?,
        };
        let table = read_records(input)?;

        if verbose {
            println!(
                "   {} {} ({} columns, {} rows)",
                "→".cyan(),
                identifier.bright_blue(),
                table.column_count(),
                table.row_count()
            );
        }

        let request = TargetRequest::new(identifier, table).with_overrides(overrides.clone());
        plugin.store(&request)?;
    }

    plugin.close()?;

    println!("{}", "✅ Store Complete!".bold().green());
    println!("   {} sheet(s) written to {}\n", inputs.len(), output);
    Ok(())
}

/// Relation identifier from the input file stem
fn relation_name(input: &Path) -> PluginResult<String> {
    input
        .file_stem()
        .and_then(|s| s.to_str())
        .map(str::to_string)
        .ok_or_else(|| {
            PluginError::Config(format!("Cannot derive relation name from {}", input.display()))
        })
}

/// Read a JSON array of record objects
fn read_records(input: &Path) -> PluginResult<Table> {
    let content = fs::read_to_string(input)?;
    let value: Value = serde_json::from_str(&content)?;
    Table::from_json_records(&value).ok_or_else(|| {
        PluginError::Config(format!(
            "{} must contain a JSON array of objects",
            input.display()
        ))
    })
}

fn print_table(table: &Table) {
    let names = table.column_names();
    let rows: Vec<Vec<String>> = (0..table.row_count())
        .map(|row| {
            (0..table.column_count())
                .map(|col| table.cell(row, col).display())
                .collect()
        })
        .collect();

    let widths: Vec<usize> = names
        .iter()
        .enumerate()
        .map(|(col, name)| {
            rows.iter()
                .map(|r| r[col].chars().count())
                .chain(std::iter::once(name.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let header: Vec<String> = names
        .iter()
        .zip(&widths)
        .map(|(name, width)| format!("{:<width$}", name, width = width))
        .collect();
    println!("{}", header.join("  ").bold());

    for row in &rows {
        let line: Vec<String> = row
            .iter()
            .zip(&widths)
            .map(|(cell, width)| format!("{:<width$}", cell, width = width))
            .collect();
        println!("{}", line.join("  "));
    }
    println!("\n{} rows", table.row_count());
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_parse_key_value_scalars() {
        assert_eq!(parse_key_value("index=false").unwrap(), ("index".to_string(), json!(false)));
        assert_eq!(parse_key_value("n=3").unwrap(), ("n".to_string(), json!(3)));
        assert_eq!(
            parse_key_value("sheet_name=Totals").unwrap(),
            ("sheet_name".to_string(), json!("Totals"))
        );
    }

    #[test]
    fn test_parse_key_value_keeps_raw_text() {
        assert_eq!(
            parse_key_value("float_format=%.2f").unwrap(),
            ("float_format".to_string(), json!("%.2f"))
        );
        assert_eq!(
            parse_key_value("na_rep=").unwrap(),
            ("na_rep".to_string(), json!(""))
        );
        assert_eq!(
            parse_key_value("path=a=b").unwrap(),
            ("path".to_string(), json!("a=b"))
        );
    }

    #[test]
    fn test_parse_key_value_invalid() {
        assert!(parse_key_value("novalue").is_err());
        assert!(parse_key_value("=x").is_err());
    }

    #[test]
    fn test_relation_name() {
        assert_eq!(relation_name(Path::new("out/orders.json")).unwrap(), "orders");
    }

    #[test]
    fn test_read_records() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("orders.json");
        let mut file = fs::File::create(&path).unwrap();
        write!(file, r#"[{{"id": 1, "total": 9.5}}, {{"id": 2, "total": null}}]"#).unwrap();

        let table = read_records(&path).unwrap();
        assert_eq!(table.column_names(), vec!["id", "total"]);
        assert_eq!(table.row_count(), 2);
    }

    #[test]
    fn test_read_records_rejects_object() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, r#"{"id": 1}"#).unwrap();
        assert!(read_records(&path).is_err());
    }
}
