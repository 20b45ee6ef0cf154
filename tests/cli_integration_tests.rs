//! CLI Integration Tests
//!
//! Tests the binary directly using assert_cmd to exercise main.rs code paths.

#![allow(deprecated)] // Command::cargo_bin deprecation - no stable replacement yet

use assert_cmd::Command;
use calamine::{open_workbook, Data, Reader, Xlsx};
use excel_plugin::config::PluginConfig;
use excel_plugin::plugin::{ExcelPlugin, Plugin, TargetRequest};
use excel_plugin::types::{CellValue, Column, Table};
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn cmd() -> Command {
    let mut cmd = Command::cargo_bin("excel-plugin").unwrap();
    cmd.env_remove("EXCEL_PLUGIN_CONFIG");
    cmd
}

/// Workbook with sheets "fruit" and "towns", no index column
fn write_workbook(path: &Path) {
    let yaml = format!("output:\n  file: {}\n  index: false\n", path.display());
    let mut plugin =
        ExcelPlugin::with_config(PluginConfig::from_yaml_str(&yaml).unwrap()).unwrap();

    let mut fruit = Table::new();
    fruit.add_column(Column::new("id", vec![CellValue::Int(1), CellValue::Int(2)]));
    fruit.add_column(Column::new(
        "item",
        vec![CellValue::from("apple"), CellValue::from("pear")],
    ));
    plugin.store(&TargetRequest::new("fruit", fruit)).unwrap();

    let mut towns = Table::new();
    towns.add_column(Column::new("town", vec![CellValue::from("Bergen")]));
    plugin.store(&TargetRequest::new("towns", towns)).unwrap();
    plugin.close().unwrap();
}

// ═══════════════════════════════════════════════════════════════════════════
// HELP AND VERSION TESTS
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_cli_help() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("excel-plugin"))
        .stdout(predicate::str::contains("COMMANDS"));
}

#[test]
fn test_cli_version() {
    cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("excel-plugin"));
}

#[test]
fn test_store_help() {
    cmd()
        .args(["store", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("header_styling"));
}

#[test]
fn test_store_requires_inputs() {
    cmd()
        .args(["store", "--config", "plugin.yaml"])
        .assert()
        .failure();
}

// ═══════════════════════════════════════════════════════════════════════════
// LOAD AND SHEETS
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_load_json() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("book.xlsx");
    write_workbook(&path);

    cmd()
        .args(["load", path.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"item\": \"apple\""))
        .stdout(predicate::str::contains("\"item\": \"pear\""));
}

#[test]
fn test_load_sheet_by_name_as_table() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("book.xlsx");
    write_workbook(&path);

    cmd()
        .args(["load", path.to_str().unwrap(), "--sheet", "towns", "--format", "table"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Bergen"))
        .stdout(predicate::str::contains("1 rows"));
}

#[test]
fn test_load_sheet_by_index_with_template() {
    let dir = TempDir::new().unwrap();
    write_workbook(&dir.path().join("jan.xlsx"));
    let template = format!("{}/{{month}}.xlsx", dir.path().display());

    cmd()
        .args(["load", &template, "--field", "month=jan", "--sheet", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Bergen"));
}

#[test]
fn test_load_unknown_sheet_fails() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("book.xlsx");
    write_workbook(&path);

    cmd()
        .args(["load", path.to_str().unwrap(), "--sheet", "nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("SheetNotFound"));
}

#[test]
fn test_load_unknown_template_field_fails() {
    cmd()
        .args(["load", "data/{month}.xlsx"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("month"));
}

#[test]
fn test_sheets_lists_names() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("book.xlsx");
    write_workbook(&path);

    cmd()
        .args(["sheets", path.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("0  fruit"))
        .stdout(predicate::str::contains("1  towns"));
}

// ═══════════════════════════════════════════════════════════════════════════
// STORE
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_store_json_inputs() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("results.xlsx");
    let config = dir.path().join("plugin.yaml");
    fs::write(
        &config,
        format!("output:\n  file: {}\n  index: false\n", output.display()),
    )
    .unwrap();

    let orders = dir.path().join("orders.json");
    fs::write(&orders, r#"[{"id": 1, "total": 9.5}, {"id": 2, "total": null}]"#).unwrap();
    let customers = dir.path().join("customers.json");
    fs::write(&customers, r#"[{"name": "Ada"}]"#).unwrap();

    cmd()
        .args(["store", "--config", config.to_str().unwrap()])
        .arg(&orders)
        .arg(&customers)
        .arg("--verbose")
        .assert()
        .success()
        .stdout(predicate::str::contains("Store Complete"))
        .stdout(predicate::str::contains("2 sheet(s)"));

    let mut workbook: Xlsx<_> = open_workbook(&output).unwrap();
    assert_eq!(workbook.sheet_names(), vec!["orders", "customers"]);
    let range = workbook.worksheet_range("orders").unwrap();
    assert_eq!(range.get_value((0, 1)), Some(&Data::String("total".to_string())));
    assert_eq!(range.get_value((1, 1)), Some(&Data::Float(9.5)));
}

#[test]
fn test_store_with_sheet_name_override() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("results.xlsx");
    let config = dir.path().join("plugin.yaml");
    fs::write(&config, format!("output:\n  file: {}\n", output.display())).unwrap();
    let input = dir.path().join("totals.json");
    fs::write(&input, r#"[{"sum": 10}]"#).unwrap();

    cmd()
        .env("EXCEL_PLUGIN_CONFIG", &config)
        .args(["store", "--override", "sheet_name=Summary"])
        .arg(&input)
        .assert()
        .success();

    let workbook: Xlsx<_> = open_workbook(&output).unwrap();
    assert_eq!(workbook.sheet_names(), vec!["Summary"]);
}

#[test]
fn test_store_without_output_section_fails() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("plugin.yaml");
    fs::write(&config, "s3_region: eu-west-1\n").unwrap();
    let input = dir.path().join("t.json");
    fs::write(&input, "[]").unwrap();

    cmd()
        .args(["store", "--config", config.to_str().unwrap()])
        .arg(&input)
        .assert()
        .failure()
        .stderr(predicate::str::contains("MissingKey"));
}

#[test]
fn test_store_rejects_non_array_input() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("results.xlsx");
    let config = dir.path().join("plugin.yaml");
    fs::write(&config, format!("output:\n  file: {}\n", output.display())).unwrap();
    let input = dir.path().join("bad.json");
    fs::write(&input, r#"{"id": 1}"#).unwrap();

    cmd()
        .args(["store", "--config", config.to_str().unwrap()])
        .arg(&input)
        .assert()
        .failure()
        .stderr(predicate::str::contains("JSON array"));
}

#[test]
fn test_store_relation_with_multiple_inputs_fails() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("plugin.yaml");
    fs::write(&config, "output:\n  file: out.xlsx\n").unwrap();

    cmd()
        .args(["store", "--config", config.to_str().unwrap(), "--relation", "x"])
        .args(["a.json", "b.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--relation"));
}
