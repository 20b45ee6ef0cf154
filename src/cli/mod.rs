//! CLI command handlers

pub mod commands;

pub use commands::{load, sheets, store, LoadFormat};
