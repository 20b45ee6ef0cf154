//! printf-style float formats (`%.2f`, `%.3e`, `%f`)
//!
//! Formatting rounds the value; the cell stays numeric.

use crate::error::{PluginError, PluginResult};
use regex::Regex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Notation {
    Fixed,
    Exponent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FloatFormat {
    precision: usize,
    notation: Notation,
}

impl FloatFormat {
    pub fn parse(format: &str) -> PluginResult<Self> {
        let pattern = Regex::new(r"^%(?:\.(\d+))?([fFeE])$")
            .map_err(|e| PluginError::Config(format!("Regex error: {}", e)))?;

        let captures = pattern.captures(format.trim()).ok_or_else(|| {
            PluginError::Config(format!(
                "Unsupported float_format '{}': expected %f, %.Nf, %e or %.Ne",
                format
            ))
        })?;

        let precision = match captures.get(1) {
            Some(digits) => digits.as_str().parse::<usize>().map_err(|e| {
                PluginError::Config(format!("Invalid precision in '{}': {}", format, e))
            })?,
            None => 6,
        };
        let notation = match captures.get(2).map(|m| m.as_str()) {
            Some("e") | Some("E") => Notation::Exponent,
            _ => Notation::Fixed,
        };

        Ok(Self {
            precision,
            notation,
        })
    }

    /// Round `value` the way the format would print it
    pub fn apply(&self, value: f64) -> f64 {
        if !value.is_finite() {
            return value;
        }
        let text = match self.notation {
            Notation::Fixed => format!("{:.*}", self.precision, value),
            Notation::Exponent => format!("{:.*e}", self.precision, value),
        };
        text.parse::<f64>().unwrap_or(value)
    }
}
