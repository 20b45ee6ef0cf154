//! `{field}` substitution for location templates
//!
//! A template is resolved in a single pass against a flat mapping, usually the
//! request it belongs to. Substituted values are not scanned again.

use crate::config::Options;
use crate::error::{PluginError, PluginResult};
use regex::Regex;
use serde_json::Value;

/// Replace every `{name}` with the value of `name` in `fields`.
///
/// `{{` and `}}` produce literal braces. Unknown names, empty `{}` and
/// unmatched braces are errors.
pub fn render(template: &str, fields: &Options) -> PluginResult<String> {
    let token = Regex::new(r"\{\{|\}\}|\{([^{}]*)\}|[{}]")
        .map_err(|e| PluginError::Template(format!("Regex error: {}", e)))?;

    let mut result = String::with_capacity(template.len());
    let mut last = 0;

    for captures in token.captures_iter(template) {
        let Some(whole) = captures.get(0) else {
            continue;
        };
        result.push_str(&template[last..whole.start()]);
        last = whole.end();

        match whole.as_str() {
            "{{" => result.push('{'),
            "}}" => result.push('}'),
            "{" | "}" => {
                return Err(PluginError::Template(format!(
                    "Single '{}' at position {} in '{}'",
                    whole.as_str(),
                    whole.start(),
                    template
                )))
            }
            _ => {
                let name = captures.get(1).map(|m| m.as_str().trim()).unwrap_or("");
                if name.is_empty() {
                    return Err(PluginError::Template(format!(
                        "Empty placeholder in '{}'",
                        template
                    )));
                }
                let value = fields.get(name).ok_or_else(|| {
                    PluginError::Template(format!(
                        "Unknown field '{}' in '{}'",
                        name, template
                    ))
                })?;
                result.push_str(&value_text(value));
            }
        }
    }

    result.push_str(&template[last..]);
    Ok(result)
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
