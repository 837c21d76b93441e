//! CLI output formatting.
//!
//! Every command produces a serializable value; the formatter renders it as
//! compact JSON, pretty JSON or indented `key: value` text.

use serde::Serialize;
use serde_json::Value;
use std::fmt::Write as _;

use crate::error::{Error, Result};

// ═══════════════════════════════════════════════════════════════════════════════
// OUTPUT FORMAT
// ═══════════════════════════════════════════════════════════════════════════════

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Indented `key: value` text
    Text,
    /// Compact JSON
    Json,
    /// Pretty JSON
    #[default]
    JsonPretty,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "json-pretty" | "pretty" => Ok(OutputFormat::JsonPretty),
            _ => Err(format!("Unknown format: {}", s)),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// OUTPUT FORMATTER
// ═══════════════════════════════════════════════════════════════════════════════

/// Renders command results
#[derive(Debug, Clone, Copy, Default)]
pub struct OutputFormatter {
    format: OutputFormat,
}

impl OutputFormatter {
    /// Create a formatter
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Selected format
    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Render a value
    pub fn render<T: Serialize>(&self, data: &T) -> Result<String> {
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string(data)?),
            OutputFormat::JsonPretty => Ok(serde_json::to_string_pretty(data)?),
            OutputFormat::Text => {
                let mut out = String::new();
                write_text(&mut out, &serde_json::to_value(data)?, 0)?;
                Ok(out)
            }
        }
    }

    /// Render a value to stdout
    pub fn print<T: Serialize>(&self, data: &T) -> Result<()> {
        println!("{}", self.render(data)?.trim_end());
        Ok(())
    }
}

fn write_text(out: &mut String, value: &Value, indent: usize) -> Result<()> {
    let prefix = "  ".repeat(indent);
    let fmt_err = |e: std::fmt::Error| Error::Serialization(e.to_string());
    match value {
        Value::Object(map) => {
            for (key, value) in map {
                if matches!(value, Value::Object(_) | Value::Array(_)) {
                    writeln!(out, "{}{}:", prefix, key).map_err(fmt_err)?;
                    write_text(out, value, indent + 1)?;
                } else {
                    writeln!(out, "{}{}: {}", prefix, key, format_value(value)).map_err(fmt_err)?;
                }
            }
        }
        Value::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                writeln!(out, "{}[{}]:", prefix, i).map_err(fmt_err)?;
                write_text(out, item, indent + 1)?;
            }
        }
        _ => writeln!(out, "{}{}", prefix, format_value(value)).map_err(fmt_err)?,
    }
    Ok(())
}

/// Format a scalar JSON value for text output
fn format_value(value: &Value) -> String {
    match value {
        Value::Null => "null".into(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
