// Output formatting for CLI

use crate::cli::config::OutputFormat;

use std::io::Write;

/// Format and output reports
pub struct OutputFormatter {
    format: OutputFormat,
    quiet: bool,
}

impl OutputFormatter {
    pub fn new(format: OutputFormat, quiet: bool) -> Self {
        Self { format, quiet }
    }

    /// Output one report
    pub fn output(&self, report: &serde_json::Value, writer: &mut dyn Write) -> anyhow::Result<()> {
        match self.format {
            OutputFormat::Pretty => writeln!(writer, "{}", serde_json::to_string_pretty(report)?)?,
            OutputFormat::Json => writeln!(writer, "{}", serde_json::to_string(report)?)?,
            OutputFormat::KeyValue => self.output_key_value(report, "", writer)?,
        }
        Ok(())
    }

    /// Output as key-value pairs, nested keys joined with '.'
    fn output_key_value(&self, value: &serde_json::Value, prefix: &str, writer: &mut dyn Write) -> anyhow::Result<()> {
        match value {
            serde_json::Value::Object(obj) => {
                let mut items: Vec<_> = obj.iter().collect();
                items.sort_by(|a, b| a.0.cmp(b.0));

                for (key, value) in items {
                    let key = if prefix.is_empty() { key.clone() } else { format!("{}.{}", prefix, key) };
                    self.output_key_value(value, &key, writer)?;
                }
            }
            other => writeln!(writer, "{}: {}", prefix, self.format_value(other))?,
        }
        Ok(())
    }

    /// Format a JSON leaf for display
    fn format_value(&self, value: &serde_json::Value) -> String {
        match value {
            serde_json::Value::String(s) => s.clone(),
            serde_json::Value::Null => "(null)".to_string(),
            serde_json::Value::Bool(b) => b.to_string(),
            serde_json::Value::Number(n) => n.to_string(),
            serde_json::Value::Array(arr) => arr
                .iter()
                .map(|v| match v {
                    serde_json::Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect::<Vec<_>>()
                .join("; "),
            serde_json::Value::Object(obj) => format!("{{{} items}}", obj.len()),
        }
    }

    /// Print success message
    pub fn print_success(&self, message: &str) {
        if !self.quiet {
            println!("✓ {}", message);
        }
    }

    /// Print error message
    pub fn print_error(&self, message: &str) {
        eprintln!("✗ {}", message);
    }

    /// Print info message
    pub fn print_info(&self, message: &str) {
        if !self.quiet {
            println!("  {}", message);
        }
    }
}
