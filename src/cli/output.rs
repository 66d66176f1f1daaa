// Output formatting for CLI

use crate::cli::config::OutputFormat;
use crate::cli::CliResult;
use serde::Serialize;
use std::io::Write;

/// Format and output records
pub struct OutputFormatter {
    format: OutputFormat,
    quiet: bool,
}

impl OutputFormatter {
    pub fn new(format: OutputFormat, quiet: bool) -> Self {
        Self { format, quiet }
    }

    /// Output one serializable record
    pub fn output_record<T: Serialize>(
        &self,
        record: &T,
        writer: &mut impl Write,
    ) -> CliResult<()> {
        let value = serde_json::to_value(record)?;
        match self.format {
            OutputFormat::Pretty => {
                writeln!(writer, "{}", serde_json::to_string_pretty(&value)?)?;
            }
            OutputFormat::Json => {
                writeln!(writer, "{}", serde_json::to_string(&value)?)?;
            }
            OutputFormat::Table => {
                self.output_table(&value, writer)?;
            }
        }
        Ok(())
    }

    /// Output as table
    fn output_table(&self, value: &serde_json::Value, writer: &mut impl Write) -> CliResult<()> {
        if let Some(obj) = value.as_object() {
            let max_key_len = obj.keys().map(|k| k.len()).max().unwrap_or(0);

            writeln!(writer, "{}", "=".repeat(max_key_len + 30))?;

            for (key, value) in obj {
                writeln!(
                    writer,
                    "{:<width$}: {}",
                    format!("{}:", key),
                    format_value(value),
                    width = max_key_len + 2
                )?;
            }

            writeln!(writer, "{}", "=".repeat(max_key_len + 30))?;
        }
        Ok(())
    }

    /// Print success message
    pub fn print_success(&self, message: &str) {
        if !self.quiet {
            eprintln!("✓ {}", message);
        }
    }

    /// Print error message
    pub fn print_error(&self, message: &str) {
        eprintln!("✗ {}", message);
    }
}

/// Format a JSON value for a table cell
fn format_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => "(null)".to_string(),
        serde_json::Value::Bool(b) => b.to_string(),
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::Array(arr) => {
            if arr.iter().all(|v| v.is_number() || v.is_string()) {
                let items: Vec<String> = arr.iter().map(format_value).collect();
                format!("[{}]", items.join(", "))
            } else {
                format!("[{} items]", arr.len())
            }
        }
        serde_json::Value::Object(obj) => {
            if obj.is_empty() {
                "{}".to_string()
            } else {
                format!("{{{} items}}", obj.len())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_is_one_line() {
        let formatter = OutputFormatter::new(OutputFormat::Json, true);
        let mut out = Vec::new();
        formatter.output_record(&json!({"serial": 1, "pages": 3}), &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.lines().count(), 1);
        assert!(text.contains("\"pages\":3"));
    }

    #[test]
    fn test_table_rows() {
        let formatter = OutputFormatter::new(OutputFormat::Table, true);
        let mut out = Vec::new();
        let record = json!({"flags": ["BEGIN_STREAM"], "packet_sizes": [5, 7]});
        formatter.output_record(&record, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("flags:"));
        assert!(text.contains("[BEGIN_STREAM]"));
        assert!(text.contains("[5, 7]"));
    }

    #[test]
    fn test_format_nested_values() {
        assert_eq!(format_value(&json!(null)), "(null)");
        assert_eq!(format_value(&json!([{"a": 1}])), "[1 items]");
        assert_eq!(format_value(&json!({"a": 1, "b": 2})), "{2 items}");
    }
}
