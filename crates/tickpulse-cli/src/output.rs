use std::io::{self, Write};

use serde_json::Value;
use tickpulse_core::Envelope;

use crate::cli::OutputFormat;
use crate::error::CliError;

pub fn render(
    envelope: &Envelope<Value>,
    format: OutputFormat,
    pretty: bool,
) -> Result<(), CliError> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    match format {
        OutputFormat::Json => {
            let payload = if pretty {
                serde_json::to_string_pretty(envelope)?
            } else {
                serde_json::to_string(envelope)?
            };
            writeln!(out, "{payload}")?;
        }
        OutputFormat::Table => write_table(&mut out, envelope)?,
    }

    Ok(())
}

fn write_table(out: &mut impl Write, envelope: &Envelope<Value>) -> Result<(), CliError> {
    writeln!(out, "schema      : {}", envelope.meta.schema_version)?;
    writeln!(out, "generated_at: {}", envelope.meta.generated_at)?;
    writeln!(out, "provider    : {}", envelope.meta.provider)?;
    writeln!(out, "latency_ms  : {}", envelope.meta.latency_ms)?;

    if !envelope.meta.warnings.is_empty() {
        writeln!(out, "warnings:")?;
        for warning in &envelope.meta.warnings {
            writeln!(out, "  - {warning}")?;
        }
    }

    writeln!(out, "data:")?;
    match &envelope.data {
        Value::Object(fields) => write_fields(out, fields, 1)?,
        Value::Array(items) => {
            for item in items {
                match item {
                    Value::Object(fields) => {
                        writeln!(out, "  -")?;
                        write_fields(out, fields, 2)?;
                    }
                    other => writeln!(out, "  - {}", scalar(other))?,
                }
            }
        }
        other => writeln!(out, "  {}", scalar(other))?,
    }

    if !envelope.errors.is_empty() {
        writeln!(out, "errors:")?;
        for error in &envelope.errors {
            match &error.context {
                Some(context) => {
                    writeln!(out, "  - [{context}] {}: {}", error.code, error.message)?
                }
                None => writeln!(out, "  - {}: {}", error.code, error.message)?,
            }
        }
    }

    Ok(())
}

fn write_fields(
    out: &mut impl Write,
    fields: &serde_json::Map<String, Value>,
    depth: usize,
) -> Result<(), CliError> {
    let indent = "  ".repeat(depth);
    let width = fields.keys().map(String::len).max().unwrap_or(0);

    for (key, value) in fields {
        match value {
            Value::Object(nested) => {
                writeln!(out, "{indent}{key}:")?;
                write_fields(out, nested, depth + 1)?;
            }
            Value::Array(items) if items.iter().any(Value::is_object) => {
                writeln!(out, "{indent}{key}:")?;
                for item in items {
                    if let Value::Object(nested) = item {
                        writeln!(out, "{indent}  -")?;
                        write_fields(out, nested, depth + 2)?;
                    } else {
                        writeln!(out, "{indent}  - {}", scalar(item))?;
                    }
                }
            }
            other => writeln!(out, "{indent}{key:<width$} : {}", scalar(other))?,
        }
    }

    Ok(())
}

fn scalar(value: &Value) -> String {
    match value {
        Value::Null => String::from("-"),
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
