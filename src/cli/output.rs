//! Output formatting for CLI commands
//!
//! Categories print as JSON, YAML, or a two column table.

use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::str::FromStr;

use crate::secrets::types::{expose_map, SecretMap};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    Json,
    Yaml,
    #[default]
    Table,
}

impl FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "yaml" => Ok(OutputFormat::Yaml),
            "table" => Ok(OutputFormat::Table),
            _ => anyhow::bail!(
                "Unsupported output format: '{}'. Use 'json', 'yaml', or 'table'.",
                s
            ),
        }
    }
}

/// Print every secret of a category in the requested format.
pub fn print_secrets(secrets: &SecretMap, format: OutputFormat) -> Result<()> {
    let exposed = expose_map(secrets);
    match format {
        OutputFormat::Json => print_json(&exposed),
        OutputFormat::Yaml => print_yaml(&exposed),
        OutputFormat::Table => {
            print!("{}", render_table(&exposed));
            Ok(())
        }
    }
}

/// Print data as JSON
pub fn print_json<T: Serialize>(data: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(data).context("Failed to serialize to JSON")?;
    println!("{}", json);
    Ok(())
}

/// Print data as YAML
pub fn print_yaml<T: Serialize>(data: &T) -> Result<()> {
    let yaml = serde_yaml::to_string(data).context("Failed to serialize to YAML")?;
    println!("{}", yaml);
    Ok(())
}

fn render_table(secrets: &BTreeMap<&str, &str>) -> String {
    if secrets.is_empty() {
        return "No secrets found\n".to_string();
    }

    let name_width = secrets.keys().map(|k| k.len()).max().unwrap_or(0).max("Name".len());
    let mut out = format!("{:<width$} {}\n", "Name", "Value", width = name_width);
    out.push_str(&"-".repeat(name_width + 1 + "Value".len()));
    out.push('\n');
    for (name, value) in secrets {
        out.push_str(&format!("{:<width$} {}\n", name, value, width = name_width));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secrets::types::secret_map;

    #[test]
    fn test_output_format_from_str() {
        assert_eq!("json".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!("yaml".parse::<OutputFormat>().unwrap(), OutputFormat::Yaml);
        assert_eq!("table".parse::<OutputFormat>().unwrap(), OutputFormat::Table);
        assert!("invalid".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_render_table() {
        let secrets = secret_map([("user", "admin"), ("password", "hunter2")]);
        let table = render_table(&expose_map(&secrets));
        let lines: Vec<&str> = table.lines().collect();

        assert_eq!(lines[0], "Name     Value");
        assert_eq!(lines[1], "--------------");
        assert_eq!(lines[2], "password hunter2");
        assert_eq!(lines[3], "user     admin");
    }

    #[test]
    fn test_render_empty_table() {
        assert_eq!(render_table(&BTreeMap::new()), "No secrets found\n");
    }

    #[test]
    fn test_print_secrets_json() {
        let secrets = secret_map([("user", "admin")]);
        assert!(print_secrets(&secrets, OutputFormat::Json).is_ok());
        assert!(print_secrets(&secrets, OutputFormat::Yaml).is_ok());
    }
}
