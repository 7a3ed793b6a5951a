//! Connections YAML parsing with environment variable substitution.
//!
//! The connections file holds one YAML document per connection, separated by
//! `---`. Documents are returned in file order.

use std::path::Path;
use std::sync::LazyLock;

use anyhow::{Context, Result};
use regex::Regex;
use serde::Deserialize;
use whale_types::Connection;

static ENV_VAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("valid env var regex"));

/// Substitute `${VAR_NAME}` patterns with environment variable values.
/// Comment lines are left untouched, so a commented-out reference to an unset
/// variable is not an error.
///
/// # Errors
///
/// Returns an error naming every referenced variable that is not set.
pub fn substitute_env_vars(input: &str) -> Result<String> {
    let mut missing: Vec<String> = Vec::new();

    let lines: Vec<String> = input
        .split('\n')
        .map(|line| {
            if line.trim_start().starts_with('#') {
                return line.to_string();
            }
            ENV_VAR_RE
                .replace_all(line, |cap: &regex::Captures<'_>| {
                    let var_name = &cap[1];
                    match std::env::var(var_name) {
                        Ok(val) => val,
                        Err(_) => {
                            if !missing.iter().any(|m| m == var_name) {
                                missing.push(var_name.to_string());
                            }
                            cap[0].to_string()
                        }
                    }
                })
                .into_owned()
        })
        .collect();

    if !missing.is_empty() {
        anyhow::bail!("Missing environment variable(s): {}", missing.join(", "));
    }

    Ok(lines.join("\n"))
}

/// Parse a connections YAML string (after env var substitution).
///
/// Empty documents, such as the one after a trailing `---`, are skipped.
///
/// # Errors
///
/// Returns an error if env var substitution fails or any document is not a
/// valid connection.
pub fn parse_connections_str(yaml_str: &str) -> Result<Vec<Connection>> {
    let substituted = substitute_env_vars(yaml_str)?;
    let mut connections = Vec::new();

    for (index, document) in serde_yaml::Deserializer::from_str(&substituted).enumerate() {
        let value = serde_yaml::Value::deserialize(document)
            .with_context(|| format!("Failed to parse connections YAML document {index}"))?;
        if value.is_null() {
            continue;
        }
        let connection: Connection = serde_yaml::from_value(value)
            .with_context(|| format!("Invalid connection in YAML document {index}"))?;
        connections.push(connection);
    }

    Ok(connections)
}

/// Parse a connections YAML file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or any document is invalid.
pub fn parse_connections(path: &Path) -> Result<Vec<Connection>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read connections file: {}", path.display()))?;
    parse_connections_str(&content)
}
