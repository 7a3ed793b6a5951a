//! Semantic validation for parsed connections.

use std::collections::HashSet;

use anyhow::{bail, Result};
use whale_types::{Connection, MetadataSource};

fn require(field: &Option<String>, name: &str, connection: &Connection, errors: &mut Vec<String>) {
    if field.as_deref().map_or(true, |v| v.trim().is_empty()) {
        errors.push(format!(
            "Connection '{}' ({}) requires '{name}'",
            connection.name, connection.metadata_source
        ));
    }
}

fn collect_connection_errors(connection: &Connection, errors: &mut Vec<String>) {
    if connection.name.trim().is_empty() {
        errors.push(format!(
            "A {} connection has an empty name",
            connection.metadata_source
        ));
    }

    match connection.metadata_source {
        MetadataSource::Presto => require(&connection.host, "host", connection, errors),
        MetadataSource::Neo4j => require(&connection.uri, "uri", connection, errors),
        MetadataSource::Bigquery => {
            require(&connection.project_id, "project_id", connection, errors);
            require(&connection.access_token, "access_token", connection, errors);
        }
        MetadataSource::Snowflake => {
            require(&connection.account, "account", connection, errors);
            require(&connection.database, "database", connection, errors);
            require(&connection.access_token, "access_token", connection, errors);
        }
        MetadataSource::BuildScript => {
            require(&connection.build_script_path, "build_script_path", connection, errors);
        }
        // Left to the orchestrator, which stops the run at this connection.
        MetadataSource::Other => {}
    }
}

/// Validate a single connection before it is handed to its configurator.
///
/// # Errors
///
/// Returns an error listing every problem found on the connection.
pub fn validate_connection(connection: &Connection) -> Result<()> {
    let mut errors = Vec::new();
    collect_connection_errors(connection, &mut errors);

    if errors.is_empty() {
        Ok(())
    } else {
        bail!("Connection validation failed:\n  - {}", errors.join("\n  - "));
    }
}

/// Validate a whole connections file.
/// Returns `Ok(())` if valid, Err with all validation errors if not.
///
/// # Errors
///
/// Returns an error listing all per-connection problems plus duplicate names.
pub fn validate_connections(connections: &[Connection]) -> Result<()> {
    let mut errors = Vec::new();
    let mut seen = HashSet::new();

    for connection in connections {
        collect_connection_errors(connection, &mut errors);
        if !connection.name.trim().is_empty() && !seen.insert(connection.name.as_str()) {
            errors.push(format!("Duplicate connection name '{}'", connection.name));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        bail!("Connection validation failed:\n  - {}", errors.join("\n  - "));
    }
}
