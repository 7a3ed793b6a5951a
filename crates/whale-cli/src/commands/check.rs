use anyhow::{Context, Result};

use whale_engine::config::{parser, validator};
use whale_engine::WhalePaths;

/// Execute the `check` command: parse and validate the connections file.
pub fn execute(paths: &WhalePaths) -> Result<()> {
    let path = paths.connections_file();
    let connections = parser::parse_connections(path)
        .with_context(|| format!("Failed to load connections: {}", path.display()))?;
    println!("Connections file:  OK ({})", path.display());

    validator::validate_connections(&connections)?;
    println!("Connections:       {} valid", connections.len());

    for connection in &connections {
        println!("  {:24} {}", connection.name, connection.metadata_source);
    }
    println!("\nAll checks passed.");
    Ok(())
}
