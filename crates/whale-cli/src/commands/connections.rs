use anyhow::Result;

use whale_engine::config::parser;
use whale_engine::WhalePaths;
use whale_types::Connection;

/// Execute the `connections` command: list configured connections.
pub fn execute(paths: &WhalePaths) -> Result<()> {
    let path = paths.connections_file();
    if !path.exists() {
        println!("No connections file found at {}", path.display());
        println!("Set WHALE_HOME or pass --connections <file>");
        return Ok(());
    }

    let connections = parser::parse_connections(path)?;
    if connections.is_empty() {
        println!("No connections configured.");
        return Ok(());
    }

    for connection in &connections {
        println!("  {} ({})", connection.name, connection.metadata_source);
        if let Some(target) = target(connection) {
            println!("    {target}");
        }
    }
    Ok(())
}

fn target(connection: &Connection) -> Option<String> {
    connection
        .host
        .as_ref()
        .map(|host| match connection.port {
            Some(port) => format!("{host}:{port}"),
            None => host.clone(),
        })
        .or_else(|| connection.uri.clone())
        .or_else(|| connection.account.clone())
        .or_else(|| connection.project_id.clone())
        .or_else(|| connection.build_script_path.clone())
}
