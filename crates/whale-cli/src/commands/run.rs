use anyhow::Result;

use whale_engine::{Orchestrator, RunOptions, WhalePaths};

/// Execute the `run` command: extract every configured connection.
pub fn execute(paths: WhalePaths, full_extraction: bool, verbose: bool) -> Result<()> {
    let options = RunOptions {
        full_extraction,
        verbose,
    };
    tracing::info!(
        base_dir = %paths.base_dir().display(),
        connections = %paths.connections_file().display(),
        "Resolved whale paths"
    );
    let orchestrator = Orchestrator::new(paths);
    let summary = orchestrator.run(&options)?;

    println!("Extraction finished.");
    println!("  Connections:     {}", summary.connections_processed);
    println!("  Tasks:           {}", summary.tasks_run);
    println!("  Records loaded:  {}", summary.records_loaded);
    println!("  Duration:        {:.2}s", summary.duration_secs);
    if let Some(reason) = &summary.stopped_by {
        println!("  Stopped early:   {reason}");
    }
    println!(
        "  Metadata:        {}",
        orchestrator.paths().metadata_dir().display()
    );
    Ok(())
}
