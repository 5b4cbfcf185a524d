// src/logging.rs

use std::fs::OpenOptions;
use std::path::Path;

use anyhow::Context;

/// Route all log output into the append-only per-run log file. Messages
/// carry the env_logger timestamp plus each component's `[name]` prefix;
/// nothing but usage and privilege errors ever goes to the terminal.
pub fn init(log_path: &Path) -> anyhow::Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)
        .with_context(|| format!("open log file {}", log_path.display()))?;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .target(env_logger::Target::Pipe(Box::new(file)))
        .init();

    Ok(())
}
