//! Profiling run orchestration
//!
//! Builds and executes the recording pipeline: `perf record` over the
//! target program, then `perf script` to dump mmap events and per-event
//! samples into the output directory the analysis reads from.

use anyhow::{bail, Context, Result};
use log::info;
use tokio::process::Command;

use crate::config::Config;

/// Shell line for one profiling run: optional setup commands, the record
/// pass, then the script dump.
#[must_use]
pub fn perf_record_command(
    config: &Config,
    program: &str,
    args: &[String],
    setup_cmds: &[String],
) -> String {
    let out = config.output_dir.display();
    let mut parts: Vec<String> = Vec::new();
    for setup in setup_cmds {
        parts.push(setup.clone());
    }

    let mut record = vec!["perf".to_string(), "record".to_string(), "-g".to_string()];
    record.extend(config.perf_flags.iter().cloned());
    record.push("-o".to_string());
    record.push(format!("{out}/perf.data"));
    record.push(program.to_string());
    record.extend(args.iter().cloned());
    parts.push(record.join(" "));

    // Dropping the sym/symoff fields keeps the dump to addresses and DSOs;
    // symbols are recovered later from debug info.
    parts.push(format!(
        "perf script -i {out}/perf.data -F -sym,-symoff --per-event-dump --show-mmap-events \
         > {out}/mmap-events.dump"
    ));
    parts.join(" && ")
}

/// Run the profiling pipeline with inherited stdio.
///
/// # Errors
/// Fails when the output directory cannot be created or the pipeline exits
/// unsuccessfully.
pub async fn run_profiling(
    config: &Config,
    program: &str,
    args: &[String],
    setup_cmds: &[String],
) -> Result<()> {
    std::fs::create_dir_all(&config.output_dir).with_context(|| {
        format!("failed to create output directory {}", config.output_dir.display())
    })?;

    let command = perf_record_command(config, program, args, setup_cmds);
    info!("running: {command}");
    let status = Command::new("sh")
        .arg("-c")
        .arg(&command)
        .status()
        .await
        .context("failed to launch the profiling shell")?;
    if !status.success() {
        bail!("profiling run exited with {status}");
    }
    Ok(())
}
