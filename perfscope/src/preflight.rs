//! Pre-flight checks for perfscope
//!
//! Validates that the external tools a command depends on are installed and
//! that the kernel permits sampling, with actionable messages when they are
//! not.

#![allow(unsafe_code)] // geteuid() requires unsafe

use anyhow::{bail, Context, Result};
use object::{Object, ObjectSection};
use std::path::Path;
use std::process::Command;

/// Recording needs perf; analysis needs addr2line; disassembly needs
/// objdump.
pub fn check_tools(tools: &[&str]) -> Result<()> {
    for tool in tools {
        check_tool(tool)?;
    }
    Ok(())
}

fn check_tool(name: &str) -> Result<()> {
    let output = Command::new(name)
        .arg("--version")
        .output()
        .with_context(|| format!("{name} not found.\n\nInstall it and try again."))?;
    if !output.status.success() {
        bail!("{name} --version exited with {}", output.status);
    }
    Ok(())
}

/// Check that perf is allowed to sample userspace.
///
/// Root always may; otherwise `/proc/sys/kernel/perf_event_paranoid` must
/// be at most 1.
pub fn check_sampling_permitted() -> Result<()> {
    if unsafe { libc::geteuid() } == 0 {
        return Ok(());
    }

    let paranoid = std::fs::read_to_string("/proc/sys/kernel/perf_event_paranoid")
        .context("failed to read /proc/sys/kernel/perf_event_paranoid")?;
    let level: i32 = paranoid.trim().parse().unwrap_or(i32::MAX);
    if level > 1 {
        bail!(
            "perf_event_paranoid is {level}; sampling is not permitted for your user.\n\n\
             Either run as root or lower the level:\n  \
             sudo sysctl kernel.perf_event_paranoid=1"
        );
    }
    Ok(())
}

/// Check that the profiled binary exists and carries enough debug
/// information for source-level attribution. A stripped binary only
/// degrades the output, so this warns instead of failing.
pub fn check_binary(target_path: &str, quiet: bool) -> Result<()> {
    let path = Path::new(target_path);
    if !path.is_file() {
        bail!(
            "Binary not found: {target_path}\n\n\
             Make sure the path is correct and the binary exists."
        );
    }
    if quiet {
        return Ok(());
    }

    let file_data = std::fs::read(path)
        .with_context(|| format!("failed to read binary: {target_path}"))?;
    let Ok(obj) = object::File::parse(&*file_data) else {
        // Not an ELF we understand; let resolution report its own problems.
        return Ok(());
    };

    let has_debug_info = obj.section_by_name(".debug_info").is_some_and(|s| s.size() > 0);
    let has_symtab = obj.section_by_name(".symtab").is_some_and(|s| s.size() > 0);
    if !has_debug_info && !has_symtab {
        eprintln!("warning: {target_path} is stripped; frames will not resolve");
    } else if !has_debug_info {
        eprintln!("warning: {target_path} has no DWARF info; source lines unavailable");
    }
    Ok(())
}
