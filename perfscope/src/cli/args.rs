//! CLI argument definitions

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::ProportionScope;

#[derive(Parser)]
#[command(
    name = "perfscope",
    about = "Aggregate perf sampling profiles into an annotated call tree",
    after_help = "\
EXAMPLES:
    perfscope record ./target/release/app -- --iterations 3
    perfscope report                         Call tree of the latest run
    perfscope annotate src/hot.rs            Per-line sample shares
    perfscope disasm 'app::hot_loop'         Annotated disassembly"
)]
pub struct Args {
    /// Project directory the profiled binary was built from
    #[arg(long, global = true)]
    pub project_dir: Option<PathBuf>,

    /// Output directory for profiling artifacts, relative to the project
    #[arg(long, global = true)]
    pub output: Option<String>,

    /// Extra flags passed to perf record (single string, space separated)
    #[arg(long, global = true)]
    pub perf_flags: Option<String>,

    /// Extra flags passed to objdump (single string, space separated)
    #[arg(long, global = true)]
    pub objdump_flags: Option<String>,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Profile a program with perf and dump its samples
    Record {
        /// Program to profile
        program: String,

        /// Arguments passed to the program
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,

        /// Shell command to run before profiling (repeatable)
        #[arg(long)]
        setup: Vec<String>,
    },

    /// Print the aggregated call tree of a recorded run
    Report {
        /// Event to analyze (defaults to the first recorded one)
        #[arg(long)]
        event: Option<String>,

        /// Only show root functions from this source file
        #[arg(long, value_name = "FILE")]
        file: Option<String>,

        /// Limit tree depth (0 = unlimited)
        #[arg(long, default_value_t = 0)]
        depth: usize,

        /// Write the tree as JSON to this path
        #[arg(long, value_name = "FILE")]
        export: Option<PathBuf>,
    },

    /// Annotate a source file with per-line sample shares
    Annotate {
        /// Source file to annotate
        file: PathBuf,

        /// Event to analyze (defaults to the first recorded one)
        #[arg(long)]
        event: Option<String>,

        /// Denominator for the percentages
        #[arg(long, value_enum, default_value_t)]
        scope: ProportionScope,
    },

    /// Disassemble a symbol and annotate it with sample shares
    Disasm {
        /// Symbol to disassemble ("*" for the whole binary)
        symbol: String,

        /// Event to analyze (defaults to the first recorded one)
        #[arg(long)]
        event: Option<String>,

        /// Denominator for the percentages
        #[arg(long, value_enum, default_value_t)]
        scope: ProportionScope,
    },

    /// List events with a recorded sample dump
    Events,
}
