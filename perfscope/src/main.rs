//! # perfscope - Main Entry Point
//!
//! Subcommands: `record` a profiling run, `report` the call tree,
//! `annotate` a source file, `disasm` a symbol, `events` list runs.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::Path;

use perfscope::cli::{Args, Command};
use perfscope::config::Config;
use perfscope::domain::AnalysisError;
use perfscope::{analysis, disasm, export, preflight, record, report, session};

// Exit codes
const EXIT_SUCCESS: i32 = 0;
const EXIT_ERROR: i32 = 1;
const EXIT_NODATA: i32 = 2;
const EXIT_NOPERM: i32 = 77;

fn main() {
    env_logger::init();
    std::process::exit(match run() {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            exit_code_for(&e)
        }
    });
}

fn exit_code_for(err: &anyhow::Error) -> i32 {
    if let Some(analysis) = err.downcast_ref::<AnalysisError>() {
        return match analysis {
            AnalysisError::StreamUnavailable(_)
            | AnalysisError::ExecutableNotFound(_)
            | AnalysisError::EmptyResult(_) => EXIT_NODATA,
            _ => EXIT_ERROR,
        };
    }
    let msg = err.to_string().to_lowercase();
    if msg.contains("permission denied") || msg.contains("paranoid") {
        EXIT_NOPERM
    } else {
        EXIT_ERROR
    }
}

#[tokio::main(flavor = "current_thread")]
async fn run() -> Result<()> {
    let args = Args::parse();
    let config = Config::resolve(&args)?;

    match &args.command {
        Command::Record { program, args: program_args, setup } => {
            preflight::check_tools(&["perf"])?;
            preflight::check_sampling_permitted()?;
            if Path::new(program).is_file() {
                preflight::check_binary(program, args.quiet)?;
            }
            record::run_profiling(&config, program, program_args, setup).await?;
            if !args.quiet {
                println!("profile recorded; run `perfscope report` to inspect it");
            }
        }

        Command::Report { event, file, depth, export: export_path } => {
            preflight::check_tools(&["addr2line"])?;
            let session = session::analyze_run(&config, event.as_deref()).await?;
            report::print_summary(&session);
            report::print_call_tree(&session, file.as_deref(), *depth);
            if let Some(path) = export_path {
                export::write_json(&session, path)?;
                if !args.quiet {
                    println!("\nexported to {}", path.display());
                }
            }
        }

        Command::Annotate { file, event, scope } => {
            preflight::check_tools(&["addr2line"])?;
            let session = session::analyze_run(&config, event.as_deref()).await?;

            let file_name = file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .with_context(|| format!("not a file path: {}", file.display()))?;
            let line_hits = session.lines_for(&file_name);
            if line_hits.is_empty() {
                println!("no samples recorded for {file_name}");
                return Ok(());
            }

            let total =
                analysis::scope_total(&line_hits, *scope, session.total_samples_in_target());
            let annotations = analysis::annotate_lines(&line_hits, total);
            let content = std::fs::read_to_string(file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            print!("{}", report::render_annotated_text(&content, &annotations));
        }

        Command::Disasm { symbol, event, scope } => {
            preflight::check_tools(&["addr2line", "objdump"])?;
            let session = session::analyze_run(&config, event.as_deref()).await?;

            let listing = disasm::disassemble(
                Path::new(session.executable()),
                symbol,
                &config.objdump_flags,
            )
            .await?;
            if listing.trim().is_empty() {
                println!("nothing to disassemble for {symbol}");
                return Ok(());
            }

            let offsets = session.offsets_across_tree();
            let line_hits = analysis::listing_line_hits(&listing, &offsets);
            let total =
                analysis::scope_total(&line_hits, *scope, session.total_samples_in_target());
            let annotations = analysis::annotate_lines(&line_hits, total);
            print!("{}", report::render_annotated_text(&listing, &annotations));
        }

        Command::Events => {
            let events = session::discover_events(&config.output_dir)?;
            report::print_events(&events);
        }
    }
    Ok(())
}
