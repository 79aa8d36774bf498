use std::collections::BTreeSet;
use std::env;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use clap::{ArgAction, Parser, ValueEnum};
use inquisitor_checker::{run_sample, CheckOptions, CheckReport, Inquisitor, SourceFile, SourceId};
use serde_json::json;
use tracing::debug;
use tracing_subscriber::filter::LevelFilter;

const DEBUG_ENV: &str = "INQUISITOR_DEBUG";

const CHECK_AFTER_HELP: &str = "\
Subcommands:
  inquisitor test [PATH]...   Check sample files against their ##ERROR markers.

Set INQUISITOR_DEBUG=<level> to raise log verbosity without passing -v.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

#[derive(Parser)]
#[command(
    name = "inquisitor",
    version,
    about = "Statically type-check a Python source file.",
    after_help = CHECK_AFTER_HELP
)]
struct CheckCli {
    /// Path to the Python file to check.
    input: PathBuf,

    /// Increase log verbosity (repeatable).
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Output format for reported violations.
    #[arg(long, value_enum, default_value = "text")]
    format: Format,

    /// Dump the token stream produced by the lexer.
    #[arg(long)]
    dump_tokens: bool,

    /// Ignore `#::` type comments.
    #[arg(long)]
    no_comment_annotations: bool,
}

#[derive(Parser)]
#[command(
    name = "inquisitor test",
    version,
    about = "Run the checker over sample files and compare against their ##ERROR markers."
)]
struct TestCli {
    /// Files or directories containing samples (defaults to `samples/`).
    #[arg(value_name = "PATH")]
    inputs: Vec<PathBuf>,

    /// Also list errors that were caught as expected.
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let raw: Vec<OsString> = env::args_os().collect();
    if raw.get(1).map(|arg| arg == "test").unwrap_or(false) {
        return handle_test(raw);
    }
    if raw.get(1).map(|arg| arg == "check").unwrap_or(false) {
        let mut args = raw;
        args.remove(1);
        return run_check(CheckCli::parse_from(args));
    }

    run_check(CheckCli::parse_from(raw))
}

fn handle_test(raw: Vec<OsString>) -> Result<()> {
    let mut args = raw;
    if !args.is_empty() {
        args.remove(1); // drop the literal "test"
    }
    let cli = TestCli::parse_from(args);
    run_test(&cli)
}

/// Verbosity is the larger of the environment setting and the `-v` count.
fn effective_verbosity(flag_count: u8) -> u8 {
    let from_env = env::var(DEBUG_ENV)
        .ok()
        .and_then(|value| value.trim().parse::<u8>().ok())
        .unwrap_or(0);
    from_env.max(flag_count)
}

fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => LevelFilter::WARN,
        1 | 2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };
    // Keep an already-installed subscriber.
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn run_check(cli: CheckCli) -> Result<()> {
    let verbosity = effective_verbosity(cli.verbose);
    init_logging(verbosity);

    let contents = fs::read_to_string(&cli.input)
        .with_context(|| format!("failed to read {}", cli.input.display()))?;
    let source = SourceFile::new(SourceId(0), cli.input.clone(), contents);

    let options = CheckOptions {
        verbosity,
        dump_tokens: cli.dump_tokens,
        comment_annotations: !cli.no_comment_annotations,
    };
    let report = Inquisitor::new(options).check(&source)?;

    match cli.format {
        Format::Text => print_text_report(&report),
        Format::Json => print_json_report(&source, &report)?,
    }

    if !report.is_clean() {
        bail!(
            "{} violation(s) found in {}",
            report.diagnostics.len(),
            source.display_name()
        );
    }

    Ok(())
}

fn print_text_report(report: &CheckReport) {
    for diagnostic in &report.diagnostics {
        println!("{diagnostic}");
    }
}

fn print_json_report(source: &SourceFile, report: &CheckReport) -> Result<()> {
    let document = json!({
        "file": source.display_name(),
        "diagnostics": report.diagnostics.to_vec(),
        "bindings": report.rendered_bindings(),
    });
    let rendered =
        serde_json::to_string_pretty(&document).context("failed to serialise report")?;
    println!("{rendered}");
    Ok(())
}

fn run_test(cli: &TestCli) -> Result<()> {
    let verbosity = effective_verbosity(0);
    init_logging(verbosity);

    let target_paths = if cli.inputs.is_empty() {
        let local = PathBuf::from("samples");
        if local.is_dir() {
            vec![local]
        } else {
            let default = detect_workspace_root()?.join("samples");
            if !default.is_dir() {
                bail!("samples/ directory not found; pass explicit paths to `inquisitor test`");
            }
            vec![default]
        }
    } else {
        cli.inputs.clone()
    };

    let mut files = BTreeSet::new();
    for path in &target_paths {
        collect_python_files(path, &mut files)?;
    }

    if files.is_empty() {
        println!("no sample files found");
        return Ok(());
    }

    let options = CheckOptions {
        verbosity,
        ..CheckOptions::default()
    };

    let mut failed = 0usize;
    for path in &files {
        println!("---> {}", path.display());
        let outcome = run_sample(path, &options)?;
        for line in outcome.report_lines(cli.verbose > 0) {
            println!("{line}");
        }
        if !outcome.passed() {
            failed += 1;
        }
        debug!(
            caught = outcome.caught.len(),
            false_alarms = outcome.false_alarms.len(),
            missed = outcome.missed.len(),
            "sample finished"
        );
    }

    if failed > 0 {
        bail!("{} of {} sample file(s) failed", failed, files.len());
    }

    println!("\nAll {} sample file(s) passed", files.len());
    Ok(())
}

fn collect_python_files(path: &Path, targets: &mut BTreeSet<PathBuf>) -> Result<()> {
    let metadata =
        fs::metadata(path).with_context(|| format!("failed to access {}", path.display()))?;

    if metadata.is_dir() {
        let mut child_paths = Vec::new();
        for entry in fs::read_dir(path)
            .with_context(|| format!("failed to read directory {}", path.display()))?
        {
            let entry = entry
                .with_context(|| format!("failed to access entry within {}", path.display()))?;
            child_paths.push(entry.path());
        }
        child_paths.sort();
        for child in child_paths {
            collect_python_files(&child, targets)?;
        }
    } else if metadata.is_file() && path.extension().and_then(|ext| ext.to_str()) == Some("py")
    {
        targets.insert(path.to_path_buf());
    }

    Ok(())
}

fn detect_workspace_root() -> Result<PathBuf> {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
    let root = manifest_dir
        .parent()
        .ok_or_else(|| anyhow!("failed to locate workspace root from manifest dir"))?;
    Ok(root.to_path_buf())
}
