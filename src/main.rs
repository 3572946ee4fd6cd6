//! cblocks binary — thin CLI shell over the [`cblocks`] library crate.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::error;

use cblocks::block::Category;
use cblocks::report::{render_outline, BlockSummary, CodebaseReport};
use cblocks::walk::find_codebase_root;
use cblocks::{load_config, scan_codebase};

// ---------------------------------------------------------------------------
// CLI definition (clap derive)
// ---------------------------------------------------------------------------

/// Lightweight structural scanner for C/C++ codebases — block trees without a
/// compiler front end.
#[derive(Parser)]
#[command(name = "cblocks", version, about, long_about = None)]
struct Cli {
    /// Codebase directory (default: current directory). The actual root is
    /// auto-detected from build-system markers unless --no-find-root is given.
    path: Option<PathBuf>,

    /// Restrict the scan to a subdirectory of the root (repeatable)
    #[arg(long = "scan-dir", value_name = "DIR")]
    scan_dirs: Vec<String>,

    /// Scan header files only
    #[arg(long)]
    headers_only: bool,

    /// Include version-control and test directories in the walk
    #[arg(long)]
    include_test_dirs: bool,

    /// Don't descend into directories whose root-relative path matches REGEX
    #[arg(long, value_name = "REGEX")]
    no_recurse: Option<String>,

    /// Don't parse files whose name matches REGEX
    #[arg(long, value_name = "REGEX")]
    no_visit: Option<String>,

    /// Use the given path as-is instead of auto-detecting the codebase root
    #[arg(long)]
    no_find_root: bool,

    /// Emit the full report as JSON on stdout
    #[arg(long)]
    json: bool,

    /// Print an indented structural outline of every file
    #[arg(long)]
    outline: bool,
}

fn compile_filter(arg: Option<&str>, what: &str) -> Result<Option<regex::Regex>, ExitCode> {
    match arg {
        None => Ok(None),
        Some(pat) => match regex::Regex::new(pat) {
            Ok(re) => Ok(Some(re)),
            Err(err) => {
                error!(pattern = pat, %err, "invalid {what} pattern");
                Err(ExitCode::FAILURE)
            }
        },
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn main() -> ExitCode {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("cblocks=info".parse().unwrap()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let start = cli.path.clone().unwrap_or_else(|| PathBuf::from("."));
    let root = if cli.no_find_root { start } else { find_codebase_root(&start) };

    let mut config = load_config(&root);
    if !cli.scan_dirs.is_empty() {
        config.scan_dirs = cli.scan_dirs.clone();
    }
    if cli.headers_only {
        config.headers_only = true;
    }
    if cli.include_test_dirs {
        config.skip_vcs_and_test_dirs = false;
    }
    config.no_recurse = match compile_filter(cli.no_recurse.as_deref(), "--no-recurse") {
        Ok(re) => re,
        Err(code) => return code,
    };
    config.no_visit = match compile_filter(cli.no_visit.as_deref(), "--no-visit") {
        Ok(re) => re,
        Err(code) => return code,
    };

    let scan = scan_codebase(&config);

    if cli.json {
        let report = CodebaseReport::build(&scan);
        match serde_json::to_string_pretty(&report) {
            Ok(json) => println!("{json}"),
            Err(err) => {
                error!(%err, "failed to serialize report");
                return ExitCode::FAILURE;
            }
        }
    } else if cli.outline {
        print!("{}", render_outline(&scan));
    } else {
        let report = CodebaseReport::build(&scan);
        for file in &report.files {
            println!(
                "{:<40} {:>6} lines  {:>4} functions  {:>3} udts  {:>4} comments",
                file.path,
                file.line_count,
                count_in(&file.blocks, Category::Function),
                count_in(&file.blocks, Category::Udt),
                file.comment_count,
            );
        }
        println!(
            "{} files, {} functions, {} udts, {} lines",
            report.file_count, report.function_count, report.udt_count, report.line_count
        );
        for diag in scan.diagnostics() {
            eprintln!("{diag}");
        }
    }

    ExitCode::SUCCESS
}

fn count_in(blocks: &[BlockSummary], category: Category) -> usize {
    blocks
        .iter()
        .map(|b| (b.category == category) as usize + count_in(&b.children, category))
        .sum()
}
