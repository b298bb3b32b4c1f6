use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use patchwright::{
    load_from_path, ApproveAll, Confirmation, IngestReport, Orchestrator, RunOptions,
    RunSummary, StagedChange, ValidationError,
};
use similar::{ChangeTag, TextDiff};
use std::env;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "patchwright")]
#[command(
    about = "Apply structured change requests to Python and JavaScript/TypeScript sources",
    long_about = None
)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Stage, confirm and write change requests
    Apply {
        /// Request file (.toml or .json)
        requests: PathBuf,

        /// Directory relative request paths resolve against
        #[arg(short, long)]
        root: Option<PathBuf>,

        /// Confirm every staged file without prompting
        #[arg(short, long)]
        yes: bool,

        /// Dry run - show what would be changed without modifying files
        #[arg(short = 'n', long)]
        dry_run: bool,

        /// Show unified diff of changes
        #[arg(short, long)]
        diff: bool,
    },

    /// Stage and validate change requests without writing anything
    Check {
        /// Request file (.toml or .json)
        requests: PathBuf,

        /// Directory relative request paths resolve against
        #[arg(short, long)]
        root: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Apply {
            requests,
            root,
            yes,
            dry_run,
            diff,
        } => cmd_apply(&requests, root, yes, dry_run, diff),

        Commands::Check { requests, root } => cmd_check(&requests, root),
    }
}

/// Resolve the request root.
///
/// Priority order:
/// 1. Explicit --root flag
/// 2. PATCHWRIGHT_ROOT environment variable
/// 3. Current directory
fn resolve_root(cli_root: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(path) = cli_root {
        return path
            .canonicalize()
            .with_context(|| format!("root {} does not exist", path.display()));
    }

    if let Ok(env_path) = env::var("PATCHWRIGHT_ROOT") {
        let path = PathBuf::from(&env_path);
        if path.exists() {
            return Ok(path.canonicalize()?);
        }
        eprintln!(
            "{}",
            format!(
                "Warning: PATCHWRIGHT_ROOT is set but path doesn't exist: {}",
                env_path
            )
            .yellow()
        );
    }

    Ok(env::current_dir()?)
}

/// Load requests and report rejected records.
fn load_requests(path: &Path) -> Result<IngestReport> {
    let report = load_from_path(path)?;
    println!(
        "Loaded {} request(s) from {}",
        report.requests.len(),
        path.display()
    );
    for issue in &report.rejected {
        eprintln!("{} {}", "✗".red(), issue);
    }
    Ok(report)
}

/// Helper: Show unified diff between original and staged content
fn display_diff(change: &StagedChange) {
    let label = if change.tombstoned {
        format!("{} (deleted)", change.path.display())
    } else {
        format!("{} (staged)", change.target().display())
    };
    println!(
        "\n{}",
        format!("--- {} (original)", change.path.display()).dimmed()
    );
    println!("{}", format!("+++ {}", label).dimmed());

    let diff = TextDiff::from_lines(&change.original, &change.working);

    for change in diff.iter_all_changes() {
        let sign = match change.tag() {
            ChangeTag::Delete => format!("-{}", change).red(),
            ChangeTag::Insert => format!("+{}", change).green(),
            ChangeTag::Equal => format!(" {}", change).normal(),
        };
        print!("{}", sign);
        if change.missing_newline() {
            println!();
        }
    }
}

fn describe(change: &StagedChange) -> String {
    if change.tombstoned {
        format!("delete {}", change.path.display())
    } else if let Some(destination) = &change.destination {
        format!(
            "move {} to {} (+{} -{})",
            change.path.display(),
            destination.display(),
            change.diff.insertions(),
            change.diff.deletions()
        )
    } else {
        format!(
            "{} (+{} -{})",
            change.path.display(),
            change.diff.insertions(),
            change.diff.deletions()
        )
    }
}

/// Per-file y/N prompt on stdin. Anything but `y`/`yes` declines.
struct Prompt;

impl Confirmation for Prompt {
    fn confirm(&mut self, change: &StagedChange) -> bool {
        display_diff(change);
        print!("\nApply {}? [y/N] ", describe(change));
        if io::stdout().flush().is_err() {
            return false;
        }

        let mut answer = String::new();
        match io::stdin().lock().read_line(&mut answer) {
            Ok(0) | Err(_) => false,
            Ok(_) => matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"),
        }
    }
}

fn cmd_apply(
    requests: &Path,
    root: Option<PathBuf>,
    yes: bool,
    dry_run: bool,
    show_diff: bool,
) -> Result<()> {
    let root = resolve_root(root)?;
    println!("Root: {}", root.display());

    let report = load_requests(requests)?;
    let rejected = report.rejected.len();

    let mut orchestrator = Orchestrator::new(RunOptions::new(&root));
    let staged = orchestrator.process(report.requests);

    for failure in orchestrator.failures() {
        eprintln!("{} {}", "✗".red(), failure);
    }

    if staged.is_empty() {
        println!("{}", "No changes to apply".yellow());
    }

    if dry_run {
        println!("{}", "[DRY RUN - showing what would be applied]".cyan());
        for change in &staged {
            println!("{} Would {}", "✓".green(), describe(change));
            if show_diff {
                display_diff(change);
            }
        }
        let failed = orchestrator.failures().len() + rejected;
        if failed > 0 {
            std::process::exit(1);
        }
        return Ok(());
    }

    let confirmed = if yes {
        if show_diff {
            staged.iter().for_each(display_diff);
        }
        orchestrator.confirm_with(&mut ApproveAll)
    } else {
        orchestrator.confirm_with(&mut Prompt)
    };

    let summary = orchestrator.commit(&confirmed);
    print_summary(&summary, rejected);

    if !summary.is_success() || rejected > 0 {
        std::process::exit(1);
    }

    Ok(())
}

fn print_summary(summary: &RunSummary, rejected: usize) {
    println!();
    for path in &summary.written {
        println!("{} Wrote {}", "✓".green(), path.display());
    }
    for path in &summary.deleted {
        println!("{} Deleted {}", "✓".green(), path.display());
    }
    for (path, reason) in &summary.skipped {
        println!("{} Skipped {} ({})", "⊘".cyan(), path.display(), reason);
    }
    for (path, reason) in &summary.rolled_back {
        eprintln!("{} Rolled back {}: {}", "✗".red(), path.display(), reason);
    }

    println!();
    println!("{}", "Summary:".bold());
    println!("  {} written", format!("{}", summary.written.len()).green());
    println!("  {} deleted", format!("{}", summary.deleted.len()).green());
    println!("  {} skipped", format!("{}", summary.skipped.len()).cyan());
    println!(
        "  {} rolled back",
        format!("{}", summary.rolled_back.len()).red()
    );
    println!(
        "  {} failed",
        format!("{}", summary.failures.len() + rejected).red()
    );
}

fn cmd_check(requests: &Path, root: Option<PathBuf>) -> Result<()> {
    let root = resolve_root(root)?;

    println!("{}", "Checking requests...".bold());
    println!("Root: {}", root.display());

    let report = load_requests(requests)?;
    let mut failed = report.rejected.len();

    let mut orchestrator = Orchestrator::new(RunOptions::new(&root));
    orchestrator.process(report.requests);

    for failure in orchestrator.failures() {
        eprintln!("{} {}", "✗".red(), failure);
        failed += 1;
    }

    let mut valid = 0;
    let mut unchecked = 0;
    for (path, result) in orchestrator.validate_staged() {
        match result {
            Ok(true) => {
                println!("{} {}: Valid", "✓".green(), path.display());
                valid += 1;
            }
            Ok(false) => {
                println!(
                    "{} {}: No grammar, not checked",
                    "⊘".cyan(),
                    path.display()
                );
                unchecked += 1;
            }
            Err(ValidationError::Syntax { errors, .. }) => {
                eprintln!("{} {}: Syntax errors", "✗".red(), path.display());
                for location in errors.iter().take(5) {
                    eprintln!("  {}", location);
                }
                failed += 1;
            }
            Err(e) => {
                eprintln!("{} {}: {}", "✗".red(), path.display(), e);
                failed += 1;
            }
        }
    }

    println!();
    println!("{}", "Summary:".bold());
    println!("  {} valid", format!("{}", valid).green());
    println!("  {} unchecked", format!("{}", unchecked).cyan());
    println!("  {} failed", format!("{}", failed).red());

    if failed > 0 {
        std::process::exit(1);
    }

    Ok(())
}
