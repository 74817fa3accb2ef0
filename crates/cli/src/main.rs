//! git-treesync command-line tool.
//!
//! Re-imports the current tree of an external project into the current
//! branch without importing its history. Installed on `$PATH` it can be
//! invoked as `git treesync`.

mod prompt;
mod style;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use treesync_core::engine::{Freshness, ImportKind, StatusReport};
use treesync_core::{
    AppConfig, AutoConfirm, GitClient, Oid, Prompter, SourceSpec, SyncEngine, SyncError,
    SyncMode, SyncOutcome, SyncRequest,
};

use crate::prompt::TerminalPrompter;

// ---------------------------------------------------------------------------
// CLI argument definitions
// ---------------------------------------------------------------------------

/// Synchronize the tree of an external project into the current branch.
#[derive(Parser, Debug)]
#[command(name = "git-treesync", version, about)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Run as if started in this directory.
    #[arg(short = 'C', long = "repo", global = true, default_value = ".")]
    repo: PathBuf,

    /// Log debug output.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Import an external tree for the first time.
    Init(RunArgs),

    /// Re-import an external tree on top of the last import.
    Resync(RunArgs),

    /// Show the alignment point and whether a resync is needed.
    Status(SourceArgs),

    /// Print the effective configuration.
    Config,
}

#[derive(Args, Debug)]
struct SourceArgs {
    /// A local revision, or a repository URL/path when REV is given.
    source: String,

    /// Ref to fetch from SOURCE.
    rev: Option<String>,
}

impl SourceArgs {
    fn spec(&self) -> SourceSpec {
        match &self.rev {
            Some(rev) => SourceSpec::Remote {
                url: self.source.clone(),
                rev: rev.clone(),
            },
            None => SourceSpec::Local {
                rev: self.source.clone(),
            },
        }
    }
}

#[derive(Args, Debug)]
struct RunArgs {
    #[command(flatten)]
    source: SourceArgs,

    /// Use MESSAGE for the import commit instead of the generated one.
    #[arg(short, long)]
    message: Option<String>,

    /// Open the import message in the editor.
    #[arg(long, overrides_with = "no_edit")]
    edit: bool,

    /// Use the import message as is.
    #[arg(long)]
    no_edit: bool,

    /// Answer yes to every prompt and skip the editor.
    #[arg(short, long, conflicts_with = "edit")]
    yes: bool,

    /// Report what would be imported without writing anything.
    #[arg(short = 'n', long)]
    dry_run: bool,
}

impl RunArgs {
    fn interactive(&self) -> bool {
        !self.yes && console::user_attended()
    }

    fn request(&self, mode: SyncMode) -> SyncRequest {
        let mut request = SyncRequest::new(mode, self.source.spec());
        request.message = self.message.clone();
        request.edit = if self.edit {
            true
        } else if self.no_edit {
            false
        } else {
            self.interactive() && self.message.is_none()
        };
        request.dry_run = self.dry_run;
        request
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", style::error(&format!("Error: {:#}", e)));
            let code = e
                .downcast_ref::<SyncError>()
                .map(SyncError::exit_code)
                .unwrap_or(1);
            ExitCode::from(code)
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = load_config(cli.config.as_deref())?;
    init_logging(&config, cli.verbose);

    match cli.command {
        Commands::Config => cmd_config(&config),
        Commands::Init(args) => cmd_run(&cli.repo, config, SyncMode::Init, &args).await,
        Commands::Resync(args) => cmd_run(&cli.repo, config, SyncMode::Resync, &args).await,
        Commands::Status(args) => cmd_status(&cli.repo, config, &args),
    }
}

// ---------------------------------------------------------------------------
// Config & logging helpers
// ---------------------------------------------------------------------------

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("treesync").join("config.toml"))
}

fn load_config(explicit: Option<&Path>) -> Result<AppConfig> {
    match explicit {
        Some(path) => AppConfig::load_and_resolve(path, true)
            .with_context(|| format!("failed to load configuration from {}", path.display())),
        None => match default_config_path() {
            Some(path) => AppConfig::load_and_resolve(&path, false)
                .with_context(|| format!("failed to load configuration from {}", path.display())),
            None => Ok(AppConfig::default()),
        },
    }
}

fn init_logging(config: &AppConfig, verbose: bool) {
    let level = if verbose {
        "debug"
    } else {
        config.general.log_level.as_str()
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();
}

fn open_engine(repo: &Path, config: AppConfig) -> Result<SyncEngine> {
    let git = GitClient::new(repo).context("failed to open repository")?;
    Ok(SyncEngine::new(git, config))
}

// ---------------------------------------------------------------------------
// Subcommand implementations
// ---------------------------------------------------------------------------

fn cmd_config(config: &AppConfig) -> Result<()> {
    if let Some(path) = default_config_path() {
        println!("{}", style::dim(&format!("# default location: {}", path.display())));
    }
    print!("{}", config.to_toml()?);
    Ok(())
}

async fn cmd_run(repo: &Path, config: AppConfig, mode: SyncMode, args: &RunArgs) -> Result<()> {
    let engine = open_engine(repo, config)?;
    let request = args.request(mode);
    debug!(?request, "run request");

    let mut prompter: Box<dyn Prompter> = if args.interactive() {
        Box::new(TerminalPrompter)
    } else {
        Box::new(AutoConfirm)
    };

    let outcome = engine.run(&request, prompter.as_mut()).await?;
    report_outcome(&engine, &request, &outcome);
    Ok(())
}

fn report_outcome(engine: &SyncEngine, request: &SyncRequest, outcome: &SyncOutcome) {
    let short = |oid: &Oid| {
        engine
            .git()
            .summarize(*oid)
            .map(|s| s.short_id)
            .unwrap_or_else(|_| oid.to_string())
    };

    match outcome {
        SyncOutcome::UpToDate { alignment } => {
            println!(
                "{}",
                style::success(&format!(
                    "Already up to date with {} (tree matches {})",
                    request.source,
                    style::commit(&short(&alignment.host_commit))
                ))
            );
        }
        SyncOutcome::WouldImport { kind, source_tree } => {
            let base = match kind {
                ImportKind::Initial => "as a new root (unrelated history)".to_string(),
                ImportKind::Resync { alignment } => {
                    format!("on top of {}", style::commit(&short(alignment)))
                }
            };
            println!(
                "Would import tree {} of {} {}",
                style::commit(&source_tree.to_string()),
                request.source,
                base
            );
        }
        SyncOutcome::Declined => {
            println!("{}", style::warn("Import cancelled. Nothing was written."));
        }
        SyncOutcome::MergeSkipped {
            import_commit,
            kind,
        } => {
            println!(
                "{}",
                style::warn(&format!(
                    "Merge skipped. Import commit {} was written but not merged.",
                    style::commit(&import_commit.to_string())
                ))
            );
            let unrelated = if kind.allows_unrelated_histories() {
                " --allow-unrelated-histories"
            } else {
                ""
            };
            println!(
                "  To merge it later: git merge --no-ff{} {}",
                unrelated, import_commit
            );
        }
        SyncOutcome::Merged {
            import_commit,
            merge_commit,
        } => {
            println!(
                "{}",
                style::success(&format!(
                    "Imported {} as {} and merged it as {}",
                    request.source,
                    style::commit(&short(import_commit)),
                    style::commit(&short(merge_commit))
                ))
            );
        }
    }
}

fn cmd_status(repo: &Path, config: AppConfig, args: &SourceArgs) -> Result<()> {
    let engine = open_engine(repo, config)?;
    let source = args.spec();

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner:.blue} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
    );
    spinner.set_message(format!("Comparing histories with {}...", source));
    spinner.enable_steady_tick(std::time::Duration::from_millis(100));
    let report = engine.status(SyncMode::Resync, &source);
    spinner.finish_and_clear();

    print_status(&source, &report?);
    Ok(())
}

fn print_status(source: &SourceSpec, report: &StatusReport) {
    println!();
    println!("{}", style::header("treesync status"));
    println!("{}", "═".repeat(15));
    println!(
        "  Branch     : {} at {} {}",
        report.branch,
        style::commit(&report.host.short_id),
        report.host.summary
    );
    println!(
        "  Source     : {} at {} {}",
        source,
        style::commit(&report.source.short_id),
        report.source.summary
    );
    match &report.alignment {
        Some(alignment) => println!(
            "  Aligned at : {} (tree {})",
            style::commit(&alignment.host_commit.to_string()),
            style::dim(&alignment.tree.to_string())
        ),
        None => println!("  Aligned at : {}", style::dim("never")),
    }
    println!();
    match report.freshness {
        Freshness::UpToDate(_) => println!("  {}", style::success("Up to date")),
        Freshness::NeedsImport(_) => {
            println!("  {}", style::warn("Source has changed; run 'git treesync resync'"))
        }
        Freshness::NoCommonHistory => println!(
            "  {}",
            style::warn("No common history; run 'git treesync init' for a first import")
        ),
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_args(argv: &[&str]) -> RunArgs {
        let cli = Cli::try_parse_from(argv).expect("arguments should parse");
        match cli.command {
            Commands::Init(args) | Commands::Resync(args) => args,
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_single_argument_is_local_source() {
        let args = run_args(&["git-treesync", "resync", "vendor/main"]);
        assert_eq!(
            args.source.spec(),
            SourceSpec::Local {
                rev: "vendor/main".into()
            }
        );
    }

    #[test]
    fn test_two_arguments_are_remote_source() {
        let args = run_args(&[
            "git-treesync",
            "init",
            "https://example.com/template.git",
            "main",
        ]);
        assert_eq!(
            args.source.spec(),
            SourceSpec::Remote {
                url: "https://example.com/template.git".into(),
                rev: "main".into()
            }
        );
    }

    #[test]
    fn test_yes_skips_editor_and_later_edit_flag_wins() {
        let args = run_args(&["git-treesync", "resync", "-y", "vendor"]);
        let request = args.request(SyncMode::Resync);
        assert!(!request.edit);
        assert!(!args.interactive());

        let args = run_args(&["git-treesync", "resync", "--no-edit", "--edit", "vendor"]);
        assert!(args.request(SyncMode::Resync).edit);

        let args = run_args(&["git-treesync", "init", "-m", "Vendor it", "vendor"]);
        let request = args.request(SyncMode::Init);
        assert!(!request.edit);
        assert_eq!(request.message.as_deref(), Some("Vendor it"));
        assert_eq!(request.mode, SyncMode::Init);
    }

    #[test]
    fn test_yes_cannot_be_combined_with_edit() {
        let err = Cli::try_parse_from(["git-treesync", "resync", "--yes", "--edit", "vendor"])
            .unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);

        let err = Cli::try_parse_from(["git-treesync", "init", "--edit", "-y", "vendor"])
            .unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn test_dry_run_and_global_repo_flag() {
        let cli = Cli::try_parse_from(["git-treesync", "resync", "-n", "vendor", "-C", "/tmp/host"])
            .unwrap();
        assert_eq!(cli.repo, PathBuf::from("/tmp/host"));
        match cli.command {
            Commands::Resync(args) => assert!(args.request(SyncMode::Resync).dry_run),
            other => panic!("unexpected command {:?}", other),
        }
    }
}
