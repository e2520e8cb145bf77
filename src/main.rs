//! revport - Main Entry Point
//!
//! Thin CLI wrapper around the `revport` library: argument parsing,
//! logging setup and exit codes live here, nothing else. All settings are
//! validated before the core pipeline is invoked.

use std::path::PathBuf;

use anyhow::Result;
use clap::{CommandFactory, Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use revport::{
    BranchModel, BzrBackend, GitBackend, HgBackend, JsonExportSource, MigrationConfig,
    MigrationDriver, RunMode, VcsBackend,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Backend {
    Git,
    Hg,
    Bzr,
}

/// Replay the history of a legacy centralized VCS into Git, Mercurial or
/// Bazaar
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// What to do: analyze only, full migration, or continuous update
    #[arg(value_enum)]
    mode: RunMode,

    /// JSON history export of the source repository
    source: PathBuf,

    /// Target working directory (ignored in analyze mode)
    #[arg(long, default_value = "./migrated")]
    workspace: PathBuf,

    /// Target version control system
    #[arg(long, value_enum, default_value_t = Backend::Git)]
    backend: Backend,

    /// Branch model: 1 = single branch, 2 = develop/production leaving
    /// develop checked out, 3 = develop/production leaving production
    #[arg(long, default_value = "1")]
    branch_model: String,

    /// JSON file mapping source logins to names and emails
    #[arg(long)]
    user_map: Option<PathBuf>,

    /// Domain for synthesized author emails
    #[arg(long)]
    email_domain: Option<String>,

    /// Hour offset applied to source timestamps (-12..=12)
    #[arg(long, default_value_t = 0)]
    time_shift: i64,

    /// Verbose logging (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    if std::env::args().len() == 1 {
        let mut cmd = Args::command();
        cmd.print_help().ok();
        println!();
        std::process::exit(2);
    }

    let args = Args::parse();
    init_logging(args.verbose);

    let config = MigrationConfig {
        mode: args.mode,
        workspace: args.workspace.clone(),
        branch_model: BranchModel::from_selector(&args.branch_model)?,
        time_shift_hours: args.time_shift,
        email_domain: args.email_domain.clone(),
        user_map: args.user_map.clone(),
    };
    config.validate()?;

    let source = JsonExportSource::open(&args.source)?;
    let mut backend: Box<dyn VcsBackend> = match args.backend {
        Backend::Git => Box::new(GitBackend::new(&args.workspace)),
        Backend::Hg => Box::new(HgBackend::new(&args.workspace)),
        Backend::Bzr => Box::new(BzrBackend::new(&args.workspace)),
    };

    match args.mode {
        RunMode::Analyze => {
            let driver = MigrationDriver::new(&config, &source, backend.as_mut());
            let report = driver.analyze()?;
            println!("events:     {}", report.events);
            println!("dropped:    {}", report.dropped);
            println!("changesets: {}", report.changesets);
            println!("adds:       {}", report.adds);
            println!("tags:       {}", report.tags);
            println!("authors:    {}", report.authors.join(", "));
        }
        RunMode::Full | RunMode::Continuous => {
            let mut driver = MigrationDriver::new(&config, &source, backend.as_mut());
            let stats = driver.migrate()?;
            println!(
                "replayed {}/{} changesets: {} commits, {} tags ({} skipped), {} merges",
                stats.changesets_replayed,
                stats.changesets_total,
                stats.commits,
                stats.tags_applied,
                stats.tags_skipped,
                stats.merges
            );
            if stats.fetch_failures > 0 || stats.backend_failures > 0 {
                println!(
                    "warnings: {} fetch failures, {} backend failures",
                    stats.fetch_failures, stats.backend_failures
                );
            }
        }
    }
    Ok(())
}
