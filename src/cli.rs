//! Command-line surface: argument parsing and one runner per subcommand.
//!
//! Flags are applied on top of the loaded [`Config`]; list flags replace the
//! configured list rather than extending it.

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use toolbelt_core::config::{ArchiveConfig, CombineConfig, Config, MigrateConfig};
use toolbelt_core::{normalize_with, FixedSeed, MonotonicSeeds, SeedSource, SystemClock};
use toolbelt_files::{ArchiveOptions, ArchiveReport, CombineReport};
use toolbelt_store::{
    run_migration, FirestoreClient, MigrationOutcome, ServiceAccount, ServiceAccountKey,
    StaticToken, TokenSource,
};

#[derive(Debug, Parser)]
#[command(name = "toolbelt", version, about = "Workspace chores: archive, combine, slug, migrate ids")]
pub struct Cli {
    /// Verbose (debug) logging on stderr. RUST_LOG takes precedence.
    #[arg(long, global = true)]
    pub debug: bool,

    /// Extra config file layered over the user config.
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print the identifier for each name (one per line; stdin when none given).
    Slug(SlugArgs),
    /// Compress a folder into a timestamped .zip.
    Archive(ArchiveArgs),
    /// Concatenate source files into one text dump.
    Combine(CombineArgs),
    /// Recompute node ids from their names and write them back.
    MigrateIds(MigrateArgs),
}

#[derive(Debug, Args)]
pub struct SlugArgs {
    pub names: Vec<String>,
    /// Fallback seed in milliseconds; defaults to the current time.
    #[arg(long, value_name = "MS")]
    pub seed: Option<u64>,
}

#[derive(Debug, Args)]
pub struct ArchiveArgs {
    #[arg(long, value_name = "DIR")]
    pub source: Option<PathBuf>,
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct CombineArgs {
    #[arg(long, value_name = "FILE")]
    pub output: Option<PathBuf>,
    /// Folder scanned with all subfolders (repeatable).
    #[arg(long = "recursive", value_name = "DIR")]
    pub recursive: Vec<PathBuf>,
    /// Folder scanned without descending (repeatable).
    #[arg(long = "flat", value_name = "DIR")]
    pub flat: Vec<PathBuf>,
    /// Single file to include (repeatable).
    #[arg(long = "file", value_name = "FILE")]
    pub files: Vec<PathBuf>,
    /// Accepted extension, with or without the dot (repeatable).
    #[arg(long = "ext", value_name = "EXT")]
    pub extensions: Vec<String>,
    /// Directory name skipped anywhere in the walk (repeatable).
    #[arg(long = "exclude", value_name = "NAME")]
    pub exclude: Vec<String>,
    /// Omit the folder tree header.
    #[arg(long)]
    pub no_tree: bool,
}

#[derive(Debug, Args)]
pub struct MigrateArgs {
    #[arg(long = "project", value_name = "ID")]
    pub project: Option<String>,
    #[arg(long = "tenant", value_name = "ID")]
    pub tenant: Option<String>,
    #[arg(long, value_name = "PATH")]
    pub collection: Option<String>,
    /// Service-account JSON key.
    #[arg(long = "key", value_name = "FILE")]
    pub key: Option<PathBuf>,
    /// Pre-issued bearer token; wins over --key.
    #[arg(long, value_name = "TOKEN")]
    pub token: Option<String>,
    #[arg(long, value_name = "URL")]
    pub base_url: Option<String>,
    #[arg(long, value_name = "N")]
    pub batch_size: Option<usize>,
    /// Do not ask for confirmation.
    #[arg(long)]
    pub yes: bool,
    /// Log the computed ids without writing.
    #[arg(long)]
    pub dry_run: bool,
}

// ---------------------------------------------------------------------------
// Overrides
// ---------------------------------------------------------------------------

impl ArchiveArgs {
    pub fn apply(&self, cfg: &mut ArchiveConfig) {
        if let Some(source) = &self.source {
            cfg.source = Some(source.clone());
        }
        if let Some(out) = &self.output_dir {
            cfg.output_dir = out.clone();
        }
    }
}

impl CombineArgs {
    pub fn apply(&self, cfg: &mut CombineConfig) {
        if let Some(out) = &self.output {
            cfg.output_file = out.clone();
        }
        if !self.recursive.is_empty() {
            cfg.recursive_folders = self.recursive.clone();
        }
        if !self.flat.is_empty() {
            cfg.flat_folders = self.flat.clone();
        }
        if !self.files.is_empty() {
            cfg.include_files = self.files.clone();
        }
        if !self.extensions.is_empty() {
            cfg.include_extensions = self
                .extensions
                .iter()
                .map(|e| {
                    if e.starts_with('.') {
                        e.clone()
                    } else {
                        format!(".{e}")
                    }
                })
                .collect();
        }
        if !self.exclude.is_empty() {
            cfg.exclude_dirs = self.exclude.clone();
        }
        if self.no_tree {
            cfg.include_file_structure = false;
        }
    }
}

impl MigrateArgs {
    pub fn apply(&self, cfg: &mut MigrateConfig) {
        if let Some(p) = &self.project {
            cfg.project_id = Some(p.clone());
        }
        if let Some(t) = &self.tenant {
            cfg.tenant_id = t.clone();
        }
        if let Some(c) = &self.collection {
            cfg.collection = c.clone();
        }
        if let Some(k) = &self.key {
            cfg.service_account_key = Some(k.clone());
        }
        if let Some(t) = &self.token {
            cfg.access_token = Some(t.clone());
        }
        if let Some(u) = &self.base_url {
            cfg.base_url = u.clone();
        }
        if let Some(n) = self.batch_size {
            cfg.batch_size = n;
        }
        cfg.assume_yes |= self.yes;
        cfg.dry_run |= self.dry_run;
    }
}

// ---------------------------------------------------------------------------
// Runners
// ---------------------------------------------------------------------------

/// Load configuration and dispatch. Returns the process exit code.
pub async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let mut cfg = Config::load(cli.config.as_deref()).context("loading configuration")?;

    match cli.command {
        Command::Slug(args) => {
            let stdin = std::io::stdin();
            let stdout = std::io::stdout();
            slug(&args, stdin.lock(), &mut stdout.lock())?;
        }
        Command::Archive(args) => {
            args.apply(&mut cfg.archive);
            let report = archive(&cfg.archive)?;
            println!("{}", report.path.display());
        }
        Command::Combine(args) => {
            args.apply(&mut cfg.combine);
            combine(&cfg.combine)?;
        }
        Command::MigrateIds(args) => {
            args.apply(&mut cfg.migrate);
            let outcome = migrate_ids(&cfg.migrate, confirm_on_stdin).await?;
            return Ok(exit_code(&outcome));
        }
    }
    Ok(ExitCode::SUCCESS)
}

/// Write one identifier per name to `out`. Names come from `args.names`, or
/// from `input` line by line when none were given.
pub fn slug(args: &SlugArgs, input: impl BufRead, out: &mut impl Write) -> anyhow::Result<()> {
    let fixed;
    let source: &dyn SeedSource = match args.seed {
        Some(seed) => {
            fixed = FixedSeed(seed);
            &fixed
        }
        None => &SystemClock,
    };
    let seeds = MonotonicSeeds::new(source);

    if args.names.is_empty() {
        for line in input.lines() {
            let line = line.context("reading names from stdin")?;
            if line.is_empty() {
                continue;
            }
            writeln!(out, "{}", normalize_with(&line, &seeds))?;
        }
    } else {
        for name in &args.names {
            writeln!(out, "{}", normalize_with(name, &seeds))?;
        }
    }
    Ok(())
}

pub fn archive(cfg: &ArchiveConfig) -> anyhow::Result<ArchiveReport> {
    let Some(source) = cfg.source.clone() else {
        bail!("no source folder: set archive.source or pass --source");
    };
    let opts = ArchiveOptions {
        source,
        output_dir: cfg.output_dir.clone(),
    };
    let report = toolbelt_files::create_archive(&opts, chrono::Local::now())
        .context("archiving folder")?;
    if report.skipped > 0 {
        tracing::warn!(skipped = report.skipped, "some entries were left out");
    }
    Ok(report)
}

pub fn combine(cfg: &CombineConfig) -> anyhow::Result<CombineReport> {
    let report = toolbelt_files::combine(cfg).context("combining files")?;
    tracing::info!(
        files = report.files,
        skipped = report.skipped,
        output = %report.output.display(),
        "combined"
    );
    Ok(report)
}

/// Run the id migration against Firestore.
pub async fn migrate_ids(
    cfg: &MigrateConfig,
    confirm: impl FnOnce(usize) -> bool,
) -> anyhow::Result<MigrationOutcome> {
    cfg.validate()?;
    let http = reqwest::Client::new();

    let (token, key_project): (Arc<dyn TokenSource>, Option<String>) =
        match (&cfg.access_token, &cfg.service_account_key) {
            (Some(token), _) => (Arc::new(StaticToken(token.clone())), None),
            (None, Some(path)) => {
                let key = ServiceAccountKey::from_file(path)?;
                let project = key.project_id.clone();
                (Arc::new(ServiceAccount::new(key, http.clone())?), project)
            }
            (None, None) => {
                bail!("no credentials: set migrate.service_account_key (--key) or --token")
            }
        };

    let project = match cfg.require_project_id() {
        Ok(p) => p.to_string(),
        Err(e) => key_project.ok_or(e)?,
    };
    tracing::debug!(project = %project, base_url = %cfg.base_url, "connecting");

    let store = FirestoreClient::new(http, cfg.base_url.clone(), project, token);
    run_migration(&store, cfg, SystemClock, confirm)
        .await
        .context("migrating node ids")
}

/// Non-zero when any batch failed. An aborted run is not a failure.
pub fn exit_code(outcome: &MigrationOutcome) -> ExitCode {
    match outcome {
        MigrationOutcome::Completed(report) if report.failed > 0 => ExitCode::FAILURE,
        _ => ExitCode::SUCCESS,
    }
}

/// Ask on stderr, read the answer from stdin. Only `yes` (any case) proceeds.
fn confirm_on_stdin(count: usize) -> bool {
    eprint!("This will update {count} nodes. Type 'yes' to continue: ");
    let _ = std::io::stderr().flush();
    let mut answer = String::new();
    if std::io::stdin().lock().read_line(&mut answer).is_err() {
        return false;
    }
    is_yes(&answer)
}

fn is_yes(answer: &str) -> bool {
    answer.trim().eq_ignore_ascii_case("yes")
}
