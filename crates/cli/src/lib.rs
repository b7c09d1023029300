//! gixt: run GitHub gists as local commands.
//!
//! ```text
//!   identifier ──> resolve (alias / index / live) ──> fetch ──> materialize
//!                                                                  │
//!              exit code <── execute <── plan <── trust gate <─────┘
//! ```
//!
//! Everything besides the default run command manages local state: aliases,
//! the index, description overrides, settings and the cache.

use anyhow::{Context as AnyhowContext, Result};
use clap::{Args, Parser, Subcommand};
use console::style;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

pub mod api;
pub mod commands;
pub mod config;
pub mod exec;
pub mod github;
pub mod prompt;
pub mod run;
pub mod state;
pub mod trust;

use commands::manifest::{ManifestContext, ManifestOptions};
use commands::remove::RemoveTargets;
use commands::settings::TrustChanges;
use config::{CacheMode, ExecMode, Paths, TrustMode};
use exec::{ExecError, CANCELLED_EXIT_CODE};
use github::GitHubClient;
use gixt_protocol::Platform;
use gixt_runner::DEFAULT_MANIFEST_NAME;
use prompt::TerminalPrompter;
use run::{RunContext, RunOptions, RunOutcome};

#[derive(Parser)]
#[command(name = "gixt")]
#[command(about = "Run GitHub gists as local commands", long_about = None)]
#[command(version)]
#[command(args_conflicts_with_subcommands = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    run: RunArgs,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log errors only
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Cache directory (relative paths live under the platform cache root)
    #[arg(long, global = true)]
    cache_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a gist (same as omitting the subcommand)
    Run(RunArgs),

    /// Manage aliases
    Alias {
        #[command(subcommand)]
        action: AliasAction,
    },

    /// Refresh every indexed gist
    #[command(name = "update-index")]
    UpdateIndex,

    /// Index your own gists
    #[command(name = "index-mine")]
    IndexMine,

    /// Index a user's public gists
    #[command(name = "index-owner")]
    IndexOwner(IndexOwnerArgs),

    /// Remove the index file (cache untouched)
    #[command(name = "clear-index")]
    ClearIndex,

    /// Remove the whole cache directory
    #[command(name = "clean-cache")]
    CleanCache,

    /// List indexed and cached gists
    List(ListArgs),

    /// Show what is known about a gist
    Describe {
        identifier: String,
    },

    /// Configure trust defaults
    #[command(name = "config-trust")]
    ConfigTrust(ConfigTrustArgs),

    /// Configure cache mode
    #[command(name = "config-cache")]
    ConfigCache {
        #[arg(long, value_enum)]
        mode: Option<CacheMode>,
        #[arg(long)]
        show: bool,
    },

    /// Configure the execution directory mode
    #[command(name = "config-exec")]
    ConfigExec {
        #[arg(long, value_enum)]
        mode: Option<ExecMode>,
        #[arg(long)]
        show: bool,
    },

    /// Cache a gist without running it
    Register(RegisterArgs),

    /// Create, edit, upload or view run manifests
    Manifest(ManifestArgs),

    /// Local description overrides used by list and name lookup
    #[command(name = "index-description")]
    IndexDescription {
        #[command(subcommand)]
        action: Option<DescriptionAction>,
    },

    /// Change a gist's description on GitHub (owner only)
    #[command(name = "set-description")]
    SetDescription {
        identifier: String,
        #[arg(required = true, num_args = 1..)]
        description: Vec<String>,
    },

    /// Remove gists from the index and/or cache
    Remove(RemoveArgs),

    /// Clone a gist's git repository with the GitHub CLI
    Clone {
        target: String,
        /// Destination directory (defaults to the gist id)
        #[arg(long)]
        dir: Option<PathBuf>,
    },

    /// Copy a gist into a new gist of your own
    Fork {
        target: String,
        #[arg(long)]
        public: bool,
        /// Description of the new gist (defaults to the original's)
        #[arg(long)]
        description: Option<String>,
    },
}

#[derive(Args)]
struct RunArgs {
    /// Gist id, URL, alias, filename or owner/filename
    identifier: Option<String>,

    /// Arguments passed to the gist
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    args: Vec<String>,

    /// Pin to a specific revision
    #[arg(long = "ref")]
    git_ref: Option<String>,

    /// Run from a temporary directory that is removed afterwards
    #[arg(long)]
    no_cache: bool,

    /// Re-download files even if cached
    #[arg(long)]
    update: bool,

    /// Refresh the index before resolving
    #[arg(long)]
    update_index: bool,

    /// Run manifest file name inside the gist
    #[arg(long, default_value = DEFAULT_MANIFEST_NAME)]
    manifest: String,

    /// Print the planned command before running
    #[arg(long)]
    print_cmd: bool,

    /// Show the planned command without running it
    #[arg(long)]
    dry_run: bool,

    /// Print the gist's files instead of running
    #[arg(long)]
    view: bool,

    /// Clear the cache before running
    #[arg(long)]
    clear_cache: bool,

    /// Look up owner/name against the owner's live gist list
    #[arg(short = 'u', long)]
    user_lookup: bool,

    /// Pages of 100 gists scanned by --user-lookup
    #[arg(short = 'p', long, default_value_t = gixt_resolve::DEFAULT_USER_PAGES)]
    user_pages: u32,

    /// Also match indexed descriptions
    #[arg(long)]
    desc_lookup: bool,

    /// Run inside the gist directory
    #[arg(long)]
    isolate: bool,

    /// Run in the current directory
    #[arg(long, visible_alias = "here", conflicts_with = "isolate")]
    cwd: bool,

    /// Cancel the gist after this long (30s, 2m, 1h, 500ms)
    #[arg(long, value_parser = exec::parse_duration)]
    timeout: Option<Duration>,

    /// Skip the trust prompt for this run
    #[arg(short, long)]
    yes: bool,

    /// Trust this gist from now on
    #[arg(long)]
    trust_always: bool,

    /// Trust every gist from now on
    #[arg(long)]
    trust_all: bool,
}

impl RunArgs {
    fn options(&self) -> RunOptions {
        RunOptions {
            git_ref: self.git_ref.clone().filter(|r| !r.trim().is_empty()),
            no_cache: self.no_cache,
            update: self.update,
            update_index: self.update_index,
            manifest_name: self.manifest.clone(),
            print_cmd: self.print_cmd,
            dry_run: self.dry_run,
            view: self.view,
            clear_cache: self.clear_cache,
            user_lookup: self.user_lookup,
            desc_lookup: self.desc_lookup,
            user_pages: self.user_pages.max(1),
            isolate: self.isolate,
            cwd: self.cwd,
            timeout: self.timeout,
            yes: self.yes,
            trust_always: self.trust_always,
            trust_all: self.trust_all,
        }
    }
}

#[derive(Subcommand)]
enum AliasAction {
    /// Map a name to a gist id or URL
    Add { name: String, target: String },
    List,
    Remove { name: String },
}

#[derive(Args)]
struct IndexOwnerArgs {
    login: Option<String>,

    #[arg(long, conflicts_with = "login")]
    owner: Option<String>,
}

#[derive(Args)]
struct ListArgs {
    /// Only cached gists
    #[arg(long)]
    cache: bool,

    /// Only gists owned by the authenticated user
    #[arg(long)]
    mine: bool,
}

#[derive(Args)]
struct ConfigTrustArgs {
    #[arg(long, value_enum)]
    mode: Option<TrustMode>,

    /// Trust an owner (repeatable)
    #[arg(long, visible_alias = "trust-owner")]
    owner: Vec<String>,

    #[arg(long)]
    remove_owner: Vec<String>,

    #[arg(long)]
    remove_gist: Vec<String>,

    #[arg(long)]
    clear_owners: bool,

    #[arg(long)]
    clear_gists: bool,

    /// Forget every trust decision and return to mode never
    #[arg(long)]
    reset: bool,

    #[arg(long)]
    show: bool,
}

impl From<ConfigTrustArgs> for TrustChanges {
    fn from(args: ConfigTrustArgs) -> Self {
        Self {
            mode: args.mode,
            add_owners: args.owner,
            remove_owners: args.remove_owner,
            remove_gists: args.remove_gist,
            clear_owners: args.clear_owners,
            clear_gists: args.clear_gists,
            reset: args.reset,
            show: args.show,
        }
    }
}

#[derive(Args)]
struct RegisterArgs {
    target: String,

    #[arg(long = "ref")]
    git_ref: Option<String>,

    /// Re-download even if cached
    #[arg(long)]
    update: bool,
}

#[derive(Args)]
struct ManifestArgs {
    #[arg(long)]
    create: bool,
    #[arg(long)]
    edit: bool,
    #[arg(long)]
    upload: bool,
    /// Print the manifest stored in a gist
    #[arg(long)]
    view: bool,
    /// Print the JSON schema of run manifests
    #[arg(long)]
    schema: bool,
    /// Overwrite without asking
    #[arg(long)]
    force: bool,

    /// Manifest file name
    #[arg(long)]
    name: Option<String>,
    /// Target gist for --upload and --view
    #[arg(long)]
    gist: Option<String>,
    #[arg(long)]
    run: Option<String>,
    /// KEY=VALUE (repeatable)
    #[arg(long)]
    env: Vec<String>,
    #[arg(long)]
    details: Option<String>,
    #[arg(long)]
    version: Option<String>,

    /// `key value` pairs: run, env, details, version, name
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pairs: Vec<String>,
}

impl ManifestArgs {
    fn options(self) -> Result<ManifestOptions> {
        let mut opts = ManifestOptions {
            name: self.name,
            create: self.create,
            edit: self.edit,
            upload: self.upload,
            view: self.view,
            schema: self.schema,
            force: self.force,
            gist: self.gist,
            run: self.run,
            env: self.env,
            details: self.details,
            version: self.version,
        };
        opts.apply_positional(&self.pairs)?;
        Ok(opts)
    }
}

#[derive(Subcommand)]
enum DescriptionAction {
    List,
    Add {
        target: String,
        #[arg(required = true, num_args = 1..)]
        description: Vec<String>,
    },
    Remove {
        target: String,
    },
}

#[derive(Args)]
struct RemoveArgs {
    /// Remove from the cache
    #[arg(long)]
    cache: Vec<String>,
    /// Remove from the index
    #[arg(long)]
    index: Vec<String>,
    /// Remove from both cache and index
    #[arg(long = "cache-index")]
    cache_index: Vec<String>,
    /// Remove every gist of an owner
    #[arg(long)]
    owner: Vec<String>,
}

fn init_logging(verbose: bool, quiet: bool) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if quiet {
        builder.filter_level(log::LevelFilter::Error);
    } else if verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();
}

async fn github() -> Result<GitHubClient> {
    GitHubClient::from_env()
        .await
        .context("Failed to set up GitHub client")
}

pub async fn main_entry() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    match dispatch(cli).await {
        Ok(code) => code,
        Err(err) => {
            if let Some(ExecError::Cancelled { .. }) = err.downcast_ref::<ExecError>() {
                eprintln!("{}", style(format!("{err:#}")).yellow());
                return ExitCode::from(CANCELLED_EXIT_CODE);
            }
            eprintln!("{}", style(format!("error: {err:#}")).red());
            ExitCode::FAILURE
        }
    }
}

async fn dispatch(cli: Cli) -> Result<ExitCode> {
    let paths = Paths::discover(cli.cache_dir.as_deref())?;

    let command = match cli.command {
        Some(command) => command,
        None => return run_default(&paths, cli.run).await,
    };
    match command {
        Commands::Run(args) => return run_default(&paths, args).await,
        Commands::Alias { action } => match action {
            AliasAction::Add { name, target } => commands::alias::add(&paths, &name, &target)?,
            AliasAction::List => commands::alias::list(&paths)?,
            AliasAction::Remove { name } => commands::alias::remove(&paths, &name)?,
        },
        Commands::UpdateIndex => commands::index::update_index(&paths, &github().await?).await?,
        Commands::IndexMine => commands::index::index_mine(&paths, &github().await?).await?,
        Commands::IndexOwner(args) => {
            let owner = args.login.or(args.owner).unwrap_or_default();
            commands::index::index_owner(&paths, &github().await?, &owner).await?
        }
        Commands::ClearIndex => commands::index::clear_index(&paths)?,
        Commands::CleanCache => commands::index::clean_cache(&paths)?,
        Commands::List(args) => {
            commands::list::list(&paths, &github().await?, args.cache, args.mine).await?
        }
        Commands::Describe { identifier } => {
            commands::describe::describe(&paths, &github().await?, &identifier).await?
        }
        Commands::ConfigTrust(args) => commands::settings::config_trust(&paths, &args.into())?,
        Commands::ConfigCache { mode, show } => {
            commands::settings::config_cache(&paths, mode, show)?
        }
        Commands::ConfigExec { mode, show } => commands::settings::config_exec(&paths, mode, show)?,
        Commands::Register(args) => {
            commands::register::register(
                &paths,
                &github().await?,
                &args.target,
                args.git_ref.as_deref().filter(|r| !r.trim().is_empty()),
                args.update,
            )
            .await?
        }
        Commands::Manifest(args) => {
            let opts = args.options()?;
            let cwd = std::env::current_dir().context("Failed to read current dir")?;
            let api = github().await?;
            let ctx = ManifestContext {
                paths: &paths,
                api: &api,
                prompter: &TerminalPrompter,
                cwd: &cwd,
            };
            commands::manifest::manifest(&ctx, &opts).await?
        }
        Commands::IndexDescription { action } => match action.unwrap_or(DescriptionAction::List) {
            DescriptionAction::List => commands::descriptions::list_overrides(&paths)?,
            DescriptionAction::Add {
                target,
                description,
            } => {
                commands::descriptions::add_override(&paths, &github().await?, &target, &description)
                    .await?
            }
            DescriptionAction::Remove { target } => {
                commands::descriptions::remove_override(&paths, &github().await?, &target).await?
            }
        },
        Commands::SetDescription {
            identifier,
            description,
        } => {
            commands::descriptions::set_description(
                &paths,
                &github().await?,
                &identifier,
                &description.join(" "),
            )
            .await?
        }
        Commands::Remove(args) => {
            let targets = RemoveTargets {
                cache: args.cache,
                index: args.index,
                both: args.cache_index,
                owners: args.owner,
            };
            commands::remove::remove(&paths, &github().await?, &targets).await?
        }
        Commands::Clone { target, dir } => {
            let cwd = std::env::current_dir().context("Failed to read current dir")?;
            commands::clone::clone_gist(&paths, &github().await?, &target, dir.as_deref(), &cwd)
                .await?
        }
        Commands::Fork {
            target,
            public,
            description,
        } => {
            commands::clone::fork_gist(
                &paths,
                &github().await?,
                &target,
                public,
                description.as_deref(),
            )
            .await?;
        }
    }
    Ok(ExitCode::SUCCESS)
}

async fn run_default(paths: &Paths, args: RunArgs) -> Result<ExitCode> {
    let Some(identifier) = args.identifier.as_deref().filter(|i| !i.trim().is_empty()) else {
        anyhow::bail!("missing gist identifier (usage: gixt [flags] <gist> [-- args])");
    };
    let api = github().await?;
    let ctx = RunContext {
        paths,
        api: &api,
        prompter: &TerminalPrompter,
        invocation_dir: std::env::current_dir().context("Failed to read current dir")?,
        platform: Platform::current(),
    };

    match run::run_gist(&ctx, identifier, &args.args, &args.options()).await? {
        RunOutcome::Completed { exit_code } => Ok(exit_code_from(exit_code)),
        RunOutcome::DryRun | RunOutcome::Viewed => Ok(ExitCode::SUCCESS),
        RunOutcome::AbortedAfterView => {
            log::warn!("aborted after view");
            Ok(ExitCode::FAILURE)
        }
        RunOutcome::AbortedByUser => {
            log::warn!("aborted by user");
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Child exit codes outside 0..=255 are reported as a generic failure.
fn exit_code_from(code: i32) -> ExitCode {
    u8::try_from(code).map_or(ExitCode::FAILURE, ExitCode::from)
}
