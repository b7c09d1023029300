//! Execution orchestrator: resolve, fetch, materialize, gate, plan, execute.

use crate::api::{ApiBridge, GistApi};
use crate::commands::index::update_index;
use crate::config::{CacheMode, ExecMode, Paths, Settings, TrustMode};
use crate::exec::execute;
use crate::prompt::{Prompter, TrustChoice};
use crate::state::{gist_version, LocalState};
use crate::trust::{evaluate, TrustVerdict};
use anyhow::{Context as AnyhowContext, Result};
use console::style;
use gixt_cache::{cache_dir, materialize, shorten, CacheManifest};
use gixt_protocol::Platform;
use gixt_resolve::ResolveOptions;
use gixt_runner::{plan, PlanRequest};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub git_ref: Option<String>,
    pub no_cache: bool,
    pub update: bool,
    pub update_index: bool,
    pub manifest_name: String,
    pub print_cmd: bool,
    pub dry_run: bool,
    pub view: bool,
    pub clear_cache: bool,
    pub user_lookup: bool,
    pub desc_lookup: bool,
    pub user_pages: u32,
    pub isolate: bool,
    pub cwd: bool,
    pub timeout: Option<Duration>,
    pub yes: bool,
    pub trust_always: bool,
    pub trust_all: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Completed { exit_code: i32 },
    DryRun,
    /// `--view`: files printed, nothing run.
    Viewed,
    /// Files viewed from the trust prompt; the run does not go ahead.
    AbortedAfterView,
    AbortedByUser,
}

/// Collaborators of a run.
pub struct RunContext<'a> {
    pub paths: &'a Paths,
    pub api: &'a dyn GistApi,
    pub prompter: &'a dyn Prompter,
    /// Directory gixt was invoked from.
    pub invocation_dir: PathBuf,
    pub platform: Platform,
}

/// Materialization target: a per-version cache dir, or a temp dir removed on drop.
enum WorkDir {
    Persistent(PathBuf),
    Ephemeral(TempDir),
}

impl WorkDir {
    fn path(&self) -> &Path {
        match self {
            Self::Persistent(dir) => dir,
            Self::Ephemeral(dir) => dir.path(),
        }
    }

    fn is_persistent(&self) -> bool {
        matches!(self, Self::Persistent(_))
    }
}

/// Per-run overrides beat the stored mode; no stored mode means isolate.
pub fn decide_exec_mode(stored: Option<ExecMode>, isolate: bool, cwd: bool) -> Result<ExecMode> {
    match (isolate, cwd) {
        (true, true) => anyhow::bail!("cannot use --isolate and --cwd together"),
        (true, false) => Ok(ExecMode::Isolate),
        (false, true) => Ok(ExecMode::Cwd),
        (false, false) => Ok(stored.unwrap_or(ExecMode::Isolate)),
    }
}

/// Forwarded args naming existing paths relative to `cwd` become absolute.
pub fn resolve_user_args(args: &[String], cwd: &Path) -> Vec<String> {
    args.iter()
        .map(|arg| {
            let path = Path::new(arg);
            if arg.is_empty() || path.is_absolute() {
                return arg.clone();
            }
            let candidate = cwd.join(path);
            if candidate.exists() {
                candidate.display().to_string()
            } else {
                arg.clone()
            }
        })
        .collect()
}

pub async fn run_gist(
    ctx: &RunContext<'_>,
    identifier: &str,
    forwarded: &[String],
    opts: &RunOptions,
) -> Result<RunOutcome> {
    let paths = ctx.paths;
    paths.ensure_dirs()?;
    let mut settings = Settings::load(&paths.settings_file)?;

    if opts.trust_all {
        settings.mode = TrustMode::All;
        settings.save(&paths.settings_file)?;
        println!(
            "{}",
            style("all gists trusted (prompt disabled globally).").yellow()
        );
    }
    if opts.clear_cache {
        println!("clearing cache at {}...", paths.cache_dir.display());
        std::fs::remove_dir_all(&paths.cache_dir)
            .or_else(ignore_not_found)
            .with_context(|| format!("Failed to clear cache {}", paths.cache_dir.display()))?;
        paths.ensure_dirs()?;
    }

    if opts.update_index {
        update_index(paths, ctx.api).await?;
    }

    let state = LocalState::load(paths)?;
    let resolve_options = ResolveOptions {
        live_lookup: opts.user_lookup,
        description_lookup: opts.desc_lookup,
        max_pages: opts.user_pages,
    };
    let identity = state.resolve(identifier, &resolve_options, ctx.api).await?;
    log::info!("resolved {identifier:?} to gist {}", identity.id);

    log::debug!("fetching gist {}", identity.id);
    let gist = ctx
        .api
        .fetch(&identity.id, opts.git_ref.as_deref())
        .await
        .with_context(|| format!("Failed to fetch gist {}", identity.id))?;
    let sha = gist_version(&gist, opts.git_ref.as_deref())?;
    let owner = identity
        .owner_hint
        .clone()
        .or_else(|| gist.owner_login().map(str::to_string))
        .unwrap_or_default();

    let ephemeral = opts.no_cache || settings.cache_mode == CacheMode::Never;
    let work_dir = prepare_work_dir(&paths.cache_dir, &identity.id, &sha, ephemeral)?;

    if settings.exec_mode.is_none() && (!identity.from_index || opts.user_lookup) {
        let chosen = if opts.yes {
            ExecMode::Isolate
        } else {
            ctx.prompter.exec_mode()?
        };
        settings.exec_mode = Some(chosen);
        settings.save(&paths.settings_file)?;
    }
    let exec_mode = decide_exec_mode(settings.exec_mode, opts.isolate, opts.cwd)?;
    let exec_dir = match exec_mode {
        ExecMode::Isolate => work_dir.path().to_path_buf(),
        ExecMode::Cwd => ctx.invocation_dir.clone(),
    };
    log::debug!("executing in {} (mode={exec_mode})", exec_dir.display());

    let materialized = materialize(&gist.files, work_dir.path(), opts.update, &ApiBridge(ctx.api))
        .await
        .with_context(|| format!("Failed to materialize gist {}", identity.id))?;
    let manifest = CacheManifest::for_gist(&gist, &sha, &owner, materialized.files);
    if work_dir.is_persistent() {
        manifest.save(work_dir.path())?;
    }
    log::debug!(
        "working dir: {} (reused cache: {})",
        work_dir.path().display(),
        materialized.reused_from_cache
    );

    if opts.view {
        view_files(&manifest, work_dir.path());
        return Ok(RunOutcome::Viewed);
    }

    let force_yes = opts.yes || opts.trust_always;
    let verdict = evaluate(&settings, &owner, &identity.id, force_yes);
    if let TrustVerdict::Trusted(reason) = verdict {
        log::debug!("gist trusted: {reason:?}");
    }
    let current_login = if verdict == TrustVerdict::NeedsCurrentUser {
        match ctx.api.current_user().await {
            Ok(login) => Some(login),
            Err(err) => {
                log::debug!("could not detect current user: {err}");
                None
            }
        }
    } else {
        None
    };
    let trusted = verdict.allows(&owner, current_login.as_deref());
    if !trusted {
        print_trust_summary(&manifest);
        match ctx.prompter.trust_choice()? {
            TrustChoice::Run => {}
            TrustChoice::View => {
                view_files(&manifest, work_dir.path());
                return Ok(RunOutcome::AbortedAfterView);
            }
            TrustChoice::Abort => return Ok(RunOutcome::AbortedByUser),
        }
    }
    if opts.trust_always {
        settings.trusted_gists.insert(identity.id.clone());
        settings.save(&paths.settings_file)?;
        println!("trusted gist {} permanently.", identity.id);
    }

    let forwarded = resolve_user_args(forwarded, &ctx.invocation_dir);
    let command = plan(&PlanRequest {
        work_dir: work_dir.path(),
        manifest_name: Some(opts.manifest_name.as_str()),
        files: &manifest.files,
        forwarded_args: &forwarded,
        exec_dir: &exec_dir,
        platform: ctx.platform,
    })?;
    if opts.print_cmd || opts.dry_run {
        println!("command ({}): {}", command.reason, command.display_command());
    }
    if opts.dry_run {
        return Ok(RunOutcome::DryRun);
    }

    let exit_code = execute(&command.argv, &exec_dir, &command.env, opts.timeout).await?;
    Ok(RunOutcome::Completed { exit_code })
}

fn prepare_work_dir(cache_root: &Path, gist_id: &str, sha: &str, ephemeral: bool) -> Result<WorkDir> {
    if ephemeral {
        std::fs::create_dir_all(cache_root)?;
        let dir = tempfile::Builder::new()
            .prefix("gixt-")
            .tempdir_in(cache_root)
            .context("Failed to create temp dir")?;
        log::debug!("running from temp dir {}", dir.path().display());
        return Ok(WorkDir::Ephemeral(dir));
    }
    let dir = cache_dir(cache_root, gist_id, sha)?;
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to prepare work dir {}", dir.display()))?;
    Ok(WorkDir::Persistent(dir))
}

fn ignore_not_found(err: std::io::Error) -> std::io::Result<()> {
    if err.kind() == std::io::ErrorKind::NotFound {
        Ok(())
    } else {
        Err(err)
    }
}

fn print_trust_summary(manifest: &CacheManifest) {
    println!(
        "{}",
        style(format!(
            "About to run gist {} (owner: {})",
            shorten(&manifest.gist_id),
            manifest.owner
        ))
        .cyan()
        .bold()
    );
    println!("Description: {}", manifest.description.trim());
    println!("Commit: {}", shorten(&manifest.sha));
    println!("Files: {}", manifest.files.join(", "));
    println!(
        "{}",
        style("Tip: manage trust defaults with `gixt config-trust --mode mine|all --owner <name>`.")
            .green()
    );
}

pub fn view_files(manifest: &CacheManifest, dir: &Path) {
    println!("{}", style("Viewing files:").cyan().bold());
    for file in &manifest.files {
        match std::fs::read_to_string(dir.join(file)) {
            Ok(content) => println!(
                "{}\n{}\n",
                style(format!("== {file} ==")).green(),
                style(content).dim()
            ),
            Err(err) => println!("  {file}: {}", style(format!("[error reading: {err}]")).yellow()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    #[test]
    fn exec_mode_flags_override_stored_mode() {
        assert_eq!(decide_exec_mode(None, false, false).unwrap(), ExecMode::Isolate);
        assert_eq!(
            decide_exec_mode(Some(ExecMode::Cwd), false, false).unwrap(),
            ExecMode::Cwd
        );
        assert_eq!(
            decide_exec_mode(Some(ExecMode::Cwd), true, false).unwrap(),
            ExecMode::Isolate
        );
        assert_eq!(
            decide_exec_mode(Some(ExecMode::Isolate), false, true).unwrap(),
            ExecMode::Cwd
        );
        assert!(decide_exec_mode(None, true, true).is_err());
    }

    #[test]
    fn existing_relative_args_become_absolute() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("input.txt"), "x").unwrap();
        let args = vec![
            "input.txt".to_string(),
            "--flag".to_string(),
            "/abs/path".to_string(),
        ];
        let resolved = resolve_user_args(&args, dir.path());
        assert_eq!(resolved[0], dir.path().join("input.txt").display().to_string());
        assert_eq!(resolved[1], "--flag");
        assert_eq!(resolved[2], "/abs/path");
    }

    #[test]
    fn ephemeral_work_dir_is_removed_on_drop() {
        let root = tempdir().unwrap();
        let work = prepare_work_dir(root.path(), "abc12345", "sha1", true).unwrap();
        let path = work.path().to_path_buf();
        assert!(path.starts_with(root.path()));
        assert!(path.exists());
        drop(work);
        assert!(!path.exists());

        let persistent = prepare_work_dir(root.path(), "abc12345", "sha1", false).unwrap();
        assert!(persistent.is_persistent());
        assert_eq!(persistent.path(), root.path().join("abc12345").join("sha1"));
    }
}
