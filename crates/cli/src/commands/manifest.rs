//! `gixt manifest`: author run manifests locally and publish them to gists.

use crate::api::GistApi;
use crate::config::Paths;
use crate::prompt::Prompter;
use crate::state::{management_lookup, refresh_index_and_cache, LocalState};
use anyhow::{Context as AnyhowContext, Result};
use gixt_cache::shorten;
use gixt_protocol::base_name;
use gixt_runner::{
    load_run_manifest, parse_run_manifest, run_manifest_schema, save_run_manifest, RunManifest,
    DEFAULT_DETAILS, DEFAULT_MANIFEST_NAME,
};
use std::collections::BTreeMap;
use std::path::Path;

const USAGE: &str = "usage: gixt manifest [--create|--edit|--upload] [--name <file>] \
[--run ... --env KEY=VAL ... --details ... --version ...] [--gist <id|name>]";

#[derive(Debug, Clone, Default)]
pub struct ManifestOptions {
    pub name: Option<String>,
    pub create: bool,
    pub edit: bool,
    pub upload: bool,
    pub view: bool,
    pub schema: bool,
    pub force: bool,
    pub gist: Option<String>,
    pub run: Option<String>,
    pub env: Vec<String>,
    pub details: Option<String>,
    pub version: Option<String>,
}

impl ManifestOptions {
    fn file_name(&self) -> &str {
        self.name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(DEFAULT_MANIFEST_NAME)
    }

    fn gist_target(&self) -> Option<&str> {
        self.gist.as_deref().map(str::trim).filter(|g| !g.is_empty())
    }

    /// Field values given as `key value` pairs after the flags, e.g.
    /// `gixt manifest --edit version 0.0.2 env KEY=VAL`.
    pub fn apply_positional(&mut self, args: &[String]) -> Result<()> {
        let mut pairs = args.chunks(2);
        for pair in &mut pairs {
            let key = pair[0].to_lowercase();
            let Some(value) = pair.get(1).cloned() else {
                anyhow::bail!("missing value for {key:?} (use --{key} <value>)");
            };
            match key.as_str() {
                "version" => self.version = Some(value),
                "run" => self.run = Some(value),
                "details" => self.details = Some(value),
                "name" => self.name = Some(value),
                "env" => self.env.push(value),
                _ => anyhow::bail!(
                    "unknown manifest argument {key:?} (supported: version, run, details, name, env)"
                ),
            }
        }
        Ok(())
    }

    fn apply_overrides(&self, manifest: &mut RunManifest) {
        if let Some(run) = self.run.as_deref().filter(|r| !r.is_empty()) {
            manifest.run = run.to_string();
        }
        manifest.apply_env_pairs(&self.env);
        if let Some(details) = self.details.as_deref().filter(|d| !d.is_empty()) {
            manifest.details = details.to_string();
        }
        if let Some(version) = self.version.as_deref().filter(|v| !v.is_empty()) {
            manifest.version = version.to_string();
        }
        if manifest.details.trim().is_empty() {
            manifest.details = DEFAULT_DETAILS.to_string();
        }
    }
}

pub struct ManifestContext<'a> {
    pub paths: &'a Paths,
    pub api: &'a dyn GistApi,
    pub prompter: &'a dyn Prompter,
    pub cwd: &'a Path,
}

pub async fn manifest(ctx: &ManifestContext<'_>, opts: &ManifestOptions) -> Result<()> {
    if opts.schema {
        println!("{}", serde_json::to_string_pretty(&run_manifest_schema())?);
        return Ok(());
    }

    let file_name = opts.file_name();
    let target_path = ctx.cwd.join(file_name);

    if opts.view {
        if opts.create || opts.edit || opts.upload {
            anyhow::bail!("--view cannot be combined with --create/--edit/--upload");
        }
        let Some(gist) = opts.gist_target() else {
            anyhow::bail!("--view requires --gist <id|name>");
        };
        let remote = fetch_remote_manifest(ctx, gist, file_name).await?;
        println!("{}", serde_json::to_string_pretty(&remote)?);
        return Ok(());
    }
    if !opts.create && !opts.edit && !opts.upload {
        anyhow::bail!(USAGE);
    }
    if opts.create && opts.edit {
        anyhow::bail!("choose either --create or --edit, not both");
    }

    let exists = target_path.is_file();
    let mut manifest = RunManifest::default();
    let mut base_loaded = false;

    if exists && !opts.create && !opts.edit {
        manifest = load_run_manifest(&target_path)?;
        base_loaded = true;
    }
    if opts.edit {
        if exists {
            manifest = load_run_manifest(&target_path)?;
            base_loaded = true;
        } else if let (true, Some(gist)) = (opts.upload, opts.gist_target()) {
            manifest = fetch_remote_manifest(ctx, gist, file_name).await?;
            base_loaded = true;
        } else if !opts.force {
            anyhow::bail!(
                "manifest {} does not exist (use --create or --force to write a new one)",
                target_path.display()
            );
        }
    }

    opts.apply_overrides(&mut manifest);

    if (opts.create || opts.edit) && !opts.upload {
        if exists && !opts.force {
            let question = format!("{} exists. Overwrite?", target_path.display());
            if !ctx.prompter.confirm(&question)? {
                anyhow::bail!("aborted");
            }
        }
        save_run_manifest(&target_path, &manifest)
            .with_context(|| format!("Failed to write manifest {}", target_path.display()))?;
        println!("wrote manifest to {}", target_path.display());
    }

    if opts.upload {
        if !base_loaded && !opts.create && !opts.edit {
            manifest = load_run_manifest(&target_path)?;
        }
        manifest.validate()?;
        upload_manifest(ctx, &manifest, file_name, opts.gist_target()).await?;
    }
    Ok(())
}

async fn upload_manifest(
    ctx: &ManifestContext<'_>,
    manifest: &RunManifest,
    file_name: &str,
    target: Option<&str>,
) -> Result<()> {
    let Some(target) = target else {
        anyhow::bail!("upload requires --gist <id|name|owner/name>");
    };
    let remote_name = base_name(file_name).to_string();

    ctx.paths.ensure_dirs()?;
    let state = LocalState::load(ctx.paths)?;
    let identity = state.resolve(target, &management_lookup(), ctx.api).await?;
    let id = identity.id;

    let current_user = ctx
        .api
        .current_user()
        .await
        .context("detect current user")?;
    let gist = ctx
        .api
        .fetch(&id, None)
        .await
        .with_context(|| format!("Failed to fetch gist {id}"))?;
    let owner = gist.owner_login().unwrap_or_default().trim();
    if owner.is_empty() || !owner.eq_ignore_ascii_case(current_user.trim()) {
        anyhow::bail!("gist {id} is not owned by {current_user}");
    }

    let question = format!(
        "Upload manifest to gist {} (owner {current_user})? This will overwrite {remote_name} if it exists in the gist.",
        shorten(&id)
    );
    if !ctx.prompter.confirm(&question)? {
        anyhow::bail!("aborted");
    }

    let body = serde_json::to_string_pretty(manifest)?;
    let files = BTreeMap::from([(remote_name.clone(), body)]);
    let updated = ctx
        .api
        .update_files(&id, &files)
        .await
        .with_context(|| format!("Failed to upload {remote_name} to gist {id}"))?;
    refresh_index_and_cache(ctx.paths, &updated, true, ctx.api).await?;
    println!("uploaded {remote_name} to gist {id}");
    Ok(())
}

async fn fetch_remote_manifest(
    ctx: &ManifestContext<'_>,
    target: &str,
    file_name: &str,
) -> Result<RunManifest> {
    ctx.paths.ensure_dirs()?;
    let state = LocalState::load(ctx.paths)?;
    let identity = state.resolve(target, &management_lookup(), ctx.api).await?;
    let gist = ctx
        .api
        .fetch(&identity.id, None)
        .await
        .with_context(|| format!("Failed to fetch gist {}", identity.id))?;

    let wanted = base_name(file_name).to_lowercase();
    let Some(file) = gist
        .files
        .iter()
        .find(|(name, _)| base_name(name).to_lowercase() == wanted)
        .map(|(_, file)| file)
    else {
        anyhow::bail!("gist {} does not contain {file_name}", identity.id);
    };

    let bytes = if file.has_inline_content() {
        file.content.clone().into_bytes()
    } else {
        ctx.api
            .fetch_raw(&file.raw_url)
            .await
            .with_context(|| format!("download manifest {file_name}"))?
    };
    Ok(parse_run_manifest(&bytes)?)
}
