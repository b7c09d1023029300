use anyhow::Result;
use async_trait::async_trait;
use gixt_cli::api::{ApiError, ApiResult, GistApi};
use gixt_cli::config::{CacheMode, ExecMode, Paths, Settings, TrustMode};
use gixt_cli::prompt::{Prompter, TrustChoice};
use gixt_cli::run::{run_gist, RunContext, RunOptions, RunOutcome};
use gixt_protocol::{Gist, GistFile, GistOwner, GistSummary, HistoryEntry, Platform};
use pretty_assertions::assert_eq;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;

const GIST_ID: &str = "0123456789abcdef0123456789abcdef";

struct FakeApi {
    gist: Gist,
    login: Option<String>,
}

impl FakeApi {
    fn new(gist: Gist) -> Self {
        Self { gist, login: None }
    }

    fn logged_in_as(mut self, login: &str) -> Self {
        self.login = Some(login.to_string());
        self
    }
}

#[async_trait]
impl GistApi for FakeApi {
    async fn fetch(&self, id: &str, _git_ref: Option<&str>) -> ApiResult<Gist> {
        if id == self.gist.id {
            Ok(self.gist.clone())
        } else {
            Err(ApiError::NotFound(id.to_string()))
        }
    }

    async fn list_mine(&self, _per_page: u32, _max_pages: u32) -> ApiResult<Vec<GistSummary>> {
        Ok(Vec::new())
    }

    async fn list_for_owner(
        &self,
        _owner: &str,
        _per_page: u32,
        _max_pages: u32,
    ) -> ApiResult<Vec<GistSummary>> {
        Ok(Vec::new())
    }

    async fn update_files(&self, id: &str, _files: &BTreeMap<String, String>) -> ApiResult<Gist> {
        Err(ApiError::NotFound(id.to_string()))
    }

    async fn update_description(&self, id: &str, _description: &str) -> ApiResult<Gist> {
        Err(ApiError::NotFound(id.to_string()))
    }

    async fn create(
        &self,
        _files: &BTreeMap<String, String>,
        _description: &str,
        _public: bool,
    ) -> ApiResult<Gist> {
        Err(ApiError::Auth("no token in tests".into()))
    }

    async fn current_user(&self) -> ApiResult<String> {
        self.login
            .clone()
            .ok_or_else(|| ApiError::Auth("no token in tests".into()))
    }

    async fn fetch_raw(&self, url: &str) -> ApiResult<Vec<u8>> {
        Err(ApiError::NotFound(url.to_string()))
    }
}

/// Answers every prompt from a script and counts trust prompts.
struct ScriptedPrompter {
    trust: TrustChoice,
    trust_prompts: AtomicUsize,
}

impl ScriptedPrompter {
    fn new(trust: TrustChoice) -> Self {
        Self {
            trust,
            trust_prompts: AtomicUsize::new(0),
        }
    }
}

impl Prompter for ScriptedPrompter {
    fn confirm(&self, _prompt: &str) -> Result<bool> {
        Ok(false)
    }

    fn trust_choice(&self) -> Result<TrustChoice> {
        self.trust_prompts.fetch_add(1, Ordering::SeqCst);
        Ok(self.trust)
    }

    fn exec_mode(&self) -> Result<ExecMode> {
        Ok(ExecMode::Isolate)
    }
}

fn gist(files: &[(&str, &str)]) -> Gist {
    Gist {
        id: GIST_ID.to_string(),
        description: "test gist".to_string(),
        files: files
            .iter()
            .map(|(name, content)| (name.to_string(), GistFile::inline(*content)))
            .collect(),
        owner: Some(GistOwner {
            login: "alice".to_string(),
        }),
        history: vec![HistoryEntry {
            version: "v1".to_string(),
            committed_at: None,
        }],
        ..Gist::default()
    }
}

struct Sandbox {
    _root: TempDir,
    paths: Paths,
    invocation_dir: std::path::PathBuf,
}

fn sandbox() -> Sandbox {
    let root = tempfile::tempdir().unwrap();
    let paths = Paths::rooted(root.path().join("config"), root.path().join("cache"));
    let invocation_dir = root.path().join("work");
    std::fs::create_dir_all(&invocation_dir).unwrap();
    Sandbox {
        paths,
        invocation_dir,
        _root: root,
    }
}

fn options() -> RunOptions {
    RunOptions {
        manifest_name: "gixt.json".to_string(),
        user_pages: 2,
        ..RunOptions::default()
    }
}

async fn run(
    sandbox: &Sandbox,
    api: &FakeApi,
    prompter: &ScriptedPrompter,
    opts: &RunOptions,
) -> Result<RunOutcome> {
    let ctx = RunContext {
        paths: &sandbox.paths,
        api,
        prompter,
        invocation_dir: sandbox.invocation_dir.clone(),
        platform: Platform::Posix,
    };
    run_gist(&ctx, GIST_ID, &[], opts).await
}

fn save_settings(sandbox: &Sandbox, settings: &Settings) {
    settings.save(&sandbox.paths.settings_file).unwrap();
}

#[tokio::test]
async fn cache_mode_keeps_files_between_runs() {
    let sandbox = sandbox();
    save_settings(
        &sandbox,
        &Settings {
            cache_mode: CacheMode::Cache,
            ..Settings::default()
        },
    );
    let api = FakeApi::new(gist(&[("hello.sh", "echo hi\n")]));
    let prompter = ScriptedPrompter::new(TrustChoice::Abort);
    let opts = RunOptions {
        dry_run: true,
        yes: true,
        ..options()
    };

    let outcome = run(&sandbox, &api, &prompter, &opts).await.unwrap();
    assert_eq!(outcome, RunOutcome::DryRun);
    assert_eq!(prompter.trust_prompts.load(Ordering::SeqCst), 0);

    let cached = sandbox.paths.cache_dir.join(GIST_ID).join("v1");
    assert!(cached.join("hello.sh").is_file());
    assert!(cached.join(".gixt-cache.json").is_file());

    let settings = Settings::load(&sandbox.paths.settings_file).unwrap();
    assert_eq!(settings.exec_mode, Some(ExecMode::Isolate));

    // A complete cache is reused as is on the next run.
    std::fs::write(cached.join("hello.sh"), "echo LOCAL\n").unwrap();
    let outcome = run(&sandbox, &api, &prompter, &opts).await.unwrap();
    assert_eq!(outcome, RunOutcome::DryRun);
    assert_eq!(
        std::fs::read_to_string(cached.join("hello.sh")).unwrap(),
        "echo LOCAL\n"
    );

    // --update rewrites it from the gist.
    let refresh = RunOptions {
        update: true,
        ..opts
    };
    run(&sandbox, &api, &prompter, &refresh).await.unwrap();
    assert_eq!(
        std::fs::read_to_string(cached.join("hello.sh")).unwrap(),
        "echo hi\n"
    );
}

#[tokio::test]
async fn default_settings_leave_no_cache_behind() {
    let sandbox = sandbox();
    let api = FakeApi::new(gist(&[("hello.sh", "echo hi\n")]));
    let prompter = ScriptedPrompter::new(TrustChoice::Abort);
    let opts = RunOptions {
        dry_run: true,
        yes: true,
        ..options()
    };

    let outcome = run(&sandbox, &api, &prompter, &opts).await.unwrap();
    assert_eq!(outcome, RunOutcome::DryRun);

    let leftovers: Vec<_> = std::fs::read_dir(&sandbox.paths.cache_dir)
        .unwrap()
        .flatten()
        .map(|entry| entry.file_name())
        .collect();
    assert!(leftovers.is_empty(), "cache root not empty: {leftovers:?}");
}

#[tokio::test]
async fn mine_mode_trusts_gists_of_the_current_user() {
    let sandbox = sandbox();
    save_settings(
        &sandbox,
        &Settings {
            mode: TrustMode::Mine,
            exec_mode: Some(ExecMode::Isolate),
            ..Settings::default()
        },
    );
    let opts = RunOptions {
        dry_run: true,
        ..options()
    };

    let api = FakeApi::new(gist(&[("hello.sh", "echo hi\n")])).logged_in_as("Alice");
    let prompter = ScriptedPrompter::new(TrustChoice::Abort);
    let outcome = run(&sandbox, &api, &prompter, &opts).await.unwrap();
    assert_eq!(outcome, RunOutcome::DryRun);
    assert_eq!(prompter.trust_prompts.load(Ordering::SeqCst), 0);

    let api = FakeApi::new(gist(&[("hello.sh", "echo hi\n")])).logged_in_as("mallory");
    let outcome = run(&sandbox, &api, &prompter, &opts).await.unwrap();
    assert_eq!(outcome, RunOutcome::AbortedByUser);
    assert_eq!(prompter.trust_prompts.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn untrusted_gist_aborts_without_running() {
    let sandbox = sandbox();
    let api = FakeApi::new(gist(&[("touch.sh", "touch ran.txt\n")]));
    let prompter = ScriptedPrompter::new(TrustChoice::Abort);

    let outcome = run(&sandbox, &api, &prompter, &options()).await.unwrap();
    assert_eq!(outcome, RunOutcome::AbortedByUser);
    assert_eq!(prompter.trust_prompts.load(Ordering::SeqCst), 1);
    assert!(!sandbox.invocation_dir.join("ran.txt").exists());
}

#[tokio::test]
async fn view_choice_shows_files_instead_of_running() {
    let sandbox = sandbox();
    let api = FakeApi::new(gist(&[("touch.sh", "touch ran.txt\n")]));
    let prompter = ScriptedPrompter::new(TrustChoice::View);

    let outcome = run(&sandbox, &api, &prompter, &options()).await.unwrap();
    assert_eq!(outcome, RunOutcome::AbortedAfterView);
    assert!(!sandbox.invocation_dir.join("ran.txt").exists());
}

#[tokio::test]
async fn view_flag_skips_the_trust_gate() {
    let sandbox = sandbox();
    let api = FakeApi::new(gist(&[("hello.sh", "echo hi\n")]));
    let prompter = ScriptedPrompter::new(TrustChoice::Abort);
    let opts = RunOptions {
        view: true,
        ..options()
    };

    let outcome = run(&sandbox, &api, &prompter, &opts).await.unwrap();
    assert_eq!(outcome, RunOutcome::Viewed);
    assert_eq!(prompter.trust_prompts.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn trust_always_remembers_the_gist() {
    let sandbox = sandbox();
    let api = FakeApi::new(gist(&[("hello.sh", "echo hi\n")]));
    let prompter = ScriptedPrompter::new(TrustChoice::Abort);
    let opts = RunOptions {
        dry_run: true,
        trust_always: true,
        ..options()
    };

    let outcome = run(&sandbox, &api, &prompter, &opts).await.unwrap();
    assert_eq!(outcome, RunOutcome::DryRun);
    let settings = Settings::load(&sandbox.paths.settings_file).unwrap();
    assert!(settings.trusted_gists.contains(GIST_ID));

    // Second run is trusted through the stored gist id.
    let outcome = run(&sandbox, &api, &prompter, &options()).await;
    assert!(!matches!(outcome, Ok(RunOutcome::AbortedByUser)));
    assert_eq!(prompter.trust_prompts.load(Ordering::SeqCst), 0);
}

#[cfg(unix)]
#[tokio::test]
async fn exit_code_of_the_gist_is_returned() {
    let sandbox = sandbox();
    let api = FakeApi::new(gist(&[("fail.sh", "exit 3\n")]));
    let prompter = ScriptedPrompter::new(TrustChoice::Run);

    let outcome = run(&sandbox, &api, &prompter, &options()).await.unwrap();
    assert_eq!(outcome, RunOutcome::Completed { exit_code: 3 });
}

#[cfg(unix)]
#[tokio::test]
async fn manifest_command_runs_in_the_gist_dir() {
    let sandbox = sandbox();
    let api = FakeApi::new(gist(&[
        ("gixt.json", r#"{"run": "test -f marker.txt && exit 7"}"#),
        ("marker.txt", "x"),
        ("main.sh", "exit 0\n"),
    ]));
    let prompter = ScriptedPrompter::new(TrustChoice::Run);
    let opts = RunOptions {
        isolate: true,
        yes: true,
        ..options()
    };

    let outcome = run(&sandbox, &api, &prompter, &opts).await.unwrap();
    assert_eq!(outcome, RunOutcome::Completed { exit_code: 7 });
}

#[cfg(unix)]
#[tokio::test]
async fn timeout_surfaces_as_cancellation() {
    let sandbox = sandbox();
    let api = FakeApi::new(gist(&[("slow.sh", "sleep 5\n")]));
    let prompter = ScriptedPrompter::new(TrustChoice::Run);
    let opts = RunOptions {
        yes: true,
        timeout: Some(std::time::Duration::from_millis(200)),
        ..options()
    };

    let err = run(&sandbox, &api, &prompter, &opts).await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<gixt_cli::exec::ExecError>(),
        Some(gixt_cli::exec::ExecError::Cancelled { .. })
    ));
}
