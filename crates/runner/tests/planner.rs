use gixt_protocol::Platform;
use gixt_runner::{
    plan, plan_with, rebase_run_to_dir, CommandPlan, ExtensionStrategy, PlanReason, PlanRequest,
    RunStrategy, RunnerError, DEFAULT_MANIFEST_NAME,
};
use pretty_assertions::assert_eq;
use std::path::Path;
use tempfile::tempdir;

fn write(dir: &Path, name: &str, body: &str) {
    std::fs::write(dir.join(name), body).unwrap();
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn request<'a>(dir: &'a Path, files: &'a [String], args: &'a [String]) -> PlanRequest<'a> {
    PlanRequest {
        work_dir: dir,
        manifest_name: Some(DEFAULT_MANIFEST_NAME),
        files,
        forwarded_args: args,
        exec_dir: dir,
        platform: Platform::Posix,
    }
}

#[test]
fn manifest_takes_priority_over_files() {
    let dir = tempdir().unwrap();
    write(dir.path(), "gixt.json", r#"{"run":"echo hi","env":{"GREETING":"hello"}}"#);
    write(dir.path(), "main.py", "#!/usr/bin/env python3\nprint('x')\n");
    let files = strings(&["gixt.json", "main.py"]);

    let plan = plan(&request(dir.path(), &files, &[])).unwrap();
    assert_eq!(plan.reason, PlanReason::Manifest);
    assert_eq!(plan.argv, strings(&["sh", "-c", "echo hi"]));
    assert_eq!(plan.env.get("GREETING").map(String::as_str), Some("hello"));
}

#[test]
fn manifest_lookup_can_be_disabled() {
    let dir = tempdir().unwrap();
    write(dir.path(), "gixt.json", r#"{"run":"echo hi"}"#);
    write(dir.path(), "main.py", "print('x')\n");
    let files = strings(&["main.py"]);

    let mut req = request(dir.path(), &files, &[]);
    req.manifest_name = None;
    let plan = plan(&req).unwrap();
    assert_eq!(plan.reason, PlanReason::Extension(".py".into()));
}

#[test]
fn invalid_manifest_is_an_error_not_a_fallback() {
    let dir = tempdir().unwrap();
    write(dir.path(), "gixt.json", r#"{"run":"echo hi","surprise":1}"#);
    write(dir.path(), "main.py", "print('x')\n");
    let files = strings(&["main.py"]);

    let err = plan(&request(dir.path(), &files, &[])).unwrap_err();
    assert!(matches!(err, RunnerError::InvalidManifest(_)), "{err}");
}

#[test]
fn manifest_forwards_args_as_positional_parameters() {
    let dir = tempdir().unwrap();
    write(dir.path(), "gixt.json", r#"{"run":"python app.py"}"#);
    let args = strings(&["--name", "two words"]);

    let plan = plan(&request(dir.path(), &[], &args)).unwrap();
    assert_eq!(
        plan.argv,
        strings(&["sh", "-c", "python app.py \"$@\"", "sh", "--name", "two words"])
    );
}

#[test]
fn manifest_run_is_rebased_when_executing_elsewhere() {
    let dir = tempdir().unwrap();
    let elsewhere = tempdir().unwrap();
    write(dir.path(), "gixt.json", r#"{"run":"python -u app.py --flag"}"#);
    write(dir.path(), "app.py", "print('x')\n");
    let files = strings(&["app.py"]);

    let mut req = request(dir.path(), &files, &[]);
    req.exec_dir = elsewhere.path();
    let plan = plan(&req).unwrap();

    let expected = format!("python -u {} --flag", dir.path().join("app.py").display());
    assert_eq!(plan.argv[2], expected);
}

#[test]
fn shebang_is_used_for_unknown_extensions() {
    let dir = tempdir().unwrap();
    write(dir.path(), "script.txt", "#!/usr/bin/env bash\necho hi\n");
    let files = strings(&["script.txt"]);
    let args = strings(&["x"]);

    let plan = plan(&request(dir.path(), &files, &args)).unwrap();
    let path = dir.path().join("script.txt").display().to_string();
    assert_eq!(plan.reason, PlanReason::Shebang);
    assert_eq!(plan.argv, vec!["/usr/bin/env".to_string(), "bash".into(), path, "x".into()]);
}

#[test]
fn extension_table_covers_common_languages() {
    let dir = tempdir().unwrap();
    for (name, program) in [("a.py", "python"), ("b.js", "node"), ("c.rb", "ruby"), ("d.sh", "sh")] {
        write(dir.path(), name, "body\n");
        let files = strings(&[name]);
        let plan = plan(&request(dir.path(), &files, &[])).unwrap();
        assert_eq!(plan.argv[0], program, "{name}");
        assert_eq!(plan.argv[1], dir.path().join(name).display().to_string());
    }
}

#[test]
fn unknown_extension_without_shebang_fails() {
    let dir = tempdir().unwrap();
    write(dir.path(), "notes.txt", "just text\n");
    let files = strings(&["notes.txt"]);

    let err = plan(&request(dir.path(), &files, &[])).unwrap_err();
    match err {
        RunnerError::UnknownRunStrategy { file } => assert_eq!(file, "notes.txt"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn no_files_and_no_manifest_fails() {
    let dir = tempdir().unwrap();
    let err = plan(&request(dir.path(), &[], &[])).unwrap_err();
    assert!(matches!(err, RunnerError::NoFiles));
}

#[test]
fn main_file_is_preferred_and_platform_variant_chosen() {
    let dir = tempdir().unwrap();
    write(dir.path(), "helper.py", "x\n");
    write(dir.path(), "main.sh", "echo posix\n");
    write(dir.path(), "main.bat", "echo windows\n");
    let files = strings(&["helper.py", "main.bat", "main.sh"]);

    let mut req = request(dir.path(), &files, &[]);
    assert_eq!(req.main_file(), Some("main.sh"));
    let plan = plan(&req).unwrap();
    assert_eq!(plan.reason, PlanReason::Extension(".sh".into()));

    req.platform = Platform::Windows;
    assert_eq!(req.main_file(), Some("main.bat"));
}

#[test]
fn custom_strategy_chain_is_honored() {
    struct Fixed;
    impl RunStrategy for Fixed {
        fn name(&self) -> &'static str {
            "fixed"
        }
        fn try_plan(&self, _: &PlanRequest<'_>) -> gixt_runner::Result<Option<CommandPlan>> {
            Ok(Some(CommandPlan {
                argv: strings(&["true"]),
                env: Default::default(),
                reason: PlanReason::Manifest,
            }))
        }
    }

    let dir = tempdir().unwrap();
    write(dir.path(), "a.py", "x\n");
    let files = strings(&["a.py"]);
    let chain: Vec<Box<dyn RunStrategy>> = vec![Box::new(ExtensionStrategy), Box::new(Fixed)];
    let plan = plan_with(&chain, &request(dir.path(), &files, &[])).unwrap();
    assert_eq!(plan.argv[0], "python");
}

#[test]
fn rebase_leaves_command_alone_without_local_file() {
    let dir = tempdir().unwrap();
    assert_eq!(rebase_run_to_dir("echo hello", dir.path()), "echo hello");
    assert_eq!(rebase_run_to_dir("/bin/true", dir.path()), "/bin/true");
}
