use crate::manifest::load_run_manifest;
use crate::{Result, RunnerError};
use gixt_protocol::{base_name, extension, is_shell_script_extension, stem, Platform};
use std::collections::BTreeMap;
use std::fmt;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Why a particular command line was chosen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanReason {
    Manifest,
    Shebang,
    Extension(String),
}

impl fmt::Display for PlanReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Manifest => f.write_str("manifest"),
            Self::Shebang => f.write_str("shebang"),
            Self::Extension(ext) => write!(f, "extension {ext}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandPlan {
    pub argv: Vec<String>,
    /// Added on top of the inherited environment.
    pub env: BTreeMap<String, String>,
    pub reason: PlanReason,
}

impl CommandPlan {
    fn new(argv: Vec<String>, reason: PlanReason) -> Self {
        Self {
            argv,
            env: BTreeMap::new(),
            reason,
        }
    }

    pub fn display_command(&self) -> String {
        self.argv.join(" ")
    }
}

#[derive(Debug, Clone)]
pub struct PlanRequest<'a> {
    /// Directory holding the materialized files.
    pub work_dir: &'a Path,
    /// Run manifest file name; `None` disables manifest lookup.
    pub manifest_name: Option<&'a str>,
    /// Materialized files in their stable order.
    pub files: &'a [String],
    pub forwarded_args: &'a [String],
    /// Directory the process will run in.
    pub exec_dir: &'a Path,
    pub platform: Platform,
}

impl PlanRequest<'_> {
    /// File that a non-manifest strategy should run.
    pub fn main_file(&self) -> Option<&str> {
        select_file(self.files, self.platform)
    }

    fn main_path(&self) -> Option<String> {
        self.main_file()
            .map(|file| self.work_dir.join(file).display().to_string())
    }
}

/// One way of turning a materialized gist into a command line.
pub trait RunStrategy {
    fn name(&self) -> &'static str;

    /// `Ok(None)` means "not applicable, try the next strategy".
    fn try_plan(&self, request: &PlanRequest<'_>) -> Result<Option<CommandPlan>>;
}

pub struct ManifestStrategy;

impl RunStrategy for ManifestStrategy {
    fn name(&self) -> &'static str {
        "manifest"
    }

    fn try_plan(&self, request: &PlanRequest<'_>) -> Result<Option<CommandPlan>> {
        let Some(name) = request.manifest_name.filter(|n| !n.trim().is_empty()) else {
            return Ok(None);
        };
        let path = request.work_dir.join(name);
        if !path.is_file() {
            return Ok(None);
        }

        let manifest = load_run_manifest(&path)?;
        let mut run = manifest.run.trim().to_string();
        if request.exec_dir != request.work_dir {
            run = rebase_run_to_dir(&run, request.work_dir);
        }

        let argv = shell_invocation(&run, request.forwarded_args, request.platform);
        Ok(Some(CommandPlan {
            argv,
            env: manifest.env,
            reason: PlanReason::Manifest,
        }))
    }
}

pub struct ShebangStrategy;

impl RunStrategy for ShebangStrategy {
    fn name(&self) -> &'static str {
        "shebang"
    }

    fn try_plan(&self, request: &PlanRequest<'_>) -> Result<Option<CommandPlan>> {
        let Some(path) = request.main_path() else {
            return Ok(None);
        };
        let Some(mut argv) = shebang_interpreter(Path::new(&path)) else {
            return Ok(None);
        };
        argv.push(path);
        argv.extend(request.forwarded_args.iter().cloned());
        Ok(Some(CommandPlan::new(argv, PlanReason::Shebang)))
    }
}

pub struct ExtensionStrategy;

impl RunStrategy for ExtensionStrategy {
    fn name(&self) -> &'static str {
        "extension"
    }

    fn try_plan(&self, request: &PlanRequest<'_>) -> Result<Option<CommandPlan>> {
        let Some(path) = request.main_path() else {
            return Ok(None);
        };
        let ext = extension(&path);
        let Some(prefix) = interpreter_for(&ext, request.platform) else {
            return Ok(None);
        };

        let mut argv: Vec<String> = prefix.iter().map(|s| s.to_string()).collect();
        argv.push(path);
        argv.extend(request.forwarded_args.iter().cloned());
        Ok(Some(CommandPlan::new(argv, PlanReason::Extension(ext))))
    }
}

pub fn default_strategies() -> Vec<Box<dyn RunStrategy>> {
    vec![
        Box::new(ManifestStrategy),
        Box::new(ShebangStrategy),
        Box::new(ExtensionStrategy),
    ]
}

/// Run the default strategy chain.
pub fn plan(request: &PlanRequest<'_>) -> Result<CommandPlan> {
    plan_with(&default_strategies(), request)
}

/// First strategy that yields a plan wins.
pub fn plan_with(strategies: &[Box<dyn RunStrategy>], request: &PlanRequest<'_>) -> Result<CommandPlan> {
    for strategy in strategies {
        if let Some(plan) = strategy.try_plan(request)? {
            log::debug!("planned command via {} strategy", strategy.name());
            return Ok(plan);
        }
    }

    match request.main_file() {
        None => Err(RunnerError::NoFiles),
        Some(file) => Err(RunnerError::UnknownRunStrategy {
            file: base_name(file).to_string(),
        }),
    }
}

fn interpreter_for(ext: &str, platform: Platform) -> Option<&'static [&'static str]> {
    let prefix: &'static [&'static str] = match ext {
        ".sh" => &["sh"],
        ".ps1" => match platform {
            Platform::Windows => &["powershell", "-ExecutionPolicy", "Bypass", "-File"],
            Platform::Posix => &["pwsh", "-File"],
        },
        ".bat" | ".cmd" => match platform {
            Platform::Windows => &["cmd", "/C"],
            Platform::Posix => &[],
        },
        ".py" => &["python"],
        ".js" => &["node"],
        ".ts" => &["npx", "ts-node"],
        ".go" => &["go", "run"],
        ".rb" => &["ruby"],
        ".pl" => &["perl"],
        ".php" => &["php"],
        _ => return None,
    };
    Some(prefix)
}

/// Wrap a manifest command in the platform shell.
///
/// On POSIX the forwarded args are passed as positional parameters and
/// spliced in with `"$@"`, so they reach the command instead of becoming `$0`.
fn shell_invocation(run: &str, forwarded: &[String], platform: Platform) -> Vec<String> {
    match platform {
        Platform::Windows => {
            let mut argv = vec!["cmd".to_string(), "/C".to_string(), run.to_string()];
            argv.extend(forwarded.iter().cloned());
            argv
        }
        Platform::Posix if forwarded.is_empty() => {
            vec!["sh".to_string(), "-c".to_string(), run.to_string()]
        }
        Platform::Posix => {
            let mut argv = vec![
                "sh".to_string(),
                "-c".to_string(),
                format!("{run} \"$@\""),
                "sh".to_string(),
            ];
            argv.extend(forwarded.iter().cloned());
            argv
        }
    }
}

/// Interpreter tokens from a `#!` first line.
fn shebang_interpreter(path: &Path) -> Option<Vec<String>> {
    let file = std::fs::File::open(path).ok()?;
    let mut first = Vec::new();
    BufReader::new(file).read_until(b'\n', &mut first).ok()?;
    let line = String::from_utf8_lossy(&first);
    let rest = line.strip_prefix("#!")?;
    let tokens: Vec<String> = rest.split_whitespace().map(str::to_string).collect();
    (!tokens.is_empty()).then_some(tokens)
}

/// Make the first relative token that names a file in `dir` absolute.
///
/// Flags and absolute paths are skipped. The command is returned unchanged
/// when nothing matches.
pub fn rebase_run_to_dir(run: &str, dir: &Path) -> String {
    let mut parts: Vec<String> = run.split_whitespace().map(str::to_string).collect();
    for part in parts.iter_mut() {
        if part.starts_with('-') || Path::new(part.as_str()).is_absolute() {
            continue;
        }
        let candidate = dir.join(part.as_str());
        if candidate.is_file() {
            *part = candidate.display().to_string();
            return parts.join(" ");
        }
    }
    run.to_string()
}

/// Choose the file to run: `main.*`, then `index.*`, then anything.
///
/// Inside each group a shell-script family with exactly one variant for
/// the host platform wins; otherwise the first file of the group is used.
pub fn select_file(files: &[String], platform: Platform) -> Option<&str> {
    for prefix in ["main.", "index."] {
        let group: Vec<&str> = files
            .iter()
            .map(String::as_str)
            .filter(|f| base_name(f).to_lowercase().starts_with(prefix))
            .collect();
        if let Some(first) = group.first() {
            return Some(choose_platform_specific(&group, platform).unwrap_or(first));
        }
    }

    let all: Vec<&str> = files.iter().map(String::as_str).collect();
    choose_platform_specific(&all, platform).or_else(|| all.first().copied())
}

fn choose_platform_specific<'f>(files: &[&'f str], platform: Platform) -> Option<&'f str> {
    struct Family<'f> {
        all_shell: bool,
        preferred: Vec<&'f str>,
    }

    let mut order: Vec<String> = Vec::new();
    let mut families: BTreeMap<String, Family<'f>> = BTreeMap::new();
    for &file in files {
        let key = stem(file).to_lowercase();
        let ext = extension(file);
        let family = families.entry(key.clone()).or_insert_with(|| {
            order.push(key);
            Family {
                all_shell: true,
                preferred: Vec::new(),
            }
        });
        if !is_shell_script_extension(&ext) {
            family.all_shell = false;
        }
        if platform.prefers(&ext) {
            family.preferred.push(file);
        }
    }

    order.iter().find_map(|key| {
        let family = &families[key];
        match family.preferred.as_slice() {
            [only] if family.all_shell => Some(*only),
            _ => None,
        }
    })
}
