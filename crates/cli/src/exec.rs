use std::collections::BTreeMap;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;

/// Conventional exit status for a run stopped by its timeout.
pub const CANCELLED_EXIT_CODE: u8 = 124;

#[derive(Error, Debug)]
pub enum ExecError {
    #[error("empty command line")]
    EmptyCommand,

    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed waiting for process: {0}")]
    Wait(std::io::Error),

    #[error("execution cancelled after {}", format_duration(.timeout))]
    Cancelled { timeout: Duration },
}

/// Spawn `argv` in `dir` with inherited stdio and `env` layered on top of
/// the current environment. Returns the child's exit code.
pub async fn execute(
    argv: &[String],
    dir: &Path,
    env: &BTreeMap<String, String>,
    timeout: Option<Duration>,
) -> Result<i32, ExecError> {
    let (program, args) = argv.split_first().ok_or(ExecError::EmptyCommand)?;

    let mut child = Command::new(program)
        .args(args)
        .current_dir(dir)
        .envs(env)
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| ExecError::Spawn {
            program: program.clone(),
            source,
        })?;

    let status = match timeout {
        Some(limit) => match tokio::time::timeout(limit, child.wait()).await {
            Ok(status) => status.map_err(ExecError::Wait)?,
            Err(_) => {
                log::warn!("timeout of {} reached; killing {program}", format_duration(&limit));
                if let Err(err) = child.kill().await {
                    log::debug!("kill after timeout failed: {err}");
                }
                return Err(ExecError::Cancelled { timeout: limit });
            }
        },
        None => child.wait().await.map_err(ExecError::Wait)?,
    };

    Ok(exit_code(status))
}

#[cfg(unix)]
fn exit_code(status: std::process::ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    status
        .code()
        .or_else(|| status.signal().map(|sig| 128 + sig))
        .unwrap_or(1)
}

#[cfg(not(unix))]
fn exit_code(status: std::process::ExitStatus) -> i32 {
    status.code().unwrap_or(1)
}

/// `30s`, `2m`, `1h`, `500ms`, or a bare number of seconds.
pub fn parse_duration(input: &str) -> Result<Duration, String> {
    let input = input.trim();
    let split = input
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(input.len());
    let (digits, unit) = input.split_at(split);
    let value: u64 = digits
        .parse()
        .map_err(|_| format!("invalid duration {input:?} (expected e.g. 30s, 2m, 1h, 500ms)"))?;
    let duration = match unit.trim() {
        "ms" => Duration::from_millis(value),
        "" | "s" => Duration::from_secs(value),
        "m" => Duration::from_secs(value * 60),
        "h" => Duration::from_secs(value * 3600),
        other => return Err(format!("unknown duration unit {other:?} in {input:?}")),
    };
    if duration.is_zero() {
        return Err("timeout must be greater than zero".into());
    }
    Ok(duration)
}

pub fn format_duration(duration: &Duration) -> String {
    let millis = duration.as_millis();
    if millis % 1000 != 0 {
        return format!("{millis}ms");
    }
    let secs = duration.as_secs();
    match secs {
        s if s % 3600 == 0 => format!("{}h", s / 3600),
        s if s % 60 == 0 => format!("{}m", s / 60),
        s => format!("{s}s"),
    }
}
