use crate::{Result, RunnerError};
use gixt_protocol::write_json_atomic;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

pub const DEFAULT_MANIFEST_NAME: &str = "gixt.json";
pub const DEFAULT_DETAILS: &str = "No description provided";

const MAX_RUN_LEN: usize = 4096;
const MAX_ENV_KEY_LEN: usize = 256;
const MAX_DETAILS_LEN: usize = 4096;
const MAX_VERSION_LEN: usize = 256;

/// Author-supplied run instructions shipped inside a gist.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct RunManifest {
    /// Single-line shell command, run through `sh -c` (or `cmd /C` on Windows).
    pub run: String,
    /// Extra environment variables for the command.
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub details: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub version: String,
}

impl RunManifest {
    pub fn validate(&self) -> Result<()> {
        let run = self.run.trim();
        if run.is_empty() {
            return Err(RunnerError::EmptyRun);
        }
        if self.run.contains(['\r', '\n']) {
            return Err(RunnerError::InvalidManifest(
                "run field must not contain newlines".into(),
            ));
        }
        if run.len() > MAX_RUN_LEN {
            return Err(RunnerError::InvalidManifest("run field too long".into()));
        }
        for key in self.env.keys() {
            if key.trim().is_empty() {
                return Err(RunnerError::InvalidManifest("env contains empty key".into()));
            }
            if key.len() > MAX_ENV_KEY_LEN {
                return Err(RunnerError::InvalidManifest(format!("env key too long: {key}")));
            }
            if key.contains(['\r', '\n']) {
                return Err(RunnerError::InvalidManifest(format!(
                    "env key contains newline: {key:?}"
                )));
            }
        }
        if self.details.trim().len() > MAX_DETAILS_LEN {
            return Err(RunnerError::InvalidManifest("details too long".into()));
        }
        if self.version.trim().len() > MAX_VERSION_LEN {
            return Err(RunnerError::InvalidManifest("version too long".into()));
        }
        Ok(())
    }

    pub fn normalize(&mut self) {
        if self.details.trim().is_empty() {
            self.details = DEFAULT_DETAILS.to_string();
        }
    }

    /// Merge `KEY=VALUE` pairs into `env`; malformed entries are skipped.
    pub fn apply_env_pairs<S: AsRef<str>>(&mut self, pairs: &[S]) {
        for pair in pairs {
            let Some((key, value)) = pair.as_ref().split_once('=') else {
                log::debug!("ignoring env entry without '=': {:?}", pair.as_ref());
                continue;
            };
            let key = key.trim();
            if key.is_empty() {
                continue;
            }
            self.env.insert(key.to_string(), value.to_string());
        }
    }
}

/// Strict parse: unknown fields and invalid values are errors.
pub fn parse_run_manifest(bytes: &[u8]) -> Result<RunManifest> {
    let mut manifest: RunManifest = serde_json::from_slice(bytes)
        .map_err(|err| RunnerError::InvalidManifest(err.to_string()))?;
    manifest.validate()?;
    manifest.normalize();
    Ok(manifest)
}

pub fn load_run_manifest(path: &Path) -> Result<RunManifest> {
    let bytes = std::fs::read(path)?;
    parse_run_manifest(&bytes).map_err(|err| match err {
        RunnerError::InvalidManifest(msg) => {
            RunnerError::InvalidManifest(format!("{}: {msg}", path.display()))
        }
        other => other,
    })
}

pub fn save_run_manifest(path: &Path, manifest: &RunManifest) -> Result<()> {
    manifest.validate()?;
    write_json_atomic(path, manifest)?;
    Ok(())
}

pub fn run_manifest_schema() -> serde_json::Value {
    serde_json::to_value(schemars::schema_for!(RunManifest)).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn unknown_fields_are_rejected() {
        let err = parse_run_manifest(br#"{"run":"echo hi","extra":true}"#).unwrap_err();
        assert!(matches!(err, RunnerError::InvalidManifest(_)), "{err}");
    }

    #[test]
    fn newline_in_run_is_rejected() {
        let err = parse_run_manifest(br#"{"run":"echo hi\nrm -rf /"}"#).unwrap_err();
        assert!(err.to_string().contains("newlines"));
    }

    #[test]
    fn empty_run_is_rejected() {
        assert!(matches!(
            parse_run_manifest(br#"{"run":"   "}"#).unwrap_err(),
            RunnerError::EmptyRun
        ));
    }

    #[test]
    fn limits_are_enforced() {
        let long_key = "K".repeat(MAX_ENV_KEY_LEN + 1);
        let doc = format!(r#"{{"run":"x","env":{{"{long_key}":"v"}}}}"#);
        assert!(parse_run_manifest(doc.as_bytes()).is_err());

        let doc = format!(r#"{{"run":"x","version":"{}"}}"#, "1".repeat(MAX_VERSION_LEN + 1));
        assert!(parse_run_manifest(doc.as_bytes()).is_err());

        let doc = format!(r#"{{"run":"{}"}}"#, "a".repeat(MAX_RUN_LEN + 1));
        assert!(parse_run_manifest(doc.as_bytes()).is_err());

        assert!(parse_run_manifest(br#"{"run":"x","env":{" ":"v"}}"#).is_err());
    }

    #[test]
    fn defaults_are_filled() {
        let manifest = parse_run_manifest(br#"{"run":"python app.py"}"#).unwrap();
        assert_eq!(manifest.details, DEFAULT_DETAILS);
        assert!(manifest.env.is_empty());
        assert_eq!(manifest.version, "");
    }

    #[test]
    fn env_pairs_skip_malformed_entries() {
        let mut manifest = RunManifest::default();
        manifest.apply_env_pairs(&["A=1", "B=x=y", "broken", "=nokey", "EMPTY="]);
        assert_eq!(manifest.env.get("A").map(String::as_str), Some("1"));
        assert_eq!(manifest.env.get("B").map(String::as_str), Some("x=y"));
        assert_eq!(manifest.env.get("EMPTY").map(String::as_str), Some(""));
        assert_eq!(manifest.env.len(), 3);
    }

    #[test]
    fn schema_forbids_additional_properties() {
        let schema = run_manifest_schema();
        assert_eq!(schema["additionalProperties"], serde_json::json!(false));
        assert_eq!(schema["required"], serde_json::json!(["run"]));
    }
}
