//! Workspace configuration: `.orchestration/config.json` with `TETHER_*`
//! environment overrides.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// How mutating actions obtain human approval.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalMode {
    /// Approve everything without asking.
    Auto,
    /// Reject every mutating action.
    Deny,
    /// Ask on the controlling terminal.
    #[default]
    Prompt,
    /// Run `approval_command`; exit status 0 approves.
    Command,
}

impl ApprovalMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Deny => "deny",
            Self::Prompt => "prompt",
            Self::Command => "command",
        }
    }
}

impl std::str::FromStr for ApprovalMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "auto" => Ok(Self::Auto),
            "deny" => Ok(Self::Deny),
            "prompt" => Ok(Self::Prompt),
            "command" => Ok(Self::Command),
            other => anyhow::bail!(
                "unknown approval mode \"{other}\" (expected auto, deny, prompt, command)"
            ),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TetherConfig {
    pub approval: ApprovalMode,
    pub approval_command: Option<String>,
    pub approval_timeout_secs: u64,
    /// Mutations below both thresholds classify as AST_REFACTOR.
    pub refactor_max_bytes: usize,
    pub refactor_max_lines: usize,
    pub max_context_chars: usize,
    pub contributor_model: String,
    pub fsync_trace: bool,
}

impl Default for TetherConfig {
    fn default() -> Self {
        Self {
            approval: ApprovalMode::Prompt,
            approval_command: None,
            approval_timeout_secs: 300,
            refactor_max_bytes: 300,
            refactor_max_lines: 10,
            max_context_chars: 8000,
            contributor_model: "unknown".to_string(),
            fsync_trace: false,
        }
    }
}

/// Every settable key, paired with the environment variable overriding it.
pub const CONFIG_KEYS: &[(&str, &str)] = &[
    ("approval", "TETHER_APPROVAL"),
    ("approval_command", "TETHER_APPROVAL_COMMAND"),
    ("approval_timeout_secs", "TETHER_APPROVAL_TIMEOUT_SECS"),
    ("refactor_max_bytes", "TETHER_REFACTOR_MAX_BYTES"),
    ("refactor_max_lines", "TETHER_REFACTOR_MAX_LINES"),
    ("max_context_chars", "TETHER_MAX_CONTEXT_CHARS"),
    ("contributor_model", "TETHER_MODEL_ID"),
    ("fsync_trace", "TETHER_FSYNC_TRACE"),
];

impl TetherConfig {
    /// Load from `config_json` (defaults when absent), then apply env overrides.
    pub fn load(config_json: &Path) -> anyhow::Result<Self> {
        let mut config = Self::load_file(config_json)?;
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn load_file(config_json: &Path) -> anyhow::Result<Self> {
        let content = match std::fs::read_to_string(config_json) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(e).with_context(|| format!("reading {}", config_json.display())),
        };
        serde_json::from_str(&content)
            .with_context(|| format!("invalid config {}", config_json.display()))
    }

    /// Persist the whole config. Readers see either the old or the new file.
    pub fn save(&self, config_json: &Path) -> anyhow::Result<()> {
        let dir = config_json
            .parent()
            .with_context(|| format!("{} has no parent directory", config_json.display()))?;
        std::fs::create_dir_all(dir)?;
        let mut staged = tempfile::NamedTempFile::new_in(dir)?;
        serde_json::to_writer_pretty(&mut staged, self)?;
        staged.as_file().sync_all()?;
        staged
            .persist(config_json)
            .with_context(|| format!("replacing {}", config_json.display()))?;
        Ok(())
    }

    /// Apply overrides from a variable lookup (the process env in production).
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<()> {
        for (key, var) in CONFIG_KEYS {
            if let Some(raw) = lookup(var) {
                self.set_key(key, &raw).with_context(|| format!("in ${var}"))?;
            }
        }
        Ok(())
    }

    /// Assign one field from its textual form, validating it for the field's type.
    pub fn set_key(&mut self, key: &str, raw: &str) -> anyhow::Result<()> {
        match key {
            "approval" => self.approval = raw.parse()?,
            "approval_command" => {
                self.approval_command = (!raw.trim().is_empty()).then(|| raw.to_string())
            }
            "approval_timeout_secs" => self.approval_timeout_secs = parse_count(key, raw)?,
            "refactor_max_bytes" => self.refactor_max_bytes = parse_count(key, raw)?,
            "refactor_max_lines" => self.refactor_max_lines = parse_count(key, raw)?,
            "max_context_chars" => self.max_context_chars = parse_count(key, raw)?,
            "contributor_model" => self.contributor_model = raw.to_string(),
            "fsync_trace" => self.fsync_trace = parse_flag(key, raw)?,
            other => anyhow::bail!("unknown config key \"{other}\""),
        }
        Ok(())
    }

    /// Textual form of one field, as `set_key` accepts it back.
    pub fn get_key(&self, key: &str) -> anyhow::Result<Option<String>> {
        Ok(match key {
            "approval" => Some(self.approval.as_str().to_string()),
            "approval_command" => self.approval_command.clone(),
            "approval_timeout_secs" => Some(self.approval_timeout_secs.to_string()),
            "refactor_max_bytes" => Some(self.refactor_max_bytes.to_string()),
            "refactor_max_lines" => Some(self.refactor_max_lines.to_string()),
            "max_context_chars" => Some(self.max_context_chars.to_string()),
            "contributor_model" => Some(self.contributor_model.clone()),
            "fsync_trace" => Some(self.fsync_trace.to_string()),
            other => anyhow::bail!("unknown config key \"{other}\""),
        })
    }
}

fn parse_count<T: std::str::FromStr>(key: &str, raw: &str) -> anyhow::Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| anyhow::anyhow!("{key} expects a non-negative integer, got \"{raw}\""))
}

fn parse_flag(key: &str, raw: &str) -> anyhow::Result<bool> {
    match raw.trim() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => anyhow::bail!("{key} expects true or false, got \"{raw}\""),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn missing_file_yields_defaults() {
        let cfg = TetherConfig::load_file(Path::new("/nonexistent/config.json")).unwrap();
        assert_eq!(cfg, TetherConfig::default());
        assert_eq!(cfg.refactor_max_bytes, 300);
        assert_eq!(cfg.refactor_max_lines, 10);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.json");
        std::fs::write(&path, r#"{"approval":"auto","contributor_model":"m-1"}"#).unwrap();
        let cfg = TetherConfig::load_file(&path).unwrap();
        assert_eq!(cfg.approval, ApprovalMode::Auto);
        assert_eq!(cfg.contributor_model, "m-1");
        assert_eq!(cfg.approval_timeout_secs, 300);
    }

    #[test]
    fn env_overrides_file() {
        let vars: HashMap<&str, &str> = [
            ("TETHER_APPROVAL", "deny"),
            ("TETHER_REFACTOR_MAX_LINES", "15"),
            ("TETHER_FSYNC_TRACE", "1"),
        ]
        .into_iter()
        .collect();
        let mut cfg = TetherConfig::default();
        cfg.apply_env(|k| vars.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(cfg.approval, ApprovalMode::Deny);
        assert_eq!(cfg.refactor_max_lines, 15);
        assert!(cfg.fsync_trace);
    }

    #[test]
    fn bad_approval_mode_rejected() {
        let mut cfg = TetherConfig::default();
        let err = cfg
            .apply_env(|k| (k == "TETHER_APPROVAL").then(|| "maybe".to_string()))
            .unwrap_err();
        assert!(format!("{err:#}").contains("unknown approval mode"));
    }

    #[test]
    fn malformed_env_number_is_an_error() {
        let mut cfg = TetherConfig::default();
        let err = cfg
            .apply_env(|k| (k == "TETHER_REFACTOR_MAX_BYTES").then(|| "lots".to_string()))
            .unwrap_err();
        assert!(format!("{err:#}").contains("TETHER_REFACTOR_MAX_BYTES"));
        assert_eq!(cfg.refactor_max_bytes, 300);
    }

    #[test]
    fn set_key_rejects_unknown_keys_and_bad_values() {
        let mut cfg = TetherConfig::default();
        assert!(cfg.set_key("approvel", "auto").is_err());
        assert!(cfg.set_key("fsync_trace", "maybe").is_err());
        assert!(cfg.set_key("max_context_chars", "-1").is_err());
        cfg.set_key("approval_command", "").unwrap();
        assert_eq!(cfg.approval_command, None);
        assert_eq!(cfg, TetherConfig::default());
    }

    #[test]
    fn every_key_reads_back_what_was_set() {
        let mut cfg = TetherConfig::default();
        for (key, _) in CONFIG_KEYS {
            let text = cfg.get_key(key).unwrap().unwrap_or_default();
            cfg.set_key(key, &text).unwrap();
        }
        assert_eq!(cfg, TetherConfig::default());
    }

    #[test]
    fn save_then_load() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nested").join("config.json");
        let mut cfg = TetherConfig::default();
        cfg.set_key("approval", "auto").unwrap();
        cfg.set_key("fsync_trace", "yes").unwrap();
        cfg.save(&path).unwrap();
        let loaded = TetherConfig::load_file(&path).unwrap();
        assert_eq!(loaded, cfg);
        assert_eq!(std::fs::read_dir(path.parent().unwrap()).unwrap().count(), 1);
    }
}
