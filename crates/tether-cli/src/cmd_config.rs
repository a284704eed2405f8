use clap::Subcommand;
use std::path::Path;
use tether_core::config::CONFIG_KEYS;
use tether_core::{TetherConfig, TetherPaths};

// ── CLI Schema ──

#[derive(Subcommand)]
pub enum ConfigCmd {
    /// Set a config value
    Set {
        /// Config key (e.g. approval, refactor_max_bytes)
        key: String,
        /// Config value, checked against the key's type
        value: String,
    },
    /// Get a config value
    Get {
        /// Config key
        key: String,
    },
    /// List every key with its effective value
    List,
}

// ── Dispatch ──

pub fn run(cmd: ConfigCmd, repo_root: &Path) -> anyhow::Result<()> {
    match cmd {
        ConfigCmd::Set { key, value } => set(repo_root, &key, &value),
        ConfigCmd::Get { key } => get(repo_root, &key),
        ConfigCmd::List => list(repo_root),
    }
}

// ── Command Implementations ──

fn initialized_paths(repo_root: &Path) -> anyhow::Result<TetherPaths> {
    let paths = TetherPaths::discover(repo_root);
    if !paths.is_initialized() {
        anyhow::bail!("No .orchestration/ workspace found. Run `tether init` first.");
    }
    Ok(paths)
}

/// `tether config set <key> <value>`
///
/// Only the file is touched; env overrides are not folded in.
pub fn set(repo_root: &Path, key: &str, value: &str) -> anyhow::Result<()> {
    let paths = initialized_paths(repo_root)?;
    let mut config = TetherConfig::load_file(&paths.config_json)?;
    config.set_key(key, value)?;
    config.save(&paths.config_json)?;
    println!("{key} = {}", display(config.get_key(key)?));
    Ok(())
}

/// `tether config get <key>`: the effective value, env overrides included.
pub fn get(repo_root: &Path, key: &str) -> anyhow::Result<()> {
    let paths = initialized_paths(repo_root)?;
    let config = TetherConfig::load(&paths.config_json)?;
    println!("{}", display(config.get_key(key)?));
    Ok(())
}

/// `tether config list`
pub fn list(repo_root: &Path) -> anyhow::Result<()> {
    let paths = initialized_paths(repo_root)?;
    let config = TetherConfig::load(&paths.config_json)?;
    for line in render_list(&config, |var| std::env::var_os(var).is_some())? {
        println!("{line}");
    }
    Ok(())
}

fn render_list(
    config: &TetherConfig,
    env_set: impl Fn(&str) -> bool,
) -> anyhow::Result<Vec<String>> {
    CONFIG_KEYS
        .iter()
        .map(|(key, var)| {
            let value = display(config.get_key(key)?);
            Ok(if env_set(var) {
                format!("{key} = {value}  (from ${var})")
            } else {
                format!("{key} = {value}")
            })
        })
        .collect()
}

fn display(value: Option<String>) -> String {
    value.unwrap_or_else(|| "(not set)".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tether_core::ApprovalMode;

    fn workspace() -> (tempfile::TempDir, TetherPaths) {
        let tmp = tempfile::tempdir().unwrap();
        let paths = TetherPaths::discover(tmp.path());
        paths.ensure_layout().unwrap();
        (tmp, paths)
    }

    #[test]
    fn set_is_visible_to_loader() {
        let (tmp, paths) = workspace();
        set(tmp.path(), "approval", "auto").unwrap();
        set(tmp.path(), "refactor_max_lines", "4").unwrap();
        let cfg = TetherConfig::load_file(&paths.config_json).unwrap();
        assert_eq!(cfg.approval, ApprovalMode::Auto);
        assert_eq!(cfg.refactor_max_lines, 4);
        assert_eq!(cfg.refactor_max_bytes, 300);
    }

    #[test]
    fn invalid_value_not_written() {
        let (tmp, paths) = workspace();
        assert!(set(tmp.path(), "approval", "sometimes").is_err());
        assert!(!paths.config_json.exists());
    }

    #[test]
    fn unknown_key_not_written() {
        let (tmp, paths) = workspace();
        let err = set(tmp.path(), "aproval", "auto").unwrap_err();
        assert!(err.to_string().contains("unknown config key"));
        assert!(!paths.config_json.exists());
        assert!(get(tmp.path(), "aproval").is_err());
    }

    #[test]
    fn list_covers_every_key_and_marks_env() {
        let mut config = TetherConfig::default();
        config.set_key("approval", "deny").unwrap();
        let lines = render_list(&config, |var| var == "TETHER_APPROVAL").unwrap();
        assert_eq!(lines.len(), CONFIG_KEYS.len());
        assert_eq!(lines[0], "approval = deny  (from $TETHER_APPROVAL)");
        assert_eq!(lines[1], "approval_command = (not set)");
        assert!(lines.contains(&"refactor_max_bytes = 300".to_string()));
    }

    #[test]
    fn requires_init() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(list(tmp.path()).is_err());
    }
}
