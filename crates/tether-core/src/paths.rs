use std::path::{Path, PathBuf};

/// Name of the per-workspace state directory.
pub const ORCHESTRATION_DIR: &str = ".orchestration";

/// All well-known paths of a workspace.
#[derive(Debug, Clone)]
pub struct TetherPaths {
    pub root: PathBuf,
    pub orchestration_dir: PathBuf,
    pub intents_yaml: PathBuf,
    pub trace_jsonl: PathBuf,
    pub trace_lock: PathBuf,
    pub config_json: PathBuf,
    pub ignore_file: PathBuf,
    pub lessons_md: PathBuf,
}

impl TetherPaths {
    /// Derive all paths from a workspace root. Pure computation, no I/O.
    pub fn discover(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let orchestration_dir = root.join(ORCHESTRATION_DIR);
        Self {
            intents_yaml: orchestration_dir.join("active_intents.yaml"),
            trace_jsonl: orchestration_dir.join("agent_trace.jsonl"),
            trace_lock: orchestration_dir.join("agent_trace.lock"),
            config_json: orchestration_dir.join("config.json"),
            ignore_file: root.join(".intentignore"),
            lessons_md: root.join("AGENTS.md"),
            orchestration_dir,
            root,
        }
    }

    /// Create the state directory. Idempotent.
    pub fn ensure_layout(&self) -> anyhow::Result<()> {
        std::fs::create_dir_all(&self.orchestration_dir)?;
        Ok(())
    }

    /// Check whether `.orchestration/` exists.
    pub fn is_initialized(&self) -> bool {
        self.orchestration_dir.is_dir()
    }

    /// Resolve a workspace-relative path to an absolute one under the root.
    pub fn resolve(&self, rel: &str) -> PathBuf {
        self.root.join(rel)
    }

    /// Walk up from `start` looking for a directory containing `.orchestration/`.
    pub fn find_root(start: &Path) -> Option<PathBuf> {
        let mut cur = start.to_path_buf();
        loop {
            if cur.join(ORCHESTRATION_DIR).is_dir() {
                return Some(cur);
            }
            if !cur.pop() {
                return None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discover_builds_correct_paths() {
        let p = TetherPaths::discover("/tmp/repo");
        assert_eq!(p.orchestration_dir, PathBuf::from("/tmp/repo/.orchestration"));
        assert_eq!(
            p.intents_yaml,
            PathBuf::from("/tmp/repo/.orchestration/active_intents.yaml")
        );
        assert_eq!(
            p.trace_jsonl,
            PathBuf::from("/tmp/repo/.orchestration/agent_trace.jsonl")
        );
        assert_eq!(p.ignore_file, PathBuf::from("/tmp/repo/.intentignore"));
        assert_eq!(p.lessons_md, PathBuf::from("/tmp/repo/AGENTS.md"));
    }

    #[test]
    fn find_root_walks_up() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = TetherPaths::discover(tmp.path());
        paths.ensure_layout().unwrap();
        let nested = tmp.path().join("src").join("deep");
        std::fs::create_dir_all(&nested).unwrap();
        assert_eq!(TetherPaths::find_root(&nested), Some(tmp.path().to_path_buf()));
    }

    #[test]
    fn ensure_layout_initializes() {
        let tmp = tempfile::tempdir().unwrap();
        let p = TetherPaths::discover(tmp.path());
        assert!(!p.is_initialized());
        p.ensure_layout().unwrap();
        p.ensure_layout().unwrap();
        assert!(p.is_initialized());
    }
}
