use std::path::Path;

/// Detect the current revision via `git rev-parse HEAD` in `cwd`.
/// Returns `None` if not in a git repo or git is unavailable.
pub fn detect_revision(cwd: &Path) -> Option<String> {
    std::process::Command::new("git")
        .args(["rev-parse", "HEAD"])
        .current_dir(cwd)
        .output()
        .ok()
        .filter(|o| o.status.success())
        .and_then(|o| String::from_utf8(o.stdout).ok())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_repo_has_no_revision() {
        let tmp = tempfile::tempdir().unwrap();
        // A fresh tempdir is not a repository unless TMPDIR itself sits inside one.
        if let Some(rev) = detect_revision(tmp.path()) {
            assert!(rev.chars().all(|c| c.is_ascii_hexdigit()));
        }
    }

    #[test]
    fn missing_dir_has_no_revision() {
        assert_eq!(detect_revision(Path::new("/nonexistent/repo")), None);
    }
}
