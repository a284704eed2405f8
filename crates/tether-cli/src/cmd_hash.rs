use std::path::Path;
use tether_core::normalize_rel_path;
use tether_hooks::ConcurrencyGuard;

/// `tether hash <path>`: fingerprint to pass as `initial_hash`.
pub fn execute(repo_root: &Path, path: &str) -> anyhow::Result<()> {
    let rel = normalize_rel_path(repo_root, path)
        .ok_or_else(|| anyhow::anyhow!("{path} is outside the workspace {}", repo_root.display()))?;
    let guard = ConcurrencyGuard::new(repo_root);
    println!("{}", guard.fingerprint(&rel)?);
    Ok(())
}
