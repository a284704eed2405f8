use std::path::Path;
use tether_core::TetherPaths;

const CATALOG_TEMPLATE: &str = "\
# Declared units of agent work. Each intent owns a set of workspace paths.
#
# active_intents:
#   - id: INT-001
#     name: Build weather API
#     owned_scope:
#       - \"src/api/**\"
#     constraints:
#       - \"Must not use external weather libraries\"
#     acceptance_criteria:
#       - \"Unit tests in tests/api/ pass\"
active_intents: []
";

pub fn execute(repo_root: &Path) -> anyhow::Result<()> {
    let paths = TetherPaths::discover(repo_root);
    let already = paths.is_initialized();
    paths.ensure_layout()?;

    if !paths.intents_yaml.exists() {
        std::fs::write(&paths.intents_yaml, CATALOG_TEMPLATE)?;
    }

    if already {
        println!("Already initialized at {}", paths.orchestration_dir.display());
    } else {
        println!("Initialized tether workspace at {}", paths.orchestration_dir.display());
        println!("  Declare intents in {}", paths.intents_yaml.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tether_core::IntentStore;

    #[test]
    fn init_creates_empty_catalog() {
        let tmp = tempfile::tempdir().unwrap();
        execute(tmp.path()).unwrap();
        let paths = TetherPaths::discover(tmp.path());
        assert!(paths.is_initialized());
        let store = IntentStore::load(&paths.intents_yaml).unwrap();
        assert!(store.intents().is_empty());
    }

    #[test]
    fn init_keeps_existing_catalog() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = TetherPaths::discover(tmp.path());
        paths.ensure_layout().unwrap();
        std::fs::write(&paths.intents_yaml, "active_intents:\n  - id: A\n    name: a\n").unwrap();
        execute(tmp.path()).unwrap();
        let store = IntentStore::load(&paths.intents_yaml).unwrap();
        assert_eq!(store.intents().len(), 1);
    }
}
