use std::path::Path;
use tether_core::{CatalogError, IntentStore, TetherPaths};

/// `tether prompt`: the operating rules for the agent, with known intents.
pub fn execute(repo_root: &Path) -> anyhow::Result<()> {
    let paths = TetherPaths::discover(repo_root);
    let intents = match IntentStore::load(&paths.intents_yaml) {
        Ok(store) => store.intents().to_vec(),
        Err(CatalogError::NotFound(_)) => Vec::new(),
        Err(e) => return Err(e.into()),
    };
    print!("{}", tether_hooks::prompt::system_prompt(&intents));
    Ok(())
}
