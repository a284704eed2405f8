use std::path::Path;
use tether_core::{IntentStore, TetherPaths};

/// `tether intents [--json]`
pub fn execute(repo_root: &Path, json: bool) -> anyhow::Result<()> {
    let paths = TetherPaths::discover(repo_root);
    let store = IntentStore::load(&paths.intents_yaml)?;

    if json {
        println!("{}", serde_json::to_string_pretty(store.intents())?);
        return Ok(());
    }
    if store.intents().is_empty() {
        println!("(no intents declared in {})", paths.intents_yaml.display());
        return Ok(());
    }
    for intent in store.intents() {
        println!("{}  {}", intent.id, intent.name);
        if !intent.owned_scope.is_empty() {
            println!("    scope: {}", intent.owned_scope.join(", "));
        }
        for c in &intent.constraints {
            println!("    - {c}");
        }
    }
    Ok(())
}
