use crate::types::Intent;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("intent catalog not found at {0}")]
    NotFound(PathBuf),
    #[error("intent catalog {path} is malformed: {detail}")]
    Malformed { path: PathBuf, detail: String },
    #[error("intent catalog {path} declares id \"{id}\" more than once")]
    DuplicateId { path: PathBuf, id: String },
    #[error("intent not found: {0}")]
    IntentNotFound(String),
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    active_intents: Vec<Intent>,
}

/// Intent catalog loaded once from `active_intents.yaml`.
///
/// The store owns its entries; callers receive clones, so nothing downstream
/// can mutate the catalog.
#[derive(Debug, Clone)]
pub struct IntentStore {
    path: PathBuf,
    intents: Vec<Intent>,
}

impl IntentStore {
    /// Load and validate the catalog. Duplicate ids reject the whole file.
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(CatalogError::NotFound(path.to_path_buf()))
            }
            Err(e) => {
                return Err(CatalogError::Malformed {
                    path: path.to_path_buf(),
                    detail: e.to_string(),
                })
            }
        };
        let intents = parse_catalog(&content).map_err(|detail| match detail {
            ParseFailure::Duplicate(id) => CatalogError::DuplicateId {
                path: path.to_path_buf(),
                id,
            },
            ParseFailure::Invalid(detail) => CatalogError::Malformed {
                path: path.to_path_buf(),
                detail,
            },
        })?;
        tracing::debug!(path = %path.display(), count = intents.len(), "intent catalog loaded");
        Ok(Self {
            path: path.to_path_buf(),
            intents,
        })
    }

    /// Build a store from already-validated intents (tests, embedding hosts).
    pub fn from_intents(intents: Vec<Intent>) -> Result<Self, CatalogError> {
        let path = PathBuf::from("<memory>");
        if let Some(id) = first_duplicate(&intents) {
            return Err(CatalogError::DuplicateId { path, id });
        }
        Ok(Self { path, intents })
    }

    /// All intents in catalog order.
    pub fn intents(&self) -> &[Intent] {
        &self.intents
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Resolve an intent by id.
    pub fn resolve(&self, id: &str) -> Result<Intent, CatalogError> {
        self.intents
            .iter()
            .find(|i| i.id == id)
            .cloned()
            .ok_or_else(|| CatalogError::IntentNotFound(id.to_string()))
    }
}

enum ParseFailure {
    Duplicate(String),
    Invalid(String),
}

fn parse_catalog(yaml: &str) -> Result<Vec<Intent>, ParseFailure> {
    let file: CatalogFile =
        serde_yaml::from_str(yaml).map_err(|e| ParseFailure::Invalid(e.to_string()))?;
    for intent in &file.active_intents {
        if intent.id.trim().is_empty() {
            return Err(ParseFailure::Invalid(format!(
                "intent \"{}\" has an empty id",
                intent.name
            )));
        }
    }
    if let Some(id) = first_duplicate(&file.active_intents) {
        return Err(ParseFailure::Duplicate(id));
    }
    Ok(file.active_intents)
}

fn first_duplicate(intents: &[Intent]) -> Option<String> {
    let mut seen = HashSet::new();
    intents
        .iter()
        .find(|i| !seen.insert(i.id.as_str()))
        .map(|i| i.id.clone())
}
