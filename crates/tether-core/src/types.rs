use serde::{Deserialize, Serialize};
use std::fmt;

/// Intent ID format: free-form, e.g. `INT-001`.
pub type IntentId = String;

/// A declared unit of agent work: what it may touch and what it must satisfy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Intent {
    pub id: IntentId,
    pub name: String,
    #[serde(default)]
    pub constraints: Vec<String>,
    #[serde(default)]
    pub owned_scope: Vec<String>,
    #[serde(default)]
    pub acceptance_criteria: Vec<String>,
}

/// How a single mutation event was classified.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MutationClass {
    /// Syntax or style change; intent preserved.
    AstRefactor,
    /// New behavior or feature.
    IntentEvolution,
}

impl MutationClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            MutationClass::AstRefactor => "AST_REFACTOR",
            MutationClass::IntentEvolution => "INTENT_EVOLUTION",
        }
    }
}

impl fmt::Display for MutationClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
