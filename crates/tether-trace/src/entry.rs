use serde::{Deserialize, Serialize};
use tether_core::MutationClass;

/// Relation type linking a conversation to its authorizing intent.
pub const REL_SPECIFICATION: &str = "specification";

/// A single trace record (one JSONL line in `agent_trace.jsonl`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TraceEntry {
    pub id: String,
    pub timestamp: String,
    pub vcs: Vcs,
    pub mutation_class: MutationClass,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub declared_mutation_class: Option<MutationClass>,
    pub files: Vec<TraceFile>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Vcs {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TraceFile {
    pub relative_path: String,
    pub conversations: Vec<Conversation>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Conversation {
    pub url: String,
    pub contributor: Contributor,
    pub ranges: Vec<Range>,
    pub related: Vec<Related>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Contributor {
    pub entity_type: String,
    pub model_identifier: String,
}

impl Contributor {
    pub fn ai(model_identifier: impl Into<String>) -> Self {
        Self {
            entity_type: "AI".to_string(),
            model_identifier: model_identifier.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Range {
    pub start_line: usize,
    pub end_line: usize,
    pub content_hash: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Related {
    #[serde(rename = "type")]
    pub rel_type: String,
    pub value: String,
}

impl TraceEntry {
    /// Intent ids this entry is linked to.
    pub fn intent_ids(&self) -> impl Iterator<Item = &str> {
        self.files
            .iter()
            .flat_map(|f| &f.conversations)
            .flat_map(|c| &c.related)
            .filter(|r| r.rel_type == REL_SPECIFICATION)
            .map(|r| r.value.as_str())
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.files.iter().map(|f| f.relative_path.as_str())
    }
}

/// Parameters for creating a trace entry.
pub struct TraceParams<'a> {
    pub intent_id: &'a str,
    pub relative_path: &'a str,
    pub session_url: &'a str,
    pub contributor: Contributor,
    pub revision_id: Option<String>,
    pub start_line: usize,
    pub end_line: usize,
    pub content_hash: String,
    pub mutation_class: MutationClass,
    pub declared_mutation_class: Option<MutationClass>,
}

fn new_entry_id() -> String {
    format!("trc_{}", ulid::Ulid::new().to_string().to_lowercase())
}

pub(crate) fn now_rfc3339() -> String {
    let now = time::OffsetDateTime::now_utc();
    now.format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| now.unix_timestamp().to_string())
}

/// Create a trace entry with one file, one conversation, and one range.
pub fn new_trace_entry(params: TraceParams<'_>) -> TraceEntry {
    TraceEntry {
        id: new_entry_id(),
        timestamp: now_rfc3339(),
        vcs: Vcs {
            revision_id: params.revision_id,
        },
        mutation_class: params.mutation_class,
        declared_mutation_class: params.declared_mutation_class,
        files: vec![TraceFile {
            relative_path: params.relative_path.to_string(),
            conversations: vec![Conversation {
                url: params.session_url.to_string(),
                contributor: params.contributor,
                ranges: vec![Range {
                    start_line: params.start_line,
                    end_line: params.end_line,
                    content_hash: params.content_hash,
                }],
                related: vec![Related {
                    rel_type: REL_SPECIFICATION.to_string(),
                    value: params.intent_id.to_string(),
                }],
            }],
        }],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> TraceParams<'static> {
        TraceParams {
            intent_id: "INT-001",
            relative_path: "src/api/weather.rs",
            session_url: "session-1",
            contributor: Contributor::ai("model-x"),
            revision_id: None,
            start_line: 1,
            end_line: 3,
            content_hash: "abc".to_string(),
            mutation_class: MutationClass::AstRefactor,
            declared_mutation_class: Some(MutationClass::AstRefactor),
        }
    }

    #[test]
    fn entry_links_intent() {
        let e = new_trace_entry(params());
        assert!(e.id.starts_with("trc_"));
        assert_eq!(e.intent_ids().collect::<Vec<_>>(), vec!["INT-001"]);
        assert_eq!(e.paths().collect::<Vec<_>>(), vec!["src/api/weather.rs"]);
    }

    #[test]
    fn ids_are_fresh() {
        assert_ne!(new_trace_entry(params()).id, new_trace_entry(params()).id);
    }

    #[test]
    fn wire_shape() {
        let e = new_trace_entry(params());
        let v = serde_json::to_value(&e).unwrap();
        assert_eq!(v["mutation_class"], "AST_REFACTOR");
        assert!(v["vcs"].get("revision_id").is_none());
        let conv = &v["files"][0]["conversations"][0];
        assert_eq!(conv["contributor"]["entity_type"], "AI");
        assert_eq!(conv["related"][0]["type"], "specification");
        assert_eq!(conv["ranges"][0]["end_line"], 3);
    }
}
