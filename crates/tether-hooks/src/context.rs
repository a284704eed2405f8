use serde::{Deserialize, Serialize};
use tether_core::Intent;

pub const CONTEXT_TAG_START: &str = "<intent_context>";
pub const CONTEXT_TAG_END: &str = "</intent_context>";

/// Outgoing model payload carried through the pre-hook.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Payload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub messages: Option<Vec<Message>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub role: String,
    pub content: String,
}

/// The only intent fields ever shown to the model.
#[derive(Serialize)]
struct CuratedIntent<'a> {
    intent_id: &'a str,
    name: &'a str,
    constraints: &'a [String],
    owned_scope: &'a [String],
    acceptance_criteria: &'a [String],
}

/// Render the curated `<intent_context>` block, bounded by `budget` chars.
pub fn render_intent_context(intent: &Intent, budget: usize) -> anyhow::Result<String> {
    let curated = CuratedIntent {
        intent_id: &intent.id,
        name: &intent.name,
        constraints: &intent.constraints,
        owned_scope: &intent.owned_scope,
        acceptance_criteria: &intent.acceptance_criteria,
    };
    let body = serde_json::to_string_pretty(&curated)?;
    let overhead = CONTEXT_TAG_START.len() + CONTEXT_TAG_END.len();
    let body = apply_budget(&body, budget.saturating_sub(overhead));
    Ok(format!("{CONTEXT_TAG_START}{body}{CONTEXT_TAG_END}"))
}

/// Truncate content to fit within the char budget, preserving UTF-8 boundaries.
///
/// The result never exceeds `budget`. A truncation marker is appended only
/// when it fits.
pub fn apply_budget(content: &str, budget: usize) -> String {
    if content.len() <= budget {
        return content.to_string();
    }
    let marker = format!("\n... (truncated to {budget} char budget)");
    if marker.len() > budget {
        return content[..floor_char_boundary(content, budget)].to_string();
    }
    let cut = floor_char_boundary(content, budget - marker.len());
    format!("{}{marker}", &content[..cut])
}

fn floor_char_boundary(s: &str, mut at: usize) -> usize {
    while at > 0 && !s.is_char_boundary(at) {
        at -= 1;
    }
    at
}

/// Merge a context block into the payload: appended to the prompt when one
/// exists, otherwise pushed as a system message.
pub fn inject(payload: &mut Payload, block: &str) {
    if let Some(prompt) = payload.prompt.as_mut() {
        if !prompt.is_empty() {
            prompt.push_str("\n\n");
        }
        prompt.push_str(block);
        return;
    }
    payload
        .messages
        .get_or_insert_with(Vec::new)
        .push(Message {
            role: "system".to_string(),
            content: block.to_string(),
        });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn intent() -> Intent {
        Intent {
            id: "INT-001".into(),
            name: "Weather API".into(),
            constraints: vec!["no external weather libs".into()],
            owned_scope: vec!["src/api/**".into()],
            acceptance_criteria: vec!["tests pass".into()],
        }
    }

    #[test]
    fn block_is_tagged_curated_json() {
        let block = render_intent_context(&intent(), 8000).unwrap();
        assert!(block.starts_with(CONTEXT_TAG_START));
        assert!(block.ends_with(CONTEXT_TAG_END));
        let json = &block[CONTEXT_TAG_START.len()..block.len() - CONTEXT_TAG_END.len()];
        let v: serde_json::Value = serde_json::from_str(json).unwrap();
        let keys: Vec<&str> = v.as_object().unwrap().keys().map(|k| k.as_str()).collect();
        assert_eq!(keys.len(), 5);
        assert_eq!(v["intent_id"], "INT-001");
        assert_eq!(v["owned_scope"][0], "src/api/**");
    }

    #[test]
    fn block_respects_budget() {
        let mut big = intent();
        big.constraints = (0..500).map(|i| format!("constraint number {i}")).collect();
        let block = render_intent_context(&big, 400).unwrap();
        assert!(block.len() <= 400);
        assert!(block.contains("truncated"));
    }

    #[test]
    fn budget_respects_char_boundaries() {
        let s = "ééééééééééééééééééééééééééééééééééééééééééééééééé";
        let out = apply_budget(s, 45);
        assert!(out.len() <= 45);
    }

    #[test]
    fn tiny_budget_drops_marker() {
        let long = "x".repeat(200);
        let out = apply_budget(&long, 5);
        assert_eq!(out, "xxxxx");
        assert_eq!(apply_budget(&long, 0), "");
        assert!(apply_budget("ééé", 3).len() <= 3);
    }

    #[test]
    fn inject_appends_to_prompt() {
        let mut p = Payload {
            prompt: Some("do the thing".into()),
            messages: None,
        };
        inject(&mut p, "<b/>");
        assert_eq!(p.prompt.as_deref(), Some("do the thing\n\n<b/>"));
        assert!(p.messages.is_none());
    }

    #[test]
    fn inject_pushes_system_message() {
        let mut p = Payload {
            prompt: None,
            messages: Some(vec![Message {
                role: "user".into(),
                content: "hi".into(),
            }]),
        };
        inject(&mut p, "<b/>");
        let msgs = p.messages.unwrap();
        assert_eq!(msgs.len(), 2);
        assert_eq!(msgs[1].role, "system");
        assert_eq!(msgs[1].content, "<b/>");
    }

    #[test]
    fn inject_into_empty_payload_creates_messages() {
        let mut p = Payload::default();
        inject(&mut p, "<b/>");
        assert_eq!(p.messages.unwrap().len(), 1);
    }
}
