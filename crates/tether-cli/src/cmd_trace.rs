use clap::Subcommand;
use std::path::Path;
use tether_core::TetherPaths;
use tether_trace::TraceEntry;

#[derive(Subcommand)]
pub enum TraceCmd {
    /// Show recorded mutations, oldest first
    Log {
        /// Only entries linked to this intent
        #[arg(long)]
        intent: Option<String>,
        /// Show at most the last N entries (0 = unlimited)
        #[arg(long, default_value_t = 50)]
        limit: usize,
        /// Output as JSON lines
        #[arg(long)]
        json: bool,
    },
    /// Check that every line parses and ids are unique
    Verify,
}

pub fn run(cmd: TraceCmd, repo_root: &Path) -> anyhow::Result<()> {
    let paths = TetherPaths::discover(repo_root);
    match cmd {
        TraceCmd::Log {
            intent,
            limit,
            json,
        } => log(&paths, intent.as_deref(), limit, json),
        TraceCmd::Verify => verify(&paths),
    }
}

fn select<'a>(entries: &'a [TraceEntry], intent: Option<&str>, limit: usize) -> Vec<&'a TraceEntry> {
    let matching: Vec<&TraceEntry> = entries
        .iter()
        .filter(|e| intent.is_none_or(|id| e.intent_ids().any(|i| i == id)))
        .collect();
    let skip = if limit == 0 {
        0
    } else {
        matching.len().saturating_sub(limit)
    };
    matching.into_iter().skip(skip).collect()
}

fn log(paths: &TetherPaths, intent: Option<&str>, limit: usize, json: bool) -> anyhow::Result<()> {
    let entries = tether_trace::read_entries(&paths.trace_jsonl)?;
    let shown = select(&entries, intent, limit);
    if shown.is_empty() && !json {
        println!("(no trace entries)");
        return Ok(());
    }
    for entry in shown {
        if json {
            println!("{}", serde_json::to_string(entry)?);
            continue;
        }
        let intents: Vec<&str> = entry.intent_ids().collect();
        let files: Vec<&str> = entry.paths().collect();
        println!(
            "[{}] {:<16} {}  {}  ({})",
            entry.timestamp,
            entry.mutation_class.as_str(),
            entry.id,
            files.join(", "),
            intents.join(", ")
        );
    }
    Ok(())
}

fn verify(paths: &TetherPaths) -> anyhow::Result<()> {
    let report = tether_trace::verify(&paths.trace_jsonl)?;
    if report.is_ok() {
        println!("ok: {} entries", report.lines);
        return Ok(());
    }
    for n in &report.invalid_lines {
        println!("line {n}: not a valid trace entry");
    }
    for id in &report.duplicate_ids {
        println!("duplicate id: {id}");
    }
    anyhow::bail!(
        "trace {} failed verification ({} invalid lines, {} duplicate ids)",
        paths.trace_jsonl.display(),
        report.invalid_lines.len(),
        report.duplicate_ids.len()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tether_core::MutationClass;
    use tether_trace::{new_trace_entry, Contributor, TraceParams};

    fn entry(intent: &str) -> TraceEntry {
        new_trace_entry(TraceParams {
            intent_id: intent,
            relative_path: "src/a.rs",
            session_url: "ses_1",
            contributor: Contributor::ai("m"),
            revision_id: None,
            start_line: 1,
            end_line: 1,
            content_hash: "h".into(),
            mutation_class: MutationClass::AstRefactor,
            declared_mutation_class: None,
        })
    }

    #[test]
    fn select_filters_by_intent_and_keeps_latest() {
        let entries = vec![entry("A"), entry("B"), entry("A"), entry("A")];
        assert_eq!(select(&entries, Some("A"), 0).len(), 3);
        let last_two = select(&entries, Some("A"), 2);
        assert_eq!(last_two.len(), 2);
        assert_eq!(last_two[1].id, entries[3].id);
        assert_eq!(select(&entries, None, 50).len(), 4);
    }
}
