use crate::classify::{line_count, LineDeltaClassifier, MutationClassifier};
use crate::entry::{new_trace_entry, Contributor, TraceEntry, TraceParams};
use anyhow::Context;
use fs2::FileExt;
use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use tether_core::{content_hash, MutationClass};

/// Everything the logger needs to describe one completed mutation.
#[derive(Debug, Clone)]
pub struct MutationRecord<'a> {
    pub intent_id: &'a str,
    pub relative_path: &'a str,
    pub pre_content: &'a str,
    pub post_content: &'a str,
    pub contributor: Contributor,
    pub session_url: &'a str,
    pub revision_id: Option<String>,
    pub start_line: Option<usize>,
    pub end_line: Option<usize>,
    pub declared_class: Option<MutationClass>,
}

/// Append-only writer for `agent_trace.jsonl`.
///
/// Each append holds an exclusive lock on a sibling lock file, so concurrent
/// writers in one or several processes never interleave lines.
pub struct AuditLogger {
    trace_path: PathBuf,
    lock_path: PathBuf,
    classifier: Box<dyn MutationClassifier>,
    fsync: bool,
}

impl AuditLogger {
    pub fn new(trace_path: impl Into<PathBuf>, lock_path: impl Into<PathBuf>) -> Self {
        Self {
            trace_path: trace_path.into(),
            lock_path: lock_path.into(),
            classifier: Box::new(LineDeltaClassifier::default()),
            fsync: false,
        }
    }

    pub fn with_classifier(mut self, classifier: Box<dyn MutationClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn with_fsync(mut self, fsync: bool) -> Self {
        self.fsync = fsync;
        self
    }

    pub fn trace_path(&self) -> &Path {
        &self.trace_path
    }

    /// Classify the mutation, build its entry, and append it.
    pub fn record(&self, rec: &MutationRecord<'_>) -> anyhow::Result<TraceEntry> {
        let mutation_class = self.classifier.classify(rec.pre_content, rec.post_content);
        let entry = new_trace_entry(TraceParams {
            intent_id: rec.intent_id,
            relative_path: rec.relative_path,
            session_url: rec.session_url,
            contributor: rec.contributor.clone(),
            revision_id: rec.revision_id.clone(),
            start_line: rec.start_line.unwrap_or(1),
            end_line: rec
                .end_line
                .unwrap_or_else(|| line_count(rec.post_content)),
            content_hash: content_hash(rec.post_content.as_bytes()),
            mutation_class,
            declared_mutation_class: rec.declared_class,
        });
        self.append(&entry)?;
        tracing::info!(
            id = %entry.id,
            intent = rec.intent_id,
            path = rec.relative_path,
            class = %mutation_class,
            "trace entry appended"
        );
        Ok(entry)
    }

    /// Append one entry as a single line. Never rewrites earlier lines.
    pub fn append(&self, entry: &TraceEntry) -> anyhow::Result<()> {
        if let Some(parent) = self.trace_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let line = serde_json::to_string(entry)?;

        let lock = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&self.lock_path)
            .with_context(|| format!("opening lock {}", self.lock_path.display()))?;
        lock.lock_exclusive()
            .with_context(|| format!("locking {}", self.lock_path.display()))?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.trace_path)
            .with_context(|| format!("opening {}", self.trace_path.display()))?;
        writeln!(file, "{line}")
            .with_context(|| format!("appending to {}", self.trace_path.display()))?;
        if self.fsync {
            file.sync_all()?;
        }
        // Lock released when `lock` drops.
        Ok(())
    }

    /// Read all entries in file order.
    pub fn read_entries(&self) -> anyhow::Result<Vec<TraceEntry>> {
        read_entries(&self.trace_path)
    }
}

/// Read all entries from a trace file. Missing file means no entries.
pub fn read_entries(path: &Path) -> anyhow::Result<Vec<TraceEntry>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let file = fs::File::open(path)?;
    let mut entries = Vec::new();
    for (n, line) in std::io::BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let entry: TraceEntry = serde_json::from_str(&line)
            .with_context(|| format!("{}:{}: invalid trace entry", path.display(), n + 1))?;
        entries.push(entry);
    }
    Ok(entries)
}

/// Outcome of checking a trace file line by line.
#[derive(Debug, Default, PartialEq)]
pub struct VerifyReport {
    pub lines: usize,
    pub invalid_lines: Vec<usize>,
    pub duplicate_ids: Vec<String>,
}

impl VerifyReport {
    pub fn is_ok(&self) -> bool {
        self.invalid_lines.is_empty() && self.duplicate_ids.is_empty()
    }
}

/// Check that every line parses on its own and that ids are unique.
pub fn verify(path: &Path) -> anyhow::Result<VerifyReport> {
    let mut report = VerifyReport::default();
    if !path.exists() {
        return Ok(report);
    }
    let content = fs::read_to_string(path)?;
    let mut seen = HashSet::new();
    for (n, line) in content.lines().enumerate() {
        report.lines += 1;
        match serde_json::from_str::<TraceEntry>(line) {
            Ok(entry) => {
                if !seen.insert(entry.id.clone()) {
                    report.duplicate_ids.push(entry.id);
                }
            }
            Err(_) => report.invalid_lines.push(n + 1),
        }
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn logger(dir: &Path) -> AuditLogger {
        let orch = dir.join(".orchestration");
        AuditLogger::new(orch.join("agent_trace.jsonl"), orch.join("agent_trace.lock"))
    }

    fn record<'a>(intent: &'a str, pre: &'a str, post: &'a str) -> MutationRecord<'a> {
        MutationRecord {
            intent_id: intent,
            relative_path: "src/lib.rs",
            pre_content: pre,
            post_content: post,
            contributor: Contributor::ai("model-x"),
            session_url: "session-1",
            revision_id: Some("deadbeef".into()),
            start_line: None,
            end_line: None,
            declared_class: None,
        }
    }

    #[test]
    fn record_creates_dir_and_appends() {
        let tmp = tempfile::tempdir().unwrap();
        let log = logger(tmp.path());
        let entry = log.record(&record("INT-1", "", "a\nb\n")).unwrap();
        assert!(log.trace_path().exists());
        let range = &entry.files[0].conversations[0].ranges[0];
        assert_eq!(range.start_line, 1);
        assert_eq!(range.end_line, 3);
        assert_eq!(range.content_hash, content_hash(b"a\nb\n"));
        assert_eq!(entry.vcs.revision_id.as_deref(), Some("deadbeef"));
    }

    #[test]
    fn n_records_make_n_lines() {
        let tmp = tempfile::tempdir().unwrap();
        let log = logger(tmp.path());
        for i in 0..5 {
            let post = format!("v{i}");
            log.record(&record("INT-1", "v", &post)).unwrap();
        }
        let content = fs::read_to_string(log.trace_path()).unwrap();
        assert_eq!(content.lines().count(), 5);
        let report = verify(log.trace_path()).unwrap();
        assert!(report.is_ok());
        assert_eq!(report.lines, 5);
        assert_eq!(log.read_entries().unwrap().len(), 5);
    }

    #[test]
    fn prior_lines_untouched() {
        let tmp = tempfile::tempdir().unwrap();
        let log = logger(tmp.path());
        log.record(&record("INT-1", "", "first")).unwrap();
        let before = fs::read_to_string(log.trace_path()).unwrap();
        log.record(&record("INT-2", "", "second")).unwrap();
        let after = fs::read_to_string(log.trace_path()).unwrap();
        assert!(after.starts_with(&before));
    }

    #[test]
    fn classification_uses_pre_and_post() {
        let tmp = tempfile::tempdir().unwrap();
        let log = logger(tmp.path());
        let big = "line\n".repeat(60);
        let e = log.record(&record("INT-1", "", &big)).unwrap();
        assert_eq!(e.mutation_class, MutationClass::IntentEvolution);
        let e = log.record(&record("INT-1", &big, &big.replace("line", "lime"))).unwrap();
        assert_eq!(e.mutation_class, MutationClass::AstRefactor);
    }

    #[test]
    fn concurrent_appends_do_not_interleave() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().to_path_buf();
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let root = root.clone();
                std::thread::spawn(move || {
                    let log = logger(&root);
                    for i in 0..10 {
                        let post = format!("thread {t} write {i}");
                        log.record(&record("INT-1", "", &post)).unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        let report = verify(&root.join(".orchestration").join("agent_trace.jsonl")).unwrap();
        assert_eq!(report.lines, 40);
        assert!(report.is_ok());
    }

    #[test]
    fn verify_flags_bad_lines_and_duplicates() {
        let tmp = tempfile::tempdir().unwrap();
        let log = logger(tmp.path());
        let entry = log.record(&record("INT-1", "", "x")).unwrap();
        log.append(&entry).unwrap();
        let mut content = fs::read_to_string(log.trace_path()).unwrap();
        content.push_str("{not json\n");
        fs::write(log.trace_path(), content).unwrap();
        let report = verify(log.trace_path()).unwrap();
        assert_eq!(report.duplicate_ids, vec![entry.id]);
        assert_eq!(report.invalid_lines, vec![3]);
        assert!(!report.is_ok());
    }

    #[test]
    fn append_failure_propagates() {
        let tmp = tempfile::tempdir().unwrap();
        // A regular file where the directory should be makes the append fail.
        let blocker = tmp.path().join(".orchestration");
        fs::write(&blocker, "not a dir").unwrap();
        let log = logger(tmp.path());
        assert!(log.record(&record("INT-1", "", "x")).is_err());
    }
}
