pub mod classify;
pub mod entry;
pub mod lesson;
pub mod logger;
pub mod vcs;

pub use classify::{LineDeltaClassifier, MutationClassifier};
pub use entry::{new_trace_entry, Contributor, TraceEntry, TraceParams};
pub use lesson::{append_lesson, LessonCategory};
pub use logger::{read_entries, verify, AuditLogger, MutationRecord, VerifyReport};
