//! The hook pipeline: classify, check, commit.
//!
//! `pre_hook` runs a fixed sequence of stages and either authorizes the call
//! or returns a [`Rejection`]. Stage order:
//!
//! 1. gatekeeper (mutating calls need an active intent)
//! 2. intent selection (short-circuits)
//! 3. ignore filter
//! 4. scope enforcement
//! 5. human approval
//! 6. concurrency guard
//!
//! After the caller has performed the mutation, `post_hook` records it in
//! the audit trace.

use crate::approval::{ApprovalGate, ApprovalRequest, Decision};
use crate::context::{inject, render_intent_context, Payload};
use crate::guard::{ConcurrencyGuard, GuardStatus};
use crate::rejection::{Rejection, RejectionKind};
use crate::session::Session;
use crate::tool::{ToolCall, WriteArgs};
use std::path::{Path, PathBuf};
use tether_core::{
    normalize_rel_path, CatalogError, IgnoreFilter, Intent, IntentStore, TetherConfig,
    TetherPaths, NEW_FILE_SENTINEL,
};
use tether_trace::{
    vcs, AuditLogger, Contributor, LineDeltaClassifier, MutationClassifier, MutationRecord,
    TraceEntry,
};

/// A call that passed every stage. Hand it back to `post_hook` once the
/// mutation has been carried out.
#[derive(Debug, Clone)]
pub struct Authorized {
    pub call: ToolCall,
    pub payload: Payload,
    /// Workspace-relative target, when the call names one inside the root.
    pub target: Option<String>,
    pub intent_id: Option<String>,
    pre_image: Option<String>,
}

impl Authorized {
    /// Content of the write target as it was when the call was authorized.
    pub fn pre_image(&self) -> Option<&str> {
        self.pre_image.as_deref()
    }
}

/// What the executor reports back after running the tool.
#[derive(Debug, Clone, Default)]
pub struct PostState {
    pub success: bool,
    /// Content actually written, when it differs from the call's `content`.
    pub content: Option<String>,
}

impl PostState {
    pub fn succeeded() -> Self {
        Self {
            success: true,
            content: None,
        }
    }

    pub fn failed() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone)]
pub enum PostOutcome {
    Recorded(TraceEntry),
    Skipped(&'static str),
}

enum Catalog {
    File(PathBuf),
    Fixed(IntentStore),
}

impl Catalog {
    fn resolve(&self, id: &str) -> Result<Intent, CatalogError> {
        match self {
            Catalog::File(path) => IntentStore::load(path)?.resolve(id),
            Catalog::Fixed(store) => store.resolve(id),
        }
    }
}

enum StageError {
    Reject(Rejection),
    Fault(anyhow::Error),
}

impl From<Rejection> for StageError {
    fn from(r: Rejection) -> Self {
        StageError::Reject(r)
    }
}

impl From<CatalogError> for StageError {
    fn from(e: CatalogError) -> Self {
        StageError::Reject(e.into())
    }
}

impl From<anyhow::Error> for StageError {
    fn from(e: anyhow::Error) -> Self {
        StageError::Fault(e)
    }
}

pub struct HookPipeline {
    root: PathBuf,
    catalog: Catalog,
    ignore: IgnoreFilter,
    approval: Box<dyn ApprovalGate>,
    guard: ConcurrencyGuard,
    logger: AuditLogger,
    contributor_model: String,
    max_context_chars: usize,
}

impl HookPipeline {
    /// Build a pipeline for the workspace at `paths`. The catalog is read at
    /// each intent selection; the ignore list is read once here.
    pub fn new(
        paths: &TetherPaths,
        config: &TetherConfig,
        approval: Box<dyn ApprovalGate>,
    ) -> anyhow::Result<Self> {
        let ignore = IgnoreFilter::load(&paths.ignore_file)?;
        let classifier: Box<dyn MutationClassifier> = Box::new(LineDeltaClassifier::new(
            config.refactor_max_bytes,
            config.refactor_max_lines,
        ));
        let logger = AuditLogger::new(&paths.trace_jsonl, &paths.trace_lock)
            .with_classifier(classifier)
            .with_fsync(config.fsync_trace);
        Ok(Self {
            root: paths.root.clone(),
            catalog: Catalog::File(paths.intents_yaml.clone()),
            ignore,
            approval,
            guard: ConcurrencyGuard::new(&paths.root),
            logger,
            contributor_model: config.contributor_model.clone(),
            max_context_chars: config.max_context_chars,
        })
    }

    /// Resolve intents from a fixed store instead of the catalog file.
    pub fn with_intent_store(mut self, store: IntentStore) -> Self {
        self.catalog = Catalog::Fixed(store);
        self
    }

    pub fn with_ignore_filter(mut self, ignore: IgnoreFilter) -> Self {
        self.ignore = ignore;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn logger(&self) -> &AuditLogger {
        &self.logger
    }

    /// Validate an untyped invocation, then run the pre-hook.
    pub async fn pre_hook_raw(
        &self,
        session: &mut Session,
        tool_name: &str,
        args: serde_json::Value,
        payload: Payload,
    ) -> Result<Authorized, Rejection> {
        let call = ToolCall::from_parts(tool_name, args).inspect_err(|r| {
            tracing::warn!(tool = tool_name, kind = r.kind.as_str(), message = %r.message, "tool call rejected");
        })?;
        self.pre_hook(session, call, payload).await
    }

    /// Run every stage for one call. Never panics on stage faults; they come
    /// back as `HookFailure`.
    pub async fn pre_hook(
        &self,
        session: &mut Session,
        call: ToolCall,
        payload: Payload,
    ) -> Result<Authorized, Rejection> {
        let tool = call.name();
        match self.run_stages(session, call, payload).await {
            Ok(auth) => {
                tracing::debug!(tool, path = ?auth.target, "tool call authorized");
                Ok(auth)
            }
            Err(StageError::Reject(r)) => {
                tracing::warn!(tool, kind = r.kind.as_str(), message = %r.message, "tool call rejected");
                Err(r)
            }
            Err(StageError::Fault(e)) => {
                let detail = format!("{e:#}");
                tracing::error!(tool, error = %detail, "hook stage failed");
                Err(Rejection::hook_failure(&e))
            }
        }
    }

    async fn run_stages(
        &self,
        session: &mut Session,
        call: ToolCall,
        mut payload: Payload,
    ) -> Result<Authorized, StageError> {
        // 1. Gatekeeper
        if call.is_mutating() && session.active().is_none() {
            return Err(Rejection::intent_required(call.name()).into());
        }

        // 2. Intent selection
        if let ToolCall::SelectActiveIntent { intent_id } = &call {
            let intent_id = self.select_intent(session, intent_id, &mut payload)?;
            return Ok(Authorized {
                call,
                payload,
                target: None,
                intent_id: Some(intent_id),
                pre_image: None,
            });
        }

        let tool = call.name();
        let raw_target = call.target_path();
        let target = raw_target.and_then(|raw| normalize_rel_path(&self.root, raw));

        // 3. Ignore filter
        if let Some(raw) = raw_target {
            let candidate = target.clone().unwrap_or_else(|| raw.replace('\\', "/"));
            if let Some(pattern) = self.ignore.matching_pattern(&candidate) {
                return Err(Rejection::new(
                    RejectionKind::Ignored,
                    format!("{candidate} is excluded by ignore pattern \"{pattern}\""),
                )
                .into());
            }
        }
        tracing::debug!(tool, "ignore filter passed");

        if call.is_mutating() {
            // 4. Scope enforcement
            self.check_scope(session, &call, raw_target, target.as_deref())?;
            tracing::debug!(tool, "scope check passed");
            // 5. Human approval
            self.request_approval(&call).await?;
            tracing::debug!(tool, "approved");
        }

        // 6. Concurrency guard
        let mut pre_image = None;
        if let (ToolCall::WriteToFile(args), Some(rel)) = (&call, target.as_deref()) {
            self.check_freshness(args, rel)?;
            tracing::debug!(tool, path = rel, "concurrency guard passed");
            pre_image = Some(self.snapshot(rel)?);
        }

        Ok(Authorized {
            intent_id: session.active_intent_id().map(str::to_string),
            call,
            payload,
            target,
            pre_image,
        })
    }

    fn select_intent(
        &self,
        session: &mut Session,
        intent_id: &str,
        payload: &mut Payload,
    ) -> Result<String, StageError> {
        if intent_id.trim().is_empty() {
            return Err(Rejection::malformed("intent_id is required").into());
        }
        let intent = self.catalog.resolve(intent_id)?;
        let block = render_intent_context(&intent, self.max_context_chars)?;
        session.activate(intent).map_err(|e| {
            Rejection::new(
                RejectionKind::CatalogMalformed,
                format!("intent {intent_id} has an invalid owned_scope pattern: {e}"),
            )
        })?;
        inject(payload, &block);
        tracing::info!(intent = intent_id, session = session.id(), "active intent selected");
        Ok(intent_id.to_string())
    }

    fn check_scope(
        &self,
        session: &Session,
        call: &ToolCall,
        raw_target: Option<&str>,
        target: Option<&str>,
    ) -> Result<(), StageError> {
        let Some(active) = session.active() else {
            return Err(Rejection::intent_required(call.name()).into());
        };
        let active_id = active.intent.id.as_str();

        if let ToolCall::WriteToFile(WriteArgs {
            intent_id: Some(declared),
            ..
        }) = call
        {
            if declared != active_id {
                return Err(Rejection::new(
                    RejectionKind::ScopeViolation,
                    format!(
                        "write_to_file declares intent {declared} but the active intent is \
                         {active_id}; call select_active_intent to switch"
                    ),
                )
                .into());
            }
        }

        let Some(raw) = raw_target else {
            return Ok(());
        };
        let Some(rel) = target else {
            return Err(Rejection::new(
                RejectionKind::ScopeViolation,
                format!("Scope Violation: {raw} resolves outside the workspace root"),
            )
            .into());
        };
        if !active.scope.is_in_scope(rel) {
            let owned = if active.scope.patterns().is_empty() {
                "(empty)".to_string()
            } else {
                active.scope.patterns().join(", ")
            };
            return Err(Rejection::new(
                RejectionKind::ScopeViolation,
                format!(
                    "Scope Violation: intent {active_id} is not allowed to modify {rel} \
                     (owned scope: {owned})"
                ),
            )
            .into());
        }
        Ok(())
    }

    async fn request_approval(&self, call: &ToolCall) -> Result<(), StageError> {
        let target = match call {
            ToolCall::ExecuteCommand { command, .. } => command.clone(),
            other => other.target_path().unwrap_or("(unknown file)").to_string(),
        };
        let description = call.describe();
        let request = ApprovalRequest {
            tool_name: call.name().to_string(),
            target,
            prompt: format!("Allow AI to {description}?"),
        };
        match self.approval.request_approval(&request).await {
            Decision::Approved => Ok(()),
            Decision::Rejected => Err(Rejection::new(
                RejectionKind::Rejected,
                format!("User rejected change: {description}"),
            )
            .into()),
            Decision::Cancelled => Err(Rejection::new(
                RejectionKind::Rejected,
                format!("Approval cancelled: {description}"),
            )
            .into()),
        }
    }

    fn check_freshness(&self, args: &WriteArgs, rel: &str) -> Result<(), StageError> {
        let Some(claimed) = args.initial_hash.as_deref() else {
            tracing::warn!(path = rel, "write_to_file without initial_hash: no staleness guarantee");
            return Ok(());
        };
        match self.guard.check(rel, claimed)? {
            GuardStatus::Ok => Ok(()),
            GuardStatus::Stale { current_hash } if claimed == NEW_FILE_SENTINEL => {
                Err(Rejection::new(
                    RejectionKind::StaleResource,
                    format!(
                        "Stale File: {rel} already exists (hash {current_hash}) but \
                         initial_hash claims a new file. Re-read it and retry."
                    ),
                )
                .into())
            }
            GuardStatus::Stale { current_hash } => Err(Rejection::new(
                RejectionKind::StaleResource,
                format!(
                    "Stale File: {rel} changed since you last read it (expected {claimed}, \
                     found {current_hash}). Re-read the file and retry."
                ),
            )
            .into()),
            GuardStatus::Conflict => Err(Rejection::new(
                RejectionKind::Conflict,
                format!(
                    "Conflict: {rel} does not exist, but initial_hash {claimed} assumes it \
                     does. Use initial_hash \"{NEW_FILE_SENTINEL}\" to create it."
                ),
            )
            .into()),
        }
    }

    fn snapshot(&self, rel: &str) -> anyhow::Result<String> {
        let full = self.root.join(rel);
        match std::fs::read(&full) {
            Ok(bytes) => Ok(String::from_utf8_lossy(&bytes).into_owned()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(String::new()),
            Err(e) => Err(anyhow::anyhow!("reading {}: {e}", full.display())),
        }
    }

    /// Record a completed write in the audit trace.
    ///
    /// The entry is attributed to the intent that authorized the call, even
    /// if the session has selected another one since. Skips, without error,
    /// failed calls and untracked tools. A failed append is returned as `Err`.
    pub fn post_hook(
        &self,
        session: &Session,
        auth: &Authorized,
        state: &PostState,
    ) -> anyhow::Result<PostOutcome> {
        if !state.success {
            return Ok(PostOutcome::Skipped("tool did not succeed"));
        }
        let ToolCall::WriteToFile(args) = &auth.call else {
            return Ok(PostOutcome::Skipped("not a tracked write"));
        };
        let Some(intent_id) = auth.intent_id.as_deref() else {
            return Ok(PostOutcome::Skipped("no authorizing intent"));
        };
        let Some(rel) = auth.target.as_deref() else {
            return Ok(PostOutcome::Skipped("write has no workspace target"));
        };

        let record = MutationRecord {
            intent_id,
            relative_path: rel,
            pre_content: auth.pre_image().unwrap_or(""),
            post_content: state.content.as_deref().unwrap_or(&args.content),
            contributor: Contributor::ai(&self.contributor_model),
            session_url: session.id(),
            revision_id: vcs::detect_revision(&self.root),
            start_line: args.start_line,
            end_line: args.end_line,
            declared_class: args.mutation_class,
        };
        let entry = self.logger.record(&record)?;
        Ok(PostOutcome::Recorded(entry))
    }
}
