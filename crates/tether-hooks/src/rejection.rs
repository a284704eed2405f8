use serde::{Deserialize, Serialize};
use std::fmt;
use tether_core::CatalogError;

/// Why the pipeline refused a tool call.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RejectionKind {
    IntentRequired,
    IntentNotFound,
    CatalogNotFound,
    CatalogMalformed,
    Ignored,
    ScopeViolation,
    /// Human denied or cancelled the approval.
    Rejected,
    StaleResource,
    /// The caller's premise about whether the file exists is false.
    Conflict,
    MalformedArgs,
    /// Unexpected internal fault inside a stage.
    HookFailure,
}

impl RejectionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectionKind::IntentRequired => "INTENT_REQUIRED",
            RejectionKind::IntentNotFound => "INTENT_NOT_FOUND",
            RejectionKind::CatalogNotFound => "CATALOG_NOT_FOUND",
            RejectionKind::CatalogMalformed => "CATALOG_MALFORMED",
            RejectionKind::Ignored => "IGNORED",
            RejectionKind::ScopeViolation => "SCOPE_VIOLATION",
            RejectionKind::Rejected => "REJECTED",
            RejectionKind::StaleResource => "STALE_RESOURCE",
            RejectionKind::Conflict => "CONFLICT",
            RejectionKind::MalformedArgs => "MALFORMED_ARGS",
            RejectionKind::HookFailure => "HOOK_FAILURE",
        }
    }
}

/// Structured refusal returned to the calling agent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Rejection {
    pub kind: RejectionKind,
    pub message: String,
}

impl Rejection {
    pub fn new(kind: RejectionKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn intent_required(tool_name: &str) -> Self {
        Self::new(
            RejectionKind::IntentRequired,
            format!(
                "{tool_name} is a mutating action: call select_active_intent with a valid intent id first"
            ),
        )
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(RejectionKind::MalformedArgs, message)
    }

    pub fn hook_failure(err: &anyhow::Error) -> Self {
        Self::new(RejectionKind::HookFailure, format!("hook failure: {err:#}"))
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind.as_str(), self.message)
    }
}

impl std::error::Error for Rejection {}

impl From<CatalogError> for Rejection {
    fn from(err: CatalogError) -> Self {
        let kind = match &err {
            CatalogError::NotFound(_) => RejectionKind::CatalogNotFound,
            CatalogError::Malformed { .. } | CatalogError::DuplicateId { .. } => {
                RejectionKind::CatalogMalformed
            }
            CatalogError::IntentNotFound(_) => RejectionKind::IntentNotFound,
        };
        Self::new(kind, err.to_string())
    }
}
