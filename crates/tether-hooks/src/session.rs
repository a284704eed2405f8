use tether_core::{Intent, ScopeMatcher};

/// The intent a session is currently working under, with its compiled scope.
#[derive(Debug, Clone)]
pub struct ActiveIntent {
    pub intent: Intent,
    pub scope: ScopeMatcher,
}

/// Per-run agent state. Created at run start, threaded through every hook
/// call, and cleared by [`Session::reset`].
///
/// Holds its own copy of the selected intent; the catalog is never aliased.
#[derive(Debug)]
pub struct Session {
    id: String,
    active: Option<ActiveIntent>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self::with_id(format!(
            "ses_{}",
            ulid::Ulid::new().to_string().to_lowercase()
        ))
    }

    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            active: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn active(&self) -> Option<&ActiveIntent> {
        self.active.as_ref()
    }

    pub fn active_intent_id(&self) -> Option<&str> {
        self.active.as_ref().map(|a| a.intent.id.as_str())
    }

    /// Make `intent` the single active intent, replacing any previous one.
    pub fn activate(&mut self, intent: Intent) -> Result<&ActiveIntent, globset::Error> {
        let scope = ScopeMatcher::compile(&intent.owned_scope)?;
        Ok(self.active.insert(ActiveIntent { intent, scope }))
    }

    pub fn reset(&mut self) {
        self.active = None;
    }
}
