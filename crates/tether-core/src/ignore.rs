use crate::scope::compile_glob;
use globset::GlobMatcher;
use std::path::Path;

struct IgnorePattern {
    raw: String,
    glob: Option<GlobMatcher>,
}

/// Deny-list loaded from `.intentignore`. Blank lines and `#` comments are skipped.
///
/// A path is ignored when any pattern is a substring of it or glob-matches it.
#[derive(Default)]
pub struct IgnoreFilter {
    patterns: Vec<IgnorePattern>,
}

impl IgnoreFilter {
    /// Load from a line-delimited file. A missing file ignores nothing.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(content) => Ok(Self::parse(&content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(anyhow::anyhow!("cannot read {}: {e}", path.display())),
        }
    }

    pub fn parse(content: &str) -> Self {
        let patterns = content
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty() && !l.starts_with('#'))
            .map(|raw| IgnorePattern {
                raw: raw.to_string(),
                // Not every substring pattern is a valid glob; those match by substring only.
                glob: compile_glob(raw).ok().map(|g| g.compile_matcher()),
            })
            .collect();
        Self { patterns }
    }

    /// Return the first pattern that ignores `rel_path`, if any.
    pub fn matching_pattern(&self, rel_path: &str) -> Option<&str> {
        self.patterns
            .iter()
            .find(|p| {
                rel_path.contains(p.raw.as_str())
                    || p.glob.as_ref().is_some_and(|g| g.is_match(rel_path))
            })
            .map(|p| p.raw.as_str())
    }

    pub fn is_ignored(&self, rel_path: &str) -> bool {
        self.matching_pattern(rel_path).is_some()
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}
