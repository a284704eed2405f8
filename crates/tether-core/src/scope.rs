use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use std::path::{Component, Path};

/// Compiled ownership scope of one intent.
///
/// Pattern semantics: `**` spans any number of path segments (including
/// none), even when glued to other text as in `src/**.ts`; `*` spans
/// characters within one segment; `.` is literal. A path is in scope when any
/// pattern matches; patterns carry no priority.
#[derive(Debug, Clone)]
pub struct ScopeMatcher {
    patterns: Vec<String>,
    set: GlobSet,
}

impl ScopeMatcher {
    pub fn compile(patterns: &[String]) -> Result<Self, globset::Error> {
        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            for variant in expand_double_star(pattern) {
                builder.add(compile_glob(&variant)?);
            }
        }
        Ok(Self {
            patterns: patterns.to_vec(),
            set: builder.build()?,
        })
    }

    /// `rel_path` must already be workspace-relative with `/` separators.
    pub fn is_in_scope(&self, rel_path: &str) -> bool {
        self.set.is_match(rel_path)
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }
}

/// Compile a single pattern with path-aware `*`.
pub fn compile_glob(pattern: &str) -> Result<globset::Glob, globset::Error> {
    GlobBuilder::new(pattern).literal_separator(true).build()
}

/// Rewrite each `**` that does not form a whole path segment into globs
/// the matcher understands.
///
/// `a**b` matches `a`, then any text (slashes included), then `b`. The text
/// either stays within one segment (`a*b`) or crosses at least one separator
/// (`a*/**/*b`), so every such occurrence doubles the variant list.
fn expand_double_star(pattern: &str) -> Vec<String> {
    let bytes = pattern.as_bytes();
    let mut variants = vec![String::new()];
    let mut copied = 0;
    let mut i = 0;
    while i + 1 < bytes.len() {
        if bytes[i] != b'*' || bytes[i + 1] != b'*' {
            i += 1;
            continue;
        }
        let opens_segment = i == 0 || bytes[i - 1] == b'/';
        let closes_segment = i + 2 == bytes.len() || bytes[i + 2] == b'/';
        if !(opens_segment && closes_segment) {
            let literal = &pattern[copied..i];
            variants = variants
                .into_iter()
                .flat_map(|v| [format!("{v}{literal}*"), format!("{v}{literal}*/**/*")])
                .collect();
            copied = i + 2;
        }
        i += 2;
    }
    let rest = &pattern[copied..];
    variants.into_iter().map(|v| v + rest).collect()
}

/// Normalize a tool-supplied path into workspace-relative form.
///
/// Backslashes become `/`, `.` segments vanish, `..` is resolved lexically,
/// and absolute paths under `root` are made relative. Returns `None` when
/// the path escapes the workspace or names the root itself.
pub fn normalize_rel_path(root: &Path, raw: &str) -> Option<String> {
    let unified = raw.replace('\\', "/");
    let candidate = Path::new(&unified);
    let rel = if candidate.is_absolute() {
        candidate.strip_prefix(root).ok()?
    } else {
        candidate
    };

    let mut parts: Vec<String> = Vec::new();
    for component in rel.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                parts.pop()?;
            }
            Component::Normal(seg) => parts.push(seg.to_string_lossy().to_string()),
            Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    if parts.is_empty() {
        return None;
    }
    Some(parts.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matcher(patterns: &[&str]) -> ScopeMatcher {
        let owned: Vec<String> = patterns.iter().map(|s| s.to_string()).collect();
        ScopeMatcher::compile(&owned).unwrap()
    }

    #[test]
    fn or_semantics_across_patterns() {
        let m = matcher(&["src/**", "docs/readme.md"]);
        assert!(m.is_in_scope("src/a/b.ts"));
        assert!(m.is_in_scope("docs/readme.md"));
        assert!(!m.is_in_scope("test/x.ts"));
    }

    #[test]
    fn single_star_stays_in_segment() {
        let m = matcher(&["src/*.rs"]);
        assert!(m.is_in_scope("src/main.rs"));
        assert!(!m.is_in_scope("src/nested/main.rs"));
    }

    #[test]
    fn double_star_matches_zero_segments() {
        let m = matcher(&["src/**/mod.rs"]);
        assert!(m.is_in_scope("src/mod.rs"));
        assert!(m.is_in_scope("src/a/b/mod.rs"));
    }

    #[test]
    fn double_star_glued_to_suffix_crosses_segments() {
        let m = matcher(&["src/**.ts"]);
        assert!(m.is_in_scope("src/b.ts"));
        assert!(m.is_in_scope("src/a/b.ts"));
        assert!(m.is_in_scope("src/a/c/b.ts"));
        assert!(!m.is_in_scope("lib/a.ts"));
        assert!(!m.is_in_scope("src/a/b.rs"));

        let m = matcher(&["docs**"]);
        assert!(m.is_in_scope("docs-old/x.md"));
        assert!(!m.is_in_scope("src/docs"));
    }

    #[test]
    fn dot_is_literal() {
        let m = matcher(&["docs/readme.md"]);
        assert!(!m.is_in_scope("docs/readmeXmd"));
    }

    #[test]
    fn match_is_anchored() {
        let m = matcher(&["src/**"]);
        assert!(!m.is_in_scope("vendor/src/x.rs"));
    }

    #[test]
    fn empty_scope_matches_nothing() {
        let m = matcher(&[]);
        assert!(!m.is_in_scope("src/a.rs"));
    }

    #[test]
    fn invalid_pattern_fails_to_compile() {
        assert!(ScopeMatcher::compile(&["src/[".to_string()]).is_err());
    }

    #[test]
    fn normalize_relative_forms() {
        let root = Path::new("/work");
        assert_eq!(normalize_rel_path(root, "./src/a.rs").as_deref(), Some("src/a.rs"));
        assert_eq!(normalize_rel_path(root, "src\\a.rs").as_deref(), Some("src/a.rs"));
        assert_eq!(normalize_rel_path(root, "src/x/../a.rs").as_deref(), Some("src/a.rs"));
        assert_eq!(normalize_rel_path(root, "/work/src/a.rs").as_deref(), Some("src/a.rs"));
    }

    #[test]
    fn normalize_rejects_escapes() {
        let root = Path::new("/work");
        assert_eq!(normalize_rel_path(root, "../etc/passwd"), None);
        assert_eq!(normalize_rel_path(root, "/etc/passwd"), None);
        assert_eq!(normalize_rel_path(root, "."), None);
    }
}
