use tether_core::MutationClass;

/// Strategy that labels one mutation event.
pub trait MutationClassifier: Send + Sync {
    fn classify(&self, before: &str, after: &str) -> MutationClass;
}

/// Size/line-delta heuristic. Small edits are refactors; anything that
/// moves either delta past its threshold is an intent evolution.
#[derive(Debug, Clone, Copy)]
pub struct LineDeltaClassifier {
    pub max_bytes: usize,
    pub max_lines: usize,
}

impl Default for LineDeltaClassifier {
    fn default() -> Self {
        Self {
            max_bytes: 300,
            max_lines: 10,
        }
    }
}

impl LineDeltaClassifier {
    pub fn new(max_bytes: usize, max_lines: usize) -> Self {
        Self {
            max_bytes,
            max_lines,
        }
    }
}

impl MutationClassifier for LineDeltaClassifier {
    fn classify(&self, before: &str, after: &str) -> MutationClass {
        let size_delta = before.len().abs_diff(after.len());
        let line_delta = line_count(before).abs_diff(line_count(after));
        if size_delta < self.max_bytes && line_delta < self.max_lines {
            MutationClass::AstRefactor
        } else {
            MutationClass::IntentEvolution
        }
    }
}

/// Number of `\n`-separated lines; the empty string counts as one line.
pub fn line_count(s: &str) -> usize {
    s.split('\n').count()
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "fn main() {\n    println!(\"hi\");\n}\n";

    #[test]
    fn whitespace_edit_is_refactor() {
        let after = BASE.replace("    println", "\tprintln");
        assert_eq!(
            LineDeltaClassifier::default().classify(BASE, &after),
            MutationClass::AstRefactor
        );
    }

    #[test]
    fn fifty_line_feature_is_evolution() {
        let mut after = BASE.to_string();
        for i in 0..50 {
            after.push_str(&format!("fn helper_{i}() -> u32 {{ {i} }}\n"));
        }
        assert_eq!(
            LineDeltaClassifier::default().classify(BASE, &after),
            MutationClass::IntentEvolution
        );
    }

    #[test]
    fn large_single_line_is_evolution() {
        let after = format!("{BASE}{}", "x".repeat(400));
        assert_eq!(
            LineDeltaClassifier::default().classify(BASE, &after),
            MutationClass::IntentEvolution
        );
    }

    #[test]
    fn thresholds_are_tunable() {
        let strict = LineDeltaClassifier::new(1, 1);
        assert_eq!(strict.classify("a", "ab"), MutationClass::IntentEvolution);
        assert_eq!(strict.classify("a", "b"), MutationClass::AstRefactor);
    }

    #[test]
    fn line_count_matches_split() {
        assert_eq!(line_count(""), 1);
        assert_eq!(line_count("a\nb"), 2);
        assert_eq!(line_count("a\nb\n"), 3);
    }
}
