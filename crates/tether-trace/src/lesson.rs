use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::Path;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LessonCategory {
    Failure,
    Design,
    Style,
    Concurrency,
    Other,
}

impl LessonCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            LessonCategory::Failure => "failure",
            LessonCategory::Design => "design",
            LessonCategory::Style => "style",
            LessonCategory::Concurrency => "concurrency",
            LessonCategory::Other => "other",
        }
    }
}

impl std::str::FromStr for LessonCategory {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "failure" => Ok(Self::Failure),
            "design" => Ok(Self::Design),
            "style" => Ok(Self::Style),
            "concurrency" => Ok(Self::Concurrency),
            "other" => Ok(Self::Other),
            other => anyhow::bail!(
                "unknown lesson category \"{other}\" (expected failure, design, style, concurrency, other)"
            ),
        }
    }
}

/// Append a timestamped lesson section to the shared brain file (`AGENTS.md`).
pub fn append_lesson(
    path: &Path,
    lesson: &str,
    category: Option<LessonCategory>,
) -> anyhow::Result<()> {
    let lesson = lesson.trim();
    if lesson.is_empty() {
        anyhow::bail!("lesson text is empty");
    }
    let category_line = category
        .map(|c| format!("**Category:** {}\n", c.as_str()))
        .unwrap_or_default();
    let section = format!(
        "\n### {}\n{category_line}**Lesson:** {lesson}\n",
        crate::entry::now_rfc3339()
    );

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    file.write_all(section.as_bytes())?;
    Ok(())
}
