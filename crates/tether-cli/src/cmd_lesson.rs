use std::path::Path;
use tether_core::TetherPaths;
use tether_trace::{append_lesson, LessonCategory};

/// `tether lesson <text> [--category C]`
pub fn execute(repo_root: &Path, text: &str, category: Option<&str>) -> anyhow::Result<()> {
    let category = category.map(str::parse::<LessonCategory>).transpose()?;
    let paths = TetherPaths::discover(repo_root);
    append_lesson(&paths.lessons_md, text, category)?;
    println!("Lesson recorded in {}", paths.lessons_md.display());
    Ok(())
}
