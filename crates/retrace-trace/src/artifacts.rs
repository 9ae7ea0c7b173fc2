//! Forward search: the artifacts an epic grew out of.
//!
//! Every finder stops at the first match. Search order is part of the
//! contract: a project-level artifact always shadows rig and town copies.

use crate::search::{agents_levels, ArtifactSearch, AGENT_MARKDOWN, MARKDOWN};
use retrace_store::SearchRoots;
use std::path::{Path, PathBuf};

/// Formula file that, when present at the project root, is the spec.
const FORMULA_FILE: &str = ".formula.toml";

/// Name marker separating pre-mortem results from ordinary plans.
const AGENT_MARKER: &str = "-agent";

/// Research note that led to this epic.
///
/// Matches on content mentioning the epic id, falling back to a file stem
/// containing the id without its prefix (`ol-retry` → `retry`).
pub fn find_research_for_epic(
    epic_id: &str,
    project_root: &Path,
    roots: &SearchRoots,
) -> Option<PathBuf> {
    let needle = epic_id.to_lowercase();
    let description = epic_description(&needle);
    ArtifactSearch::under(&agents_levels(project_root, roots), "research", &MARKDOWN).first_match(
        |c| {
            c.mentions(&needle)
                || description
                    .as_deref()
                    .is_some_and(|d| c.stem.contains(d))
        },
    )
}

/// Product brief mentioning the epic.
pub fn find_product_brief(
    epic_id: &str,
    project_root: &Path,
    roots: &SearchRoots,
) -> Option<PathBuf> {
    let needle = epic_id.to_lowercase();
    ArtifactSearch::under(&agents_levels(project_root, roots), "products", &MARKDOWN)
        .first_match(|c| c.mentions(&needle))
}

/// Pre-mortem result (`*-agent*.md` in the plans directory) mentioning the epic.
pub fn find_pre_mortem(epic_id: &str, roots: &SearchRoots) -> Option<PathBuf> {
    let plans = roots.plans_dir.clone()?;
    let needle = epic_id.to_lowercase();
    ArtifactSearch::new(vec![plans], &AGENT_MARKDOWN).first_match(|c| c.mentions(&needle))
}

/// Spec for the epic: the project's formula file if there is one, otherwise a
/// spec note mentioning the epic.
pub fn find_spec_artifact(epic_id: &str, project_root: &Path) -> Option<PathBuf> {
    let formula = project_root.join(FORMULA_FILE);
    if formula.is_file() {
        return Some(formula);
    }
    let needle = epic_id.to_lowercase();
    ArtifactSearch::new(vec![project_root.join(".agents").join("specs")], &MARKDOWN)
        .first_match(|c| c.mentions(&needle))
}

/// Ordinary plan (no `-agent` marker) mentioning the epic.
pub fn find_plan_artifact(epic_id: &str, roots: &SearchRoots) -> Option<PathBuf> {
    let plans = roots.plans_dir.clone()?;
    let needle = epic_id.to_lowercase();
    ArtifactSearch::new(vec![plans], &MARKDOWN)
        .excluding(AGENT_MARKER)
        .first_match(|c| c.mentions(&needle))
}

/// The epic id with its first hyphen token removed, if anything remains.
fn epic_description(epic_id: &str) -> Option<String> {
    let (_, rest) = epic_id.split_once('-')?;
    (!rest.is_empty()).then(|| rest.to_string())
}
