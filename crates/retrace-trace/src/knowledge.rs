//! Backward search: prior learnings, retros and patterns that may have
//! informed an epic.

use crate::search::{agents_levels, lower_stem, ArtifactSearch, MARKDOWN};
use retrace_store::SearchRoots;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KnowledgeSource {
    Learning,
    Retro,
    Pattern,
    Research,
}

impl KnowledgeSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            KnowledgeSource::Learning => "learning",
            KnowledgeSource::Retro => "retro",
            KnowledgeSource::Pattern => "pattern",
            KnowledgeSource::Research => "research",
        }
    }
}

impl fmt::Display for KnowledgeSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sub-directories of each `.agents` root scanned for prior knowledge.
const KNOWLEDGE_DIRS: [(&str, KnowledgeSource); 3] = [
    ("learnings", KnowledgeSource::Learning),
    ("retros", KnowledgeSource::Retro),
    ("patterns", KnowledgeSource::Pattern),
];

/// Prior artifact judged relevant to an epic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeInput {
    pub path: PathBuf,
    pub source_type: KnowledgeSource,
    pub relevance: String,
}

/// Searchable keywords of an epic id: `ol-r1-closure` → `["closure"]`.
///
/// Drops a leading prefix token of up to four characters, then any token of
/// two characters or fewer and any purely numeric token.
pub fn extract_keywords_from_epic(epic_id: &str) -> Vec<String> {
    let lower = epic_id.to_lowercase();
    let mut parts: Vec<&str> = lower.split('-').collect();
    if parts.first().is_some_and(|p| p.chars().count() <= 4) {
        parts.remove(0);
    }
    parts
        .into_iter()
        .filter(|p| p.chars().count() > 2 && !p.chars().all(|c| c.is_ascii_digit()))
        .map(str::to_string)
        .collect()
}

/// Find learnings, retros and patterns related to `epic_id` across the
/// project, rig and town `.agents` roots.
///
/// Filename matches are preferred over content matches. The result is
/// deduplicated by resolved path, keeping the first occurrence.
pub fn trace_knowledge_inputs(
    epic_id: &str,
    project_root: &Path,
    roots: &SearchRoots,
) -> Vec<KnowledgeInput> {
    let keywords = extract_keywords_from_epic(epic_id);
    if keywords.is_empty() {
        return Vec::new();
    }

    let mut inputs: Vec<KnowledgeInput> = Vec::new();
    for base in agents_levels(project_root, roots) {
        if !base.is_dir() {
            continue;
        }
        for (sub, source_type) in KNOWLEDGE_DIRS {
            let search = ArtifactSearch::new(vec![base.join(sub)], &MARKDOWN);
            for path in search.files() {
                if let Some(relevance) = check_relevance(&path, &keywords) {
                    inputs.push(KnowledgeInput {
                        path,
                        source_type,
                        relevance,
                    });
                }
            }
        }
    }

    let mut seen: HashSet<PathBuf> = HashSet::new();
    inputs.retain(|input| {
        let resolved = input
            .path
            .canonicalize()
            .unwrap_or_else(|_| input.path.clone());
        seen.insert(resolved)
    });
    tracing::debug!(epic_id, inputs = inputs.len(), "knowledge inputs");
    inputs
}

/// Describe why `path` is relevant to `keywords`, or `None` if it is not.
fn check_relevance(path: &Path, keywords: &[String]) -> Option<String> {
    let stem = lower_stem(path);
    let filename_matches: Vec<&str> = keywords
        .iter()
        .filter(|k| stem.contains(k.as_str()))
        .map(String::as_str)
        .collect();
    if !filename_matches.is_empty() {
        return Some(format!("Filename matches: {}", filename_matches.join(", ")));
    }

    let content = match std::fs::read_to_string(path) {
        Ok(c) => c.to_lowercase(),
        Err(err) => {
            tracing::debug!(path = %path.display(), %err, "skipping unreadable knowledge file");
            return None;
        }
    };
    let content_matches: Vec<&str> = keywords
        .iter()
        .filter(|k| content.contains(k.as_str()))
        .map(String::as_str)
        .collect();
    if content_matches.is_empty() {
        None
    } else {
        Some(format!("Content mentions: {}", content_matches.join(", ")))
    }
}
