//! Provenance chain assembly for one epic.

use crate::artifacts::{
    find_plan_artifact, find_pre_mortem, find_product_brief, find_research_for_epic,
    find_spec_artifact,
};
use crate::decision::{extract_decisions_from_session, Decision};
use crate::error::TraceError;
use crate::knowledge::{trace_knowledge_inputs, KnowledgeInput};
use retrace_store::SearchRoots;
use retrace_transcript::SessionData;
use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};

/// Everything traced back from an epic: the artifacts that led to it, the
/// work done in the session and the prior knowledge it may have drawn on.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProvenanceChain {
    pub epic_id: String,
    pub research_artifact: Option<PathBuf>,
    pub product_brief: Option<PathBuf>,
    pub pre_mortem_results: Option<PathBuf>,
    pub spec_artifact: Option<PathBuf>,
    pub plan_artifact: Option<PathBuf>,
    #[serde(default)]
    pub implementation_commits: Vec<String>,
    #[serde(default)]
    pub decisions_made: Vec<Decision>,
    #[serde(default)]
    pub knowledge_inputs: Vec<KnowledgeInput>,
}

impl ProvenanceChain {
    pub fn new(epic_id: impl Into<String>) -> Self {
        Self {
            epic_id: epic_id.into(),
            ..Default::default()
        }
    }
}

/// Reject epic ids that cannot name an issue: empty, containing whitespace,
/// or containing a path separator.
pub fn validate_epic_id(epic_id: &str) -> Result<(), TraceError> {
    let bad = epic_id.is_empty()
        || epic_id.chars().any(char::is_whitespace)
        || epic_id.contains('/')
        || epic_id.contains('\\');
    if bad {
        return Err(TraceError::InvalidEpicId(epic_id.to_string()));
    }
    Ok(())
}

/// Deepest directory containing every file the session changed.
///
/// `None` when nothing was changed or the only common ancestor is the
/// filesystem root.
pub fn infer_project_path(session: &SessionData) -> Option<PathBuf> {
    let mut parents = session
        .file_changes
        .iter()
        .map(|f| Path::new(f).parent().unwrap_or(Path::new("")));
    let first = parents.next()?;
    let mut common: Vec<Component<'_>> = first.components().collect();
    for parent in parents {
        let shared = common
            .iter()
            .zip(parent.components())
            .take_while(|(a, b)| *a == b)
            .count();
        common.truncate(shared);
    }

    let path: PathBuf = common.into_iter().collect();
    let is_root = path.parent().is_none();
    if path.as_os_str().is_empty() || is_root {
        return None;
    }
    Some(path)
}

/// Trace the provenance of `epic_id`.
///
/// Without a project path (given or inferred from the session's file
/// changes) only the session-derived fields are filled in.
pub fn trace_epic_provenance(
    epic_id: &str,
    session: &SessionData,
    project_path: Option<&Path>,
    roots: &SearchRoots,
) -> Result<ProvenanceChain, TraceError> {
    validate_epic_id(epic_id)?;
    if project_path.is_some_and(|p| p.as_os_str().is_empty()) {
        return Err(TraceError::InvalidProjectPath);
    }
    let project = project_path
        .map(Path::to_path_buf)
        .or_else(|| infer_project_path(session));

    let mut chain = ProvenanceChain::new(epic_id);
    if let Some(project) = &project {
        chain.research_artifact = find_research_for_epic(epic_id, project, roots);
        chain.product_brief = find_product_brief(epic_id, project, roots);
        chain.pre_mortem_results = find_pre_mortem(epic_id, roots);
        chain.spec_artifact = find_spec_artifact(epic_id, project);
        chain.plan_artifact = find_plan_artifact(epic_id, roots);
        chain.knowledge_inputs = trace_knowledge_inputs(epic_id, project, roots);
    } else {
        tracing::debug!(epic_id, "no project path, skipping artifact search");
    }
    chain.implementation_commits = session.commits_made.clone();
    chain.decisions_made = extract_decisions_from_session(session);

    tracing::info!(
        epic_id,
        project = ?project,
        commits = chain.implementation_commits.len(),
        decisions = chain.decisions_made.len(),
        knowledge = chain.knowledge_inputs.len(),
        "traced provenance"
    );
    Ok(chain)
}
