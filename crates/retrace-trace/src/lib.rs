mod artifacts;
mod decision;
mod error;
mod knowledge;
mod provenance;
mod render;
mod search;

pub use artifacts::{
    find_plan_artifact, find_pre_mortem, find_product_brief, find_research_for_epic,
    find_spec_artifact,
};
pub use decision::{extract_decisions_from_session, Decision, DecisionSource};
pub use error::TraceError;
pub use knowledge::{
    extract_keywords_from_epic, trace_knowledge_inputs, KnowledgeInput, KnowledgeSource,
};
pub use provenance::{infer_project_path, trace_epic_provenance, validate_epic_id, ProvenanceChain};
pub use render::format_provenance_report;
pub use search::{agents_levels, ArtifactSearch, Candidate};
