#[derive(Debug, thiserror::Error)]
pub enum TraceError {
    #[error("invalid epic id {0:?}: expected a non-empty issue identifier without whitespace or path separators")]
    InvalidEpicId(String),
    #[error("project path must not be empty")]
    InvalidProjectPath,
}
