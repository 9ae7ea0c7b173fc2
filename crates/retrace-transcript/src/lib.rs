mod compaction;
mod error;
mod parse;
mod record;
mod session;

pub use compaction::{
    build_composite_session, extract_session_slug, find_all_project_sessions,
    find_compaction_chain, is_compaction_boundary, CompactionChain, CHAIN_COMPACTION_MARKERS,
    SLUG_SCAN_LINES,
};
pub use error::TranscriptError;
pub use parse::{
    extract_issue_ids, parse_transcript, process_bash_command, LINE_COMPACTION_MARKERS,
};
pub use record::{classify_record, Content, LogEntry, RecordKind, ToolUse};
pub use session::{extract_epic_from_session, BeadsOp, BeadsOperation, CompactionMarker, SessionData};
