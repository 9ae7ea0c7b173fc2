use crate::error::TranscriptError;
use crate::record::{Content, LogEntry, RecordKind};
use crate::session::{BeadsOp, CompactionMarker, SessionData};
use regex::Regex;
use serde_json::Value;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::LazyLock;

/// Markers checked on every transcript line. Must stay lower-case.
pub const LINE_COMPACTION_MARKERS: [&str; 3] = [
    "session is being continued",
    "summary below covers",
    "context has been compacted",
];

/// `prefix-suffix` with optional child suffixes (`ol-abc`, `ol-abc.2`).
const ISSUE_ID_SHAPE: &str = r"[a-z]{2,4}-[a-z0-9]{3,6}(?:\.\d+)*";

static ISSUE_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!(r"(?i)\b({ISSUE_ID_SHAPE})\b")).unwrap());

static BD_SUBCOMMANDS: LazyLock<Vec<(BeadsOp, Regex)>> = LazyLock::new(|| {
    BeadsOp::ALL
        .iter()
        .map(|op| {
            // No trailing boundary: an over-long id still yields its leading match.
            let pattern = format!(r"(?i)\bbd\s+{}\s+({ISSUE_ID_SHAPE})", op.as_str());
            (*op, Regex::new(&pattern).unwrap())
        })
        .collect()
});

/// Parse a Claude Code JSONL transcript into [`SessionData`].
///
/// Each line is decoded on its own: blank lines and lines that are not valid
/// JSON are skipped. Only a file that cannot be opened is an error.
pub fn parse_transcript(path: &Path) -> Result<SessionData, TranscriptError> {
    let file = File::open(path).map_err(|source| TranscriptError::Open {
        path: path.to_path_buf(),
        source,
    })?;

    let mut session = empty_session_for(path);

    let mut reader = BufReader::new(file);
    let mut buf: Vec<u8> = Vec::new();
    let mut line_num = 0usize;
    let mut skipped = 0usize;

    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) => break,
            Ok(_) => {}
            Err(err) => {
                tracing::warn!(path = %path.display(), line = line_num + 1, %err, "transcript read stopped early");
                break;
            }
        }
        line_num += 1;

        let raw = buf.trim_ascii();
        if raw.is_empty() {
            continue;
        }
        let entry: Value = match serde_json::from_slice(raw) {
            Ok(v) => v,
            Err(err) => {
                skipped += 1;
                tracing::debug!(line = line_num, %err, "skipping malformed record");
                continue;
            }
        };

        process_entry(&entry, &mut session, path, line_num);
    }

    tracing::debug!(
        path = %path.display(),
        lines = line_num,
        skipped,
        operations = session.beads_operations.len(),
        "parsed transcript"
    );
    Ok(session)
}

/// Session identity of a transcript: its file stem and parent directory.
pub(crate) fn empty_session_for(path: &Path) -> SessionData {
    let session_id = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let project_path = path
        .parent()
        .map(|p| p.display().to_string())
        .unwrap_or_default();
    SessionData::new(session_id, project_path)
}

fn process_entry(entry: &Value, session: &mut SessionData, source: &Path, line: usize) {
    let record = LogEntry::from_value(entry);

    if record.content().contains_any(&LINE_COMPACTION_MARKERS) {
        session.compaction_markers.push(CompactionMarker {
            source: source.to_path_buf(),
            line,
        });
        return;
    }

    match record.kind {
        RecordKind::Assistant => {
            for tool in record.tool_uses() {
                match tool.name {
                    "Bash" => {
                        let command = tool.input_str("command").unwrap_or("");
                        process_bash_command(command, session, record.timestamp);
                    }
                    "Write" | "Edit" => {
                        if let Some(fp) = tool.input_str("file_path").filter(|fp| !fp.is_empty()) {
                            session.file_changes.push(fp.to_string());
                        }
                    }
                    _ => {}
                }
            }
        }
        RecordKind::User => {
            if let Content::Text(text) = record.content() {
                extract_issue_ids(text, session);
            }
        }
        RecordKind::Other => {}
    }
}

/// Extract beads operations, commits and issue ids from one shell command.
pub fn process_bash_command(command: &str, session: &mut SessionData, timestamp: &str) {
    for (op, pattern) in BD_SUBCOMMANDS.iter() {
        if let Some(caps) = pattern.captures(command) {
            session.push_operation(*op, &caps[1], command, timestamp);
        }
    }

    if command.contains("git commit") {
        session.commits_made.push(command.to_string());
    }

    extract_issue_ids(command, session);
}

/// Register every issue-id-shaped token in `text`.
pub fn extract_issue_ids(text: &str, session: &mut SessionData) {
    for caps in ISSUE_ID.captures_iter(text) {
        session.register_issue(&caps[1]);
    }
}
