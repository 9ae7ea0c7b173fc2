use retrace_transcript::{extract_epic_from_session, parse_transcript, SessionData};
use std::fmt::Write as _;
use std::path::Path;

pub fn execute(transcript: &Path, json: bool, extract_epic: bool) -> anyhow::Result<()> {
    let session = parse_transcript(transcript)?;

    if extract_epic {
        let epic = extract_epic_from_session(&session);
        if json {
            println!("{}", serde_json::json!({ "epic_id": epic }));
        } else {
            match epic {
                Some(epic) => println!("{epic}"),
                None => println!("No epic detected."),
            }
        }
        return Ok(());
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&session)?);
    } else {
        print!("{}", summarize(&session));
    }
    Ok(())
}

/// Human-readable summary of a parsed session.
pub(crate) fn summarize(session: &SessionData) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Session: {}", session.session_id);
    let _ = writeln!(out, "  beads operations: {}", session.beads_operations.len());
    for op in &session.beads_operations {
        let _ = writeln!(out, "    {} {}", op.operation, op.issue_id);
    }
    let _ = writeln!(out, "  epics: {}", join_or_none(session.epic_ids.iter()));
    let _ = writeln!(out, "  issues: {}", join_or_none(session.issue_ids.iter()));
    let _ = writeln!(out, "  file changes: {}", session.file_changes.len());
    let _ = writeln!(out, "  commits: {}", session.commits_made.len());
    let _ = writeln!(out, "  compaction markers: {}", session.compaction_markers.len());
    out
}

fn join_or_none<'a>(items: impl Iterator<Item = &'a String>) -> String {
    let joined: Vec<&str> = items.map(String::as_str).collect();
    if joined.is_empty() {
        "(none)".to_string()
    } else {
        joined.join(", ")
    }
}
