//! Compaction chains: one logical session split across several transcripts.
//!
//! When Claude Code compacts its context it starts a new transcript file
//! seeded with a summary. Continuation files share the session slug of the
//! file they continue, which is how chains are discovered here.

use crate::parse::{empty_session_for, parse_transcript, LINE_COMPACTION_MARKERS};
use crate::record::{Content, LogEntry};
use crate::session::{BeadsOp, CompactionMarker, SessionData};
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

/// Markers for the standalone boundary check. Superset of
/// [`LINE_COMPACTION_MARKERS`]; must stay lower-case.
pub const CHAIN_COMPACTION_MARKERS: [&str; 5] = [
    LINE_COMPACTION_MARKERS[0],
    LINE_COMPACTION_MARKERS[1],
    LINE_COMPACTION_MARKERS[2],
    "continuing from previous context",
    "this is a continuation",
];

/// Non-blank lines read from the top of a transcript when looking for a slug.
pub const SLUG_SCAN_LINES: usize = 10;

/// Transcript files of one logical session, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CompactionChain {
    pub files: Vec<PathBuf>,
    pub compaction_points: Vec<CompactionMarker>,
    pub total_lines: usize,
}

impl CompactionChain {
    /// Discover the chain around `anchor` and scan every member for
    /// compaction boundaries.
    pub fn discover(anchor: &Path) -> Self {
        Self::from_files(find_compaction_chain(anchor))
    }

    pub fn from_files(files: Vec<PathBuf>) -> Self {
        let mut chain = CompactionChain {
            files,
            ..Default::default()
        };
        for path in &chain.files {
            let file = match File::open(path) {
                Ok(f) => f,
                Err(err) => {
                    tracing::warn!(path = %path.display(), %err, "skipping unreadable chain member");
                    continue;
                }
            };
            for (idx, line) in BufReader::new(file).split(b'\n').enumerate() {
                let Ok(line) = line else { break };
                chain.total_lines += 1;
                let Ok(record) = serde_json::from_slice::<Value>(line.trim_ascii()) else {
                    continue;
                };
                if let Some(message) = record.get("message") {
                    if is_compaction_boundary(message) {
                        chain.compaction_points.push(CompactionMarker {
                            source: path.clone(),
                            line: idx + 1,
                        });
                    }
                }
            }
        }
        chain
    }

    pub fn is_split(&self) -> bool {
        self.files.len() > 1
    }
}

/// Read the session slug from the first few records of a transcript.
pub fn extract_session_slug(path: &Path) -> Option<String> {
    let file = File::open(path).ok()?;
    BufReader::new(file)
        .split(b'\n')
        .map_while(Result::ok)
        .filter(|line| !line.trim_ascii().is_empty())
        .take(SLUG_SCAN_LINES)
        .find_map(|line| {
            let record: Value = serde_json::from_slice(line.trim_ascii()).ok()?;
            let entry = LogEntry::from_value(&record);
            entry.slug.map(str::to_string)
        })
}

/// Find every transcript in the anchor's compaction chain, oldest first.
///
/// The anchor is always part of the chain. Other `*.jsonl` files in the same
/// directory join it when they carry the same slug. A missing anchor yields
/// an empty chain.
pub fn find_compaction_chain(anchor: &Path) -> Vec<PathBuf> {
    if !anchor.is_file() {
        return Vec::new();
    }
    let mut chain = vec![anchor.to_path_buf()];

    if let Some(slug) = extract_session_slug(anchor) {
        let dir = match anchor.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        for other in retrace_store::list_files(dir, &retrace_store::jsonl_matcher()) {
            if other.file_name() == anchor.file_name() {
                continue;
            }
            if extract_session_slug(&other).as_deref() == Some(slug.as_str()) {
                chain.push(other);
            }
        }
    }

    sort_oldest_first(&mut chain);
    tracing::info!(anchor = %anchor.display(), files = chain.len(), "compaction chain");
    chain
}

fn sort_oldest_first(files: &mut [PathBuf]) {
    files.sort_by(|a, b| {
        retrace_store::modified_time(a)
            .cmp(&retrace_store::modified_time(b))
            .then_with(|| a.cmp(b))
    });
}

/// Merge every transcript of a chain into one composite session.
///
/// Beads operations are deduplicated on `(issue_id, operation, command)`
/// keeping the first; id sets are unioned; file changes, commits and
/// compaction markers are concatenated in chain order.
pub fn build_composite_session(chain: &[PathBuf]) -> SessionData {
    let Some(first) = chain.first() else {
        return SessionData::default();
    };
    let mut composite = empty_session_for(first);
    let mut seen: HashSet<(String, BeadsOp, String)> = HashSet::new();

    for path in chain {
        let session = match parse_transcript(path) {
            Ok(s) => s,
            Err(err) => {
                tracing::warn!(path = %path.display(), %err, "chain member contributes nothing");
                continue;
            }
        };
        for op in session.beads_operations {
            if seen.insert((op.issue_id.clone(), op.operation, op.command.clone())) {
                composite.beads_operations.push(op);
            }
        }
        composite.epic_ids.extend(session.epic_ids);
        composite.issue_ids.extend(session.issue_ids);
        composite.file_changes.extend(session.file_changes);
        composite.commits_made.extend(session.commits_made);
        composite.compaction_markers.extend(session.compaction_markers);
    }

    composite
}

/// Classify an arbitrary message object as a compaction summary, using the
/// full marker list.
pub fn is_compaction_boundary(message: &Value) -> bool {
    Content::of_message(Some(message)).contains_any(&CHAIN_COMPACTION_MARKERS)
}

/// Group every transcript in `log_dir` by slug, each group oldest first.
/// Transcripts without a slug are left out.
pub fn find_all_project_sessions(log_dir: &Path) -> BTreeMap<String, Vec<PathBuf>> {
    let mut chains: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();
    for transcript in retrace_store::list_files(log_dir, &retrace_store::jsonl_matcher()) {
        if let Some(slug) = extract_session_slug(&transcript) {
            chains.entry(slug).or_default().push(transcript);
        }
    }
    for files in chains.values_mut() {
        sort_oldest_first(files);
    }
    chains
}
