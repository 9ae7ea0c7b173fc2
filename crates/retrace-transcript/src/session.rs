use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;
use std::sync::LazyLock;

/// A child id such as `ol-abc.2`; group 1 is the parent (epic) id.
static EPIC_CHILD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^([a-z]{2,4}-[a-z0-9]{3,6})\.\d+").unwrap());

// ── Beads operations ──

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BeadsOp {
    Update,
    Close,
    Show,
}

impl BeadsOp {
    pub const ALL: [BeadsOp; 3] = [BeadsOp::Update, BeadsOp::Close, BeadsOp::Show];

    pub fn as_str(&self) -> &'static str {
        match self {
            BeadsOp::Update => "update",
            BeadsOp::Close => "close",
            BeadsOp::Show => "show",
        }
    }

    /// Weight of this operation when scoring epics. Closes are the strongest
    /// signal of work actually done.
    pub fn weight(&self) -> u32 {
        match self {
            BeadsOp::Close => 3,
            BeadsOp::Update => 2,
            BeadsOp::Show => 1,
        }
    }
}

impl fmt::Display for BeadsOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One `bd update|close|show` invocation seen in an assistant turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeadsOperation {
    pub command: String,
    pub issue_id: String,
    pub operation: BeadsOp,
    pub timestamp: String,
}

impl BeadsOperation {
    /// True if this operation targets `epic_id` itself or one of its children.
    pub fn belongs_to(&self, epic_id: &str) -> bool {
        self.issue_id == epic_id
            || self
                .issue_id
                .strip_prefix(epic_id)
                .is_some_and(|rest| rest.starts_with('.'))
    }
}

// ── Session data ──

/// Position of a compaction boundary: 1-based line within `source`.
///
/// Line numbers are per file. Markers merged from a chain keep their own
/// source; there is no global line space.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompactionMarker {
    pub source: PathBuf,
    pub line: usize,
}

/// Structured facts parsed from one transcript, or merged from a chain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionData {
    pub session_id: String,
    pub project_path: String,
    #[serde(default)]
    pub beads_operations: Vec<BeadsOperation>,
    #[serde(default)]
    pub epic_ids: BTreeSet<String>,
    #[serde(default)]
    pub issue_ids: BTreeSet<String>,
    /// Written or edited paths. Repeats are kept: churn is a signal.
    #[serde(default)]
    pub file_changes: Vec<String>,
    #[serde(default)]
    pub commits_made: Vec<String>,
    #[serde(default)]
    pub compaction_markers: Vec<CompactionMarker>,
}

impl SessionData {
    pub fn new(session_id: impl Into<String>, project_path: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            project_path: project_path.into(),
            ..Default::default()
        }
    }

    /// Register an issue id and apply epic detection in both directions:
    /// a child `base.N` marks `base` as an epic, and a bare id is an epic as
    /// soon as any known id extends it with a dot-suffix.
    pub fn register_issue(&mut self, issue_id: &str) {
        let issue_id = issue_id.to_lowercase();
        self.issue_ids.insert(issue_id.clone());

        let base = issue_id.split('.').next().unwrap_or(&issue_id).to_string();
        let child_prefix = format!("{base}.");
        let has_child = self
            .issue_ids
            .range(child_prefix.clone()..)
            .next()
            .is_some_and(|existing| existing.starts_with(&child_prefix));
        if has_child {
            self.epic_ids.insert(base);
            return;
        }

        if let Some(caps) = EPIC_CHILD.captures(&issue_id) {
            self.epic_ids.insert(caps[1].to_lowercase());
        }
    }

    pub fn push_operation(
        &mut self,
        operation: BeadsOp,
        issue_id: &str,
        command: &str,
        timestamp: &str,
    ) {
        let issue_id = issue_id.to_lowercase();
        self.beads_operations.push(BeadsOperation {
            command: command.to_string(),
            issue_id: issue_id.clone(),
            operation,
            timestamp: timestamp.to_string(),
        });
        self.register_issue(&issue_id);
    }
}

// ── Epic selection ──

/// Determine which epic this session worked on.
///
/// Epics are scored by the weighted operations on themselves and their
/// children. Without any epic, the issue with the most operations wins.
/// Equal scores resolve to the lexicographically smallest id.
pub fn extract_epic_from_session(session: &SessionData) -> Option<String> {
    if !session.epic_ids.is_empty() {
        return best_scoring(&session.epic_ids, |epic| {
            session
                .beads_operations
                .iter()
                .filter(|op| op.belongs_to(epic))
                .map(|op| op.operation.weight())
                .sum()
        });
    }

    best_scoring(&session.issue_ids, |issue| {
        session
            .beads_operations
            .iter()
            .filter(|op| op.issue_id == issue)
            .count() as u32
    })
}

fn best_scoring(candidates: &BTreeSet<String>, score: impl Fn(&str) -> u32) -> Option<String> {
    let mut best: Option<(&String, u32)> = None;
    for candidate in candidates {
        let s = score(candidate.as_str());
        if best.map_or(true, |(_, top)| s > top) {
            best = Some((candidate, s));
        }
    }
    best.map(|(id, _)| id.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn op(operation: BeadsOp, issue_id: &str) -> BeadsOperation {
        BeadsOperation {
            command: format!("bd {operation} {issue_id}"),
            issue_id: issue_id.to_string(),
            operation,
            timestamp: String::new(),
        }
    }

    #[test]
    fn parent_then_child_marks_epic() {
        let mut s = SessionData::default();
        s.register_issue("ol-r1");
        assert!(s.epic_ids.is_empty());
        s.register_issue("ol-r1.2");
        assert!(s.epic_ids.contains("ol-r1"));
    }

    #[test]
    fn child_then_parent_marks_epic() {
        let mut s = SessionData::default();
        s.register_issue("ol-r1.2");
        s.register_issue("ol-r1");
        assert!(s.epic_ids.contains("ol-r1"));
        assert_eq!(s.epic_ids.len(), 1);
    }

    #[test]
    fn sibling_prefix_is_not_child() {
        let mut s = SessionData::default();
        s.register_issue("ol-abc");
        s.register_issue("ol-abcd");
        s.register_issue("ol-abc-x");
        assert!(s.epic_ids.is_empty());
    }

    #[test]
    fn child_registers_parent_even_if_parent_unseen() {
        let mut s = SessionData::default();
        s.register_issue("AG-XYZ9.3");
        assert!(s.issue_ids.contains("ag-xyz9.3"));
        assert!(s.epic_ids.contains("ag-xyz9"));
        assert!(!s.issue_ids.contains("ag-xyz9"));
    }

    #[test]
    fn belongs_to_matches_self_and_children_only() {
        assert!(op(BeadsOp::Close, "ol-r1").belongs_to("ol-r1"));
        assert!(op(BeadsOp::Close, "ol-r1.4").belongs_to("ol-r1"));
        assert!(!op(BeadsOp::Close, "ol-r12").belongs_to("ol-r1"));
    }

    #[test]
    fn epic_scoring_prefers_weighted_operations() {
        let mut s = SessionData::default();
        s.epic_ids = ["ol-r1", "ol-r2"].iter().map(|s| s.to_string()).collect();
        s.beads_operations = vec![
            op(BeadsOp::Close, "ol-r1"),
            op(BeadsOp::Update, "ol-r1"),
            op(BeadsOp::Show, "ol-r2"),
        ];
        assert_eq!(extract_epic_from_session(&s).as_deref(), Some("ol-r1"));
    }

    #[test]
    fn epic_scoring_counts_children() {
        let mut s = SessionData::default();
        s.epic_ids = ["ol-aaa", "ol-bbb"].iter().map(|s| s.to_string()).collect();
        s.beads_operations = vec![
            op(BeadsOp::Show, "ol-aaa"),
            op(BeadsOp::Close, "ol-bbb.1"),
        ];
        assert_eq!(extract_epic_from_session(&s).as_deref(), Some("ol-bbb"));
    }

    #[test]
    fn epic_ties_pick_smallest_id() {
        let mut s = SessionData::default();
        s.epic_ids = ["ol-zzz", "ol-aaa", "ol-mmm"].iter().map(|s| s.to_string()).collect();
        assert_eq!(extract_epic_from_session(&s).as_deref(), Some("ol-aaa"));
    }

    #[test]
    fn issue_fallback_counts_operations() {
        let mut s = SessionData::default();
        s.issue_ids = ["ag-aaa", "ag-bbb"].iter().map(|s| s.to_string()).collect();
        s.beads_operations = vec![op(BeadsOp::Show, "ag-bbb"), op(BeadsOp::Show, "ag-bbb")];
        assert_eq!(extract_epic_from_session(&s).as_deref(), Some("ag-bbb"));
    }

    #[test]
    fn empty_session_has_no_epic() {
        assert!(extract_epic_from_session(&SessionData::default()).is_none());
    }

    #[test]
    fn push_operation_lowercases_and_registers() {
        let mut s = SessionData::default();
        s.push_operation(BeadsOp::Close, "OL-ABC.1", "bd close OL-ABC.1", "t");
        assert_eq!(s.beads_operations[0].issue_id, "ol-abc.1");
        assert!(s.issue_ids.contains("ol-abc.1"));
        assert!(s.epic_ids.contains("ol-abc"));
    }
}
