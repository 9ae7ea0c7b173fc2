//! Decisions recorded during a session: beads comments and commit messages.

use regex::Regex;
use retrace_transcript::SessionData;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

/// Quoted `-m "..."` / `-m '...'` argument.
static QUOTED_MESSAGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"-m\s+["']([^"']+)["']"#).unwrap());

/// Words that mark a commit message as recording a decision.
const DECISION_WORDS: [&str; 4] = ["decide", "chose", "selected", "opt"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionSource {
    BeadsComment,
    CommitMessage,
    AskUserQuestion,
    Explicit,
}

impl DecisionSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            DecisionSource::BeadsComment => "beads_comment",
            DecisionSource::CommitMessage => "commit_message",
            DecisionSource::AskUserQuestion => "ask_user_question",
            DecisionSource::Explicit => "explicit",
        }
    }
}

impl fmt::Display for DecisionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    pub content: String,
    pub source: DecisionSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub context: String,
}

/// Extract decisions from a session's beads comments and commit messages.
pub fn extract_decisions_from_session(session: &SessionData) -> Vec<Decision> {
    let mut decisions = Vec::new();

    for op in &session.beads_operations {
        if !op.command.to_lowercase().contains("comment") {
            continue;
        }
        if let Some(content) = quoted_message(&op.command) {
            decisions.push(Decision {
                content,
                source: DecisionSource::BeadsComment,
                timestamp: Some(op.timestamp.clone()).filter(|t| !t.is_empty()),
                context: format!("Issue: {}", op.issue_id),
            });
        }
    }

    for commit in &session.commits_made {
        let Some(message) = quoted_message(commit) else {
            continue;
        };
        let lower = message.to_lowercase();
        if DECISION_WORDS.iter().any(|w| lower.contains(w)) {
            decisions.push(Decision {
                content: message,
                source: DecisionSource::CommitMessage,
                timestamp: None,
                context: "git commit".to_string(),
            });
        }
    }

    decisions
}

fn quoted_message(command: &str) -> Option<String> {
    QUOTED_MESSAGE
        .captures(command)
        .map(|caps| caps[1].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use retrace_transcript::{BeadsOp, BeadsOperation};

    fn session_with(ops: Vec<BeadsOperation>, commits: &[&str]) -> SessionData {
        SessionData {
            beads_operations: ops,
            commits_made: commits.iter().map(|c| c.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn commit_with_decision_word() {
        let s = session_with(vec![], &[r#"git commit -m "decided to use caching for retries""#]);
        let decisions = extract_decisions_from_session(&s);
        assert_eq!(
            decisions,
            vec![Decision {
                content: "decided to use caching for retries".to_string(),
                source: DecisionSource::CommitMessage,
                timestamp: None,
                context: "git commit".to_string(),
            }]
        );
    }

    #[test]
    fn commit_without_decision_word_is_ignored() {
        let s = session_with(
            vec![],
            &[r#"git commit -m "fix typo""#, "git commit --amend --no-edit"],
        );
        assert!(extract_decisions_from_session(&s).is_empty());
    }

    #[test]
    fn single_quoted_commit_message() {
        let s = session_with(vec![], &["git commit -m 'Chose sqlite over files'"]);
        let decisions = extract_decisions_from_session(&s);
        assert_eq!(decisions.len(), 1);
        assert_eq!(decisions[0].content, "Chose sqlite over files");
    }

    #[test]
    fn beads_comment_decision() {
        let op = BeadsOperation {
            command: r#"bd update ol-abc --comment -m "keep the old parser""#.to_string(),
            issue_id: "ol-abc".to_string(),
            operation: BeadsOp::Update,
            timestamp: "2026-01-05T10:00:00Z".to_string(),
        };
        let s = session_with(vec![op], &[]);
        let decisions = extract_decisions_from_session(&s);
        assert_eq!(decisions.len(), 1);
        assert_eq!(decisions[0].source, DecisionSource::BeadsComment);
        assert_eq!(decisions[0].content, "keep the old parser");
        assert_eq!(decisions[0].context, "Issue: ol-abc");
        assert_eq!(decisions[0].timestamp.as_deref(), Some("2026-01-05T10:00:00Z"));
    }

    #[test]
    fn beads_operation_without_comment_is_ignored() {
        let op = BeadsOperation {
            command: r#"bd update ol-abc -m "note""#.to_string(),
            issue_id: "ol-abc".to_string(),
            operation: BeadsOp::Update,
            timestamp: String::new(),
        };
        assert!(extract_decisions_from_session(&session_with(vec![op], &[])).is_empty());
    }

    #[test]
    fn source_serializes_snake_case() {
        let json = serde_json::to_string(&DecisionSource::AskUserQuestion).unwrap();
        assert_eq!(json, "\"ask_user_question\"");
    }
}
