//! Markdown rendering of a provenance chain.

use crate::knowledge::{KnowledgeInput, KnowledgeSource};
use crate::provenance::ProvenanceChain;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::Path;

const MAX_COMMITS: usize = 5;
const MAX_DECISIONS: usize = 5;
const MAX_INPUTS_PER_KIND: usize = 3;
const MAX_COMMIT_LEN: usize = 80;

/// Render `chain` as a markdown report. Empty phases are omitted.
pub fn format_provenance_report(chain: &ProvenanceChain) -> String {
    let mut out = String::from("## Provenance Chain\n\n");

    let phases = [
        ("Research Phase", "Artifact", &chain.research_artifact),
        ("Product Phase", "Brief", &chain.product_brief),
        ("Pre-Mortem Phase", "Results", &chain.pre_mortem_results),
        ("Spec Phase", "Spec/Formula", &chain.spec_artifact),
        ("Plan Phase", "Plan", &chain.plan_artifact),
    ];
    for (title, label, path) in phases {
        if let Some(path) = path {
            let _ = writeln!(out, "### {title}");
            let _ = writeln!(out, "- **{label}:** `{}`\n", path.display());
        }
    }

    if !chain.implementation_commits.is_empty() {
        out.push_str("### Implementation Phase\n");
        let _ = writeln!(out, "- **Commits:** {}", chain.implementation_commits.len());
        for commit in chain.implementation_commits.iter().take(MAX_COMMITS) {
            let _ = writeln!(out, "  - `{}`", truncate(commit, MAX_COMMIT_LEN));
        }
        out.push('\n');
    }

    if !chain.decisions_made.is_empty() {
        out.push_str("### Key Decisions\n");
        for decision in chain.decisions_made.iter().take(MAX_DECISIONS) {
            let _ = writeln!(out, "- **[{}]** {}", decision.source, decision.content);
            if !decision.context.is_empty() {
                let _ = writeln!(out, "  - Context: {}", decision.context);
            }
        }
        out.push('\n');
    }

    if !chain.knowledge_inputs.is_empty() {
        out.push_str("### Knowledge Loop Inputs (Backward Trace)\n");
        out.push_str("*Prior knowledge that may have informed this work:*\n\n");
        let mut by_kind: BTreeMap<&str, (KnowledgeSource, Vec<&KnowledgeInput>)> =
            BTreeMap::new();
        for input in &chain.knowledge_inputs {
            by_kind
                .entry(input.source_type.as_str())
                .or_insert_with(|| (input.source_type, Vec::new()))
                .1
                .push(input);
        }
        for (kind, inputs) in by_kind.into_values() {
            let _ = writeln!(out, "**{}:**", kind_heading(kind));
            for input in inputs.iter().take(MAX_INPUTS_PER_KIND) {
                let _ = writeln!(
                    out,
                    "- `{}` - {}",
                    file_name(&input.path),
                    input.relevance
                );
            }
            if inputs.len() > MAX_INPUTS_PER_KIND {
                let _ = writeln!(out, "- ... and {} more", inputs.len() - MAX_INPUTS_PER_KIND);
            }
            out.push('\n');
        }
    }

    out
}

fn kind_heading(kind: KnowledgeSource) -> &'static str {
    match kind {
        KnowledgeSource::Learning => "Learnings",
        KnowledgeSource::Retro => "Retros",
        KnowledgeSource::Pattern => "Patterns",
        KnowledgeSource::Research => "Research",
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Cut to `max` characters, the last three replaced by `...`.
fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let end = s
        .char_indices()
        .nth(max.saturating_sub(3))
        .map_or(s.len(), |(i, _)| i);
    format!("{}...", &s[..end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision::{Decision, DecisionSource};
    use std::path::PathBuf;

    fn input(path: &str, source_type: KnowledgeSource) -> KnowledgeInput {
        KnowledgeInput {
            path: PathBuf::from(path),
            source_type,
            relevance: "Filename matches: retry".to_string(),
        }
    }

    fn section<'a>(report: &'a str, header: &str) -> &'a str {
        let start = report
            .find(header)
            .unwrap_or_else(|| panic!("missing {header}"));
        let rest = &report[start + header.len()..];
        let end = rest.find("\n### ").map(|i| i + 1).unwrap_or(rest.len());
        &rest[..end]
    }

    #[test]
    fn every_field_under_its_header() {
        let chain = ProvenanceChain {
            epic_id: "ol-retry".to_string(),
            research_artifact: Some(PathBuf::from("/p/.agents/research/r.md")),
            product_brief: Some(PathBuf::from("/p/.agents/products/b.md")),
            pre_mortem_results: Some(PathBuf::from("/h/plans/x-agent-1.md")),
            spec_artifact: Some(PathBuf::from("/p/.formula.toml")),
            plan_artifact: Some(PathBuf::from("/h/plans/x.md")),
            implementation_commits: vec![r#"git commit -m "add retry""#.to_string()],
            decisions_made: vec![Decision {
                content: "decided to use caching".to_string(),
                source: DecisionSource::CommitMessage,
                timestamp: None,
                context: "git commit".to_string(),
            }],
            knowledge_inputs: vec![input(
                "/p/.agents/learnings/retry.md",
                KnowledgeSource::Learning,
            )],
        };
        let report = format_provenance_report(&chain);
        assert!(report.starts_with("## Provenance Chain\n"));

        let expected = [
            ("### Research Phase", "- **Artifact:** `/p/.agents/research/r.md`"),
            ("### Product Phase", "- **Brief:** `/p/.agents/products/b.md`"),
            ("### Pre-Mortem Phase", "- **Results:** `/h/plans/x-agent-1.md`"),
            ("### Spec Phase", "- **Spec/Formula:** `/p/.formula.toml`"),
            ("### Plan Phase", "- **Plan:** `/h/plans/x.md`"),
        ];
        for (header, line) in expected {
            assert!(section(&report, header).contains(line), "{header}");
        }

        let implementation = section(&report, "### Implementation Phase");
        assert!(implementation.contains("- **Commits:** 1"));
        assert!(implementation.contains(r#"  - `git commit -m "add retry"`"#));

        let decisions = section(&report, "### Key Decisions");
        assert!(decisions.contains("- **[commit_message]** decided to use caching"));
        assert!(decisions.contains("  - Context: git commit"));

        let knowledge = section(&report, "### Knowledge Loop Inputs (Backward Trace)");
        assert!(knowledge.contains("**Learnings:**"));
        assert!(knowledge.contains("- `retry.md` - Filename matches: retry"));
    }

    #[test]
    fn empty_chain_has_only_title() {
        let report = format_provenance_report(&ProvenanceChain::new("ol-x"));
        assert_eq!(report, "## Provenance Chain\n\n");
    }

    #[test]
    fn long_commits_truncated_and_capped() {
        let long = format!("git commit -m \"{}\"", "é".repeat(90));
        let mut chain = ProvenanceChain::new("ol-x");
        chain.implementation_commits = vec![long; 7];
        let report = format_provenance_report(&chain);
        assert!(report.contains("- **Commits:** 7"));
        let listed: Vec<&str> = report.lines().filter(|l| l.starts_with("  - `")).collect();
        assert_eq!(listed.len(), 5);
        assert!(listed.iter().all(|l| l.ends_with("...`")));
    }

    #[test]
    fn knowledge_grouped_sorted_and_capped() {
        let mut chain = ProvenanceChain::new("ol-retry");
        for i in 0..5 {
            chain
                .knowledge_inputs
                .push(input(&format!("/k/retry-{i}.md"), KnowledgeSource::Retro));
        }
        chain
            .knowledge_inputs
            .push(input("/k/p.md", KnowledgeSource::Pattern));
        chain
            .knowledge_inputs
            .push(input("/k/l.md", KnowledgeSource::Learning));

        let report = format_provenance_report(&chain);
        let learnings = report.find("**Learnings:**").unwrap();
        let patterns = report.find("**Patterns:**").unwrap();
        let retros = report.find("**Retros:**").unwrap();
        assert!(learnings < patterns && patterns < retros);
        assert!(report.contains("- `retry-2.md`"));
        assert!(!report.contains("- `retry-3.md`"));
        assert!(report.contains("- ... and 2 more"));
    }

    #[test]
    fn truncate_counts_chars() {
        let s = "é".repeat(81);
        let cut = truncate(&s, 80);
        assert_eq!(cut.chars().count(), 80);
        assert!(cut.ends_with("é..."));
        assert_eq!(truncate("short", 80), "short");
    }
}
