use retrace_transcript::{build_composite_session, CompactionChain};
use std::fmt::Write as _;
use std::path::Path;

pub fn execute(transcript: &Path, composite: bool, json: bool) -> anyhow::Result<()> {
    if !transcript.is_file() {
        anyhow::bail!("Transcript not found: {}", transcript.display());
    }
    let chain = CompactionChain::discover(transcript);

    if composite {
        let session = build_composite_session(&chain.files);
        if json {
            println!("{}", serde_json::to_string_pretty(&session)?);
        } else {
            println!("Chain of {} file(s)", chain.files.len());
            print!("{}", crate::cmd_parse::summarize(&session));
        }
        return Ok(());
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&chain)?);
    } else {
        print!("{}", describe(&chain));
    }
    Ok(())
}

fn describe(chain: &CompactionChain) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Chain: {} file(s), {} line(s){}",
        chain.files.len(),
        chain.total_lines,
        if chain.is_split() { ", split by compaction" } else { "" }
    );
    for (i, file) in chain.files.iter().enumerate() {
        let _ = writeln!(out, "  {}. {}", i + 1, file.display());
        for point in chain.compaction_points.iter().filter(|p| &p.source == file) {
            let _ = writeln!(out, "     compacted at line {}", point.line);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use retrace_transcript::CompactionMarker;
    use std::path::PathBuf;

    #[test]
    fn describe_lists_files_and_boundaries() {
        let a = PathBuf::from("/logs/a.jsonl");
        let b = PathBuf::from("/logs/b.jsonl");
        let chain = CompactionChain {
            files: vec![a.clone(), b.clone()],
            compaction_points: vec![CompactionMarker { source: b, line: 1 }],
            total_lines: 12,
        };
        let text = describe(&chain);
        assert!(text.starts_with("Chain: 2 file(s), 12 line(s), split by compaction\n"));
        assert!(text.contains("  1. /logs/a.jsonl\n  2. /logs/b.jsonl\n     compacted at line 1\n"));
    }

    #[test]
    fn missing_transcript_is_an_error() {
        let err = execute(Path::new("/nonexistent/t.jsonl"), false, false).unwrap_err();
        assert!(err.to_string().contains("Transcript not found"));
    }
}
