use retrace_store::SearchRoots;
use retrace_trace::{format_provenance_report, trace_epic_provenance, ProvenanceChain};
use retrace_transcript::{
    build_composite_session, extract_epic_from_session, find_compaction_chain, parse_transcript,
    SessionData,
};
use std::path::Path;

pub struct TraceCliParams<'a> {
    pub epic: Option<&'a str>,
    pub transcript: Option<&'a Path>,
    pub project: Option<&'a Path>,
    pub no_chain: bool,
    pub json: bool,
    pub output: Option<&'a Path>,
}

pub fn execute(params: &TraceCliParams<'_>) -> anyhow::Result<()> {
    let chain = run(params, &SearchRoots::from_env())?;
    let rendered = render(&chain, params.json)?;

    match params.output {
        Some(path) => {
            retrace_store::write_atomic(path, rendered.as_bytes())?;
            eprintln!("Wrote provenance for {} to {}", chain.epic_id, path.display());
        }
        None => print!("{rendered}"),
    }
    Ok(())
}

fn run(params: &TraceCliParams<'_>, roots: &SearchRoots) -> anyhow::Result<ProvenanceChain> {
    if params.epic.is_none() && params.transcript.is_none() {
        anyhow::bail!("Nothing to trace: pass --epic, --transcript, or both.");
    }

    let session = match params.transcript {
        Some(transcript) => load_session(transcript, params.no_chain)?,
        None => SessionData::default(),
    };

    let epic = match params.epic {
        Some(epic) => epic.to_string(),
        None => match extract_epic_from_session(&session) {
            Some(epic) => epic,
            None => anyhow::bail!("No epic detected in the transcript. Pass --epic."),
        },
    };
    tracing::debug!(epic = %epic, "tracing");

    Ok(trace_epic_provenance(&epic, &session, params.project, roots)?)
}

fn load_session(transcript: &Path, no_chain: bool) -> anyhow::Result<SessionData> {
    if !transcript.is_file() {
        anyhow::bail!("Transcript not found: {}", transcript.display());
    }
    if no_chain {
        return Ok(parse_transcript(transcript)?);
    }
    Ok(build_composite_session(&find_compaction_chain(transcript)))
}

fn render(chain: &ProvenanceChain, json: bool) -> anyhow::Result<String> {
    if json {
        let mut text = serde_json::to_string_pretty(chain)?;
        text.push('\n');
        Ok(text)
    } else {
        Ok(format_provenance_report(chain))
    }
}
