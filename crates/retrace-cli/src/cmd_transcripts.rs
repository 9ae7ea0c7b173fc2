use std::path::Path;

pub fn execute(project: &Path) -> anyhow::Result<()> {
    let transcripts =
        retrace_store::find_session_transcripts(&retrace_store::projects_root(), project);
    if transcripts.is_empty() {
        println!("No transcripts found for {}", project.display());
        return Ok(());
    }
    for transcript in &transcripts {
        println!("{}", transcript.display());
    }
    Ok(())
}
