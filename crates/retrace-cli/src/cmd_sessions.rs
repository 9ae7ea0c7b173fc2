use retrace_transcript::find_all_project_sessions;
use std::path::Path;

pub fn execute(project: &Path, json: bool) -> anyhow::Result<()> {
    let Some(log_dir) = retrace_store::find_project_log_dir(&retrace_store::projects_root(), project)
    else {
        anyhow::bail!("No transcripts found for {}", project.display());
    };
    let sessions = find_all_project_sessions(&log_dir);

    if json {
        println!("{}", serde_json::to_string_pretty(&sessions)?);
        return Ok(());
    }
    if sessions.is_empty() {
        println!("No sessions with a slug in {}", log_dir.display());
        return Ok(());
    }
    for (slug, files) in &sessions {
        println!("{slug} ({} file(s))", files.len());
        for file in files {
            println!("  {}", file.display());
        }
    }
    Ok(())
}
