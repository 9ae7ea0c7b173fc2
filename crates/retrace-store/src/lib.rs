use globset::{Glob, GlobMatcher};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

// ── Home-level roots ──

/// Return the Claude home directory: `~/.claude/`.
/// Overridable via `RETRACE_CLAUDE_DIR`.
pub fn claude_dir() -> PathBuf {
    if let Some(dir) = env_dir("RETRACE_CLAUDE_DIR") {
        return dir;
    }
    match dirs::home_dir() {
        Some(home) => home.join(".claude"),
        None => PathBuf::from(".claude"),
    }
}

/// Return the town directory: `~/gt/`.
/// Overridable via `RETRACE_TOWN_DIR`.
pub fn town_dir() -> PathBuf {
    if let Some(dir) = env_dir("RETRACE_TOWN_DIR") {
        return dir;
    }
    match dirs::home_dir() {
        Some(home) => home.join("gt"),
        None => PathBuf::from("gt"),
    }
}

/// Per-project transcript directories: `~/.claude/projects/`.
pub fn projects_root() -> PathBuf {
    claude_dir().join("projects")
}

/// Plan and pre-mortem files: `~/.claude/plans/`.
pub fn plans_dir() -> PathBuf {
    claude_dir().join("plans")
}

/// Town-level agent metadata root: `~/gt/.agents/`.
pub fn town_agents_dir() -> PathBuf {
    town_dir().join(".agents")
}

fn env_dir(var: &str) -> Option<PathBuf> {
    std::env::var(var)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .map(PathBuf::from)
}

/// Home-level directories searched in addition to the project tree.
///
/// `None` disables that location. Tests construct this directly; the CLI
/// uses [`SearchRoots::from_env`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchRoots {
    /// Town-level `.agents` directory (research, products, learnings, ...).
    pub town_agents_dir: Option<PathBuf>,
    /// Directory holding plans and `-agent` pre-mortem files.
    pub plans_dir: Option<PathBuf>,
}

impl SearchRoots {
    pub fn from_env() -> Self {
        Self {
            town_agents_dir: Some(town_agents_dir()),
            plans_dir: Some(plans_dir()),
        }
    }
}

// ── Transcript discovery ──

/// Convert a project path into the form Claude uses for its log directory
/// names: slashes become dashes, one leading dash is dropped.
pub fn normalize_project_path(project_path: &Path) -> String {
    let raw = project_path.to_string_lossy().replace('\\', "/");
    let normalized = raw.replace('/', "-");
    match normalized.strip_prefix('-') {
        Some(rest) => rest.to_string(),
        None => normalized,
    }
}

/// Find the log directory under `projects_root` for `project_path`.
///
/// Prefers a directory whose name contains the normalized path, then falls
/// back to one whose dash-separated parts contain the last three parts of it.
pub fn find_project_log_dir(projects_root: &Path, project_path: &Path) -> Option<PathBuf> {
    let entries = fs::read_dir(projects_root).ok()?;
    let mut candidates: Vec<PathBuf> = entries
        .flatten()
        .map(|e| e.path())
        .filter(|p| p.is_dir())
        .collect();
    candidates.sort();

    let normalized = normalize_project_path(project_path);
    if normalized.is_empty() {
        return None;
    }

    let name_of = |p: &Path| -> String {
        p.file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default()
    };

    if let Some(hit) = candidates
        .iter()
        .find(|d| name_of(d).contains(&normalized))
    {
        return Some(hit.clone());
    }

    let path_parts: Vec<&str> = normalized.split('-').collect();
    let tail = &path_parts[path_parts.len().saturating_sub(3)..];
    candidates.into_iter().find(|d| {
        let name = name_of(d);
        let dir_parts: Vec<&str> = name.split('-').collect();
        tail.iter().all(|p| dir_parts.contains(p))
    })
}

/// All transcripts recorded for `project_path`, newest first.
pub fn find_session_transcripts(projects_root: &Path, project_path: &Path) -> Vec<PathBuf> {
    let Some(log_dir) = find_project_log_dir(projects_root, project_path) else {
        return Vec::new();
    };
    let mut transcripts = list_files(&log_dir, &jsonl_matcher());
    transcripts.sort_by(|a, b| {
        modified_time(b)
            .cmp(&modified_time(a))
            .then_with(|| a.cmp(b))
    });
    transcripts
}

// ── Directory listing ──

/// Compile a file-name glob such as `*.md` or `*-agent*.md`.
pub fn glob_matcher(pattern: &str) -> anyhow::Result<GlobMatcher> {
    Ok(Glob::new(pattern)?.compile_matcher())
}

/// Matcher for transcript files.
pub fn jsonl_matcher() -> GlobMatcher {
    Glob::new("*.jsonl")
        .expect("static glob should compile")
        .compile_matcher()
}

/// Regular files in `dir` whose file name matches `matcher`, sorted by name.
/// A missing or unreadable directory lists as empty.
pub fn list_files(dir: &Path, matcher: &GlobMatcher) -> Vec<PathBuf> {
    let entries = match fs::read_dir(dir) {
        Ok(e) => e,
        Err(err) => {
            tracing::debug!(dir = %dir.display(), %err, "skipping unreadable directory");
            return Vec::new();
        }
    };
    let mut files: Vec<PathBuf> = entries
        .flatten()
        .map(|e| e.path())
        .filter(|p| p.is_file())
        .filter(|p| {
            p.file_name()
                .map(|n| matcher.is_match(Path::new(n)))
                .unwrap_or(false)
        })
        .collect();
    files.sort();
    files
}

/// Modification time, or `None` when the file cannot be stat'ed.
pub fn modified_time(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|m| m.modified()).ok()
}

// ── Writes ──

/// Atomic write: write to temp file in same dir, then rename.
pub fn write_atomic(path: &Path, data: &[u8]) -> anyhow::Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)?;
    let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
    tmp.write_all(data)?;
    tmp.flush()?;
    tmp.persist(path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn touch(path: &Path, secs: u64) {
        fs::write(path, "{}\n").unwrap();
        let f = fs::File::options().write(true).open(path).unwrap();
        f.set_modified(SystemTime::UNIX_EPOCH + Duration::from_secs(secs))
            .unwrap();
    }

    #[test]
    fn normalize_strips_leading_dash() {
        assert_eq!(
            normalize_project_path(Path::new("/home/dev/gt/olympus")),
            "home-dev-gt-olympus"
        );
        assert_eq!(normalize_project_path(Path::new("rel/dir")), "rel-dir");
    }

    #[test]
    fn find_log_dir_by_normalized_name() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir_all(tmp.path().join("-home-dev-other")).unwrap();
        fs::create_dir_all(tmp.path().join("-home-dev-gt-olympus")).unwrap();

        let found = find_project_log_dir(tmp.path(), Path::new("/home/dev/gt/olympus"));
        assert_eq!(found, Some(tmp.path().join("-home-dev-gt-olympus")));
    }

    #[test]
    fn find_log_dir_by_trailing_parts() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir_all(tmp.path().join("-Users-dev-gt-olympus-crew")).unwrap();

        // Different home prefix, same last three parts.
        let found = find_project_log_dir(tmp.path(), Path::new("/srv/gt/olympus/crew"));
        assert_eq!(found, Some(tmp.path().join("-Users-dev-gt-olympus-crew")));
    }

    #[test]
    fn find_log_dir_missing_root() {
        let found = find_project_log_dir(Path::new("/nonexistent/root"), Path::new("/a/b"));
        assert!(found.is_none());
    }

    #[test]
    fn transcripts_are_newest_first() {
        let tmp = tempfile::tempdir().unwrap();
        let log_dir = tmp.path().join("-work-proj");
        fs::create_dir_all(&log_dir).unwrap();
        touch(&log_dir.join("old.jsonl"), 1_000);
        touch(&log_dir.join("new.jsonl"), 3_000);
        touch(&log_dir.join("mid.jsonl"), 2_000);
        fs::write(log_dir.join("notes.txt"), "ignored").unwrap();

        let found = find_session_transcripts(tmp.path(), Path::new("/work/proj"));
        let names: Vec<String> = found
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["new.jsonl", "mid.jsonl", "old.jsonl"]);
    }

    #[test]
    fn list_files_filters_and_sorts() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("b-agent-review.md"), "").unwrap();
        fs::write(tmp.path().join("a.md"), "").unwrap();
        fs::write(tmp.path().join("c.txt"), "").unwrap();
        fs::create_dir_all(tmp.path().join("dir.md")).unwrap();

        let all = list_files(tmp.path(), &glob_matcher("*.md").unwrap());
        assert_eq!(
            all,
            vec![tmp.path().join("a.md"), tmp.path().join("b-agent-review.md")]
        );

        let agent = list_files(tmp.path(), &glob_matcher("*-agent*.md").unwrap());
        assert_eq!(agent, vec![tmp.path().join("b-agent-review.md")]);
    }

    #[test]
    fn list_files_missing_dir_is_empty() {
        let files = list_files(Path::new("/nonexistent/dir"), &jsonl_matcher());
        assert!(files.is_empty());
    }

    #[test]
    fn write_atomic_creates_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("reports").join("trace.md");
        write_atomic(&path, b"## Provenance Chain").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "## Provenance Chain");
    }
}
