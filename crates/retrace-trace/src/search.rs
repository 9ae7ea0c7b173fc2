//! First-match artifact search over an ordered list of directories.

use globset::GlobMatcher;
use retrace_store::SearchRoots;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

pub(crate) static MARKDOWN: LazyLock<GlobMatcher> =
    LazyLock::new(|| retrace_store::glob_matcher("*.md").unwrap());

/// Pre-mortem results carry an `-agent` suffix marker in their name.
pub(crate) static AGENT_MARKDOWN: LazyLock<GlobMatcher> =
    LazyLock::new(|| retrace_store::glob_matcher("*-agent*.md").unwrap());

/// The `.agents` metadata roots for a project, in search order:
/// project level, rig level (the project's parent), town level.
pub fn agents_levels(project_root: &Path, roots: &SearchRoots) -> Vec<PathBuf> {
    let mut levels = vec![project_root.join(".agents")];
    if let Some(parent) = project_root.parent() {
        levels.push(parent.join(".agents"));
    }
    if let Some(town) = &roots.town_agents_dir {
        levels.push(town.clone());
    }
    levels
}

/// A readable candidate file, with lower-cased stem and content for
/// case-insensitive matching.
#[derive(Debug, Clone)]
pub struct Candidate<'a> {
    pub path: &'a Path,
    pub stem: String,
    pub content: String,
}

impl<'a> Candidate<'a> {
    /// Read `path`. Unreadable files are not candidates.
    pub fn load(path: &'a Path) -> Option<Self> {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(err) => {
                tracing::debug!(path = %path.display(), %err, "skipping unreadable artifact");
                return None;
            }
        };
        Some(Self {
            path,
            stem: lower_stem(path),
            content: content.to_lowercase(),
        })
    }

    /// Case-insensitive content match. `needle` must be lower-case.
    pub fn mentions(&self, needle: &str) -> bool {
        self.content.contains(needle)
    }
}

pub(crate) fn lower_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

/// Ordered directories plus a file-name filter. Directories are visited in
/// order and files within a directory by name.
#[derive(Debug, Clone)]
pub struct ArtifactSearch {
    dirs: Vec<PathBuf>,
    pattern: GlobMatcher,
    exclude_fragment: Option<&'static str>,
}

impl ArtifactSearch {
    /// `pattern` filters file names, e.g. a compiled `*.md`.
    pub fn new(dirs: Vec<PathBuf>, pattern: &GlobMatcher) -> Self {
        Self {
            dirs,
            pattern: pattern.clone(),
            exclude_fragment: None,
        }
    }

    /// Search `sub` inside each of `bases`.
    pub fn under(bases: &[PathBuf], sub: &str, pattern: &GlobMatcher) -> Self {
        Self::new(bases.iter().map(|b| b.join(sub)).collect(), pattern)
    }

    /// Skip files whose name contains `fragment`.
    pub fn excluding(mut self, fragment: &'static str) -> Self {
        self.exclude_fragment = Some(fragment);
        self
    }

    /// Every matching file, in search order.
    pub fn files(&self) -> impl Iterator<Item = PathBuf> + '_ {
        self.dirs
            .iter()
            .filter(|d| d.is_dir())
            .flat_map(|d| retrace_store::list_files(d, &self.pattern))
            .filter(|p| match self.exclude_fragment {
                Some(fragment) => !p
                    .file_name()
                    .map(|n| n.to_string_lossy().contains(fragment))
                    .unwrap_or(false),
                None => true,
            })
    }

    /// The first readable file satisfying `predicate`.
    pub fn first_match(&self, predicate: impl Fn(&Candidate<'_>) -> bool) -> Option<PathBuf> {
        self.files().find(|path| Candidate::load(path).is_some_and(|c| predicate(&c)))
    }
}
