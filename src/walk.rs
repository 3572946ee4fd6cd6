//! Codebase discovery: find the project root and walk it for source files.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use ignore::WalkBuilder;
use tracing::debug;

use crate::types::ScanConfig;

// ---------------------------------------------------------------------------
// Folder policy
// ---------------------------------------------------------------------------

/// Version-control bookkeeping folders, never worth descending into.
const VCS_FOLDERS: &[&str] = &[".git", ".hg", ".bzr", ".svn"];

pub fn is_vcs_folder(name: &str) -> bool {
    VCS_FOLDERS.contains(&name)
}

/// Test folders (`test`, `tests`, any casing) hold scaffolding rather than
/// product structure, so the default policy skips them.
pub fn is_test_folder(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    lower == "test" || lower == "tests"
}

// ---------------------------------------------------------------------------
// Root detection
// ---------------------------------------------------------------------------

/// Whether `dir` looks like the top of a codebase: a build entry point
/// (`Makefile`, `configure`, and their autotools variants), a `src`
/// directory, or a version-control directory.
fn looks_like_root(dir: &Path) -> bool {
    for marker in ["Makefile", "Makefile.am", "configure", "configure.ac"] {
        if dir.join(marker).is_file() {
            return true;
        }
    }
    if dir.join("src").is_dir() {
        return true;
    }
    VCS_FOLDERS.iter().any(|v| dir.join(v).is_dir())
}

/// Ascend from `start` looking for the codebase root. Falls back to `start`
/// itself when no ancestor carries a root marker.
pub fn find_codebase_root(start: &Path) -> PathBuf {
    let mut dir = start;
    loop {
        if looks_like_root(dir) {
            debug!(root = %dir.display(), "detected codebase root");
            return dir.to_path_buf();
        }
        match dir.parent() {
            Some(parent) if parent != dir => dir = parent,
            _ => return start.to_path_buf(),
        }
    }
}

// ---------------------------------------------------------------------------
// File discovery
// ---------------------------------------------------------------------------

/// One file found by the walk.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct DiscoveredFile {
    /// Root-relative path with forward slashes. Ordering key, so listings
    /// and reports come out deterministic.
    pub rel: String,
    pub abs: PathBuf,
}

fn dir_allowed(config: &ScanConfig, entry: &ignore::DirEntry) -> bool {
    let name = entry.file_name().to_string_lossy();
    if config.skip_dirs.contains(name.as_ref()) {
        return false;
    }
    if config.skip_vcs_and_test_dirs && (is_vcs_folder(&name) || is_test_folder(&name)) {
        return false;
    }
    if let Some(pat) = &config.no_recurse {
        let rel = entry
            .path()
            .strip_prefix(&config.root)
            .unwrap_or(entry.path())
            .to_string_lossy()
            .replace('\\', "/");
        if pat.is_match(&rel) {
            return false;
        }
    }
    true
}

/// Walk the configured scan directories in parallel and collect every file
/// passing the extension and visit filters, sorted by relative path.
pub fn discover_files(config: &ScanConfig) -> Vec<DiscoveredFile> {
    let scan_dirs: Vec<String> = if config.scan_dirs.is_empty() {
        vec![".".to_string()]
    } else {
        config.scan_dirs.clone()
    };

    let extensions: HashSet<String> = config.effective_extensions();
    let results: Mutex<Vec<DiscoveredFile>> = Mutex::new(Vec::new());

    for scan_dir in &scan_dirs {
        let dir = if scan_dir == "." { config.root.clone() } else { config.root.join(scan_dir) };
        if !dir.exists() {
            debug!(dir = %dir.display(), "skipping scan dir (not found)");
            continue;
        }

        let cfg = config.clone();
        WalkBuilder::new(&dir)
            .hidden(true)
            .git_ignore(false)
            .git_global(false)
            .git_exclude(false)
            .threads(rayon::current_num_threads().min(12))
            .filter_entry(move |entry| {
                if entry.file_type().is_some_and(|ft| ft.is_dir()) {
                    return dir_allowed(&cfg, entry);
                }
                true
            })
            .build_parallel()
            .run(|| {
                Box::new(|entry| {
                    let entry = match entry {
                        Ok(e) => e,
                        Err(_) => return ignore::WalkState::Continue,
                    };
                    if !entry.file_type().is_some_and(|ft| ft.is_file()) {
                        return ignore::WalkState::Continue;
                    }

                    let abs = entry.path().to_path_buf();
                    let ext = abs
                        .extension()
                        .and_then(|e| e.to_str())
                        .map(|e| e.to_ascii_lowercase())
                        .unwrap_or_default();
                    if !extensions.contains(&ext) {
                        return ignore::WalkState::Continue;
                    }

                    if let Some(pat) = &config.no_visit {
                        let name = abs.file_name().unwrap_or_default().to_string_lossy();
                        if pat.is_match(&name) {
                            return ignore::WalkState::Continue;
                        }
                    }

                    let rel = abs
                        .strip_prefix(&config.root)
                        .unwrap_or(&abs)
                        .to_string_lossy()
                        .replace('\\', "/");

                    results.lock().unwrap().push(DiscoveredFile { rel, abs });
                    ignore::WalkState::Continue
                })
            });
    }

    let mut files = results.into_inner().unwrap();
    files.sort();
    files.dedup();
    files
}
