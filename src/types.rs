use serde::Serialize;
use std::collections::HashSet;
use std::path::PathBuf;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Maximum file size (in bytes) that will be read into memory for parsing.
pub const MAX_FILE_READ: usize = 2 * 1024 * 1024;

/// Extensions recognized as C/C++ sources (matched case-insensitively).
pub const C_EXTENSIONS: &[&str] = &["c", "cc", "cpp", "cxx", "h", "hpp", "hxx"];

/// Extensions recognized as C/C++ headers.
pub const HEADER_EXTENSIONS: &[&str] = &["h", "hpp", "hxx"];

// ---------------------------------------------------------------------------
// Scan configuration — loaded from .cblocks.toml or defaults
// ---------------------------------------------------------------------------

/// Runtime configuration for a codebase scan.
#[derive(Clone)]
pub struct ScanConfig {
    pub root: PathBuf,
    /// Directories to scan (relative to root). Empty = scan root itself.
    pub scan_dirs: Vec<String>,
    /// Directory names to skip during the walk, in addition to the built-in
    /// version-control and test folder policy.
    pub skip_dirs: HashSet<String>,
    /// File extensions to include, lowercased. Empty = the C/C++ default set.
    pub extensions: HashSet<String>,
    /// Restrict the walk to header files.
    pub headers_only: bool,
    /// Skip version-control (`.git`, `.hg`, `.bzr`, `.svn`) and test
    /// (`test`/`tests`) directories. On by default.
    pub skip_vcs_and_test_dirs: bool,
    /// Extra recursion filter: directories whose root-relative path matches
    /// are not descended into.
    pub no_recurse: Option<regex::Regex>,
    /// Extra visit filter: files whose name matches are not parsed.
    pub no_visit: Option<regex::Regex>,
}

impl ScanConfig {
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            scan_dirs: Vec::new(),
            skip_dirs: HashSet::new(),
            extensions: HashSet::new(),
            headers_only: false,
            skip_vcs_and_test_dirs: true,
            no_recurse: None,
            no_visit: None,
        }
    }

    /// The effective extension filter: explicit config, or the header/source
    /// default sets.
    pub fn effective_extensions(&self) -> HashSet<String> {
        if !self.extensions.is_empty() {
            return self.extensions.clone();
        }
        let defaults = if self.headers_only { HEADER_EXTENSIONS } else { C_EXTENSIONS };
        defaults.iter().map(|s| s.to_string()).collect()
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self::new(PathBuf::from("."))
    }
}

// ---------------------------------------------------------------------------
// Structured diagnostics
// ---------------------------------------------------------------------------

/// Diagnostic severity. Every scanner condition is recoverable; `Error` marks
/// the ones where text had to be skipped or truncated to continue, `Warning`
/// marks suspicious but harmless text (a stray slash outside any expression).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Severity {
    Error,
    Warning,
}

/// A recoverable condition hit during a parse. Diagnostics never abort the
/// scan of the file they occur in, nor of sibling files.
#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub path: String,
    /// 1-based line number at the point the condition was detected.
    pub line: u32,
    pub message: String,
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}, line {}: {:?}. {}", self.path, self.line, self.severity, self.message)
    }
}
