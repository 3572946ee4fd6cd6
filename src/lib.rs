//! cblocks — lightweight structural scanner for C/C++ codebases.
//!
//! This crate identifies the block structure of C and C++ sources — classes,
//! structs, function definitions, comments — without a compiler front end.
//! A single forward pass per file produces a typed block tree plus comment
//! statistics, robust against the preprocessor abuse and legacy encodings
//! that defeat grammatical parsers.
//!
//! # Modules
//!
//! - [`parser`] — The recursive-descent scanner; one buffer in, one block tree out
//! - [`block`] — The block arena, the cursor API, header and skeleton rendering
//! - [`patterns`] — Declaration-header classifier patterns
//! - [`walk`] — Codebase root detection and parallel file discovery
//! - [`report`] — Whole-codebase parsing, JSON reports, outline rendering
//! - [`types`] — Scan configuration and diagnostics

pub mod block;
pub mod parser;
pub mod patterns;
pub mod report;
pub mod types;
pub mod walk;

use std::path::Path;
use std::time::Instant;

use tracing::{debug, info, warn};

use report::{parse_codebase, CodebaseScan};
use types::ScanConfig;

// ---------------------------------------------------------------------------
// .cblocks.toml config loading
// ---------------------------------------------------------------------------

/// Known keys in `.cblocks.toml` for config validation.
const KNOWN_CONFIG_KEYS: &[&str] =
    &["scan_dirs", "skip_dirs", "extensions", "headers_only", "skip_vcs_and_test_dirs"];

/// Simple Levenshtein edit distance for typo suggestions.
fn edit_distance(a: &str, b: &str) -> usize {
    let (a, b) = (a.as_bytes(), b.as_bytes());
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];
    for (i, &ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, &cb) in b.iter().enumerate() {
            let cost = if ca == cb { 0 } else { 1 };
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

/// Load scan configuration from `.cblocks.toml` in the given codebase root.
///
/// Returns a [`ScanConfig`] with defaults merged with any overrides from the
/// config file. If the file doesn't exist or can't be parsed, returns defaults
/// with a warning. Unknown keys trigger a warning with a typo suggestion.
pub fn load_config(root: &Path) -> ScanConfig {
    let mut config = ScanConfig::new(root.to_path_buf());
    let config_path = root.join(".cblocks.toml");

    if config_path.exists() {
        debug!("Loading .cblocks.toml");
        if let Ok(content) = std::fs::read_to_string(&config_path) {
            if let Ok(table) = content.parse::<toml::Table>() {
                // Validate keys — warn on unknown
                for key in table.keys() {
                    if !KNOWN_CONFIG_KEYS.contains(&key.as_str()) {
                        let suggestion =
                            KNOWN_CONFIG_KEYS.iter().min_by_key(|k| edit_distance(key, k)).unwrap();
                        let dist = edit_distance(key, suggestion);
                        if dist <= 3 {
                            warn!(
                                key = key.as_str(),
                                suggestion = *suggestion,
                                "Unknown key in .cblocks.toml — did you mean '{suggestion}'?"
                            );
                        } else {
                            warn!(
                                key = key.as_str(),
                                "Unknown key in .cblocks.toml (known keys: {})",
                                KNOWN_CONFIG_KEYS.join(", ")
                            );
                        }
                    }
                }

                // scan_dirs
                if let Some(dirs) = table.get("scan_dirs").and_then(|v| v.as_array()) {
                    config.scan_dirs =
                        dirs.iter().filter_map(|v| v.as_str().map(|s| s.to_string())).collect();
                }

                // skip_dirs — merge with defaults
                if let Some(dirs) = table.get("skip_dirs").and_then(|v| v.as_array()) {
                    for d in dirs {
                        if let Some(s) = d.as_str() {
                            config.skip_dirs.insert(s.to_string());
                        }
                    }
                }

                // extensions — lowercased to match the walk's filter
                if let Some(exts) = table.get("extensions").and_then(|v| v.as_array()) {
                    config.extensions = exts
                        .iter()
                        .filter_map(|v| v.as_str().map(|s| s.to_ascii_lowercase()))
                        .collect();
                }

                // headers_only
                if let Some(b) = table.get("headers_only").and_then(|v| v.as_bool()) {
                    config.headers_only = b;
                }

                // skip_vcs_and_test_dirs
                if let Some(b) = table.get("skip_vcs_and_test_dirs").and_then(|v| v.as_bool()) {
                    config.skip_vcs_and_test_dirs = b;
                }
            } else {
                warn!("Failed to parse .cblocks.toml");
            }
        }
    }

    config
}

// ---------------------------------------------------------------------------
// Scan a codebase
// ---------------------------------------------------------------------------

/// Parse a whole codebase under `config.root` and return the scan.
///
/// Discovery, parsing, and redaction all happen here; rendering is left to
/// [`report`]. Unreadable and oversized files are skipped, never fatal.
pub fn scan_codebase(config: &ScanConfig) -> CodebaseScan {
    info!(root = %config.root.display(), "Scanning codebase");
    if !config.scan_dirs.is_empty() {
        debug!(dirs = ?config.scan_dirs, "Scan dirs");
    }
    if !config.extensions.is_empty() {
        debug!(exts = ?config.extensions, "Extension filter");
    }

    let start = Instant::now();
    let scan = parse_codebase(config);

    let block_count: usize = scan.sources.iter().map(|s| s.file.blocks().count()).sum();
    let diag_count = scan.diagnostics().count();
    info!(
        files = scan.sources.len(),
        skipped = scan.skipped,
        blocks = block_count,
        diagnostics = diag_count,
        time_ms = start.elapsed().as_millis() as u64,
        "Scan complete"
    );
    scan
}
