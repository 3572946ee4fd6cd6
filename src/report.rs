//! Codebase-level parsing and report rendering.
//!
//! Discovery hands over a sorted file list; this module parses every file in
//! parallel and folds the per-file block trees into serializable reports and
//! a human-readable outline.

use std::fs;

use rayon::prelude::*;
use serde::Serialize;
use tracing::warn;

use crate::block::{Block, Category};
use crate::parser::SourceFile;
use crate::types::{Diagnostic, ScanConfig, MAX_FILE_READ};
use crate::walk::discover_files;

// ---------------------------------------------------------------------------
// Codebase parse
// ---------------------------------------------------------------------------

/// One parsed source file plus its root-relative path.
pub struct ScannedSource {
    pub rel_path: String,
    pub file: SourceFile,
}

/// The result of parsing a whole codebase. Sources keep discovery order
/// (sorted by relative path).
pub struct CodebaseScan {
    pub sources: Vec<ScannedSource>,
    /// Files skipped because they were oversized or unreadable.
    pub skipped: usize,
}

impl CodebaseScan {
    /// Diagnostics from every parsed file, in file order.
    pub fn diagnostics(&self) -> impl Iterator<Item = &Diagnostic> {
        self.sources.iter().flat_map(|s| s.file.diagnostics().iter())
    }
}

/// Discover and parse every source file under the configured root. A file
/// that cannot be read is skipped with a warning; its siblings still parse.
pub fn parse_codebase(config: &ScanConfig) -> CodebaseScan {
    let discovered = discover_files(config);

    let parsed: Vec<Option<ScannedSource>> = discovered
        .into_par_iter()
        .map(|f| {
            let bytes = match fs::read(&f.abs) {
                Ok(b) => b,
                Err(err) => {
                    warn!(path = %f.rel, %err, "skipping unreadable file");
                    return None;
                }
            };
            if bytes.len() > MAX_FILE_READ {
                warn!(path = %f.rel, size = bytes.len(), "skipping oversized file");
                return None;
            }
            let file = SourceFile::parse_text(f.rel.clone(), bytes);
            Some(ScannedSource { rel_path: f.rel, file })
        })
        .collect();

    let skipped = parsed.iter().filter(|p| p.is_none()).count();
    let sources = parsed.into_iter().flatten().collect();
    CodebaseScan { sources, skipped }
}

// ---------------------------------------------------------------------------
// Serializable reports
// ---------------------------------------------------------------------------

/// One block in a report tree.
#[derive(Debug, Serialize)]
pub struct BlockSummary {
    pub category: Category,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,
    pub header: String,
    pub start_line: u32,
    pub line_count: u32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<BlockSummary>,
}

impl BlockSummary {
    fn from_block(block: Block<'_>) -> BlockSummary {
        BlockSummary {
            category: block.category(),
            name: block.name().to_string(),
            header: block.header(),
            start_line: block.start_line(),
            line_count: block.full_line_count(),
            children: block.children().map(BlockSummary::from_block).collect(),
        }
    }
}

/// Per-file structure report.
#[derive(Debug, Serialize)]
pub struct FileReport {
    pub path: String,
    pub line_count: u32,
    pub comment_count: u32,
    pub comment_bytes: usize,
    /// Depth of the most deeply nested block (0 for a file with none).
    pub deepest_nesting: u32,
    pub blocks: Vec<BlockSummary>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,
}

impl FileReport {
    pub fn from_source(source: &ScannedSource) -> FileReport {
        let root = source.file.root();
        let deepest_nesting =
            root.most_distant_descendants().first().map(|b| b.depth()).unwrap_or(0);
        FileReport {
            path: source.rel_path.clone(),
            line_count: root.full_line_count(),
            comment_count: root.comment_count(),
            comment_bytes: root.comment_bytes(),
            deepest_nesting,
            blocks: root.children().map(BlockSummary::from_block).collect(),
            diagnostics: source.file.diagnostics().to_vec(),
        }
    }
}

/// Whole-codebase report.
#[derive(Debug, Serialize)]
pub struct CodebaseReport {
    pub file_count: usize,
    pub skipped_count: usize,
    pub function_count: usize,
    pub udt_count: usize,
    pub line_count: u64,
    pub files: Vec<FileReport>,
}

impl CodebaseReport {
    pub fn build(scan: &CodebaseScan) -> CodebaseReport {
        let mut function_count = 0;
        let mut udt_count = 0;
        let mut line_count: u64 = 0;
        for source in &scan.sources {
            line_count += u64::from(source.file.root().full_line_count());
            for block in source.file.blocks() {
                match block.category() {
                    Category::Function => function_count += 1,
                    Category::Udt => udt_count += 1,
                    _ => {}
                }
            }
        }
        CodebaseReport {
            file_count: scan.sources.len(),
            skipped_count: scan.skipped,
            function_count,
            udt_count,
            line_count,
            files: scan.sources.iter().map(FileReport::from_source).collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Outline rendering
// ---------------------------------------------------------------------------

/// Human-readable outline of every parsed file, one skeleton per file,
/// separated by blank lines.
pub fn render_outline(scan: &CodebaseScan) -> String {
    let mut out = String::new();
    for source in &scan.sources {
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(&source.file.root().skeleton());
    }
    out
}
