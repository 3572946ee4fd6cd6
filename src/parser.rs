//! The incremental scanner: a single-pass, recursive-descent classifier that
//! turns one raw source buffer into a tree of typed blocks.
//!
//! Formal parsing of C and C++ might be doable — if it weren't for all the
//! old and new language standards, the non-standard compiler extensions, and
//! the preprocessor. This scanner doesn't pretend to do perfect parsing, but
//! it is simple and robust: it identifies code blocks (classes, structs,
//! function definitions) and handles comments and string literals without
//! getting confused, even on gnarly corner cases.
//!
//! It does not handle `#ifdef`s well. It recognizes them, but assumes they
//! don't cross block boundaries — wholly inside a function, wholly outside,
//! or wholly around one. A conditional that contains the end of one function
//! and the beginning of another will produce inaccurate structure; that is an
//! accepted limitation, not a defect.
//!
//! Comments, string-literal interiors, and elided `#else` branches are
//! redacted in place — replaced with filler bytes that preserve buffer length
//! and newline positions — so the header classifier never misfires on text
//! that is not code.

use std::path::Path;

use tracing::warn;

use crate::block::{Block, BlockArena, BlockId, BlockKind, UdtKind};
use crate::patterns::*;
use crate::types::{Diagnostic, Severity};

// ---------------------------------------------------------------------------
// Byte-buffer helpers
// ---------------------------------------------------------------------------

fn find_byte(buf: &[u8], needle: u8, from: usize) -> Option<usize> {
    buf.get(from..)?.iter().position(|&b| b == needle).map(|i| from + i)
}

fn find_pair(buf: &[u8], a: u8, b: u8, from: usize) -> Option<usize> {
    let mut i = from;
    while i + 1 < buf.len() {
        if buf[i] == a && buf[i + 1] == b {
            return Some(i);
        }
        i += 1;
    }
    None
}

fn count_newlines(buf: &[u8]) -> u32 {
    buf.iter().filter(|&&b| b == b'\n').count() as u32
}

fn lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

// ---------------------------------------------------------------------------
// Parsed file
// ---------------------------------------------------------------------------

/// One parsed source file: the (redacted) text buffer, the block arena rooted
/// at a `File` block, and the diagnostics collected along the way.
pub struct SourceFile {
    path: String,
    buffer: Vec<u8>,
    arena: BlockArena,
    root: BlockId,
    diagnostics: Vec<Diagnostic>,
}

impl SourceFile {
    /// Read and parse a file from disk.
    pub fn parse_path(path: &Path) -> std::io::Result<SourceFile> {
        let text = std::fs::read(path)?;
        Ok(Self::parse_text(path.to_string_lossy().replace('\\', "/"), text))
    }

    /// Parse an in-memory buffer. Never fails: malformed input degrades to
    /// diagnostics and best-effort structure.
    pub fn parse_text(path: impl Into<String>, text: impl Into<Vec<u8>>) -> SourceFile {
        let path = path.into();
        let mut buffer = text.into();
        let mut arena = BlockArena::default();
        let mut diagnostics = Vec::new();

        // The File root records start_line 0; scanning begins on line 1.
        let root = arena.alloc(BlockKind::File { path: path.clone() }, 0, buffer.len(), 0, None);
        let mut scanner = Scanner {
            buf: &mut buffer,
            arena: &mut arena,
            diags: &mut diagnostics,
            path: &path,
            idx: 0,
            line: 1,
        };
        scanner.scan_block(root);

        SourceFile { path, buffer, arena, root, diagnostics }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// The file path with a codebase root prefix stripped.
    pub fn rel_path(&self, root: &str) -> &str {
        self.path
            .strip_prefix(root)
            .map(|s| s.trim_start_matches('/'))
            .unwrap_or(&self.path)
    }

    /// The root `File` block.
    pub fn root(&self) -> Block<'_> {
        Block::new(self, self.root)
    }

    pub fn block(&self, id: BlockId) -> Block<'_> {
        Block::new(self, id)
    }

    /// Every block in the arena (comments included), in creation order.
    pub fn blocks(&self) -> impl Iterator<Item = Block<'_>> {
        self.arena.ids().map(move |id| Block::new(self, id))
    }

    /// The text buffer after redaction. Same length and newline positions as
    /// the original input.
    pub fn text(&self) -> &[u8] {
        &self.buffer
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub(crate) fn arena(&self) -> &BlockArena {
        &self.arena
    }
}

// ---------------------------------------------------------------------------
// Scanner
// ---------------------------------------------------------------------------

/// The recursive-descent scanner. Borrows the file's buffer exclusively for
/// the duration of one parse; redaction writes through the same borrow, so
/// there is a single owner and a single writer throughout.
struct Scanner<'a> {
    buf: &'a mut Vec<u8>,
    arena: &'a mut BlockArena,
    diags: &'a mut Vec<Diagnostic>,
    path: &'a str,
    idx: usize,
    line: u32,
}

impl Scanner<'_> {
    /// Scan the body of `block` from the current position until its closing
    /// `}` or end of buffer. Children are allocated and recursed into as
    /// their opening braces are found.
    fn scan_block(&mut self, block: BlockId) {
        // Candidate header: first non-trivial byte since the last statement
        // terminator, block boundary, or directive.
        let mut expr_begin: Option<usize> = None;
        let mut header_line: u32 = 0;
        let mut last_comment: Option<BlockId> = None;

        while self.idx < self.buf.len() {
            let i = self.idx;
            match self.buf[i] {
                b'\n' => {
                    self.finish_line();
                }
                b if b.is_ascii_whitespace() => {
                    self.idx += 1;
                }
                b'/' => match self.buf.get(i + 1).copied() {
                    Some(b'/') => {
                        self.idx += 2;
                        self.finish_line();
                        self.erase_comment(block, i, self.idx - 1);
                    }
                    Some(b'*') => {
                        self.idx += 2;
                        self.block_comment(block, &mut last_comment);
                        self.erase_comment(block, i, self.idx);
                    }
                    _ => {
                        if expr_begin.is_none() {
                            self.report(Severity::Warning, "Unexpected / char.");
                        }
                        self.idx += 1;
                    }
                },
                b';' => {
                    self.idx = i + 1;
                    expr_begin = None;
                }
                b'{' => {
                    let classified = match expr_begin {
                        Some(begin) => {
                            self.classify_header(block, begin, header_line, &mut last_comment)
                        }
                        None => false,
                    };
                    if !classified {
                        self.idx += 1;
                        self.anonymous_block(block, &mut last_comment);
                    }
                    expr_begin = None;
                }
                b'}' => {
                    let begin = self.arena[block].begin;
                    self.arena[block].end = i + 1;
                    self.arena[block].full_line_count = count_newlines(&self.buf[begin..i + 1]);
                    // Consume the brace so the parent resumes after it.
                    self.idx = i + 1;
                    return;
                }
                b'#' => {
                    self.preproc_directive(block);
                    expr_begin = None;
                }
                b'"' => {
                    self.idx += 1;
                    last_comment = None;
                    self.string_literal();
                }
                b'\'' => {
                    if self.buf.get(i + 1) == Some(&b'\\') {
                        self.idx += 1;
                    }
                    self.idx += 2;
                }
                _ => {
                    if expr_begin.is_none() {
                        expr_begin = Some(i);
                        header_line = self.line;
                    }
                    self.idx += 1;
                }
            }
        }

        // End of buffer: the span stays open to the buffer end.
        let (begin, end) = (self.arena[block].begin, self.arena[block].end);
        self.arena[block].full_line_count = count_newlines(&self.buf[begin..end]);
    }

    // -- line and literal consumers ------------------------------------------

    /// Advance past the next newline, or to end of buffer if there is none.
    /// The line counter is incremented only when a newline was consumed.
    fn finish_line(&mut self) -> bool {
        match find_byte(self.buf, b'\n', self.idx) {
            Some(i) => {
                self.idx = i + 1;
                self.line += 1;
                true
            }
            None => {
                self.idx = self.buf.len();
                false
            }
        }
    }

    /// Consume a block comment. The position must be just past the opening
    /// `/*`. On success a Comment node is recorded; if the buffer ends first,
    /// a diagnostic is emitted and the truncated span is still counted.
    fn block_comment(&mut self, parent: BlockId, last_comment: &mut Option<BlockId>) -> bool {
        match find_pair(self.buf, b'*', b'/', self.idx) {
            None => {
                self.idx = self.buf.len();
                self.report(Severity::Error, "File ended before comment ended.");
                false
            }
            Some(i) => {
                let begin = self.idx - 2;
                let end = i + 2;
                let id = self.arena.alloc(BlockKind::Comment, begin, end, self.line, Some(parent));
                self.arena[id].full_line_count = count_newlines(&self.buf[begin..end]);
                self.line += self.arena[id].full_line_count;
                self.idx = end;
                *last_comment = Some(id);
                true
            }
        }
    }

    /// Consume a string literal. The position must be just past the opening
    /// quote. A backslash skips the following byte unconditionally; a bare
    /// line break before the closing quote is an unterminated literal.
    fn string_literal(&mut self) -> bool {
        let open = self.idx - 1;
        debug_assert_eq!(self.buf[open], b'"');
        let mut i = self.idx;
        while i < self.buf.len() {
            match self.buf[i] {
                b'\\' => i += 1,
                b'\r' | b'\n' => {
                    self.report(Severity::Error, "Line ended before string literal ended.");
                    self.idx = i;
                    return false;
                }
                b'"' => {
                    self.redact_literal(open + 1, i);
                    self.idx = i + 1;
                    return true;
                }
                _ => {}
            }
            i += 1;
        }
        false
    }

    // -- preprocessor --------------------------------------------------------

    /// Consume a `#` directive. `#define` follows backslash continuations;
    /// `#else` elides through the next `#endif`; everything else finishes the
    /// line. The position must be at the `#`.
    fn preproc_directive(&mut self, block: BlockId) -> bool {
        let probe_end = (self.idx + 20).min(self.buf.len());
        let fragment = self.buf[self.idx..probe_end].to_vec();

        if DEFINE_DIRECTIVE.is_match(&fragment) {
            // Keep consuming lines while each one ends in a continuation
            // backslash (trailing whitespace allowed).
            let mut another = true;
            while another {
                let i = self.idx;
                if !self.finish_line() {
                    self.report(Severity::Error, "File ended before #define ended.");
                    return false;
                }
                // Walk back from the byte before the newline.
                let mut j = self.idx - 2;
                while j > i {
                    let c = self.buf[j];
                    if c == b'\\' {
                        break;
                    } else if !c.is_ascii_whitespace() {
                        another = false;
                        break;
                    }
                    j -= 1;
                }
            }
            true
        } else if ELSE_DIRECTIVE.is_match(&fragment) {
            // Resolving real conditional-compilation semantics would need a
            // preprocessor pass. Eliding the #else branch keeps brace
            // counting consistent for the common case where the conditional
            // wraps whole declarations.
            match ENDIF_DIRECTIVE.find_at(self.buf, self.idx) {
                Some(m) => {
                    let (begin, end) = (self.idx, m.end());
                    self.erase_block(block, begin, end);
                    true
                }
                None => {
                    self.report(Severity::Error, "#else without matching #endif");
                    self.finish_line()
                }
            }
        } else {
            self.finish_line()
        }
    }

    // -- header classification -----------------------------------------------

    /// Decide what kind of block the accumulated candidate header opens.
    /// Returns true when a classified block was created (and fully scanned);
    /// false leaves the caller to open an unnamed block instead.
    fn classify_header(
        &mut self,
        parent: BlockId,
        expr_begin: usize,
        header_line: u32,
        last_comment: &mut Option<BlockId>,
    ) -> bool {
        let raw = self.buf[expr_begin..self.idx].to_vec();
        if RESERVED_WORD.is_match(&raw) {
            return false;
        }
        let header = THROW_SPEC.replace_all(&raw, &b""[..]).into_owned();
        let header = ACCESS_SPECIFIER.replace_all(&header, &b""[..]).into_owned();

        // A parenthesis anywhere past the first byte means a callable; a
        // leading parenthesis is treated as no parenthesis at all.
        let paren = header.iter().position(|&b| b == b'(');
        let kind = if matches!(paren, Some(p) if p > 0) {
            self.classify_callable(&header)
        } else {
            self.classify_udt(&header)
        };

        match kind {
            Some(kind) => {
                self.open_classified(parent, kind, expr_begin, header_line, last_comment);
                true
            }
            None => false,
        }
    }

    /// Match a header containing `(` against the function, destructor, and
    /// constructor patterns, in that order.
    fn classify_callable(&self, header: &[u8]) -> Option<BlockKind> {
        if let Some(caps) = FUNC_HEADER.captures(header) {
            let return_type = norm_param(&lossy(&caps[1]));
            let name = lossy(&caps[2]);
            let mut params: Vec<String> =
                lossy(&caps[3]).split(',').map(norm_param).collect();
            if params.len() == 1 && params[0] == "void" {
                params.clear();
            }
            let is_const = caps.get(4).is_some();
            return Some(BlockKind::Function { return_type, name, params, is_const });
        }
        if let Some(caps) = DTOR_HEADER.captures(header) {
            let name = format!("~{}", lossy(&caps[1]));
            return Some(BlockKind::Function {
                return_type: "<dtor>".to_string(),
                name,
                params: Vec::new(),
                is_const: false,
            });
        }
        if let Some(caps) = CTOR_HEADER.captures(header) {
            let name = lossy(&caps[1]);
            let mut params: Vec<String> =
                lossy(&caps[2]).split(',').map(|p| p.trim().to_string()).collect();
            if params.len() == 1 && params[0] == "void" {
                params.clear();
            }
            return Some(BlockKind::Function {
                return_type: "<ctor>".to_string(),
                name,
                params,
                is_const: false,
            });
        }
        None
    }

    /// Match a parenthesis-free header against the user-defined-type pattern.
    fn classify_udt(&self, header: &[u8]) -> Option<BlockKind> {
        let caps = UDT_HEADER.captures(header)?;
        let kind = match &caps[2] {
            b"struct" => UdtKind::Struct,
            _ => UdtKind::Class,
        };
        let name = lossy(&caps[3]);
        Some(BlockKind::Udt { kind, name })
    }

    /// Create a classified block beginning at its header, attach any pending
    /// doc comment, and recursively scan its body (just past the `{`).
    fn open_classified(
        &mut self,
        parent: BlockId,
        kind: BlockKind,
        begin: usize,
        start_line: u32,
        last_comment: &mut Option<BlockId>,
    ) {
        let id = self.arena.alloc(kind, begin, self.buf.len(), start_line, Some(parent));
        if let Some(c) = last_comment.take() {
            if self.arena[c].depth == self.arena[id].depth {
                self.arena[id].preceding_doc_comment = Some(c);
            }
        }
        self.arena[parent].children.push(id);
        self.idx += 1;
        self.scan_block(id);
    }

    /// Create an unnamed block beginning just past the `{` (the position must
    /// already be there) and recursively scan it. Unnamed blocks never take a
    /// doc comment, and discard any pending one.
    fn anonymous_block(&mut self, parent: BlockId, last_comment: &mut Option<BlockId>) {
        *last_comment = None;
        let id =
            self.arena.alloc(BlockKind::Unnamed, self.idx, self.buf.len(), self.line, Some(parent));
        self.arena[parent].children.push(id);
        self.scan_block(id);
    }

    // -- redaction -----------------------------------------------------------

    /// Redact a comment span and count it toward the block's statistics.
    fn erase_comment(&mut self, block: BlockId, begin: usize, end: usize) {
        self.arena[block].own_comment_count += 1;
        self.erase_block(block, begin, end);
    }

    /// Redact a byte range so later structural matching cannot misfire on it.
    /// Non-newline bytes become spaces; newlines stay in place, so buffer
    /// length and line positions are unchanged.
    fn erase_block(&mut self, block: BlockId, begin: usize, end: usize) {
        self.arena[block].own_comment_bytes += end - begin;
        for b in &mut self.buf[begin..end] {
            if *b != b'\n' {
                *b = b' ';
            }
        }
    }

    /// Redact a string-literal interior (the quotes are left in place). Not
    /// counted in comment statistics.
    fn redact_literal(&mut self, begin: usize, end: usize) {
        for b in &mut self.buf[begin..end] {
            *b = b'x';
        }
    }

    // -- diagnostics ---------------------------------------------------------

    fn report(&mut self, severity: Severity, message: &str) {
        warn!(path = self.path, line = self.line, "{message}");
        self.diags.push(Diagnostic {
            severity,
            path: self.path.to_string(),
            line: self.line,
            message: message.to_string(),
        });
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::Category;

    /// Build a scanner mid-parse over `text` at offset `idx`, the way the
    /// real parse would be positioned after consuming an opening delimiter.
    struct Mock {
        buf: Vec<u8>,
        arena: BlockArena,
        diags: Vec<Diagnostic>,
        root: BlockId,
    }

    impl Mock {
        fn new(text: &str) -> Mock {
            let buf = text.as_bytes().to_vec();
            let mut arena = BlockArena::default();
            let root = arena.alloc(
                BlockKind::File { path: "fake.c".to_string() },
                0,
                buf.len(),
                0,
                None,
            );
            Mock { buf, arena, diags: Vec::new(), root }
        }

        fn scanner(&mut self, idx: usize) -> Scanner<'_> {
            Scanner {
                buf: &mut self.buf,
                arena: &mut self.arena,
                diags: &mut self.diags,
                path: "fake.c",
                idx,
                line: 1,
            }
        }
    }

    fn first_child(file: &SourceFile) -> Block<'_> {
        file.root().children().next().expect("expected at least one block")
    }

    // -- primitive consumers -------------------------------------------------

    #[test]
    fn test_finish_line_normal() {
        let mut m = Mock::new("line 1\nline 2");
        let mut s = m.scanner(0);
        assert!(s.finish_line());
        assert_eq!(s.idx, 7);
    }

    #[test]
    fn test_finish_line_no_eol() {
        let mut m = Mock::new("line 1\nline 2");
        let mut s = m.scanner(7);
        assert!(!s.finish_line());
        assert_eq!(s.idx, 13);
    }

    #[test]
    fn test_string_literal_normal() {
        let mut m = Mock::new("\"hello\\\"\" \"abc\"\nline 2");
        let mut s = m.scanner(1);
        assert!(s.string_literal());
        assert_eq!(s.idx, 9);
        assert_eq!(s.buf[s.idx], b' ');
        s.idx = 11;
        assert!(s.string_literal());
        assert_eq!(s.idx, 15);
    }

    #[test]
    fn test_string_literal_unterminated() {
        let mut m = Mock::new(" \"hello\nline 2\"");
        let mut s = m.scanner(2);
        assert!(!s.string_literal());
        assert_eq!(s.idx, 7);
        assert_eq!(m.diags.len(), 1);
        assert_eq!(m.diags[0].message, "Line ended before string literal ended.");
    }

    #[test]
    fn test_string_literal_hard() {
        // This particular string used to cause a hang in an earlier design.
        let mut m = Mock::new(
            "\"    Procs: %d/%d (CPULoad: %.2f/%.2f)  Mem: %d/%d MB Location: %d:%d\\n\" ",
        );
        let mut s = m.scanner(1);
        assert!(s.string_literal());
        assert_eq!(s.idx, 72);
        assert_eq!(s.buf[s.idx], b' ');
    }

    #[test]
    fn test_multiline_comment_normal() {
        let mut m = Mock::new("/*hello*//**//*/...*/\nline 2");
        let root = m.root;
        let mut s = m.scanner(2);
        let mut last = None;
        assert!(s.block_comment(root, &mut last));
        assert_eq!(s.idx, 9);
        s.idx = 11;
        assert!(s.block_comment(root, &mut last));
        assert_eq!(s.idx, 13);
        s.idx = 15;
        assert!(s.block_comment(root, &mut last));
        assert_eq!(s.idx, 21);
    }

    #[test]
    fn test_multiline_comment_unterminated() {
        let mut m = Mock::new("/*hello\nline 2");
        let root = m.root;
        let mut s = m.scanner(2);
        let mut last = None;
        assert!(!s.block_comment(root, &mut last));
        assert_eq!(s.idx, 14);
        assert_eq!(m.diags[0].message, "File ended before comment ended.");
    }

    #[test]
    fn test_preproc_directive_normal() {
        for word in ["include", "pragma ", "if     ", "ifdef  ", "endif  ", "define "] {
            let text = format!("#{word} <x.h>\nhello");
            let mut m = Mock::new(&text);
            let root = m.root;
            let mut s = m.scanner(0);
            assert!(s.preproc_directive(root), "directive #{word} should finish its line");
            assert_eq!(s.idx, 15, "directive #{word} should land on the next line");
        }
    }

    #[test]
    fn test_multiline_define() {
        let mut m = Mock::new("# define abc(x, y) \\ \n  something\\\n  end\nhello");
        let root = m.root;
        let mut s = m.scanner(0);
        assert!(s.preproc_directive(root));
        assert_eq!(s.idx, 41, "should land exactly at the start of the following token");
        assert_eq!(&s.buf[s.idx..s.idx + 5], b"hello");
    }

    #[test]
    fn test_define_unterminated() {
        let mut m = Mock::new("# define abc(x, y) \\ \n  something\\\n  end");
        let root = m.root;
        let len = m.buf.len();
        let mut s = m.scanner(0);
        assert!(!s.preproc_directive(root));
        assert_eq!(s.idx, len);
        assert_eq!(m.diags[0].message, "File ended before #define ended.");
    }

    // -- whole-file parses ---------------------------------------------------

    #[test]
    fn test_udt() {
        let txt = "\ntypedef struct foo\n  { \nint x;\nconst char * y;\n}\nhello";
        let file = SourceFile::parse_text("fake.c", txt);
        assert_eq!(file.root().children().count(), 1);
        let udt = first_child(&file);
        match udt.kind() {
            BlockKind::Udt { kind, name } => {
                assert_eq!(*kind, UdtKind::Struct);
                assert_eq!(name, "foo");
            }
            other => panic!("expected a udt, got {other:?}"),
        }
        assert_eq!(udt.full_line_count(), 4);
        assert_eq!(udt.start_line(), 2);
    }

    #[test]
    fn test_func() {
        let txt = "//a comment\nint doSomething(char * buf, int n);\nvoid doSomethingElse(double f) {\n  printf(\"hello\");\n}";
        let file = SourceFile::parse_text("fake.c", txt);
        assert_eq!(file.root().children().count(), 1, "the declaration is not a block");
        let func = first_child(&file);
        match func.kind() {
            BlockKind::Function { return_type, name, params, is_const } => {
                assert_eq!(return_type, "void");
                assert_eq!(name, "doSomethingElse");
                assert_eq!(params[0], "double f");
                assert!(!is_const);
            }
            other => panic!("expected a function, got {other:?}"),
        }
        assert_eq!(func.full_line_count(), 2);
        assert_eq!(func.start_line(), 3);
    }

    #[test]
    fn test_for_loop() {
        // The first string literal contains a real newline, so it is
        // unterminated; the scanner must recover and still find the for-loop
        // body as an unnamed block.
        let txt = "    MStringAppendF(Buffer,\"    Triggers:\n\");\n\n    for (tindex = 0;tindex < V->T->NumItems;tindex++)\n      {   \n      }   \n\n/* END MVMShow.c */";
        let file = SourceFile::parse_text("fake.c", txt);
        assert_eq!(file.root().comment_count(), 1);
        assert_eq!(file.root().comment_bytes(), 19);
        let blocks: Vec<_> = file.root().children().collect();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].category(), Category::Unnamed);
        assert_eq!(blocks[0].start_line(), 5);
    }

    #[test]
    fn test_parse_terminates_on_truncated_literal() {
        // Truncated mid-literal after an escape; must terminate, not hang.
        let txt = "int MVMShow() {\n  MStringAppendF(Buffer,\"%sVM[%s]  State: %s  JobID: %s  ActiveOS: %s\\n\",";
        let file = SourceFile::parse_text("fake.c", txt);
        assert_eq!(file.root().children().count(), 1);
    }

    #[test]
    fn test_uneven_braces_in_ifdef() {
        let txt = "void tcl_init(void)\n  {\n\n#if TCLX\n#if TCL_MINOR_VERSION < 5  && TCL_MAJOR_VERSION < 8\n  if (TclX_Init(interp) == TCL_ERROR)\n    {\n#else\n\n  if (Tclx_Init(interp) == TCL_ERROR)\n    {\n#endif\n    fprintf(stderr, \"Tclx_Init error: %s\",\n            interp->result);\n    }\n\n#endif /* TCLX */\n  return;\n  }\n\nvoid nothing() { }\n";
        let file = SourceFile::parse_text("fake.c", txt);
        let blocks: Vec<_> = file.root().children().collect();
        let descrip: Vec<(Category, u32)> =
            blocks.iter().map(|b| (b.category(), b.start_line())).collect();
        assert_eq!(
            descrip,
            vec![(Category::Function, 1), (Category::Function, 21)],
            "the #else elision must keep brace counting consistent"
        );
    }

    #[test]
    fn test_else_without_endif() {
        let txt = "#if FOO\nint x;\n#else\nint y;\n";
        let file = SourceFile::parse_text("fake.c", txt);
        assert_eq!(file.diagnostics().len(), 1);
        assert_eq!(file.diagnostics()[0].message, "#else without matching #endif");
    }

    #[test]
    fn test_void_param_list_is_empty() {
        let txt = "int main(void) {\n  return 0;\n}\n";
        let file = SourceFile::parse_text("fake.c", txt);
        match first_child(&file).kind() {
            BlockKind::Function { params, .. } => assert!(params.is_empty()),
            other => panic!("expected a function, got {other:?}"),
        }
    }

    #[test]
    fn test_destructor() {
        let txt = "class Foo {\nvirtual ~Foo()\n{\n}\n};\n";
        let file = SourceFile::parse_text("fake.h", txt);
        let class = first_child(&file);
        let dtor = class.children().next().expect("dtor block");
        match dtor.kind() {
            BlockKind::Function { return_type, name, params, .. } => {
                assert_eq!(return_type, "<dtor>");
                assert_eq!(name, "~Foo");
                assert!(params.is_empty());
            }
            other => panic!("expected a function, got {other:?}"),
        }
    }

    #[test]
    fn test_constructor_with_initializer_list() {
        let txt = "class Foo {\nFoo(int x) : m_x(x) {\n}\nint m_x;\n};\n";
        let file = SourceFile::parse_text("fake.h", txt);
        let class = first_child(&file);
        let ctor = class.children().next().expect("ctor block");
        match ctor.kind() {
            BlockKind::Function { return_type, name, params, .. } => {
                assert_eq!(return_type, "<ctor>");
                assert_eq!(name, "Foo");
                assert_eq!(params, &["int x"]);
            }
            other => panic!("expected a function, got {other:?}"),
        }
    }

    #[test]
    fn test_const_method() {
        let txt = "class Foo {\npublic:\nint get() const {\n  return x;\n}\nint x;\n};\n";
        let file = SourceFile::parse_text("fake.h", txt);
        let class = first_child(&file);
        let method = class.children().next().expect("method block");
        match method.kind() {
            BlockKind::Function { name, is_const, .. } => {
                assert_eq!(name, "get");
                assert!(is_const, "trailing const qualifier should be detected");
            }
            other => panic!("expected a function, got {other:?}"),
        }
        assert_eq!(method.header(), "int get() const");
    }

    #[test]
    fn test_throw_spec_stripped() {
        let txt = "void risky() throw(int)\n{\n}\n";
        let file = SourceFile::parse_text("fake.cpp", txt);
        match first_child(&file).kind() {
            BlockKind::Function { name, .. } => assert_eq!(name, "risky"),
            other => panic!("expected a function, got {other:?}"),
        }
    }

    #[test]
    fn test_siblings_survive_a_nested_close() {
        // Closing a child must hand control back to the parent *after* the
        // brace; the later siblings and the root's full extent depend on it.
        let txt = "void a() {\n  if (x) {\n  }\n}\nvoid b() {\n}\nstruct s {\n};\n";
        let file = SourceFile::parse_text("fake.c", txt);
        let names: Vec<&str> = file.root().children().map(|b| b.name()).collect();
        assert_eq!(names, vec!["a", "b", "s"]);
        let (_, root_end) = file.root().span();
        assert_eq!(root_end, txt.len());
        let (_, a_end) = file.root().children().next().unwrap().span();
        assert_eq!(file.text()[a_end - 1], b'}');
    }

    #[test]
    fn test_reserved_words_open_unnamed_blocks() {
        let txt = "namespace util {\nvoid helper() {\n}\n}\n";
        let file = SourceFile::parse_text("fake.cpp", txt);
        let ns = first_child(&file);
        assert_eq!(ns.category(), Category::Unnamed);
        let inner = ns.children().next().expect("nested function");
        assert_eq!(inner.category(), Category::Function);
        assert_eq!(inner.depth(), 2);
    }

    #[test]
    fn test_preceding_doc_comments_and_stats() {
        let txt = "/* one */\nclass Foo {\nint x;\n};\n/* two */\nclass Bar {\n};\n";
        let file = SourceFile::parse_text("fake.h", txt);
        let blocks: Vec<_> = file.root().children().collect();
        assert_eq!(blocks.len(), 2, "comments are not listed as children");
        for b in &blocks {
            assert!(b.preceding_doc_comment().is_some(), "{} lost its doc comment", b.name());
        }
        assert_eq!(file.root().comment_count(), 2);
        assert_eq!(file.root().comment_bytes(), 18);
        assert!(blocks[0].header().starts_with("/* ... */\n"));
    }

    #[test]
    fn test_doc_comment_replaced_by_later_comment() {
        let txt = "/* stale */\n/* fresh */\nvoid f() {\n}\n";
        let file = SourceFile::parse_text("fake.c", txt);
        let func = first_child(&file);
        let doc = func.preceding_doc_comment().expect("doc comment");
        // The later comment wins; the earlier one is never linked.
        assert_eq!(doc.start_line(), 2);
    }

    #[test]
    fn test_string_literal_clears_pending_doc_comment() {
        let txt = "/* doc */\nchar * s = \"x\";\nvoid f() {\n}\n";
        let file = SourceFile::parse_text("fake.c", txt);
        let func = first_child(&file);
        assert!(func.preceding_doc_comment().is_none());
    }

    #[test]
    fn test_line_comment_at_eof() {
        let txt = "int x;\n// trailing comment";
        let file = SourceFile::parse_text("fake.c", txt);
        assert_eq!(file.root().comment_count(), 1);
    }

    #[test]
    fn test_stray_slash_diagnostic() {
        let txt = "/\nint x;\n";
        let file = SourceFile::parse_text("fake.c", txt);
        assert_eq!(file.diagnostics().len(), 1);
        assert_eq!(file.diagnostics()[0].message, "Unexpected / char.");
        // Nothing was skipped or truncated, so this is a warning.
        assert_eq!(file.diagnostics()[0].severity, Severity::Warning);
    }

    #[test]
    fn test_truncation_diagnostics_are_errors() {
        let file = SourceFile::parse_text("fake.c", "/*hello\nline 2");
        assert_eq!(file.diagnostics()[0].severity, Severity::Error);
    }

    #[test]
    fn test_division_in_expression_is_not_reported() {
        let txt = "int f() {\n  int y = x / 2;\n  return y;\n}\n";
        let file = SourceFile::parse_text("fake.c", txt);
        assert!(file.diagnostics().is_empty());
    }

    #[test]
    fn test_char_literals_fixed_width_skip() {
        let txt = "int f() {\n  if (c == '\\n') {\n    return 1;\n  }\n  return 0;\n}\n";
        let file = SourceFile::parse_text("fake.c", txt);
        let func = first_child(&file);
        assert_eq!(func.category(), Category::Function);
        assert_eq!(func.children().count(), 1);
    }

    // -- invariants ----------------------------------------------------------

    fn check_invariants(file: &SourceFile) {
        for block in file.blocks() {
            let (begin, end) = block.span();
            assert!(begin <= end, "span must be ordered");
            if let Some(parent) = block.parent() {
                let (pb, pe) = parent.span();
                assert!(pb <= begin && end <= pe, "child span must nest in parent");
                assert_eq!(block.depth(), parent.depth() + 1);
            }
            let mut prev_begin = None;
            for child in block.children() {
                let (cb, _) = child.span();
                if let Some(p) = prev_begin {
                    assert!(cb >= p, "children must be ordered by position");
                }
                prev_begin = Some(cb);
            }
            let newlines =
                block.text().iter().filter(|&&b| b == b'\n').count() as u32;
            assert_eq!(block.full_line_count(), newlines, "line count must match the span");
        }
    }

    #[test]
    fn test_span_and_line_invariants() {
        let txt = "/* header */\nstruct outer {\n  struct inner {\n    int x;\n  };\n};\nvoid f(void) {\n  if (a) {\n    g(\"s\");\n  }\n}\n";
        let file = SourceFile::parse_text("fake.c", txt);
        check_invariants(&file);
    }

    #[test]
    fn test_redaction_preserves_length_and_newlines() {
        let txt = "/* a\n   b */\nint f() {\n  s = \"lit\\\"eral\";\n#if X\n  g();\n#else\n  h();\n#endif\n}\n";
        let original: Vec<usize> =
            txt.bytes().enumerate().filter(|(_, b)| *b == b'\n').map(|(i, _)| i).collect();
        let file = SourceFile::parse_text("fake.c", txt);
        assert_eq!(file.text().len(), txt.len());
        let redacted: Vec<usize> = file
            .text()
            .iter()
            .enumerate()
            .filter(|(_, b)| **b == b'\n')
            .map(|(i, _)| i)
            .collect();
        assert_eq!(original, redacted, "newline positions must survive redaction");
        check_invariants(&file);
    }

    #[test]
    fn test_parse_terminates_on_malformed_soup() {
        for txt in [
            "/* never closed",
            "\"never closed",
            "#define X \\",
            "{{{{{",
            "}}}}}",
            "'",
            "'\\",
            "/",
            "int f( {\"broken;",
        ] {
            let file = SourceFile::parse_text("fake.c", txt);
            check_invariants(&file);
        }
    }
}
