//! The block tree: an arena of typed nodes plus a borrowing cursor for
//! queries.
//!
//! Every parsed file owns one [`BlockArena`]. All structural references —
//! parent, children, preceding doc comment — are [`BlockId`] indices into that
//! arena, so back-references can never dangle and ownership stays strictly
//! tree-shaped: the arena owns every node, parent/child is index-only.

use serde::Serialize;

use crate::parser::SourceFile;

// ---------------------------------------------------------------------------
// Categories and variants
// ---------------------------------------------------------------------------

/// The category of a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    File,
    Udt,
    Function,
    Comment,
    Unnamed,
}

impl Category {
    pub fn label(&self) -> &'static str {
        match self {
            Category::File => "file",
            Category::Udt => "udt",
            Category::Function => "function",
            Category::Comment => "comment",
            Category::Unnamed => "unnamed",
        }
    }
}

/// Whether a user-defined type was introduced with `struct` or `class`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UdtKind {
    Struct,
    Class,
}

impl UdtKind {
    pub fn label(&self) -> &'static str {
        match self {
            UdtKind::Struct => "struct",
            UdtKind::Class => "class",
        }
    }
}

/// Variant-specific data for a block.
#[derive(Debug, Clone)]
pub enum BlockKind {
    /// The root block for one source file.
    File { path: String },
    /// A struct or class declaration.
    Udt { kind: UdtKind, name: String },
    /// A function, method, constructor, or destructor definition.
    /// Constructors carry the return-type sentinel `<ctor>`, destructors
    /// `<dtor>` with a `~`-prefixed name.
    Function { return_type: String, name: String, params: Vec<String>, is_const: bool },
    /// A block comment (`/* ... */`).
    Comment,
    /// A brace-delimited region whose header matched no declaration pattern.
    Unnamed,
}

impl BlockKind {
    pub fn category(&self) -> Category {
        match self {
            BlockKind::File { .. } => Category::File,
            BlockKind::Udt { .. } => Category::Udt,
            BlockKind::Function { .. } => Category::Function,
            BlockKind::Comment => Category::Comment,
            BlockKind::Unnamed => Category::Unnamed,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            BlockKind::File { path } => path,
            BlockKind::Udt { name, .. } => name,
            BlockKind::Function { name, .. } => name,
            BlockKind::Comment | BlockKind::Unnamed => "",
        }
    }
}

// ---------------------------------------------------------------------------
// Arena
// ---------------------------------------------------------------------------

/// Index of a block within its file's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockId(u32);

/// One node in the block tree.
#[derive(Debug)]
pub struct BlockNode {
    pub kind: BlockKind,
    /// `[begin, end)` byte span into the owning buffer.
    pub begin: usize,
    pub end: usize,
    /// 1-based line of the block's first character (0 for the File root).
    pub start_line: u32,
    /// Nesting level; the File root is 0.
    pub depth: u32,
    /// Newline count strictly within the span. Fixed when the block closes;
    /// redaction preserves newlines, so it stays valid afterwards.
    pub full_line_count: u32,
    pub parent: Option<BlockId>,
    /// Child blocks in positional order. Comment nodes are tracked in the
    /// arena but not listed here; they surface through
    /// `preceding_doc_comment` and the comment statistics.
    pub children: Vec<BlockId>,
    pub preceding_doc_comment: Option<BlockId>,
    /// Comments found directly in this block's own text (not descendants').
    pub own_comment_count: u32,
    /// Bytes redacted directly in this block's own text (comments plus
    /// elided `#else` branches).
    pub own_comment_bytes: usize,
}

/// Append-only arena owning every block of one parsed file.
#[derive(Debug, Default)]
pub struct BlockArena {
    nodes: Vec<BlockNode>,
}

impl BlockArena {
    /// Allocate a node. `end` is provisional (the buffer end) until the
    /// block's closing delimiter is found.
    pub fn alloc(
        &mut self,
        kind: BlockKind,
        begin: usize,
        end: usize,
        start_line: u32,
        parent: Option<BlockId>,
    ) -> BlockId {
        let depth = parent.map(|p| self[p].depth + 1).unwrap_or(0);
        let id = BlockId(self.nodes.len() as u32);
        self.nodes.push(BlockNode {
            kind,
            begin,
            end,
            start_line,
            depth,
            full_line_count: 0,
            parent,
            children: Vec::new(),
            preceding_doc_comment: None,
            own_comment_count: 0,
            own_comment_bytes: 0,
        });
        id
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = BlockId> {
        (0..self.nodes.len() as u32).map(BlockId)
    }
}

impl std::ops::Index<BlockId> for BlockArena {
    type Output = BlockNode;
    fn index(&self, id: BlockId) -> &BlockNode {
        &self.nodes[id.0 as usize]
    }
}

impl std::ops::IndexMut<BlockId> for BlockArena {
    fn index_mut(&mut self, id: BlockId) -> &mut BlockNode {
        &mut self.nodes[id.0 as usize]
    }
}

// ---------------------------------------------------------------------------
// Cursor
// ---------------------------------------------------------------------------

/// A borrowing cursor over one block — a `(file, id)` pair with the query
/// surface. Copy-cheap; all data lives in the file's arena.
#[derive(Clone, Copy)]
pub struct Block<'a> {
    file: &'a SourceFile,
    id: BlockId,
}

impl<'a> Block<'a> {
    pub(crate) fn new(file: &'a SourceFile, id: BlockId) -> Self {
        Block { file, id }
    }

    pub fn id(&self) -> BlockId {
        self.id
    }

    fn node(&self) -> &'a BlockNode {
        &self.file.arena()[self.id]
    }

    pub fn kind(&self) -> &'a BlockKind {
        &self.node().kind
    }

    pub fn category(&self) -> Category {
        self.node().kind.category()
    }

    pub fn name(&self) -> &'a str {
        self.node().kind.name()
    }

    /// `[begin, end)` byte offsets into the file's buffer.
    pub fn span(&self) -> (usize, usize) {
        (self.node().begin, self.node().end)
    }

    /// The block's text after redaction.
    pub fn text(&self) -> &'a [u8] {
        &self.file.text()[self.node().begin..self.node().end]
    }

    pub fn start_line(&self) -> u32 {
        self.node().start_line
    }

    /// Number of full lines contained in the block.
    pub fn full_line_count(&self) -> u32 {
        self.node().full_line_count
    }

    pub fn end_line(&self) -> u32 {
        self.node().start_line + self.node().full_line_count
    }

    pub fn depth(&self) -> u32 {
        self.node().depth
    }

    pub fn parent(&self) -> Option<Block<'a>> {
        self.node().parent.map(|id| Block::new(self.file, id))
    }

    /// The block comment immediately preceding this block at the same depth,
    /// if one was attached.
    pub fn preceding_doc_comment(&self) -> Option<Block<'a>> {
        self.node().preceding_doc_comment.map(|id| Block::new(self.file, id))
    }

    pub fn children(&self) -> impl Iterator<Item = Block<'a>> + '_ {
        let file = self.file;
        self.node().children.iter().map(move |&id| Block::new(file, id))
    }

    pub fn has_children(&self) -> bool {
        !self.node().children.is_empty()
    }

    /// Child blocks of one category, in positional order.
    pub fn children_by_category(&self, category: Category) -> Vec<Block<'a>> {
        self.children().filter(|b| b.category() == category).collect()
    }

    /// The path of the owning file (the root block's name).
    pub fn path(&self) -> &'a str {
        self.file.path()
    }

    // -- aggregate statistics ------------------------------------------------

    /// Comments in this block and all descendants.
    pub fn comment_count(&self) -> u32 {
        self.node().own_comment_count + self.children().map(|c| c.comment_count()).sum::<u32>()
    }

    /// Redacted bytes in this block and all descendants.
    pub fn comment_bytes(&self) -> usize {
        self.node().own_comment_bytes + self.children().map(|c| c.comment_bytes()).sum::<usize>()
    }

    // -- deepest descendants -------------------------------------------------

    /// The set of descendants nested most deeply beneath this block. All
    /// blocks tied at the maximum depth are included.
    pub fn most_distant_descendants(&self) -> Vec<Block<'a>> {
        let mut mdd: Vec<Block<'a>> = Vec::new();
        let mut max_depth = 0;
        for child in self.children() {
            let mut child_mdd = child.most_distant_descendants();
            if child_mdd.is_empty() {
                child_mdd.push(child);
            }
            let this_depth = child_mdd[0].depth();
            if this_depth > max_depth {
                mdd = child_mdd;
                max_depth = this_depth;
            } else if this_depth == max_depth {
                mdd.extend(child_mdd);
            }
        }
        mdd
    }

    // -- rendering -----------------------------------------------------------

    /// One-line canonical header for the block, prefixed with `/* ... */` when
    /// a preceding doc comment is attached.
    pub fn header(&self) -> String {
        let h = match self.kind() {
            BlockKind::File { path } => format!("file \"{path}\""),
            BlockKind::Udt { kind, name } => format!("{} {}", kind.label(), name),
            BlockKind::Function { return_type, name, params, is_const } => {
                let suffix = if *is_const { " const" } else { "" };
                format!("{} {}({}){}", return_type, name, params.join(", "), suffix)
            }
            BlockKind::Comment => "/* ... */".to_string(),
            BlockKind::Unnamed => {
                format!("unnamed \"\" at {}, line {}", self.path(), self.start_line())
            }
        };
        if self.preceding_doc_comment().is_some() {
            format!("/* ... */\n{h}")
        } else {
            h
        }
    }

    /// Indented textual outline of this block and its descendants. Childless
    /// blocks render with an elided body marker.
    pub fn skeleton(&self) -> String {
        if self.category() == Category::File {
            let mut sk = self.header();
            sk.push('\n');
            for child in self.children() {
                sk.push_str(&child.skeleton());
            }
            return sk;
        }
        let indent = "  ".repeat(self.depth() as usize);
        let mut sk = self.header();
        if self.has_children() {
            sk.push_str(" {\n");
            for child in self.children() {
                sk.push_str(&child.skeleton());
            }
            sk.push_str(&indent);
            sk.push('}');
        } else {
            sk.push_str(" {...}");
        }
        sk.push('\n');
        format!("{indent}{sk}")
    }
}

impl std::fmt::Display for Block<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.header())
    }
}
