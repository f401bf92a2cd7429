/// Document tree for CommonMark documents: arena-backed blocks and inlines
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::line::LineSlice;
use crate::span::{LineIndex, Span};

/// Index of a block in its document's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlockId(pub(crate) usize);

/// Index of an inline node in its document's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InlineId(pub(crate) usize);

impl BlockId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl InlineId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ListMarker {
    Bullet(char),
    Ordered { start: u64, delimiter: char },
}

impl ListMarker {
    /// Whether an item with this marker continues a list started by `other`.
    pub fn continues(&self, other: &ListMarker) -> bool {
        match (self, other) {
            (ListMarker::Bullet(a), ListMarker::Bullet(b)) => a == b,
            (
                ListMarker::Ordered { delimiter: a, .. },
                ListMarker::Ordered { delimiter: b, .. },
            ) => a == b,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListData {
    pub marker: ListMarker,
    /// Columns of indentation before the marker.
    pub marker_offset: usize,
    /// Columns from the marker start to the item content.
    pub padding: usize,
    pub tight: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fence {
    pub character: char,
    pub length: usize,
    pub indent: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeBlockData {
    pub fence: Option<Fence>, // None for indented code
    pub info: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum BlockKind {
    Document,
    BlockQuote,
    List(ListData),     // Contains ListItem blocks only
    ListItem(ListData), // Contains any block except ListItem
    Paragraph,
    Heading { level: u8, setext: bool },
    ThematicBreak,
    CodeBlock(CodeBlockData),
    HtmlBlock { kind: u8 }, // Start condition 1-7
    /// A block opened by a parser registered from outside this crate.
    Custom { name: &'static str, container: bool },
}

impl BlockKind {
    pub fn is_container(&self) -> bool {
        match self {
            BlockKind::Document | BlockKind::BlockQuote | BlockKind::List(_) | BlockKind::ListItem(_) => true,
            BlockKind::Custom { container, .. } => *container,
            _ => false,
        }
    }

    pub fn is_paragraph(&self) -> bool {
        matches!(self, BlockKind::Paragraph)
    }

    pub fn can_contain(&self, child: &BlockKind) -> bool {
        match self {
            BlockKind::List(_) => matches!(child, BlockKind::ListItem(_)),
            kind if kind.is_container() => !matches!(child, BlockKind::ListItem(_)),
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Block {
    pub kind: BlockKind,
    pub span: Span,
    pub parent: Option<BlockId>,
    /// Leaves whose content must never be inline parsed (code, raw HTML).
    pub no_inline: bool,
    pub(crate) children: Vec<BlockId>,
    pub(crate) lines: Vec<LineSlice>,
    pub(crate) inline: Option<InlineId>,
    #[serde(skip)]
    pub(crate) open: bool,
    #[serde(skip)]
    pub(crate) last_line_blank: bool,
}

impl Block {
    pub(crate) fn new(kind: BlockKind, span: Span, parent: Option<BlockId>) -> Self {
        Block {
            kind,
            span,
            parent,
            no_inline: false,
            children: Vec::new(),
            lines: Vec::new(),
            inline: None,
            open: true,
            last_line_blank: false,
        }
    }

    pub fn line(&self) -> usize {
        self.span.line
    }

    pub fn column(&self) -> usize {
        self.span.column
    }

    pub fn children(&self) -> &[BlockId] {
        &self.children
    }

    /// Raw lines of a leaf block.
    pub fn lines(&self) -> &[LineSlice] {
        &self.lines
    }

    /// Root of the inline tree, once the inline phase has run.
    pub fn inline(&self) -> Option<InlineId> {
        self.inline
    }

    pub fn is_open(&self) -> bool {
        self.open
    }
}

/// A `[label]: url "title"` definition, kept only in the document's table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkReferenceDefinition {
    pub label: String,
    pub url: String,
    pub title: Option<String>,
    pub span: Span,
}

/// Definitions keyed by normalized label.
pub type LinkReferenceMap = HashMap<String, LinkReferenceDefinition>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DelimiterType {
    Open,
    Close,
    Both,
}

impl DelimiterType {
    pub fn from_flanking(can_open: bool, can_close: bool) -> Option<Self> {
        match (can_open, can_close) {
            (true, true) => Some(DelimiterType::Both),
            (true, false) => Some(DelimiterType::Open),
            (false, true) => Some(DelimiterType::Close),
            (false, false) => None,
        }
    }

    pub fn can_open(self) -> bool {
        matches!(self, DelimiterType::Open | DelimiterType::Both)
    }

    pub fn can_close(self) -> bool {
        matches!(self, DelimiterType::Close | DelimiterType::Both)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DelimiterKind {
    Emphasis,
    Link { image: bool },
}

/// Transient marker for an emphasis run or a link/image opener.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delimiter {
    pub kind: DelimiterKind,
    pub character: char,
    pub delimiter_type: DelimiterType,
    pub active: bool,
    /// Characters of the run not yet consumed by emphasis.
    pub length: usize,
    pub original_length: usize,
    /// Offset of the run in the leaf's inline buffer.
    pub position: usize,
}

impl Delimiter {
    /// Text the delimiter stands for when it degrades to a literal.
    pub fn literal(&self) -> String {
        match self.kind {
            DelimiterKind::Emphasis => std::iter::repeat_n(self.character, self.length).collect(),
            DelimiterKind::Link { image: true } => "![".to_string(),
            DelimiterKind::Link { image: false } => "[".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkData {
    pub url: String,
    pub title: Option<String>,
    /// Normalized label when the link was resolved through a reference definition.
    pub reference: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum InlineKind {
    Root, // Container for a leaf's inline content
    Text(String),
    Code(String), // Inline code span
    Html(String), // Raw inline HTML (passed through unchanged)
    Autolink { url: String, text: String, email: bool },
    Entity { raw: String, text: String },
    LineBreak { hard: bool },
    Emphasis { delimiter: char, strong: bool },
    Link(LinkData),
    Image(LinkData), // Children are the image description
    Delimiter(Delimiter),
    /// A leaf produced by an inline parser registered from outside this crate.
    Custom { name: &'static str, text: String },
}

impl InlineKind {
    pub fn is_container(&self) -> bool {
        matches!(
            self,
            InlineKind::Root
                | InlineKind::Emphasis { .. }
                | InlineKind::Link(_)
                | InlineKind::Image(_)
                | InlineKind::Delimiter(_)
        )
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Inline {
    pub kind: InlineKind,
    pub span: Span,
    pub(crate) parent: Option<InlineId>,
    pub(crate) prev: Option<InlineId>,
    pub(crate) next: Option<InlineId>,
    pub(crate) first_child: Option<InlineId>,
    pub(crate) last_child: Option<InlineId>,
    pub(crate) closed: bool,
    #[serde(skip)]
    pub(crate) dissolved: bool,
}

impl Inline {
    pub fn parent(&self) -> Option<InlineId> {
        self.parent
    }

    pub fn next(&self) -> Option<InlineId> {
        self.next
    }

    pub fn prev(&self) -> Option<InlineId> {
        self.prev
    }

    pub fn first_child(&self) -> Option<InlineId> {
        self.first_child
    }

    pub fn last_child(&self) -> Option<InlineId> {
        self.last_child
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub(crate) fn delimiter(&self) -> Option<&Delimiter> {
        match &self.kind {
            InlineKind::Delimiter(delimiter) => Some(delimiter),
            _ => None,
        }
    }

    pub(crate) fn delimiter_mut(&mut self) -> Option<&mut Delimiter> {
        match &mut self.kind {
            InlineKind::Delimiter(delimiter) => Some(delimiter),
            _ => None,
        }
    }
}

/// Storage for every inline node of a document.
///
/// Nodes are never freed; detached nodes simply become unreachable. Sibling chains are
/// doubly linked and each container's first/last child always match its chain.
///
/// While a leaf is being parsed, a parent link may point at a dissolved node, which
/// forwards to the container that took over its children. [`InlineArena::parent_of`]
/// follows those links; [`InlineArena::settle_parents`] rewrites them once the leaf is
/// done.
#[derive(Debug, Clone, Default, Serialize)]
pub struct InlineArena {
    nodes: Vec<Inline>,
}

impl InlineArena {
    pub fn get(&self, id: InlineId) -> &Inline {
        &self.nodes[id.0]
    }

    pub(crate) fn get_mut(&mut self, id: InlineId) -> &mut Inline {
        &mut self.nodes[id.0]
    }

    pub(crate) fn alloc(&mut self, kind: InlineKind, span: Span, closed: bool) -> InlineId {
        let id = InlineId(self.nodes.len());
        self.nodes.push(Inline {
            kind,
            span,
            parent: None,
            prev: None,
            next: None,
            first_child: None,
            last_child: None,
            closed,
            dissolved: false,
        });
        id
    }

    pub fn children(&self, parent: InlineId) -> InlineChildren<'_> {
        InlineChildren {
            arena: self,
            next: self.get(parent).first_child,
        }
    }

    pub(crate) fn append_child(&mut self, parent: InlineId, child: InlineId) {
        self.detach(child);
        let last = self.get(parent).last_child;
        {
            let node = self.get_mut(child);
            node.parent = Some(parent);
            node.prev = last;
            node.next = None;
        }
        match last {
            Some(last) => self.get_mut(last).next = Some(child),
            None => self.get_mut(parent).first_child = Some(child),
        }
        self.get_mut(parent).last_child = Some(child);
    }

    pub(crate) fn insert_after(&mut self, anchor: InlineId, node: InlineId) {
        self.detach(node);
        let parent = self.parent_of(anchor);
        let next = self.get(anchor).next;
        {
            let inserted = self.get_mut(node);
            inserted.parent = parent;
            inserted.prev = Some(anchor);
            inserted.next = next;
        }
        self.get_mut(anchor).next = Some(node);
        match next {
            Some(next) => self.get_mut(next).prev = Some(node),
            None => {
                if let Some(parent) = parent {
                    self.get_mut(parent).last_child = Some(node);
                }
            }
        }
    }

    /// Unlinks `node` from its parent and siblings. Its own children stay with it.
    pub(crate) fn detach(&mut self, node: InlineId) {
        let parent = self.parent_of(node);
        let (prev, next) = {
            let n = self.get(node);
            (n.prev, n.next)
        };
        match prev {
            Some(prev) => self.get_mut(prev).next = next,
            None => {
                if let Some(parent) = parent {
                    self.get_mut(parent).first_child = next;
                }
            }
        }
        match next {
            Some(next) => self.get_mut(next).prev = prev,
            None => {
                if let Some(parent) = parent {
                    self.get_mut(parent).last_child = prev;
                }
            }
        }
        let n = self.get_mut(node);
        n.parent = None;
        n.prev = None;
        n.next = None;
    }

    /// The live container of `node`, skipping dissolved nodes and shortening the path.
    pub(crate) fn parent_of(&mut self, node: InlineId) -> Option<InlineId> {
        let mut parent = self.get(node).parent;
        while let Some(id) = parent
            && self.get(id).dissolved
        {
            parent = self.get(id).parent;
        }
        let mut current = self.get(node).parent;
        while let Some(id) = current
            && self.get(id).dissolved
        {
            current = self.get(id).parent;
            self.get_mut(id).parent = parent;
        }
        self.get_mut(node).parent = parent;
        parent
    }

    /// Puts `replacement` in the place of `node`, followed by the children of `node`.
    ///
    /// Runs in constant time: the children keep their parent link to `node`, which is
    /// left detached and forwards to its own parent.
    pub(crate) fn dissolve(&mut self, node: InlineId, replacement: InlineId) {
        let parent = self.parent_of(node);
        let (prev, next, first, last) = {
            let n = self.get(node);
            (n.prev, n.next, n.first_child, n.last_child)
        };
        {
            let r = self.get_mut(replacement);
            r.parent = parent;
            r.prev = prev;
            r.next = None;
        }
        match prev {
            Some(prev) => self.get_mut(prev).next = Some(replacement),
            None => {
                if let Some(parent) = parent {
                    self.get_mut(parent).first_child = Some(replacement);
                }
            }
        }
        let tail = match (first, last) {
            (Some(first), Some(last)) => {
                self.get_mut(replacement).next = Some(first);
                self.get_mut(first).prev = Some(replacement);
                last
            }
            _ => replacement,
        };
        self.get_mut(tail).next = next;
        match next {
            Some(next) => self.get_mut(next).prev = Some(tail),
            None => {
                if let Some(parent) = parent {
                    self.get_mut(parent).last_child = Some(tail);
                }
            }
        }
        let n = self.get_mut(node);
        n.prev = None;
        n.next = None;
        n.first_child = None;
        n.last_child = None;
        n.dissolved = true;
    }

    /// Rewrites the parent link of every node below `container`.
    pub(crate) fn settle_parents(&mut self, container: InlineId) {
        let mut current = self.get(container).first_child;
        while let Some(node) = current {
            self.get_mut(node).parent = Some(container);
            if self.get(node).kind.is_container() {
                self.settle_parents(node);
            }
            current = self.get(node).next;
        }
    }

    /// Moves the siblings strictly between `first` and `last` under `parent`.
    pub(crate) fn move_between(&mut self, first: InlineId, last: InlineId, parent: InlineId) {
        let mut current = self.get(first).next;
        while let Some(node) = current {
            if node == last {
                break;
            }
            current = self.get(node).next;
            self.append_child(parent, node);
        }
    }

    /// Whether `node` is still reachable from `root`.
    pub fn is_attached(&self, node: InlineId, root: InlineId) -> bool {
        if self.get(node).dissolved {
            return false;
        }
        let mut current = Some(node);
        while let Some(id) = current {
            if id == root {
                return true;
            }
            current = self.get(id).parent;
        }
        false
    }

    /// Joins runs of adjacent text nodes below `container`, recursively.
    pub(crate) fn merge_adjacent_text(&mut self, container: InlineId) {
        let mut current = self.get(container).first_child;
        while let Some(node) = current {
            if self.get(node).kind.is_container() {
                self.merge_adjacent_text(node);
                current = self.get(node).next;
                continue;
            }
            while let Some(next) = self.get(node).next {
                let appended = match (&self.get(node).kind, &self.get(next).kind) {
                    (InlineKind::Text(_), InlineKind::Text(more)) => more.clone(),
                    _ => break,
                };
                let end = self.get(next).span.end;
                let merged = self.get_mut(node);
                if let InlineKind::Text(text) = &mut merged.kind {
                    text.push_str(&appended);
                }
                merged.span.end = merged.span.end.max(end);
                self.detach(next);
            }
            current = self.get(node).next;
        }
    }
}

pub struct InlineChildren<'a> {
    arena: &'a InlineArena,
    next: Option<InlineId>,
}

impl Iterator for InlineChildren<'_> {
    type Item = InlineId;

    fn next(&mut self) -> Option<InlineId> {
        let current = self.next?;
        self.next = self.arena.get(current).next;
        Some(current)
    }
}

/// A parsed document: the block tree, every inline tree and the link reference table.
#[derive(Debug, Clone)]
pub struct Document<'a> {
    source: &'a str,
    pub(crate) line_index: LineIndex,
    pub(crate) blocks: Vec<Block>,
    pub(crate) inlines: InlineArena,
    pub(crate) link_references: LinkReferenceMap,
}

impl<'a> Document<'a> {
    pub(crate) fn new(source: &'a str) -> Self {
        let line_index = LineIndex::new(source);
        let root = Block::new(BlockKind::Document, Span::new(0, source.len(), 0, 0), None);
        Document {
            source,
            line_index,
            blocks: vec![root],
            inlines: InlineArena::default(),
            link_references: LinkReferenceMap::new(),
        }
    }

    pub fn source(&self) -> &'a str {
        self.source
    }

    pub fn line_index(&self) -> &LineIndex {
        &self.line_index
    }

    pub fn root(&self) -> BlockId {
        BlockId(0)
    }

    pub fn block(&self, id: BlockId) -> &Block {
        &self.blocks[id.0]
    }

    pub(crate) fn block_mut(&mut self, id: BlockId) -> &mut Block {
        &mut self.blocks[id.0]
    }

    pub(crate) fn push_block(&mut self, block: Block) -> BlockId {
        let id = BlockId(self.blocks.len());
        if let Some(parent) = block.parent {
            self.blocks[parent.0].children.push(id);
        }
        self.blocks.push(block);
        id
    }

    /// Detaches `id` from its parent's child list.
    pub(crate) fn remove_block(&mut self, id: BlockId) {
        if let Some(parent) = self.blocks[id.0].parent.take() {
            self.blocks[parent.0].children.retain(|&child| child != id);
        }
    }

    pub fn children(&self, id: BlockId) -> &[BlockId] {
        &self.blocks[id.0].children
    }

    /// All attached blocks in document order.
    pub fn descendants(&self) -> Vec<BlockId> {
        let mut out = Vec::new();
        let mut stack = vec![self.root()];
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.children(id).iter().rev().copied());
        }
        out
    }

    pub fn inline(&self, id: InlineId) -> &Inline {
        self.inlines.get(id)
    }

    pub fn inline_children(&self, id: InlineId) -> InlineChildren<'_> {
        self.inlines.children(id)
    }

    pub fn inlines(&self) -> &InlineArena {
        &self.inlines
    }

    /// Leaf lines joined with `\n`, virtual spaces included.
    pub fn leaf_text(&self, id: BlockId) -> String {
        let mut out = String::new();
        for (i, line) in self.block(id).lines.iter().enumerate() {
            if i > 0 {
                out.push('\n');
            }
            line.push_to(self.source, &mut out);
        }
        out
    }

    pub fn link_references(&self) -> &LinkReferenceMap {
        &self.link_references
    }

    /// Registers a definition under its normalized label. The first definition of a
    /// label wins; later ones are dropped.
    pub(crate) fn add_link_reference(&mut self, definition: LinkReferenceDefinition) -> bool {
        let key = crate::link_syntax::normalize_label(&definition.label);
        if self.link_references.contains_key(&key) {
            return false;
        }
        self.link_references.insert(key, definition);
        true
    }

    /// Looks up a definition by label, normalizing it first.
    pub fn link_reference(&self, label: &str) -> Option<&LinkReferenceDefinition> {
        self.link_references
            .get(&crate::link_syntax::normalize_label(label))
    }

    /// Concatenated literal content of an inline subtree.
    pub fn plain_text(&self, id: InlineId) -> String {
        let mut out = String::new();
        self.push_plain_text(id, &mut out);
        out
    }

    fn push_plain_text(&self, id: InlineId, out: &mut String) {
        match &self.inline(id).kind {
            InlineKind::Text(text)
            | InlineKind::Code(text)
            | InlineKind::Entity { text, .. }
            | InlineKind::Autolink { text, .. }
            | InlineKind::Custom { text, .. } => out.push_str(text),
            InlineKind::LineBreak { .. } => out.push(' '),
            InlineKind::Html(_) => {}
            _ => {
                for child in self.inline_children(id) {
                    self.push_plain_text(child, out);
                }
            }
        }
    }
}
