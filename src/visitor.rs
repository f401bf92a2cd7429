//! Read-only traversal of a parsed [`Document`], and the outline view built on it.

use std::fmt;

use serde::Serialize;

use crate::ast::{BlockId, BlockKind, Document, InlineId, InlineKind, LinkData};

/// Kind of a node, as seen by a [`Visitor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum NodeType {
    Document,
    BlockQuote,
    List,
    Item,
    Paragraph,
    Heading,
    ThematicBreak,
    CodeBlock,
    HtmlBlock,
    CustomBlock(&'static str),
    Text,
    Code,
    Html,
    Autolink,
    Entity,
    SoftBreak,
    HardBreak,
    Emphasis,
    Strong,
    Link,
    Image,
    CustomInline(&'static str),
}

impl NodeType {
    pub fn of_block(kind: &BlockKind) -> Self {
        match kind {
            BlockKind::Document => NodeType::Document,
            BlockKind::BlockQuote => NodeType::BlockQuote,
            BlockKind::List(_) => NodeType::List,
            BlockKind::ListItem(_) => NodeType::Item,
            BlockKind::Paragraph => NodeType::Paragraph,
            BlockKind::Heading { .. } => NodeType::Heading,
            BlockKind::ThematicBreak => NodeType::ThematicBreak,
            BlockKind::CodeBlock(_) => NodeType::CodeBlock,
            BlockKind::HtmlBlock { .. } => NodeType::HtmlBlock,
            BlockKind::Custom { name, .. } => NodeType::CustomBlock(name),
        }
    }

    pub fn of_inline(kind: &InlineKind) -> Self {
        match kind {
            // unresolved delimiters never survive the inline phase
            InlineKind::Root | InlineKind::Text(_) | InlineKind::Delimiter(_) => NodeType::Text,
            InlineKind::Code(_) => NodeType::Code,
            InlineKind::Html(_) => NodeType::Html,
            InlineKind::Autolink { .. } => NodeType::Autolink,
            InlineKind::Entity { .. } => NodeType::Entity,
            InlineKind::LineBreak { hard: false } => NodeType::SoftBreak,
            InlineKind::LineBreak { hard: true } => NodeType::HardBreak,
            InlineKind::Emphasis { strong: false, .. } => NodeType::Emphasis,
            InlineKind::Emphasis { strong: true, .. } => NodeType::Strong,
            InlineKind::Link(_) => NodeType::Link,
            InlineKind::Image(_) => NodeType::Image,
            InlineKind::Custom { name, .. } => NodeType::CustomInline(name),
        }
    }

    /// Short name used in outlines.
    pub fn name(self) -> &'static str {
        match self {
            NodeType::Document => "document",
            NodeType::BlockQuote => "block_quote",
            NodeType::List => "list",
            NodeType::Item => "item",
            NodeType::Paragraph => "paragraph",
            NodeType::Heading => "heading",
            NodeType::ThematicBreak => "hr",
            NodeType::CodeBlock => "code_block",
            NodeType::HtmlBlock => "html_block",
            NodeType::Text => "text",
            NodeType::Code => "code",
            NodeType::Html => "html",
            NodeType::Autolink => "autolink",
            NodeType::Entity => "entity",
            NodeType::SoftBreak => "softbreak",
            NodeType::HardBreak => "hardbreak",
            NodeType::Emphasis => "emphasis",
            NodeType::Strong => "strong",
            NodeType::Link => "link",
            NodeType::Image => "image",
            NodeType::CustomBlock(name) | NodeType::CustomInline(name) => name,
        }
    }
}

/// A node handed to [`Visitor::write`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeRef {
    Block(BlockId),
    Inline(InlineId),
}

/// Consumer of a document walk.
///
/// `accept` only filters which nodes are written; the walk always descends, so a
/// visitor interested in headings still sees headings nested inside quotes and lists.
pub trait Visitor {
    fn accept(&mut self, node_type: NodeType) -> bool;

    fn write(&mut self, document: &Document<'_>, node: NodeRef);
}

impl Document<'_> {
    /// Walks every attached block in document order; a leaf's inline tree is walked
    /// right after the leaf itself.
    pub fn walk(&self, visitor: &mut impl Visitor) {
        self.walk_block(self.root(), visitor);
    }

    fn walk_block(&self, id: BlockId, visitor: &mut impl Visitor) {
        let block = self.block(id);
        if visitor.accept(NodeType::of_block(&block.kind)) {
            visitor.write(self, NodeRef::Block(id));
        }
        if let Some(root) = block.inline() {
            for child in self.inline_children(root) {
                self.walk_inline(child, visitor);
            }
        }
        for &child in self.children(id) {
            self.walk_block(child, visitor);
        }
    }

    fn walk_inline(&self, id: InlineId, visitor: &mut impl Visitor) {
        if visitor.accept(NodeType::of_inline(&self.inline(id).kind)) {
            visitor.write(self, NodeRef::Inline(id));
        }
        for child in self.inline_children(id) {
            self.walk_inline(child, visitor);
        }
    }

    /// A compact, comparable view of the whole tree.
    pub fn outline(&self) -> Outline {
        self.block_outline(self.root())
    }

    fn block_outline(&self, id: BlockId) -> Outline {
        let block = self.block(id);
        let mut outline = Outline::node(NodeType::of_block(&block.kind));
        match &block.kind {
            BlockKind::Heading { level, .. } => outline.level = Some(*level),
            BlockKind::CodeBlock(data) => {
                if !data.info.is_empty() {
                    outline.title = Some(data.info.clone());
                }
                outline.literal = Some(self.leaf_text(id));
            }
            BlockKind::HtmlBlock { .. } => outline.literal = Some(self.leaf_text(id)),
            _ => {}
        }
        if let Some(root) = block.inline() {
            outline.children = self.inline_outlines(root);
        }
        outline
            .children
            .extend(self.children(id).iter().map(|&child| self.block_outline(child)));
        outline
    }

    fn inline_outlines(&self, parent: InlineId) -> Vec<Outline> {
        let mut out: Vec<Outline> = Vec::new();
        for child in self.inline_children(parent) {
            let outline = self.inline_outline(child);
            // entities and leftover delimiters read as part of the surrounding text
            if let (Some(last), Some(text)) = (out.last_mut(), outline.text())
                && let Some(previous) = last.text_mut()
            {
                previous.push_str(text);
                continue;
            }
            out.push(outline);
        }
        out
    }

    fn inline_outline(&self, id: InlineId) -> Outline {
        let kind = &self.inline(id).kind;
        match kind {
            InlineKind::Text(text) | InlineKind::Entity { text, .. } => Outline::literal_text(text.clone()),
            InlineKind::Delimiter(delimiter) => Outline::literal_text(delimiter.literal()),
            InlineKind::Code(text) | InlineKind::Html(text) | InlineKind::Custom { text, .. } => {
                Outline {
                    literal: Some(text.clone()),
                    ..Outline::node(NodeType::of_inline(kind))
                }
            }
            InlineKind::Autolink { url, text, .. } => Outline {
                destination: Some(url.clone()),
                literal: Some(text.clone()),
                ..Outline::node(NodeType::Autolink)
            },
            InlineKind::Link(LinkData { url, title, .. }) | InlineKind::Image(LinkData { url, title, .. }) => {
                Outline {
                    destination: Some(url.clone()),
                    title: title.clone(),
                    children: self.inline_outlines(id),
                    ..Outline::node(NodeType::of_inline(kind))
                }
            }
            _ => Outline {
                children: self.inline_outlines(id),
                ..Outline::node(NodeType::of_inline(kind))
            },
        }
    }
}

/// Serializable tree view of a document.
///
/// `Display` prints it as an S-expression: text nodes as quoted strings, other nodes as
/// `(name level "destination" "title" "literal" children...)` with absent parts left out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Outline {
    pub node: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub literal: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Outline>,
}

impl Outline {
    fn node(node_type: NodeType) -> Self {
        Outline {
            node: node_type.name(),
            level: None,
            destination: None,
            title: None,
            literal: None,
            children: Vec::new(),
        }
    }

    fn literal_text(text: String) -> Self {
        Outline {
            literal: Some(text),
            ..Outline::node(NodeType::Text)
        }
    }

    fn text_mut(&mut self) -> Option<&mut String> {
        match self.node {
            "text" => self.literal.as_mut(),
            _ => None,
        }
    }

    fn text(&self) -> Option<&str> {
        match self.node {
            "text" => self.literal.as_deref(),
            _ => None,
        }
    }
}

impl fmt::Display for Outline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(text) = self.text() {
            return write!(f, "{text:?}");
        }
        write!(f, "({}", self.node)?;
        if let Some(level) = self.level {
            write!(f, " {level}")?;
        }
        for part in [&self.destination, &self.title, &self.literal].into_iter().flatten() {
            write!(f, " {part:?}")?;
        }
        for child in &self.children {
            write!(f, " {child}")?;
        }
        write!(f, ")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[derive(Default)]
    struct Headings(Vec<(u8, String)>);

    impl Visitor for Headings {
        fn accept(&mut self, node_type: NodeType) -> bool {
            node_type == NodeType::Heading
        }

        fn write(&mut self, document: &Document<'_>, node: NodeRef) {
            let NodeRef::Block(id) = node else { return };
            let block = document.block(id);
            if let BlockKind::Heading { level, .. } = block.kind {
                let text = block.inline().map(|root| document.plain_text(root)).unwrap_or_default();
                self.0.push((level, text));
            }
        }
    }

    #[derive(Default)]
    struct Trace(Vec<&'static str>);

    impl Visitor for Trace {
        fn accept(&mut self, _node_type: NodeType) -> bool {
            true
        }

        fn write(&mut self, document: &Document<'_>, node: NodeRef) {
            let node_type = match node {
                NodeRef::Block(id) => NodeType::of_block(&document.block(id).kind),
                NodeRef::Inline(id) => NodeType::of_inline(&document.inline(id).kind),
            };
            self.0.push(node_type.name());
        }
    }

    #[test]
    fn walk_is_pre_order_with_inlines_after_their_leaf() {
        let document = crate::parse_document("> # a *b*\n\nc").unwrap();
        let mut trace = Trace::default();
        document.walk(&mut trace);
        assert_eq!(
            trace.0,
            vec!["document", "block_quote", "heading", "text", "emphasis", "text", "paragraph", "text"]
        );
    }

    #[test]
    fn accept_filters_without_pruning() {
        let document = crate::parse_document("# One\n\n- ## Two `x`\n\n> Three\n> ---").unwrap();
        let mut headings = Headings::default();
        document.walk(&mut headings);
        assert_eq!(
            headings.0,
            vec![(1, "One".to_string()), (2, "Two x".to_string()), (2, "Three".to_string())]
        );
    }

    #[test]
    fn outline_display_and_json() {
        let document = crate::parse_document("## h\n\n```rs\nfn\n```\n\nto <a@b.c> &amp; x").unwrap();
        let outline = document.outline();
        assert_eq!(
            outline.to_string(),
            r#"(document (heading 2 "h") (code_block "rs" "fn") (paragraph "to " (autolink "mailto:a@b.c" "a@b.c") " & x"))"#
        );
        let json = serde_json::to_value(&outline).unwrap();
        assert_eq!(json["children"][0]["level"], 2);
        assert_eq!(json["children"][1]["title"], "rs");
        assert!(json["children"][0].get("destination").is_none());
    }
}
