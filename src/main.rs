use markcore::ast::BlockKind;
use markcore::{Document, NodeRef, NodeType, Visitor, parse_document};
use std::io::{self, Read};
use std::process::ExitCode;

/// Collects headings as (level, text) pairs.
#[derive(Default)]
struct TableOfContents {
    entries: Vec<(u8, String)>,
}

impl Visitor for TableOfContents {
    fn accept(&mut self, node_type: NodeType) -> bool {
        node_type == NodeType::Heading
    }

    fn write(&mut self, document: &Document<'_>, node: NodeRef) {
        let NodeRef::Block(id) = node else { return };
        let block = document.block(id);
        if let BlockKind::Heading { level, .. } = block.kind {
            let text = block
                .inline()
                .map(|root| document.plain_text(root))
                .unwrap_or_default();
            self.entries.push((level, text.trim().to_string()));
        }
    }
}

impl TableOfContents {
    /// Nested bullet list, indented relative to the shallowest heading.
    fn render(&self) -> String {
        let top = self.entries.iter().map(|(level, _)| *level).min().unwrap_or(1);
        let mut out = String::new();
        for (level, text) in &self.entries {
            let depth = usize::from(level - top);
            out.push_str(&"  ".repeat(depth));
            out.push_str("- ");
            out.push_str(text);
            out.push('\n');
        }
        out
    }
}

fn main() -> ExitCode {
    let json = std::env::args().skip(1).any(|arg| arg == "--json");

    let mut input = String::new();
    if let Err(err) = io::stdin().read_to_string(&mut input) {
        eprintln!("Failed to read stdin: {err}");
        return ExitCode::FAILURE;
    }
    let document = match parse_document(&input) {
        Ok(document) => document,
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::FAILURE;
        }
    };

    if json {
        match serde_json::to_string_pretty(&document.outline()) {
            Ok(output) => println!("{output}"),
            Err(err) => {
                eprintln!("{err}");
                return ExitCode::FAILURE;
            }
        }
    } else {
        let mut toc = TableOfContents::default();
        document.walk(&mut toc);
        print!("{}", toc.render());
    }
    ExitCode::SUCCESS
}
