use markcore::ast::InlineKind;
use markcore::{Document, Pipeline, PipelineBuilder, parse, parse_document};
use pretty_assertions::assert_eq;
use rstest::rstest;

fn outline(text: &str) -> String {
    parse_document(text).unwrap().outline().to_string()
}

/// Every non-whitespace character lies inside an attached block or a link reference
/// definition.
fn unaccounted(document: &Document<'_>) -> Vec<usize> {
    let source = document.source();
    let mut covered = vec![false; source.len()];
    let mut mark = |start: usize, end: usize| {
        for slot in &mut covered[start.min(source.len())..end.min(source.len())] {
            *slot = true;
        }
    };
    for id in document.descendants().into_iter().skip(1) {
        let span = document.block(id).span;
        mark(span.start, span.end);
    }
    for definition in document.link_references().values() {
        mark(definition.span.start, definition.span.end);
    }
    source
        .char_indices()
        .filter(|(offset, c)| !c.is_whitespace() && !covered[*offset])
        .map(|(offset, _)| offset)
        .collect()
}

#[test_fuzz::test_fuzz]
fn parse_accounts_for_every_character(text: String) {
    let document = parse_document(&text).unwrap();
    assert_eq!(unaccounted(&document), Vec::<usize>::new(), "input: {text:?}");
}

#[rstest]
#[case("*a")]
#[case("a*")]
#[case("_a")]
#[case("**a")]
#[case("a**")]
#[case("a * b")]
#[case("_ a _")]
fn unpairable_delimiters_stay_one_literal(#[case] text: &str) {
    let document = parse_document(text).unwrap();
    let paragraph = document.children(document.root())[0];
    let root = document.block(paragraph).inline().unwrap();
    let children: Vec<_> = document.inline_children(root).collect();
    assert_eq!(children.len(), 1);
    assert_eq!(document.inline(children[0]).kind, InlineKind::Text(text.to_string()));
}

#[test]
fn emphasis_nests_without_overlap() {
    assert_eq!(
        outline("*a **b** c*"),
        r#"(document (paragraph (emphasis "a " (strong "b") " c")))"#
    );
}

#[test]
fn rule_of_three_skips_mixed_runs() {
    // the inner single run cannot close the double opener, but the outer runs pair
    assert_eq!(outline("**a*b**"), r#"(document (paragraph (strong "a*b")))"#);
    assert_eq!(outline("*a**b*"), r#"(document (paragraph (emphasis "a**b")))"#);
}

#[test]
fn links_do_not_contain_links() {
    assert_eq!(
        outline("[a [b](/b) c](/a)"),
        r#"(document (paragraph "[a " (link "/b" "b") " c](/a)"))"#
    );
}

#[test]
fn quoted_paragraph_and_lazy_continuation() {
    let document = parse_document("> a\n> b\n").unwrap();
    let quote = document.children(document.root())[0];
    let paragraph = document.children(quote)[0];
    assert_eq!(document.block(paragraph).lines().len(), 2);
    assert_eq!(
        document.outline().to_string(),
        r#"(document (block_quote (paragraph "a" (softbreak) "b")))"#
    );

    assert_eq!(
        outline("> a\np\n> b\n"),
        r#"(document (block_quote (paragraph "a" (softbreak) "p" (softbreak) "b")))"#
    );
}

#[test]
fn references_defined_later_resolve() {
    assert_eq!(outline("[x]\n\n[x]: /u"), r#"(document (paragraph (link "/u" "x")))"#);
}

#[rstest]
#[case("")]
#[case("plain text\nover two lines")]
#[case("# Title #\n\nSub\n---\n\n***")]
#[case("> quote\nlazy\n>\n> > nested\n")]
#[case("- a\n- b\n\n  c\n10) ten\n11) eleven\n-\n")]
#[case("```rust\nfn main() {}\n```\n\n    indented\n\tcode\n")]
#[case("<div>\n<p>raw</p>\n</div>\n\n<!-- c -->\n")]
#[case("[ref]: /url 'title'\n[other]:\n  <x y>\n\n[ref] and [other][]")]
#[case("*a* **b** _c_ `d` <http://e> &amp; \\* f  \ng")]
#[case(">\t\tfoo\n -\tbar\n")]
#[case("[a [b](/b) c](/a) ![i *j*](/k \"l\")\n*[x*](/y)")]
fn every_character_is_accounted_for(#[case] text: &str) {
    parse_accounts_for_every_character(text.to_string());
}

#[rstest]
#[case("a\n> b\n> c")]
#[case("a\n- b\n- c")]
#[case("- a\n  - b\n\n  - c")]
#[case("a\n```\nb\n```")]
#[case("a\n<div>\nb")]
#[case("p\n<!-- x\ny")]
#[case("a\n<script>\nb")]
#[case("a\n<?x\nb")]
#[case("a\n# h\nb")]
#[case("a\n***\nb")]
fn interrupted_paragraphs_are_accounted_for(#[case] text: &str) {
    parse_accounts_for_every_character(text.to_string());
}

/// Every sequence of up to four fragments drawn from common block and inline markup.
fn markup_corpus() -> impl Iterator<Item = String> {
    const FRAGMENTS: [&str; 15] = [
        "", "a", "\n", "> ", "- ", "1. ", "  ", "```", "<div>", "<!--", "*", "[", "](/u)", "#", "---",
    ];
    let n = FRAGMENTS.len();
    (0..n.pow(4)).map(move |mut code| {
        let mut text = String::new();
        for _ in 0..4 {
            text.push_str(FRAGMENTS[code % n]);
            code /= n;
        }
        text
    })
}

#[test]
fn any_markup_produces_a_document() {
    let failures: Vec<_> = markup_corpus()
        .filter_map(|text| parse_document(&text).err().map(|err| format!("{text:?}: {err}")))
        .take(10)
        .collect();
    assert_eq!(failures, Vec::<String>::new());
}

#[test]
fn unclosed_brackets_stay_flat() {
    let text = "[".repeat(20_000);
    assert_eq!(outline(&text), format!("(document (paragraph {text:?}))"));

    let text = "*[".repeat(2_000) + &"]*".repeat(2_000);
    let document = parse_document(&text).unwrap();
    assert_eq!(unaccounted(&document), Vec::<usize>::new());
    let paragraph = document.children(document.root())[0];
    let root = document.block(paragraph).inline().unwrap();
    assert_eq!(document.plain_text(root).matches('[').count(), 2_000);
}

#[test]
fn parsing_is_deterministic_across_threads() {
    let pipeline = Pipeline::commonmark();
    let texts = [
        "# a\n\n> b *c*\n",
        "- [x][]\n- y\n\n[x]: /x",
        "```\ncode\n```\n**strong**",
    ];
    let expected: Vec<_> = texts.iter().map(|text| parse(text, &pipeline).unwrap().outline()).collect();

    std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|_| {
                scope.spawn(|| {
                    texts
                        .iter()
                        .map(|text| parse(text, &pipeline).unwrap().outline())
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), expected);
        }
    });
}

#[test]
fn deep_nesting_terminates() {
    let text = "> ".repeat(500) + "deep";
    let document = parse_document(&text).unwrap();
    assert_eq!(unaccounted(&document), Vec::<usize>::new());

    let shallow = PipelineBuilder::commonmark()
        .options(markcore::ParseOptions {
            max_nesting_depth: 3,
            ..Default::default()
        })
        .build()
        .unwrap();
    let document = parse(&text, &shallow).unwrap();
    assert!(document.descendants().len() <= 5);
}
