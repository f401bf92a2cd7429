use markcore::parse_document;
use serde::Deserialize;
use std::fs;

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct OutlineCase {
    markdown: String,
    outline: String,
    example: u32,
    section: String,
}

#[test]
fn outline_fixtures() {
    let data = fs::read_to_string("tests/data/outlines.json").expect("Failed to read outlines.json");
    let cases: Vec<OutlineCase> = serde_json::from_str(&data).expect("Failed to parse outlines.json");

    let mut passed = 0;
    let mut failures = Vec::new();

    for case in &cases {
        let result = parse_document(&case.markdown)
            .map(|document| document.outline().to_string())
            .unwrap_or_else(|err| format!("error: {err}"));

        if result == case.outline {
            passed += 1;
        } else {
            if failures.len() < 5 {
                eprintln!("\nExample {} failed ({})", case.example, case.section);
                eprintln!("  Input: {:?}", case.markdown);
                eprintln!("  Expected: {}", case.outline);
                eprintln!("  Got: {}", result);
            }
            failures.push(case.example);
        }
    }

    eprintln!("\nOutline fixtures: {} passed, {} failed", passed, failures.len());
    assert!(failures.is_empty(), "failed examples: {:?}", failures);
}
