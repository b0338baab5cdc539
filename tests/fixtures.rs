//! Runs every discovered `tests/fixtures/*.modl` document through the full
//! pipeline and compares its emitted JSON against the matching `*.json`
//! sibling. Grounded on the teacher's `TestDiscoverer` + the
//! `tests/integration_tests.rs` "discover, run all, report a summary"
//! pattern, generalized from Sutra's `(test ...)`-form discovery to MODL's
//! simpler file-pair convention.

use modl::driver::InterpretOptions;
use modl::syntax::parser::PestParser;
use modl::syntax::Parser;
use modl::testing::discover_fixtures;

#[test]
fn all_fixtures_evaluate_to_their_expected_json() {
    let fixtures = discover_fixtures(concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures"));
    assert!(!fixtures.is_empty(), "expected at least one fixture pair under tests/fixtures");

    let mut failures = Vec::new();
    for fixture in &fixtures {
        let source = std::fs::read_to_string(&fixture.source_path).unwrap();
        let expected_text = std::fs::read_to_string(&fixture.expected_path).unwrap();
        let expected: serde_json::Value = serde_json::from_str(&expected_text).unwrap();

        let tree = match PestParser::new().parse(&source) {
            Ok(tree) => tree,
            Err(e) => {
                failures.push(format!("{}: parse error: {e}", fixture.name));
                continue;
            }
        };
        let value = match modl::interpret(tree, &InterpretOptions::default()) {
            Ok(v) => v,
            Err(e) => {
                failures.push(format!("{}: interpret error: {e}", fixture.name));
                continue;
            }
        };
        let actual: serde_json::Value = serde_json::from_str(&modl::emit::emit_json(&value)).unwrap();

        if actual != expected {
            failures.push(format!(
                "{}: mismatch\n  expected: {expected}\n  actual:   {actual}",
                fixture.name
            ));
        }
    }

    if !failures.is_empty() {
        panic!("{} fixture(s) failed:\n{}", failures.len(), failures.join("\n"));
    }
}
