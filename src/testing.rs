//! Fixture discovery, grounded on the teacher's `src/testing/discovery.rs`
//! (`TestDiscoverer::discover_test_files`, a sorted `WalkDir` scan by
//! extension). Used by `tests/fixtures.rs` to pair every `tests/fixtures/
//! *.modl` document with its expected `*.json` output, rather than hand-
//! listing filenames in the test source — the ambient test-tooling layer
//! `SPEC_FULL.md` §8 commits to.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

/// One discovered fixture: a `.modl` source file and its sibling `.json`
/// expected-output file (same stem, same directory).
#[derive(Debug, Clone)]
pub struct Fixture {
    pub name: String,
    pub source_path: PathBuf,
    pub expected_path: PathBuf,
}

/// Recursively scans `root` for `.modl` files and pairs each with a
/// same-stem `.json` file in the same directory. Files without a matching
/// `.json` sibling are skipped (not every fixture need assert on output).
/// Returned in sorted (deterministic) order, matching the teacher's
/// discoverer.
pub fn discover_fixtures(root: impl AsRef<Path>) -> Vec<Fixture> {
    let mut found = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let Ok(entry) = entry else { continue };
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("modl") {
            continue;
        }
        let expected_path = path.with_extension("json");
        if !expected_path.is_file() {
            continue;
        }
        let name = path.file_stem().and_then(|s| s.to_str()).unwrap_or("fixture").to_string();
        found.push(Fixture {
            name,
            source_path: path.to_path_buf(),
            expected_path,
        });
    }
    found.sort_by(|a, b| a.name.cmp(&b.name));
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn pairs_modl_files_with_matching_json_siblings() {
        let dir = std::env::temp_dir().join("modl-testing-discover-fixtures");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("a.modl"), "x=1").unwrap();
        fs::write(dir.join("a.json"), "{}").unwrap();
        fs::write(dir.join("orphan.modl"), "x=1").unwrap();

        let fixtures = discover_fixtures(&dir);
        assert!(fixtures.iter().any(|f| f.name == "a"));
        assert!(!fixtures.iter().any(|f| f.name == "orphan"));
    }
}
