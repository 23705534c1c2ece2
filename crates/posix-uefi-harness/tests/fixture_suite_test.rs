//! Runs every fixture file shipped with the harness.

use std::path::Path;

use posix_uefi_harness::verify::VerificationSummary;
use posix_uefi_harness::{FixtureSet, HarnessError, TestRunner};

fn fixture_dir() -> &'static Path {
    Path::new(concat!(env!("CARGO_MANIFEST_DIR"), "/fixtures"))
}

#[test]
fn shipped_fixtures_all_pass() {
    let sets = FixtureSet::load_dir(fixture_dir()).expect("fixtures load");
    let families: Vec<&str> = sets.iter().map(|set| set.family.as_str()).collect();
    assert_eq!(families, ["printf", "stream"]);

    let runner = TestRunner::new("fixture-suite");
    let results: Vec<_> = sets.iter().flat_map(|set| runner.run(set)).collect();
    let summary = VerificationSummary::from_results(results);
    let failures: Vec<String> = summary
        .failures()
        .map(|r| format!("{}/{}: {:?}", r.family, r.case_name, r.diff))
        .collect();
    assert!(failures.is_empty(), "{failures:#?}");
    assert!(summary.total >= 40);
}

#[test]
fn case_names_are_unique_per_family() {
    for set in FixtureSet::load_dir(fixture_dir()).expect("fixtures load") {
        let mut names: Vec<&str> = set.cases.iter().map(|c| c.name.as_str()).collect();
        let total = names.len();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), total, "duplicate case in {}", set.family);
    }
}

#[test]
fn empty_directory_is_an_error() {
    let dir = std::env::temp_dir().join(format!("posix-uefi-empty-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let err = FixtureSet::load_dir(&dir).unwrap_err();
    assert!(matches!(err, HarnessError::NoFixtures(_)));
    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn malformed_fixture_names_the_file() {
    let dir = std::env::temp_dir().join(format!("posix-uefi-bad-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("broken.json"), "{ not json").unwrap();
    let err = FixtureSet::load_dir(&dir).unwrap_err();
    assert!(err.to_string().contains("broken.json"), "{err}");
    std::fs::remove_dir_all(&dir).unwrap();
}
