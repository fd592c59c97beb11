use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use interpreter::{Executor, Limits, Value};
use strand::loader::{LoadError, Loader};

const TEST_SUFFIX: &str = ".test.strand";

#[derive(Debug, Deserialize)]
pub struct ExpectedWarning {
    /// Substring that must appear in the warning message.
    pub contains: String,
}

#[derive(Debug, Deserialize)]
pub struct TestConfig {
    /// Human-readable test description.
    #[serde(default)]
    pub description: Option<String>,

    /// Initial register value. Defaults to the empty string.
    #[serde(default)]
    pub initial: String,

    /// Expected final register value (exact comparison).
    #[serde(default)]
    pub expect_output: Option<String>,

    /// Expected failure: the final exception's message, or the runtime
    /// error's Display string, must contain this substring.
    #[serde(default)]
    pub expect_error: Option<String>,

    /// If true, the test expects loading the program to fail.
    #[serde(default)]
    pub expect_load_error: bool,

    /// Expected lint warnings. If present (even empty), count and content are checked.
    #[serde(default)]
    pub expect_warnings: Option<Vec<ExpectedWarning>>,

    /// Step budget for the run, so a runaway loop fails the test instead of hanging it.
    #[serde(default = "default_max_steps")]
    pub max_steps: u64,
}

fn default_max_steps() -> u64 {
    1_000_000
}

/// Parse a `.test.strand` file into its TOML config and JSON program source.
fn parse_test_file(content: &str) -> Result<(TestConfig, &str), String> {
    let content = content.trim_start_matches('\u{feff}'); // strip BOM

    if !content.starts_with("---") {
        return Err("missing opening --- frontmatter delimiter".into());
    }

    let after_open = &content[3..];
    let after_open = after_open
        .strip_prefix('\n')
        .or_else(|| after_open.strip_prefix("\r\n"))
        .unwrap_or(after_open);

    let close_pos = after_open
        .find("\n---")
        .ok_or("missing closing --- frontmatter delimiter")?;

    let toml_str = after_open[..close_pos].trim_end_matches('\r');
    let rest_start = close_pos + 4; // skip \n---
    let source = after_open[rest_start..]
        .strip_prefix("\r\n")
        .or_else(|| after_open[rest_start..].strip_prefix('\n'))
        .unwrap_or(&after_open[rest_start..]);

    let config: TestConfig =
        toml::from_str(toml_str).map_err(|e| format!("TOML parse error: {}", e))?;

    Ok((config, source))
}

pub enum TestOutcome {
    Pass,
    Fail(String),
}

pub struct TestResult {
    pub path: PathBuf,
    pub description: Option<String>,
    pub outcome: TestOutcome,
}

fn run_single_test(path: &Path) -> TestResult {
    let fail = |description: Option<String>, reason: String| TestResult {
        path: path.to_path_buf(),
        description,
        outcome: TestOutcome::Fail(reason),
    };

    // 1. Read file
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => return fail(None, format!("cannot read file: {}", e)),
    };

    // 2. Parse frontmatter
    let (config, source) = match parse_test_file(&content) {
        Ok(pair) => pair,
        Err(e) => return fail(None, format!("frontmatter error: {}", e)),
    };

    let description = config.description.clone();

    // 3. Load program
    let load_result = Loader::new(source.to_string(), 0).load();

    // 4. Handle expect_load_error
    if config.expect_load_error {
        return TestResult {
            path: path.to_path_buf(),
            description,
            outcome: match load_result {
                Err(_) => TestOutcome::Pass,
                Ok(_) => TestOutcome::Fail("expected load error, but loading succeeded".into()),
            },
        };
    }

    let loaded = match load_result {
        Ok(loaded) => loaded,
        Err(errs) => {
            let msgs: Vec<String> = errs
                .iter()
                .map(|e| match e.notes.first() {
                    Some(note) => format!("{} ({})", e.message, note),
                    None => e.message.clone(),
                })
                .collect();
            return fail(
                description,
                format!("unexpected load error: {}", msgs.join("; ")),
            );
        }
    };

    // 5. Execute; exceptions and budget refusals both count as failures here
    let mut executor = Executor::new(Limits::new().with_max_steps(config.max_steps));
    let exec_result = match executor.run(&loaded.program, config.initial.as_str()) {
        Ok(Value::String(s)) => Ok(s),
        Ok(Value::Exception(exception)) => Err(exception.to_string()),
        Err(error) => Err(format!("runtime error: {}", error)),
    };
    debug!(path = %path.display(), steps = executor.steps(), "fixture executed");

    // 6. Check error/output expectations
    let outcome = match (&config.expect_error, &config.expect_output, exec_result) {
        (Some(expected_err), _, Err(actual_err)) => {
            if actual_err.contains(expected_err.as_str()) {
                None
            } else {
                Some(format!(
                    "expected error containing \"{}\", got: {}",
                    expected_err, actual_err
                ))
            }
        }
        (Some(expected_err), _, Ok(value)) => Some(format!(
            "expected error containing \"{}\", but execution produced \"{}\"",
            expected_err, value
        )),
        (None, Some(_), Err(actual_err)) => Some(format!("unexpected exception: {}", actual_err)),
        (None, Some(expected_output), Ok(value)) => {
            if value == *expected_output {
                None
            } else {
                Some(format!(
                    "output mismatch\n  expected: {:?}\n  actual:   {:?}",
                    expected_output, value
                ))
            }
        }
        (None, None, Err(actual_err)) => Some(format!("unexpected exception: {}", actual_err)),
        (None, None, Ok(_)) => None,
    };

    if let Some(reason) = outcome {
        return fail(description, reason);
    }

    // 7. Check warning expectations
    if let Some(expected_warnings) = &config.expect_warnings {
        if let Some(reason) = check_warnings(&loaded.warnings, expected_warnings) {
            return fail(description, reason);
        }
    }

    TestResult {
        path: path.to_path_buf(),
        description,
        outcome: TestOutcome::Pass,
    }
}

/// Check that actual warnings match expectations. Returns `Some(reason)` on mismatch.
fn check_warnings(warnings: &[LoadError], expected: &[ExpectedWarning]) -> Option<String> {
    if warnings.len() != expected.len() {
        let actual_msgs: Vec<String> = warnings.iter().map(|w| format!("  - {}", w)).collect();
        return Some(format!(
            "expected {} warning(s), got {}\n  actual warnings:\n{}",
            expected.len(),
            warnings.len(),
            if actual_msgs.is_empty() {
                "    (none)".to_string()
            } else {
                actual_msgs.join("\n")
            }
        ));
    }

    for (i, (actual, expected)) in warnings.iter().zip(expected.iter()).enumerate() {
        let msg = actual.to_string();
        if !msg.contains(&expected.contains) {
            return Some(format!(
                "warning[{}]: expected message containing \"{}\", got: {}",
                i, expected.contains, msg
            ));
        }
    }

    None
}

/// Discover `.test.strand` files grouped by category (subfolder relative to root).
/// Files directly in `root` get category "" (uncategorized).
fn discover_categorized(root: &Path) -> BTreeMap<String, Vec<PathBuf>> {
    let mut categories: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();
    collect_tests(root, root, &mut categories);
    for files in categories.values_mut() {
        files.sort();
    }
    categories
}

fn collect_tests(dir: &Path, root: &Path, out: &mut BTreeMap<String, Vec<PathBuf>>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_tests(&path, root, out);
        } else if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            if name.ends_with(TEST_SUFFIX) {
                let category = path
                    .parent()
                    .and_then(|p| p.strip_prefix(root).ok())
                    .map(|p| p.to_string_lossy().replace('\\', "/"))
                    .unwrap_or_default();
                out.entry(category).or_default().push(path);
            }
        }
    }
}

/// List available categories for the given test path.
pub fn list_categories(path: &Path) {
    if path.is_file() {
        eprintln!("(single file, no categories)");
        return;
    }

    let categories = discover_categorized(path);
    if categories.is_empty() {
        eprintln!("no {} files found in {}", TEST_SUFFIX, path.display());
        return;
    }

    eprintln!("available categories:");
    for (cat, files) in &categories {
        let label = if cat.is_empty() { "(root)" } else { cat.as_str() };
        eprintln!("  {} ({} tests)", label, files.len());
    }
}

fn pass_label(no_color: bool) -> &'static str {
    if no_color { "PASS" } else { "\x1b[32mPASS\x1b[0m" }
}

fn fail_label(no_color: bool) -> &'static str {
    if no_color { "FAIL" } else { "\x1b[31mFAIL\x1b[0m" }
}

fn bold(s: &str, no_color: bool) -> String {
    if no_color {
        s.to_string()
    } else {
        format!("\x1b[1m{}\x1b[0m", s)
    }
}

fn test_label(result: &TestResult) -> &str {
    result.description.as_deref().unwrap_or_else(|| {
        result
            .path
            .file_name()
            .and_then(|s| s.to_str())
            .and_then(|s| s.strip_suffix(TEST_SUFFIX))
            .unwrap_or("?")
    })
}

fn print_failures(failures: &[TestResult]) {
    eprintln!();
    eprintln!("failures:");
    for f in failures {
        eprintln!();
        eprintln!("  --- {} ---", f.path.display());
        if let TestOutcome::Fail(reason) = &f.outcome {
            for line in reason.lines() {
                eprintln!("  {}", line);
            }
        }
    }
}

/// Run all `.test.strand` files under `path` (or a single file).
/// If `categories` is non-empty, only run tests in those categories.
/// Returns exit code: 0 = all pass, 1 = any failure.
pub fn run_tests(path: &Path, no_color: bool, categories: &[String]) -> i32 {
    let run_categories: BTreeMap<String, Vec<PathBuf>> = if path.is_file() {
        BTreeMap::from([(String::new(), vec![path.to_path_buf()])])
    } else {
        let all_categories = discover_categorized(path);
        if all_categories.is_empty() {
            eprintln!("no {} files found in {}", TEST_SUFFIX, path.display());
            return 1;
        }
        filter_categories(all_categories, categories)
    };

    if run_categories.is_empty() {
        eprintln!("no matching categories found");
        return 1;
    }

    let mut passed = 0usize;
    let mut failures: Vec<TestResult> = Vec::new();

    for (cat, files) in &run_categories {
        if !path.is_file() {
            let header = if cat.is_empty() { "(root)" } else { cat.as_str() };
            eprintln!();
            eprintln!("{}", bold(header, no_color));
        }

        for file in files {
            let result = run_single_test(file);
            match &result.outcome {
                TestOutcome::Pass => {
                    passed += 1;
                    eprintln!("  {}  {}", pass_label(no_color), test_label(&result));
                }
                TestOutcome::Fail(_) => {
                    eprintln!("  {}  {}", fail_label(no_color), test_label(&result));
                    failures.push(result);
                }
            }
        }
    }

    if !failures.is_empty() {
        print_failures(&failures);
    }

    let failed = failures.len();
    eprintln!();
    if failed == 0 {
        let ok = if no_color { "ok" } else { "\x1b[32mok\x1b[0m" };
        eprintln!("test result: {}. {} passed, 0 failed", ok, passed);
        0
    } else {
        let bad = if no_color { "FAILED" } else { "\x1b[31mFAILED\x1b[0m" };
        eprintln!(
            "test result: {}. {} passed, {} failed (of {})",
            bad,
            passed,
            failed,
            passed + failed
        );
        1
    }
}

fn filter_categories(
    all_categories: BTreeMap<String, Vec<PathBuf>>,
    requested: &[String],
) -> BTreeMap<String, Vec<PathBuf>> {
    if requested.is_empty() {
        return all_categories;
    }

    let mut filtered = BTreeMap::new();
    for requested in requested {
        let req = requested.trim_matches('/');
        let mut found = false;
        for (cat, files) in &all_categories {
            if cat == req || cat.starts_with(&format!("{}/", req)) {
                filtered.insert(cat.clone(), files.clone());
                found = true;
            }
        }
        if !found {
            eprintln!(
                "warning: category '{}' not found (available: {})",
                req,
                all_categories
                    .keys()
                    .map(|k| if k.is_empty() { "(root)" } else { k.as_str() })
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }
    }
    filtered
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    const TRY_PROGRAM: &str = r#"[
  { "type": "set_value", "value": "a" },
  { "type": "try",
    "body": [{ "type": "remove_first_char" }, { "type": "remove_first_char" }],
    "catch": [{ "type": "set_value", "value": "Exception!" }] }
]"#;

    fn write_fixture(dir: &Path, name: &str, frontmatter: &str, program: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, format!("---\n{}\n---\n{}", frontmatter, program)).unwrap();
        path
    }

    fn assert_pass(result: &TestResult) {
        if let TestOutcome::Fail(reason) = &result.outcome {
            panic!("{} failed: {}", result.path.display(), reason);
        }
    }

    fn failure_reason(result: &TestResult) -> &str {
        match &result.outcome {
            TestOutcome::Fail(reason) => reason,
            TestOutcome::Pass => panic!("{} unexpectedly passed", result.path.display()),
        }
    }

    #[test]
    fn frontmatter_splits_config_from_program() {
        let content = "---\ndescription = \"d\"\ninitial = \"x\"\n---\n[]\n";
        let (config, source) = parse_test_file(content).unwrap();
        assert_eq!(config.description.as_deref(), Some("d"));
        assert_eq!(config.initial, "x");
        assert_eq!(config.max_steps, 1_000_000);
        assert_eq!(source, "[]\n");
    }

    #[test]
    fn frontmatter_must_be_delimited() {
        assert!(parse_test_file("[]").is_err());
        assert!(parse_test_file("---\ninitial = \"x\"\n[]").is_err());
    }

    #[test]
    fn expected_output_passes() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_fixture(
            dir.path(),
            "try.test.strand",
            "expect_output = \"Exception!\"",
            TRY_PROGRAM,
        );
        assert_pass(&run_single_test(&path));
    }

    #[test]
    fn output_mismatch_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_fixture(
            dir.path(),
            "try.test.strand",
            "expect_output = \"a\"",
            TRY_PROGRAM,
        );
        assert!(failure_reason(&run_single_test(&path)).contains("output mismatch"));
    }

    #[test]
    fn expected_exception_matches_message() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_fixture(
            dir.path(),
            "empty.test.strand",
            "expect_error = \"cannot remove first character\"",
            r#"[{ "type": "cdr" }]"#,
        );
        assert_pass(&run_single_test(&path));
    }

    #[test]
    fn runaway_loop_is_stopped_by_max_steps() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_fixture(
            dir.path(),
            "spin.test.strand",
            "max_steps = 100\nexpect_error = \"step limit\"\nexpect_warnings = [{ contains = \"empty body\" }]",
            r#"[{ "type": "while", "condition": {
                "type": "equal",
                "left": { "type": "current_value" },
                "right": { "type": "current_value" } } }]"#,
        );
        assert_pass(&run_single_test(&path));
    }

    #[test]
    fn load_errors_are_reported() {
        let dir = tempfile::tempdir().unwrap();
        let expected = write_fixture(
            dir.path(),
            "bad.test.strand",
            "expect_load_error = true",
            r#"[{ "type": "reverse" }]"#,
        );
        assert_pass(&run_single_test(&expected));

        let unexpected = write_fixture(
            dir.path(),
            "bad2.test.strand",
            "expect_output = \"\"",
            r#"[{ "type": "reverse" }]"#,
        );
        assert!(failure_reason(&run_single_test(&unexpected)).contains("unexpected load error"));
    }

    #[test]
    fn discovery_groups_by_subdirectory() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("control")).unwrap();
        write_fixture(dir.path(), "a.test.strand", "", "[]");
        write_fixture(&dir.path().join("control"), "b.test.strand", "", "[]");
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let categories = discover_categorized(dir.path());
        assert_eq!(categories.keys().collect::<Vec<_>>(), vec!["", "control"]);
        assert_eq!(categories["control"].len(), 1);

        assert_eq!(run_tests(dir.path(), true, &[]), 0);
        assert_eq!(run_tests(dir.path(), true, &["control".to_string()]), 0);
        assert_eq!(run_tests(dir.path(), true, &["missing".to_string()]), 1);
    }

    #[test]
    fn conformance_suite_passes() {
        let root = Path::new(env!("CARGO_MANIFEST_DIR")).join("../conformance");
        assert_eq!(run_tests(&root, true, &[]), 0);
    }
}
