//! Serde model of mochawesome result documents.
//!
//! Only the fields the pipeline reads are typed. Everything else is kept in
//! flattened `extra` maps so a merged report serializes back with every field
//! the fragments carried.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Merged tree of all suite/test results for one run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AggregateReport {
    #[serde(default)]
    pub stats: Stats,

    /// Root suites, one per spec file
    #[serde(default)]
    pub results: Vec<Suite>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Run-level counters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    #[serde(default)]
    pub suites: u64,
    #[serde(default)]
    pub tests: u64,
    #[serde(default)]
    pub passes: u64,
    #[serde(default)]
    pub pending: u64,
    #[serde(default)]
    pub failures: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<DateTime<Utc>>,
    /// Milliseconds
    #[serde(default)]
    pub duration: u64,
    #[serde(default)]
    pub tests_registered: u64,
    #[serde(default)]
    pub pass_percent: f64,
    #[serde(default)]
    pub pending_percent: f64,
    #[serde(default)]
    pub other: u64,
    #[serde(default)]
    pub has_other: bool,
    #[serde(default)]
    pub skipped: u64,
    #[serde(default)]
    pub has_skipped: bool,
}

/// A suite node; suites nest without a depth limit
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Suite {
    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub tests: Vec<Test>,

    #[serde(default)]
    pub suites: Vec<Suite>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A single test case
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Test {
    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub full_title: String,

    /// `null` for tests that never ran
    #[serde(default)]
    pub state: Option<TestState>,

    /// `{}` for tests without an error
    #[serde(default)]
    pub err: TestError,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Test {
    pub fn is_failed(&self) -> bool {
        self.state == Some(TestState::Failed)
    }

    /// First non-empty line of the error message, trimmed
    pub fn error_summary(&self) -> Option<&str> {
        self.err
            .message
            .as_deref()?
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
    }
}

/// Error attached to a failed test
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TestError {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estack: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diff: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Test outcome; unknown values round-trip through `Other`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TestState {
    Passed,
    Failed,
    Pending,
    Skipped,
    Other(String),
}

impl From<String> for TestState {
    fn from(value: String) -> Self {
        match value.as_str() {
            "passed" => Self::Passed,
            "failed" => Self::Failed,
            "pending" => Self::Pending,
            "skipped" => Self::Skipped,
            _ => Self::Other(value),
        }
    }
}

impl From<TestState> for String {
    fn from(state: TestState) -> Self {
        state.to_string()
    }
}

impl fmt::Display for TestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Passed => f.write_str("passed"),
            Self::Failed => f.write_str("failed"),
            Self::Pending => f.write_str("pending"),
            Self::Skipped => f.write_str("skipped"),
            Self::Other(s) => f.write_str(s),
        }
    }
}

impl AggregateReport {
    /// Failed tests in document order: a suite's own tests come before the
    /// tests of its nested suites, and sibling subtrees are visited in order.
    pub fn failed_tests(&self) -> Vec<&Test> {
        let mut failed = Vec::new();
        let mut stack: Vec<&Suite> = self.results.iter().rev().collect();

        while let Some(suite) = stack.pop() {
            failed.extend(suite.tests.iter().filter(|test| test.is_failed()));
            stack.extend(suite.suites.iter().rev());
        }

        failed
    }

    /// Total number of tests in the tree, regardless of state
    pub fn test_count(&self) -> usize {
        let mut count = 0;
        let mut stack: Vec<&Suite> = self.results.iter().collect();
        while let Some(suite) = stack.pop() {
            count += suite.tests.len();
            stack.extend(suite.suites.iter());
        }
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn test_case(title: &str, state: &str) -> Value {
        json!({
            "title": title,
            "fullTitle": format!("suite {title}"),
            "state": state,
            "err": if state == "failed" { json!({ "message": format!("{title} broke") }) } else { json!({}) },
            "uuid": format!("uuid-{title}"),
        })
    }

    #[test]
    fn test_state_round_trips_unknown_values() {
        let parsed: TestState = serde_json::from_value(json!("flaky")).unwrap();
        assert_eq!(parsed, TestState::Other("flaky".to_string()));
        assert_eq!(serde_json::to_value(&parsed).unwrap(), json!("flaky"));

        let failed: TestState = serde_json::from_value(json!("failed")).unwrap();
        assert_eq!(failed, TestState::Failed);
    }

    #[test]
    fn test_null_state_and_empty_err() {
        let test: Test = serde_json::from_value(json!({
            "title": "skipped one",
            "fullTitle": "suite skipped one",
            "state": null,
            "err": {},
        }))
        .unwrap();
        assert_eq!(test.state, None);
        assert_eq!(test.err, TestError::default());
        assert!(!test.is_failed());
    }

    #[test]
    fn test_unknown_fields_are_preserved() {
        let suite: Suite = serde_json::from_value(json!({
            "title": "root",
            "uuid": "abc",
            "fullFile": "cypress/e2e/login.cy.js",
            "tests": [test_case("a", "passed")],
            "suites": [],
        }))
        .unwrap();

        let back = serde_json::to_value(&suite).unwrap();
        assert_eq!(back["uuid"], "abc");
        assert_eq!(back["fullFile"], "cypress/e2e/login.cy.js");
        assert_eq!(back["tests"][0]["uuid"], "uuid-a");
    }

    #[test]
    fn test_failed_tests_document_order() {
        let report: AggregateReport = serde_json::from_value(json!({
            "stats": {},
            "results": [
                {
                    "title": "",
                    "tests": [test_case("r1", "failed")],
                    "suites": [
                        {
                            "title": "outer",
                            "tests": [test_case("o1", "failed"), test_case("o2", "passed")],
                            "suites": [
                                { "title": "inner", "tests": [test_case("i1", "failed")], "suites": [] }
                            ]
                        },
                        { "title": "sibling", "tests": [test_case("s1", "failed")], "suites": [] }
                    ]
                },
                { "title": "", "tests": [test_case("r2", "failed")], "suites": [] }
            ]
        }))
        .unwrap();

        let titles: Vec<&str> = report.failed_tests().iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["r1", "o1", "i1", "s1", "r2"]);
        assert_eq!(report.test_count(), 6);
    }

    #[test]
    fn test_deep_nesting_is_traversed() {
        let mut suite = Suite {
            title: "leaf".to_string(),
            tests: vec![serde_json::from_value(test_case("deep", "failed")).unwrap()],
            ..Suite::default()
        };
        for depth in 0..1_000 {
            suite = Suite {
                title: format!("level {depth}"),
                tests: vec![serde_json::from_value(test_case("shallow", "passed")).unwrap()],
                suites: vec![suite],
                ..Suite::default()
            };
        }
        let report = AggregateReport {
            results: vec![suite],
            ..AggregateReport::default()
        };

        let failed = report.failed_tests();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].title, "deep");
    }

    #[test]
    fn test_error_summary_first_line() {
        let test = Test {
            err: TestError {
                message: Some("timeout exceeded\n  at foo()\n".to_string()),
                ..TestError::default()
            },
            ..Test::default()
        };
        assert_eq!(test.error_summary(), Some("timeout exceeded"));
        assert_eq!(Test::default().error_summary(), None);
    }
}
