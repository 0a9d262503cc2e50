use crate::{IndexerError, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Outcome of one test case in the last run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestOutcome {
    Passed,
    Failed,
}

/// Parsed JUnit report: test id (`classname::name`) to outcome.
///
/// Skipped cases produce no result; a case reported more than once fails if any
/// occurrence failed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TestReport {
    pub results: BTreeMap<String, TestOutcome>,
    pub skipped: usize,
}

impl TestReport {
    pub fn from_path(path: &Path) -> Result<Self> {
        let xml = match std::fs::read_to_string(path) {
            Ok(xml) => xml,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(IndexerError::ReportMissing(path.display().to_string()))
            }
            Err(err) => return Err(err.into()),
        };
        parse_junit(&xml).map_err(|err| match err {
            IndexerError::MalformedJunit(msg) => {
                IndexerError::MalformedJunit(format!("{}: {msg}", path.display()))
            }
            other => other,
        })
    }

    pub fn outcome(&self, test: &str) -> Option<TestOutcome> {
        self.results.get(test).copied()
    }

    pub fn count(&self, outcome: TestOutcome) -> usize {
        self.results.values().filter(|o| **o == outcome).count()
    }
}

#[derive(Debug)]
struct OpenCase {
    id: String,
    failed: bool,
    skipped: bool,
}

/// Composite id used to address a test case.
pub fn test_id(classname: &str, name: &str) -> String {
    if classname.is_empty() {
        name.to_string()
    } else {
        format!("{classname}::{name}")
    }
}

pub fn parse_junit(xml: &str) -> Result<TestReport> {
    let mut reader = Reader::from_str(xml);
    let mut report = TestReport::default();
    let mut open: Option<OpenCase> = None;
    let mut depth: usize = 0;
    let mut saw_suite = false;

    loop {
        let event = reader.read_event().map_err(|err| {
            IndexerError::MalformedJunit(format!(
                "at byte {}: {err}",
                reader.buffer_position()
            ))
        })?;
        match event {
            Event::Start(tag) => {
                depth += 1;
                match tag.name().as_ref() {
                    b"testsuite" | b"testsuites" => saw_suite = true,
                    b"testcase" => open = Some(open_case(&tag)?),
                    other => mark_case(open.as_mut(), other),
                }
            }
            Event::Empty(tag) => match tag.name().as_ref() {
                b"testsuite" | b"testsuites" => saw_suite = true,
                b"testcase" => finish_case(&mut report, open_case(&tag)?),
                other => mark_case(open.as_mut(), other),
            },
            Event::End(tag) => {
                depth = depth.saturating_sub(1);
                if tag.name().as_ref() == b"testcase" {
                    if let Some(case) = open.take() {
                        finish_case(&mut report, case);
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if depth != 0 {
        return Err(IndexerError::MalformedJunit(
            "document ended with unclosed elements".to_string(),
        ));
    }
    if !saw_suite {
        return Err(IndexerError::MalformedJunit(
            "no <testsuite> element found".to_string(),
        ));
    }
    Ok(report)
}

fn open_case(tag: &BytesStart<'_>) -> Result<OpenCase> {
    let mut classname = String::new();
    let mut name = None;
    for attr in tag.attributes() {
        let attr = attr.map_err(|err| IndexerError::MalformedJunit(err.to_string()))?;
        let value = attr
            .unescape_value()
            .map_err(|err| IndexerError::MalformedJunit(err.to_string()))?;
        match attr.key.as_ref() {
            b"classname" => classname = value.trim().to_string(),
            b"name" => name = Some(value.trim().to_string()),
            _ => {}
        }
    }
    let name = name.ok_or_else(|| {
        IndexerError::MalformedJunit("<testcase> without a name attribute".to_string())
    })?;
    Ok(OpenCase {
        id: test_id(&classname, &name),
        failed: false,
        skipped: false,
    })
}

fn mark_case(open: Option<&mut OpenCase>, tag: &[u8]) {
    let Some(case) = open else { return };
    match tag {
        b"failure" | b"error" => case.failed = true,
        b"skipped" => case.skipped = true,
        _ => {}
    }
}

fn finish_case(report: &mut TestReport, case: OpenCase) {
    if case.failed {
        report.results.insert(case.id, TestOutcome::Failed);
    } else if case.skipped {
        log::debug!("skipped test {} carries no result", case.id);
        report.skipped += 1;
    } else {
        report
            .results
            .entry(case.id)
            .or_insert(TestOutcome::Passed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const REPORT: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<testsuites>
  <testsuite name="pytest" tests="4" failures="1">
    <testcase classname="tests/test_sync.py" name="test_merge" time="0.01"/>
    <testcase classname="tests/test_sync.py" name="test_conflict" time="0.02">
      <failure message="assert 1 == 2">trace &amp; more</failure>
    </testcase>
    <testcase classname="tests/test_sync.py" name="test_slow">
      <skipped message="slow"/>
    </testcase>
    <testcase classname="" name="standalone"></testcase>
  </testsuite>
</testsuites>
"#;

    #[test]
    fn parses_outcomes_and_skips() {
        let report = parse_junit(REPORT).unwrap();
        assert_eq!(
            report.outcome("tests/test_sync.py::test_merge"),
            Some(TestOutcome::Passed)
        );
        assert_eq!(
            report.outcome("tests/test_sync.py::test_conflict"),
            Some(TestOutcome::Failed)
        );
        assert_eq!(report.outcome("tests/test_sync.py::test_slow"), None);
        assert_eq!(report.outcome("standalone"), Some(TestOutcome::Passed));
        assert_eq!(report.skipped, 1);
        assert_eq!(report.count(TestOutcome::Passed), 2);
    }

    #[test]
    fn repeated_case_fails_if_any_run_failed() {
        let xml = r#"<testsuite>
            <testcase classname="a" name="t"><error/></testcase>
            <testcase classname="a" name="t"/>
        </testsuite>"#;
        let report = parse_junit(xml).unwrap();
        assert_eq!(report.outcome("a::t"), Some(TestOutcome::Failed));
    }

    #[test]
    fn rejects_malformed_documents() {
        assert!(matches!(
            parse_junit("<testsuite><testcase name=\"x\"></testsuite>"),
            Err(IndexerError::MalformedJunit(_))
        ));
        assert!(matches!(
            parse_junit("<testsuite><testcase name=\"x\">"),
            Err(IndexerError::MalformedJunit(_))
        ));
        assert!(matches!(
            parse_junit(""),
            Err(IndexerError::MalformedJunit(_))
        ));
        assert!(matches!(
            parse_junit("<testsuite><testcase classname=\"a\"/></testsuite>"),
            Err(IndexerError::MalformedJunit(_))
        ));
    }
}
