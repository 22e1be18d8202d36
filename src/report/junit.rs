use crate::runner::state::{FlowResult, FlowStatus, SuiteResult};
use anyhow::Result;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::io::Cursor;
use std::path::{Path, PathBuf};

fn seconds(ms: u64) -> String {
    (ms as f64 / 1000.0).to_string()
}

/// Generate a JUnit XML document with one `<testcase>` per flow
pub fn generate_junit_xml(suite: &SuiteResult) -> Result<String> {
    let mut writer = Writer::new(Cursor::new(Vec::new()));

    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let tests = suite.summary.total.to_string();
    let failures = suite.summary.failed.to_string();
    let skipped = suite.summary.skipped.to_string();
    let time = seconds(suite.duration_ms);

    let mut suites_start = BytesStart::new("testsuites");
    suites_start.push_attribute(("name", "lumi-flow-run"));
    suites_start.push_attribute(("tests", tests.as_str()));
    suites_start.push_attribute(("failures", failures.as_str()));
    suites_start.push_attribute(("skipped", skipped.as_str()));
    suites_start.push_attribute(("time", time.as_str()));
    writer.write_event(Event::Start(suites_start))?;

    let timestamp = suite
        .flows
        .first()
        .map(|f| f.start_time.to_rfc3339())
        .unwrap_or_default();

    let mut suite_start = BytesStart::new("testsuite");
    suite_start.push_attribute(("name", "default"));
    suite_start.push_attribute(("tests", tests.as_str()));
    suite_start.push_attribute(("failures", failures.as_str()));
    suite_start.push_attribute(("skipped", skipped.as_str()));
    suite_start.push_attribute(("id", suite.session_id.as_str()));
    suite_start.push_attribute(("time", time.as_str()));
    suite_start.push_attribute(("timestamp", timestamp.as_str()));
    writer.write_event(Event::Start(suite_start))?;

    for flow in &suite.flows {
        write_test_case(&mut writer, flow)?;
    }

    writer.write_event(Event::End(BytesEnd::new("testsuite")))?;
    writer.write_event(Event::End(BytesEnd::new("testsuites")))?;

    let xml = String::from_utf8(writer.into_inner().into_inner())?;
    Ok(xml)
}

/// Flow-level error first, otherwise the first failed step's
fn failure_message(flow: &FlowResult) -> String {
    flow.error
        .clone()
        .or_else(|| {
            flow.steps
                .iter()
                .find(|s| s.failed())
                .map(|s| match &s.error {
                    Some(e) => format!("Step {} ({}): {}", s.index, s.step.display_name(), e),
                    None => format!("Step {} ({}) failed", s.index, s.step.display_name()),
                })
        })
        .unwrap_or_else(|| "Unknown error".to_string())
}

fn write_test_case<W: std::io::Write>(writer: &mut Writer<W>, flow: &FlowResult) -> Result<()> {
    let time = seconds(flow.duration_ms);
    let mut case_start = BytesStart::new("testcase");
    case_start.push_attribute(("name", flow.name.as_str()));
    case_start.push_attribute(("classname", "lumi-flow"));
    case_start.push_attribute(("time", time.as_str()));
    writer.write_event(Event::Start(case_start))?;

    match flow.status {
        FlowStatus::Failed => {
            let message = failure_message(flow);
            let mut fail_start = BytesStart::new("failure");
            fail_start.push_attribute(("message", message.as_str()));
            fail_start.push_attribute(("type", "AssertionError"));
            writer.write_event(Event::Start(fail_start))?;

            let details: Vec<String> = flow
                .steps
                .iter()
                .filter_map(|s| {
                    s.error
                        .as_ref()
                        .map(|e| format!("[{}] step {}: {}", s.phase, s.index, e))
                })
                .collect();
            if !details.is_empty() {
                writer.write_event(Event::Text(BytesText::new(&details.join("\n"))))?;
            }

            writer.write_event(Event::End(BytesEnd::new("failure")))?;
        }
        FlowStatus::Skipped => {
            writer.write_event(Event::Empty(BytesStart::new("skipped")))?;
        }
        FlowStatus::Passed => {}
    }

    writer.write_event(Event::End(BytesEnd::new("testcase")))?;
    Ok(())
}

/// Write `junit.xml` into `output_dir`
pub fn write_report(suite: &SuiteResult, output_dir: &Path) -> Result<PathBuf> {
    let xml = generate_junit_xml(suite)?;
    let path = output_dir.join("junit.xml");
    std::fs::write(&path, xml)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{Phase, Step, StepAction};
    use crate::runner::state::{StepResult, StepStatus};
    use chrono::Utc;

    #[test]
    fn test_generate_junit_xml() {
        let now = Utc::now();
        let failed_step = StepResult {
            step: Step::new(StepAction::Click {
                selector: "#pay".to_string(),
            }),
            phase: Phase::Main,
            index: 2,
            status: StepStatus::Failed,
            duration_ms: 40,
            error: Some("Element not found: #pay (self-healing failed)".to_string()),
            screenshot: None,
            healed_selector: None,
        };
        let suite = SuiteResult::from_flows(
            "test-session",
            vec![
                FlowResult::new("Login Flow", now, now, Vec::new(), None),
                FlowResult::new("Checkout Flow", now, now, vec![failed_step], None),
                FlowResult::skipped("Nightly Flow"),
            ],
            3500,
        );

        let xml = generate_junit_xml(&suite).unwrap();

        assert!(xml.contains(r#"<testsuites name="lumi-flow-run""#));
        assert!(xml.contains(r#"tests="3""#));
        assert!(xml.contains(r#"failures="1""#));
        assert!(xml.contains(r#"skipped="1""#));
        assert!(xml.contains(r#"<testcase name="Login Flow""#));
        assert!(xml.contains("Step 2"));
        assert!(xml.contains("<skipped/>"));
    }
}
