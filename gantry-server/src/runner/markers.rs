//! Failure message extraction
//!
//! A failed automation run buries its real cause in hundreds of output
//! lines. Extraction is an ordered table of (pattern, extractor) rules
//! evaluated top to bottom over the combined output; the first hit wins.
//! Keeping the table as data, away from the runner's control flow, lets
//! each rule be tested on its own.

use std::sync::LazyLock;

use regex::{Captures, Regex};

/// Structured failure payload emitted per failing task:
/// `fatal: [host]: FAILED! => {"msg": "...", ...}`.
static STRUCTURED_FAILURE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"FAILED! => (\{.*\})").unwrap());

/// Generic top-level error marker, e.g. `ERROR! the playbook could not be found`.
static ERROR_MARKER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^ERROR!\s*(.+)").unwrap());

struct Rule {
    pattern: &'static LazyLock<Regex>,
    extract: fn(&Captures) -> Option<String>,
}

/// Evaluated in priority order: structured payloads beat bare markers.
static RULES: &[Rule] = &[
    Rule {
        pattern: &STRUCTURED_FAILURE,
        extract: extract_structured_msg,
    },
    Rule {
        pattern: &ERROR_MARKER,
        extract: extract_whole_match,
    },
];

fn extract_structured_msg(captures: &Captures) -> Option<String> {
    let payload: serde_json::Value = serde_json::from_str(captures.get(1)?.as_str()).ok()?;
    let msg = payload.get("msg")?;
    match msg {
        serde_json::Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        _ => None,
    }
}

fn extract_whole_match(captures: &Captures) -> Option<String> {
    captures.get(1).map(|m| m.as_str().trim().to_string())
}

/// Derives a one-line failure message from a failed run's output.
///
/// Scans stdout then stderr against the rule table; falls back to the
/// last non-empty stderr line, then to a generic message.
pub fn extract_failure_message(stdout: &[String], stderr: &[String]) -> String {
    for rule in RULES {
        for line in stdout.iter().chain(stderr) {
            if let Some(captures) = rule.pattern.captures(line) {
                if let Some(message) = (rule.extract)(&captures) {
                    return message;
                }
            }
        }
    }

    stderr
        .iter()
        .rev()
        .map(|line| line.trim())
        .find(|line| !line.is_empty())
        .map(|line| line.to_string())
        .unwrap_or_else(|| "Command failed with no error output".to_string())
}
