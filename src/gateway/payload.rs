//! Extraction of the JSON document a script prints after its log output.

use serde::de::IgnoredAny;
use serde_json::Value;

use crate::errors::{ApiError, ErrorCode};

use super::ScriptOutput;

/// The last top-level `{...}` object in `stdout`.
///
/// Objects are found by parsing forward from each `{`, so braces inside
/// string values and log lines printed before the payload do not confuse
/// the search. When no object parses, the last balanced brace span is
/// returned so the caller can report why it is not valid JSON.
pub fn extract_trailing_json(stdout: &str) -> Option<&str> {
    last_parsable_object(stdout).or_else(|| last_balanced_span(stdout))
}

fn last_parsable_object(stdout: &str) -> Option<&str> {
    let mut found = None;
    let mut from = 0usize;
    while let Some(offset) = stdout[from..].find('{') {
        let start = from + offset;
        let mut stream =
            serde_json::Deserializer::from_str(&stdout[start..]).into_iter::<IgnoredAny>();
        from = match stream.next() {
            Some(Ok(_)) => {
                let end = start + stream.byte_offset();
                found = Some(&stdout[start..end]);
                end
            }
            _ => start + 1,
        };
    }
    found
}

/// Backward brace-depth scan. A `{` with no matching `}` after it is skipped.
fn last_balanced_span(stdout: &str) -> Option<&str> {
    let mut depth = 0usize;
    let mut end = None;
    for (index, byte) in stdout.bytes().enumerate().rev() {
        match byte {
            b'}' => {
                if depth == 0 {
                    end = Some(index + 1);
                }
                depth += 1;
            }
            b'{' if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    return end.map(|end| &stdout[index..end]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Lines of `stderr` from the first one mentioning `Traceback`.
pub fn extract_stack_trace(stderr: &str) -> Option<String> {
    let lines = stderr.split('\n').collect::<Vec<_>>();
    let start = lines.iter().position(|line| line.contains("Traceback"))?;
    Some(lines[start..].join("\n"))
}

/// Decode the trailing JSON payload of a finished script. `source` names the
/// script in messages, e.g. `"compare script"`.
///
/// Both failure modes map to `SCRIPT_EXECUTION_ERROR` with as much context as
/// is available: the raw stdout when nothing was found, and the parse error,
/// extracted text, stdout and stderr when the text is not valid JSON.
pub fn parse_payload(output: &ScriptOutput, source: &str) -> Result<Value, ApiError> {
    let Some(text) = extract_trailing_json(&output.stdout) else {
        return Err(ApiError::new(
            ErrorCode::ScriptExecutionError,
            format!("No JSON output from {source}"),
        )
        .with_details(format!("Raw output:\n{}", output.stdout)));
    };
    serde_json::from_str(text).map_err(|err| {
        ApiError::new(
            ErrorCode::ScriptExecutionError,
            format!("Failed to parse JSON from {source}"),
        )
        .with_details(format!(
            "Parse error: {err}\n\nJSON string:\n{text}\n\nFull stdout:\n{}\n\nStderr:\n{}",
            output.stdout, output.stderr
        ))
    })
}

/// Fail when the payload reports `success: false`, using `fallback` when the
/// payload carries no message. A payload without a `success` field counts as
/// successful.
pub fn check_success(payload: &Value, fallback: &str) -> Result<(), ApiError> {
    if payload.get("success").and_then(Value::as_bool) != Some(false) {
        return Ok(());
    }
    let error = payload.get("error");
    let message = error
        .and_then(|error| error.get("message"))
        .and_then(Value::as_str)
        .filter(|message| !message.is_empty())
        .unwrap_or(fallback);
    let details = error
        .and_then(|error| error.get("details"))
        .and_then(Value::as_str)
        .filter(|details| !details.is_empty())
        .unwrap_or("Unknown error");
    Err(ApiError::new(ErrorCode::ScriptExecutionError, message).with_details(details))
}
