//! Keyword filtering over JSON-lines records.
//!
//! Counts the records whose `text` field contains the keyword given as the
//! auxiliary argument. Lines that are not JSON objects are matched on
//! their raw content, so the workload also works on plain text files.

use common::PartialResult;
use serde_json::Value;

pub fn map(payload: &str, aux: &str) -> PartialResult {
    let keyword = aux.to_lowercase();
    let mut counts = PartialResult::new();
    if keyword.is_empty() {
        return counts;
    }

    let mut matched = 0u64;
    for line in payload.lines() {
        let haystack = match serde_json::from_str::<Value>(line) {
            Ok(Value::Object(record)) => record
                .get("text")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_lowercase(),
            _ => line.to_lowercase(),
        };
        if haystack.contains(&keyword) {
            matched += 1;
        }
    }

    counts.insert(keyword, matched);
    counts
}
