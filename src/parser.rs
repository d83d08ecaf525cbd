//! JSONL moment parsing for replay
//!
//! One moment per line in the `moment.record` shape, plus an optional
//! `timestamp` (epoch seconds or RFC 3339). Blank lines are skipped; bad
//! lines are collected with their 1-based line numbers instead of aborting.

use std::fs;
use std::path::Path;

use resonance_core::MomentInput;
use serde::Deserialize;

/// A parsed line: the moment plus the time it happened, if recorded.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplayRecord {
    pub line: usize,
    pub input: MomentInput,
    /// Epoch seconds.
    pub timestamp: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub line: usize,
    pub message: String,
}

#[derive(Debug, Default)]
pub struct ParseResult {
    pub records: Vec<ReplayRecord>,
    pub errors: Vec<ParseError>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawTimestamp {
    Seconds(f64),
    Rfc3339(String),
}

impl RawTimestamp {
    fn to_epoch_secs(&self) -> Result<f64, String> {
        match self {
            RawTimestamp::Seconds(secs) => Ok(*secs),
            RawTimestamp::Rfc3339(text) => chrono::DateTime::parse_from_rfc3339(text)
                .map(|dt| dt.timestamp_millis() as f64 / 1000.0)
                .map_err(|e| format!("invalid timestamp {:?}: {}", text, e)),
        }
    }
}

#[derive(Deserialize)]
struct RawLine {
    #[serde(flatten)]
    input: MomentInput,
    #[serde(default)]
    timestamp: Option<RawTimestamp>,
}

pub fn parse_file(path: &Path) -> Result<ParseResult, std::io::Error> {
    let content = fs::read_to_string(path)?;
    Ok(parse_lines(&content))
}

pub fn parse_lines(content: &str) -> ParseResult {
    let mut result = ParseResult::default();

    for (i, line) in content.lines().enumerate() {
        let line_no = i + 1;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match parse_line(line) {
            Ok((input, timestamp)) => result.records.push(ReplayRecord {
                line: line_no,
                input,
                timestamp,
            }),
            Err(message) => result.errors.push(ParseError {
                line: line_no,
                message,
            }),
        }
    }

    result
}

fn parse_line(line: &str) -> Result<(MomentInput, Option<f64>), String> {
    let raw: RawLine = serde_json::from_str(line).map_err(|e| e.to_string())?;
    if raw.input.source.is_empty() {
        return Err("missing source".to_string());
    }
    let timestamp = raw.timestamp.as_ref().map(RawTimestamp::to_epoch_secs).transpose()?;
    Ok((raw.input, timestamp))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_line() {
        let result = parse_lines(r#"{"source":"creative","type":"insight","concepts":["flow"]}"#);
        assert!(result.errors.is_empty());
        let record = &result.records[0];
        assert_eq!(record.line, 1);
        assert_eq!(record.input.source, "creative");
        assert_eq!(record.input.kind, "insight");
        assert!(record.timestamp.is_none());
    }

    #[test]
    fn parses_numeric_and_rfc3339_timestamps() {
        let content = concat!(
            r#"{"source":"a","type":"insight","timestamp":1700000000}"#,
            "\n",
            r#"{"source":"b","type":"insight","timestamp":"2023-11-14T22:13:21.500Z","novelty":0.4}"#,
        );
        let result = parse_lines(content);
        assert!(result.errors.is_empty(), "{:?}", result.errors);
        assert_eq!(result.records[0].timestamp, Some(1_700_000_000.0));
        assert_eq!(result.records[1].timestamp, Some(1_700_000_001.5));
        assert_eq!(result.records[1].input.novelty, Some(0.4));
    }

    #[test]
    fn skips_blank_lines_and_reports_bad_ones() {
        let content = "\n{\"source\":\"a\",\"type\":\"insight\"}\nnot json\n\n{\"type\":\"insight\"}\n{\"source\":\"\",\"type\":\"x\"}\n{\"source\":\"a\",\"type\":\"x\",\"timestamp\":\"yesterday\"}\n";
        let result = parse_lines(content);
        assert_eq!(result.records.len(), 1);
        assert_eq!(result.records[0].line, 2);
        let lines: Vec<usize> = result.errors.iter().map(|e| e.line).collect();
        assert_eq!(lines, vec![3, 5, 6, 7]);
        assert!(result.errors[2].message.contains("missing source"));
        assert!(result.errors[3].message.contains("yesterday"));
    }
}
