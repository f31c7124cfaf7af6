//! Newline-delimited JSON response parsing.
//!
//! While recognition is in progress the service emits keep-alive lines:
//!
//! ```text
//! {"result":[]}
//! ```
//!
//! followed by a terminal line once recognition completes:
//!
//! ```text
//! {"result":[{"alternative":[{"transcript":"…","confidence":0.92}],"final":true}],"result_index":0}
//! ```
//!
//! A result entry carrying only a non-zero `status` (no `alternative` array)
//! means recognition failed for that segment — a successful round trip with
//! a negative outcome, surfaced as a [`TranscriptionResult`] with a status,
//! not as an error.

use std::io::BufRead;

use serde::Deserialize;

use super::task::{Hypothesis, SubmitError, TranscriptionResult};

// ---------------------------------------------------------------------------
// Wire structs
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct WireLine {
    #[serde(default)]
    result: Vec<WireResult>,
    #[serde(default)]
    result_index: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct WireResult {
    #[serde(default)]
    alternative: Vec<WireAlternative>,
    #[serde(default)]
    status: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct WireAlternative {
    #[serde(default)]
    transcript: String,
    #[serde(default)]
    confidence: Option<f32>,
}

// ---------------------------------------------------------------------------
// read_result
// ---------------------------------------------------------------------------

/// Read newline-delimited JSON documents from `reader`, skipping keep-alive
/// lines, until the first non-empty result or end-of-stream.
///
/// End-of-stream after only keep-alives yields the valid "empty" result
/// (distinct from a network failure, which the transport layer reports).
///
/// # Errors
///
/// - [`SubmitError::Network`] on a read failure mid-stream.
/// - [`SubmitError::Protocol`] on a line that is not valid JSON of the
///   expected shape.
pub fn read_result<R: BufRead>(reader: R) -> Result<TranscriptionResult, SubmitError> {
    for line in reader.lines() {
        let line = line.map_err(|e| SubmitError::Network(e.to_string()))?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let wire: WireLine = serde_json::from_str(trimmed)
            .map_err(|e| SubmitError::Protocol(format!("{e} in line {trimmed:?}")))?;

        // Keep-alive: the service is still working.
        if wire.result.is_empty() {
            log::trace!("response: keep-alive");
            continue;
        }

        return Ok(into_result(wire));
    }

    // End-of-stream with no terminal line: valid empty result.
    Ok(TranscriptionResult::default())
}

fn into_result(wire: WireLine) -> TranscriptionResult {
    // Only the first result entry of the terminal line is meaningful; the
    // service sends one segment per line.
    let entry = &wire.result[0];

    TranscriptionResult {
        hypotheses: entry
            .alternative
            .iter()
            .map(|a| Hypothesis {
                transcript: a.transcript.clone(),
                confidence: a.confidence,
            })
            .collect(),
        result_index: wire.result_index.unwrap_or(0),
        status: entry.status,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn parse(body: &str) -> Result<TranscriptionResult, SubmitError> {
        read_result(Cursor::new(body.as_bytes().to_vec()))
    }

    #[test]
    fn keep_alives_are_skipped() {
        let body = concat!(
            "{\"result\":[]}\n",
            "{\"result\":[]}\n",
            "{\"result\":[{\"alternative\":[{\"transcript\":\"ok\",\"confidence\":0.9}]}],\"result_index\":0}\n",
        );
        let result = parse(body).expect("parse");
        assert_eq!(result.best().unwrap().transcript, "ok");
        assert_eq!(result.best().unwrap().confidence, Some(0.9));
        assert!(!result.is_empty());
    }

    #[test]
    fn only_keep_alives_yield_empty_result() {
        let body = "{\"result\":[]}\n{\"result\":[]}\n";
        let result = parse(body).expect("parse");
        assert!(result.is_empty());
    }

    #[test]
    fn empty_stream_yields_empty_result() {
        let result = parse("").expect("parse");
        assert!(result.is_empty());
    }

    #[test]
    fn multiple_alternatives_keep_order() {
        let body = "{\"result\":[{\"alternative\":[\
            {\"transcript\":\"first\",\"confidence\":0.95},\
            {\"transcript\":\"second\"}],\"final\":true}],\"result_index\":2}\n";
        let result = parse(body).expect("parse");
        assert_eq!(result.hypotheses.len(), 2);
        assert_eq!(result.hypotheses[0].transcript, "first");
        assert_eq!(result.hypotheses[1].transcript, "second");
        assert_eq!(result.hypotheses[1].confidence, None);
        assert_eq!(result.result_index, 2);
    }

    #[test]
    fn status_only_entry_is_a_recognition_failure() {
        let body = "{\"result\":[{\"status\":5}],\"result_index\":0}\n";
        let result = parse(body).expect("parse");
        assert!(result.is_recognition_failure());
        assert!(result.hypotheses.is_empty());
        assert_eq!(result.status, Some(5));
    }

    #[test]
    fn malformed_json_is_a_protocol_error() {
        let err = parse("{\"result\":oops}\n").unwrap_err();
        assert!(matches!(err, SubmitError::Protocol(_)));
    }

    #[test]
    fn non_json_garbage_is_a_protocol_error() {
        let err = parse("<html>502 Bad Gateway</html>\n").unwrap_err();
        assert!(matches!(err, SubmitError::Protocol(_)));
    }

    #[test]
    fn blank_lines_are_ignored() {
        let body = "\n\n{\"result\":[{\"alternative\":[{\"transcript\":\"hi\"}]}]}\n";
        let result = parse(body).expect("parse");
        assert_eq!(result.best().unwrap().transcript, "hi");
    }

    #[test]
    fn parsing_stops_at_first_terminal_line() {
        // A second terminal line must not override the first.
        let body = concat!(
            "{\"result\":[{\"alternative\":[{\"transcript\":\"first\"}]}]}\n",
            "{\"result\":[{\"alternative\":[{\"transcript\":\"late\"}]}]}\n",
        );
        let result = parse(body).expect("parse");
        assert_eq!(result.best().unwrap().transcript, "first");
    }
}
