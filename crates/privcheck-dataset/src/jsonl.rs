//! # JSON Lines Ingest
//!
//! Every measurement source and the policy-claim source is a JSON Lines
//! file. Blank lines are skipped. A line that does not deserialize is a
//! malformed record: it is filed in the ledger under the line's `domain`
//! field when one can be read, otherwise under `unattributed`, and the
//! rest of the file is still read. Failing to open or read the file is
//! fatal.

use std::io::BufRead;
use std::path::Path;

use serde::de::DeserializeOwned;

use crate::error::{DatasetError, DatasetResult};
use crate::ledger::{ErrorLedger, LedgerEntry, Source, UNATTRIBUTED};

/// A record with its 1-based line number.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceLine<T> {
    /// 1-based line number in the source file.
    pub line: usize,
    /// The parsed record.
    pub record: T,
}

/// Records parsed from one source plus the lines that failed.
#[derive(Debug, Clone)]
pub struct JsonlBatch<T> {
    /// Successfully parsed records in file order.
    pub records: Vec<SourceLine<T>>,
    /// Malformed lines.
    pub ledger: ErrorLedger,
}

/// Read a JSON Lines file.
pub fn read_jsonl<T: DeserializeOwned>(path: &Path, source: Source) -> DatasetResult<JsonlBatch<T>> {
    let file = std::fs::File::open(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            DatasetError::FileNotFound {
                path: path.to_path_buf(),
            }
        } else {
            DatasetError::Io {
                path: path.to_path_buf(),
                source: e,
            }
        }
    })?;
    let batch = parse_jsonl(std::io::BufReader::new(file), source).map_err(|e| DatasetError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    tracing::info!(
        path = %path.display(),
        source = %source,
        records = batch.records.len(),
        malformed = batch.ledger.len(),
        "read input"
    );
    Ok(batch)
}

/// Parse JSON Lines from any reader.
///
/// A line that is not valid UTF-8 is a malformed record like any other;
/// only a failed read is an error.
pub fn parse_jsonl<T: DeserializeOwned, R: BufRead>(
    mut reader: R,
    source: Source,
) -> std::io::Result<JsonlBatch<T>> {
    let mut records = Vec::new();
    let mut ledger = ErrorLedger::new();
    let mut buf = Vec::new();
    let mut number = 0;
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        number += 1;
        let line = match std::str::from_utf8(&buf) {
            Ok(line) => line,
            Err(e) => {
                ledger.record(
                    UNATTRIBUTED,
                    LedgerEntry::malformed(source, Some(number), None, format!("invalid UTF-8: {e}")),
                );
                continue;
            }
        };
        let text = line.trim();
        if text.is_empty() {
            continue;
        }
        match serde_json::from_str::<T>(text) {
            Ok(record) => records.push(SourceLine {
                line: number,
                record,
            }),
            Err(e) => {
                let domain = attributable_domain(text);
                ledger.record(
                    domain.as_deref().unwrap_or(UNATTRIBUTED),
                    LedgerEntry::malformed(source, Some(number), None, e.to_string()),
                );
            }
        }
    }
    Ok(JsonlBatch { records, ledger })
}

/// Best-effort `domain` of a line that failed typed parsing.
fn attributable_domain(text: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(text).ok()?;
    let raw = value.get("domain")?.as_str()?;
    Some(
        privcheck_core::HostName::parse(raw)
            .map(|h| h.as_str().to_string())
            .unwrap_or_else(|_| raw.trim().to_ascii_lowercase()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::CookieRecord;

    #[test]
    fn skips_blank_lines_and_numbers_from_one() {
        let input = "\n{\"domain\":\"a.gov\",\"hostname\":\"a.gov\"}\n\n";
        let batch: JsonlBatch<CookieRecord> = parse_jsonl(input.as_bytes(), Source::Cookies).unwrap();
        assert_eq!(batch.records.len(), 1);
        assert_eq!(batch.records[0].line, 2);
        assert!(batch.ledger.is_empty());
    }

    #[test]
    fn malformed_lines_are_attributed_when_possible() {
        let input = concat!(
            "{\"domain\":\"www.b.gov\",\"is_secure\":1}\n",
            "not json at all\n",
            "{\"domain\":\"a.gov\",\"hostname\":\"x.com\"}\n",
        );
        let batch: JsonlBatch<CookieRecord> = parse_jsonl(input.as_bytes(), Source::Cookies).unwrap();
        assert_eq!(batch.records.len(), 1);
        assert_eq!(batch.ledger.for_domain("b.gov").len(), 1);
        assert_eq!(batch.ledger.for_domain(UNATTRIBUTED)[0].line, Some(2));
    }

    #[test]
    fn invalid_utf8_line_is_malformed_not_fatal() {
        let mut input = b"{\"domain\":\"a.gov\",\"hostname\":\"a.gov\"}\n".to_vec();
        input.extend_from_slice(b"{\"domain\":\"\xff\xfe.gov\"}\n");
        input.extend_from_slice(b"{\"domain\":\"b.gov\",\"hostname\":\"b.gov\"}\n");
        let batch: JsonlBatch<CookieRecord> = parse_jsonl(input.as_slice(), Source::Cookies).unwrap();
        assert_eq!(batch.records.len(), 2);
        assert_eq!(batch.records[1].line, 3);
        let entries = batch.ledger.for_domain(UNATTRIBUTED);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].line, Some(2));
        assert_eq!(entries[0].source, Source::Cookies);
    }

    #[test]
    fn missing_file_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_jsonl::<CookieRecord>(&dir.path().join("none.jsonl"), Source::Cookies)
            .unwrap_err();
        assert!(matches!(err, DatasetError::FileNotFound { .. }));
    }

    #[test]
    fn reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("c.jsonl");
        std::fs::write(&path, "{\"domain\":\"a.gov\",\"hostname\":\"a.gov\"}\n").unwrap();
        let batch = read_jsonl::<CookieRecord>(&path, Source::Cookies).unwrap();
        assert_eq!(batch.records.len(), 1);
    }
}
