//! Bounded single-line input
//!
//! Reads at most one line from a `BufRead`, keeping no more than
//! [`MAX_INPUT_BYTES`] content bytes in memory. The terminator (`\n` or
//! `\r\n`) is not part of the content and does not count against the cap.
//! What happens to the rest of an oversized line is decided by
//! [`OverflowPolicy`].

use crate::{Result, SyntheError};
use serde::{Deserialize, Serialize};
use std::io::{BufRead, ErrorKind};
use tracing::{debug, warn};

/// Content cap for one input line, terminator excluded.
pub const MAX_INPUT_BYTES: usize = 1023;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Keep the first bytes up to the cap (on a char boundary), drop the rest of the line.
    #[default]
    Truncate,
    /// Fail with `SyntheError::InputTooLong`.
    Reject,
}

impl std::str::FromStr for OverflowPolicy {
    type Err = SyntheError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "truncate" => Ok(OverflowPolicy::Truncate),
            "reject" => Ok(OverflowPolicy::Reject),
            other => Err(SyntheError::Config(format!(
                "unknown overflow policy '{}'",
                other
            ))),
        }
    }
}

/// One line of text ready for synthesis.
///
/// Bytes are kept as read; the engine decides what encoding it accepts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InputText {
    bytes: Vec<u8>,
    truncated: bool,
}

impl InputText {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: bytes.into(),
            truncated: false,
        }
    }

    /// The text, if it is valid UTF-8.
    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.bytes).ok()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Whether bytes past the cap were dropped.
    pub fn is_truncated(&self) -> bool {
        self.truncated
    }
}

/// Read one line of at most `limit` content bytes.
///
/// Returns `Ok(None)` on immediate end-of-stream, and also when the stream
/// fails before yielding any data. A final line without a terminator is
/// valid input, and so is a bare `\n` (empty text).
pub fn read_line_bounded<R: BufRead>(
    reader: &mut R,
    limit: usize,
    policy: OverflowPolicy,
) -> Result<Option<InputText>> {
    let mut line: Vec<u8> = Vec::with_capacity(limit.min(256));
    let mut seen_any = false;
    let mut overflowed = false;
    // `\r` at the end of a chunk: terminator or content depends on what follows.
    let mut pending_cr = false;

    loop {
        let (consumed, done) = {
            let available = match reader.fill_buf() {
                Ok(buf) => buf,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) if !seen_any => {
                    debug!(target: "synthe", error = %e, "Input unreadable; treating as empty");
                    return Ok(None);
                }
                Err(e) => return Err(e.into()),
            };
            if available.is_empty() {
                break;
            }
            seen_any = true;

            let (mut content, consumed, done) =
                match available.iter().position(|&b| b == b'\n') {
                    Some(i) => (&available[..i], i + 1, true),
                    None => (available, available.len(), false),
                };

            if pending_cr {
                pending_cr = false;
                if !(done && content.is_empty()) {
                    overflowed |= push_bounded(&mut line, b"\r", limit);
                }
            }
            if let Some((&b'\r', rest)) = content.split_last() {
                content = rest;
                pending_cr = !done;
            }
            overflowed |= push_bounded(&mut line, content, limit);
            (consumed, done)
        };
        reader.consume(consumed);

        if overflowed && policy == OverflowPolicy::Reject {
            return Err(SyntheError::InputTooLong { limit });
        }
        if done {
            break;
        }
    }

    if !seen_any {
        debug!(target: "synthe", "End of input before any data");
        return Ok(None);
    }

    // Unterminated line ending in `\r`: the `\r` is content.
    if pending_cr {
        overflowed |= push_bounded(&mut line, b"\r", limit);
        if overflowed && policy == OverflowPolicy::Reject {
            return Err(SyntheError::InputTooLong { limit });
        }
    }

    if overflowed {
        // The cut may have split a multi-byte character.
        let keep = complete_utf8_prefix(&line);
        line.truncate(keep);
        warn!(target: "synthe", limit, kept = line.len(), "Input line truncated");
    }

    Ok(Some(InputText {
        bytes: line,
        truncated: overflowed,
    }))
}

/// Append as much of `bytes` as fits under `limit`; true if anything was left over.
fn push_bounded(line: &mut Vec<u8>, bytes: &[u8], limit: usize) -> bool {
    let room = limit.saturating_sub(line.len());
    line.extend_from_slice(&bytes[..bytes.len().min(room)]);
    bytes.len() > room
}

/// Length of `bytes` without a trailing incomplete UTF-8 sequence.
///
/// Only the tail is inspected, so invalid bytes earlier in the line pass
/// through untouched.
fn complete_utf8_prefix(bytes: &[u8]) -> usize {
    let len = bytes.len();
    for back in 1..=len.min(4) {
        let b = bytes[len - back];
        if b & 0xC0 == 0x80 {
            continue;
        }
        let width = match b {
            0x00..=0x7F => 1,
            0xC0..=0xDF => 2,
            0xE0..=0xEF => 3,
            0xF0..=0xF7 => 4,
            _ => return len,
        };
        return if back < width { len - back } else { len };
    }
    len
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufReader, Cursor};

    fn read(input: &[u8], policy: OverflowPolicy) -> Result<Option<InputText>> {
        read_line_bounded(&mut Cursor::new(input.to_vec()), MAX_INPUT_BYTES, policy)
    }

    #[test]
    fn test_reads_single_line() {
        let text = read(b"Konnichiwa\nsecond line\n", OverflowPolicy::Truncate)
            .unwrap()
            .unwrap();
        assert_eq!(text.as_str(), Some("Konnichiwa"));
        assert!(!text.is_truncated());
    }

    #[test]
    fn test_empty_stream_is_none() {
        assert!(read(b"", OverflowPolicy::Truncate).unwrap().is_none());
        assert!(read(b"", OverflowPolicy::Reject).unwrap().is_none());
    }

    #[test]
    fn test_unterminated_line_is_input() {
        let text = read("こんにちは".as_bytes(), OverflowPolicy::Truncate)
            .unwrap()
            .unwrap();
        assert_eq!(text.as_str(), Some("こんにちは"));
    }

    #[test]
    fn test_bare_newline_is_empty_text() {
        let text = read(b"\n", OverflowPolicy::Truncate).unwrap().unwrap();
        assert!(text.is_empty());
    }

    #[test]
    fn test_crlf_terminator_stripped() {
        let text = read(b"hello\r\n", OverflowPolicy::Truncate)
            .unwrap()
            .unwrap();
        assert_eq!(text.as_str(), Some("hello"));
    }

    #[test]
    fn test_exact_limit_accepted() {
        let mut input = vec![b'a'; MAX_INPUT_BYTES];
        input.push(b'\n');

        let text = read(&input, OverflowPolicy::Reject).unwrap().unwrap();
        assert_eq!(text.len(), MAX_INPUT_BYTES);
        assert!(!text.is_truncated());
    }

    #[test]
    fn test_long_line_truncated_and_rest_consumed() {
        let mut input = vec![b'x'; 3000];
        input.extend_from_slice(b"\nnext\n");
        // Small buffer forces several fill_buf rounds
        let mut reader = BufReader::with_capacity(16, Cursor::new(input));

        let first = read_line_bounded(&mut reader, MAX_INPUT_BYTES, OverflowPolicy::Truncate)
            .unwrap()
            .unwrap();
        assert_eq!(first.len(), MAX_INPUT_BYTES);
        assert!(first.is_truncated());

        let second = read_line_bounded(&mut reader, MAX_INPUT_BYTES, OverflowPolicy::Truncate)
            .unwrap()
            .unwrap();
        assert_eq!(second.as_str(), Some("next"));
    }

    #[test]
    fn test_truncation_respects_char_boundary() {
        let mut input = "a".repeat(MAX_INPUT_BYTES - 1);
        input.push_str("あいう\n");

        let text = read(input.as_bytes(), OverflowPolicy::Truncate)
            .unwrap()
            .unwrap();
        assert_eq!(text.len(), MAX_INPUT_BYTES - 1);
        assert!(text.as_bytes().iter().all(|&b| b == b'a'));
    }

    #[test]
    fn test_reject_policy_errors_on_long_line() {
        let input = vec![b'a'; MAX_INPUT_BYTES + 1];
        let err = read(&input, OverflowPolicy::Reject).unwrap_err();
        assert!(matches!(err, SyntheError::InputTooLong { limit } if limit == MAX_INPUT_BYTES));
    }

    #[test]
    fn test_non_utf8_bytes_forwarded() {
        let text = read(b"\xff\xfeabc\n", OverflowPolicy::Truncate)
            .unwrap()
            .unwrap();
        assert_eq!(text.as_bytes(), b"\xff\xfeabc");
        assert!(text.as_str().is_none());
    }

    #[test]
    fn test_crlf_not_counted_against_limit() {
        let mut input = vec![b'a'; MAX_INPUT_BYTES];
        input.extend_from_slice(b"\r\n");

        for policy in [OverflowPolicy::Reject, OverflowPolicy::Truncate] {
            let text = read(&input, policy).unwrap().unwrap();
            assert_eq!(text.len(), MAX_INPUT_BYTES);
            assert!(!text.is_truncated());
        }
    }

    #[test]
    fn test_crlf_split_across_reads() {
        // 1023 content bytes then "\r" fill exactly one 1024-byte buffer.
        let mut input = vec![b'a'; MAX_INPUT_BYTES];
        input.extend_from_slice(b"\r\nnext\n");
        let mut reader = BufReader::with_capacity(MAX_INPUT_BYTES + 1, Cursor::new(input));

        let first = read_line_bounded(&mut reader, MAX_INPUT_BYTES, OverflowPolicy::Reject)
            .unwrap()
            .unwrap();
        assert_eq!(first.len(), MAX_INPUT_BYTES);
        assert!(!first.is_truncated());

        let second = read_line_bounded(&mut reader, MAX_INPUT_BYTES, OverflowPolicy::Reject)
            .unwrap()
            .unwrap();
        assert_eq!(second.as_str(), Some("next"));
    }

    #[test]
    fn test_lone_cr_is_content() {
        let mut reader = BufReader::with_capacity(2, Cursor::new(b"a\rb\n".to_vec()));
        let text = read_line_bounded(&mut reader, MAX_INPUT_BYTES, OverflowPolicy::Truncate)
            .unwrap()
            .unwrap();
        assert_eq!(text.as_bytes(), b"a\rb");

        let text = read(b"tail\r", OverflowPolicy::Truncate).unwrap().unwrap();
        assert_eq!(text.as_bytes(), b"tail\r");
    }

    /// Reader whose every read fails.
    struct FailingReader;

    impl std::io::Read for FailingReader {
        fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(ErrorKind::Other, "Is a directory"))
        }
    }

    #[test]
    fn test_read_error_before_data_is_empty() {
        let mut reader = BufReader::new(FailingReader);
        let result = read_line_bounded(&mut reader, MAX_INPUT_BYTES, OverflowPolicy::Truncate);
        assert!(result.unwrap().is_none());
    }

    #[test]
    fn test_read_error_after_data_propagates() {
        let mut reader = BufReader::with_capacity(4, std::io::Read::chain(&b"abcd"[..], FailingReader));
        let result = read_line_bounded(&mut reader, MAX_INPUT_BYTES, OverflowPolicy::Truncate);
        assert!(matches!(result, Err(SyntheError::IoError(_))));
    }

    #[test]
    fn test_policy_from_str() {
        assert_eq!("truncate".parse::<OverflowPolicy>().unwrap(), OverflowPolicy::Truncate);
        assert_eq!(" Reject ".parse::<OverflowPolicy>().unwrap(), OverflowPolicy::Reject);
        assert!("clip".parse::<OverflowPolicy>().is_err());
    }
}
