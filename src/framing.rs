use serde_json::Value;

use crate::error::{RelayError, Result};
use crate::protocol::OutboundFrame;

/// Length-delimited framing over a text stream: splits received chunks into
/// candidate frames and encodes outbound ones, both against the one delimiter
/// configured at server construction.
#[derive(Debug, Clone)]
pub struct Framer {
    delimiter: String,
}

impl Framer {
    pub fn new(delimiter: impl Into<String>) -> Result<Self> {
        let delimiter = delimiter.into();
        if delimiter.is_empty() {
            return Err(RelayError::EmptyDelimiter);
        }
        Ok(Self { delimiter })
    }

    pub fn delimiter(&self) -> &str {
        &self.delimiter
    }

    /// Decode one received chunk in isolation.
    ///
    /// The trailing split element is discarded unconditionally: every frame
    /// must be delimiter-terminated, and a fragment cut off by network
    /// segmentation is not buffered for the next read. Clients are required
    /// to flush whole, terminated frames per write. An empty chunk, or a
    /// chunk equal to exactly the delimiter, yields no frames.
    pub fn decode<'a>(&self, chunk: &'a str) -> Vec<&'a str> {
        let mut parts: Vec<&'a str> = chunk.split(self.delimiter.as_str()).collect();
        parts.pop();
        parts.retain(|part| !part.is_empty());
        parts
    }

    /// Encode one outbound broadcast frame, delimiter-terminated.
    pub fn encode(&self, event: &str, args: &[Value]) -> serde_json::Result<String> {
        let json = serde_json::to_string(&OutboundFrame { event, args })?;
        Ok(format!("{}{}", json, self.delimiter))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn framer() -> Framer {
        Framer::new("@@@").unwrap()
    }

    #[test]
    fn empty_delimiter_is_rejected() {
        assert!(matches!(Framer::new(""), Err(RelayError::EmptyDelimiter)));
    }

    #[test]
    fn terminated_chunk_yields_one_frame() {
        let chunk = r#"{"type":"broadcast","event":"news"}@@@"#;
        assert_eq!(framer().decode(chunk), vec![r#"{"type":"broadcast","event":"news"}"#]);
    }

    #[test]
    fn unterminated_chunk_yields_nothing() {
        assert_eq!(framer().decode(r#"{"type":"broadcast","event":"news"}"#).len(), 0);
    }

    #[test]
    fn trailing_fragment_is_dropped() {
        let chunk = r#"{"a":1}@@@{"b":2}@@@{"trunc"#;
        assert_eq!(framer().decode(chunk), vec![r#"{"a":1}"#, r#"{"b":2}"#]);
    }

    #[test]
    fn three_terminated_frames_decode_in_order() {
        let chunk = r#"{"a":1}@@@{"b":2}@@@{"c":3}@@@"#;
        assert_eq!(framer().decode(chunk), vec![r#"{"a":1}"#, r#"{"b":2}"#, r#"{"c":3}"#]);
    }

    #[test]
    fn empty_and_delimiter_only_chunks_yield_nothing() {
        let f = framer();
        assert!(f.decode("").is_empty());
        assert!(f.decode("@@@").is_empty());
        assert!(f.decode("@@@@@@").is_empty());
    }

    #[test]
    fn custom_delimiter_is_honored() {
        let f = Framer::new("|").unwrap();
        assert_eq!(f.decode("one|two|tail"), vec!["one", "two"]);
    }

    #[test]
    fn encode_terminates_and_omits_type() {
        let out = framer().encode("got-episode", &[json!("S7E5")]).unwrap();
        assert_eq!(out, r#"{"event":"got-episode","args":["S7E5"]}@@@"#);
    }
}
