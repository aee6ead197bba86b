use chrono::{DateTime, Utc};
use serde::ser::{Serialize, SerializeSeq, Serializer};
use std::collections::HashMap;

/// Opaque key/value pairs attached to a single line.
pub type Metadata = HashMap<String, String>;

/// One captured log line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// When the line was observed by the tailer, not when it was written.
    pub timestamp: DateTime<Utc>,
    /// Line text without the trailing newline
    pub line: String,
    pub metadata: Metadata,
}

impl Entry {
    /// Create an entry stamped with the current time and no metadata.
    pub fn new(line: impl Into<String>) -> Self {
        Self::with_metadata(line, Metadata::new())
    }

    pub fn with_metadata(line: impl Into<String>, metadata: Metadata) -> Self {
        Self {
            timestamp: Utc::now(),
            line: line.into(),
            metadata,
        }
    }

    /// Byte cost of this entry when accumulated into a batch.
    ///
    /// Counts the line plus every metadata key and value. The timestamp is
    /// fixed-width and left out.
    pub fn encoded_len(&self) -> usize {
        self.line.len()
            + self
                .metadata
                .iter()
                .map(|(k, v)| k.len() + v.len())
                .sum::<usize>()
    }

    /// Unix epoch nanoseconds as a decimal string.
    pub fn timestamp_nanos(&self) -> String {
        self.timestamp
            .timestamp_nanos_opt()
            .unwrap_or_default()
            .to_string()
    }
}

// Encoded as a push value tuple: ["<ns>", "<line>"] or ["<ns>", "<line>", {meta}]
impl Serialize for Entry {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let len = if self.metadata.is_empty() { 2 } else { 3 };
        let mut seq = serializer.serialize_seq(Some(len))?;
        seq.serialize_element(&self.timestamp_nanos())?;
        seq.serialize_element(&self.line)?;
        if !self.metadata.is_empty() {
            seq.serialize_element(&self.metadata)?;
        }
        seq.end()
    }
}
