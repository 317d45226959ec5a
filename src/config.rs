use std::fmt;

use crate::admission::AdmissionPredicate;

/// Frame delimiter used when the owner does not choose one.
pub const DEFAULT_DELIMITER: &str = "@@@";

/// Construction-time configuration, fixed for the server's lifetime.
#[derive(Clone)]
pub struct RelayConfig {
    /// Frame terminator. Must be non-empty; validated by `RelayServer::new`.
    pub delimiter: String,
    /// Admission predicate for freshly accepted connections.
    /// `None` means unconditional allow.
    pub admission: Option<AdmissionPredicate>,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            delimiter: DEFAULT_DELIMITER.to_string(),
            admission: None,
        }
    }
}

impl RelayConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.delimiter = delimiter.into();
        self
    }

    pub fn admission(mut self, predicate: AdmissionPredicate) -> Self {
        self.admission = Some(predicate);
        self
    }
}

impl fmt::Debug for RelayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelayConfig")
            .field("delimiter", &self.delimiter)
            .field("admission", &self.admission.as_ref().map(|_| "<predicate>"))
            .finish()
    }
}
