//! Non-fatal findings gathered while parsing status output

use serde::Serialize;

/// A finding that does not abort the inventory build
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// A reported key without a dedicated field; the value was kept in `extra`
    UnknownField {
        hostname: String,
        record: &'static str,
        key: String,
        value: String,
    },
    /// The number of parsed GPU devices differs from the node's `gpus` attribute
    GpuCountMismatch {
        hostname: String,
        reported: u32,
        parsed: usize,
    },
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownField {
                hostname,
                record,
                key,
                ..
            } => write!(f, "{hostname}: unknown {record} field '{key}'"),
            Self::GpuCountMismatch {
                hostname,
                reported,
                parsed,
            } => write!(
                f,
                "{hostname}: node reports {reported} GPU(s) but {parsed} device(s) were parsed"
            ),
        }
    }
}

/// Collector threaded through the parsers and returned with the inventory
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn unknown_field(&mut self, hostname: &str, record: &'static str, key: &str, value: &str) {
        tracing::warn!(hostname, record, key, value, "Skipping unknown status field");
        self.entries.push(Diagnostic::UnknownField {
            hostname: hostname.to_owned(),
            record,
            key: key.to_owned(),
            value: value.to_owned(),
        });
    }

    pub(crate) fn gpu_count_mismatch(&mut self, hostname: &str, reported: u32, parsed: usize) {
        tracing::warn!(
            hostname,
            reported,
            parsed,
            "GPU count mismatch, keeping the parsed device list"
        );
        self.entries.push(Diagnostic::GpuCountMismatch {
            hostname: hostname.to_owned(),
            reported,
            parsed,
        });
    }

    pub fn extend(&mut self, other: Self) {
        self.entries.extend(other.entries);
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Diagnostic> {
        self.entries.iter()
    }

    /// Findings other than unknown fields
    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries
            .iter()
            .filter(|d| !matches!(d, Diagnostic::UnknownField { .. }))
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
