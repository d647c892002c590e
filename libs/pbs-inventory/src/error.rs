//! Errors for cluster inventory collection

use std::time::Duration;

/// Errors raised while reading or writing a single record field
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FieldError {
    #[error("{record} has no field '{field}'")]
    InvalidField { record: &'static str, field: String },

    #[error("{record} does not declare field '{field}'")]
    UnknownField { record: &'static str, field: String },

    #[error("{record}.{field}: cannot parse '{value}' as {expected}")]
    TypeCoercion {
        record: &'static str,
        field: String,
        value: String,
        expected: &'static str,
    },
}

/// Errors that abort the parse of one node's status output
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("status output is for host '{reported}', expected '{requested}'")]
    HostnameMismatch { requested: String, reported: String },

    #[error("{hostname}: {source}")]
    Field {
        hostname: String,
        #[source]
        source: FieldError,
    },

    #[error("{hostname}: malformed gpu_status chunk '{chunk}': {reason}")]
    MalformedGpuField {
        hostname: String,
        chunk: String,
        reason: String,
    },
}

impl ParseError {
    pub(crate) fn field(hostname: &str, source: FieldError) -> Self {
        Self::Field {
            hostname: hostname.to_owned(),
            source,
        }
    }

    pub(crate) fn malformed_gpu(hostname: &str, chunk: &str, reason: impl Into<String>) -> Self {
        Self::MalformedGpuField {
            hostname: hostname.to_owned(),
            chunk: chunk.to_owned(),
            reason: reason.into(),
        }
    }
}

/// Failures of the external status command
#[derive(Debug, thiserror::Error)]
pub enum StatusCommandError {
    #[error("failed to launch '{program}': {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("'{program}' exited with {}: {stderr}", exit_code(.code))]
    NonZeroExit {
        program: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("'{program}' produced non UTF-8 output")]
    InvalidOutput { program: String },

    #[error("'{program}' did not finish within {}", elapsed(.timeout))]
    Timeout { program: String, timeout: Duration },
}

#[allow(clippy::ref_option)]
fn exit_code(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("code {code}"),
        None => "no code (terminated by a signal)".to_owned(),
    }
}

fn elapsed(timeout: &Duration) -> String {
    if timeout.subsec_millis() == 0 {
        format!("{}s", timeout.as_secs())
    } else {
        format!("{}ms", timeout.as_millis())
    }
}

/// Errors that abort a whole inventory build
#[derive(Debug, thiserror::Error)]
pub enum InventoryError {
    #[error("unknown cluster '{0}' (expected one of: genius, thinking, breniac)")]
    UnknownCluster(String),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("status command failed for {hostname}: {source}")]
    StatusCommand {
        hostname: String,
        #[source]
        source: StatusCommandError,
    },

    #[error("inventory collection was cancelled")]
    Cancelled,
}
