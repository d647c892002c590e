use super::{FieldPolicy, assign};
use crate::diagnostics::Diagnostics;
use crate::error::ParseError;
use crate::model::NodeStatus;

/// Parse the top-level `key = value` lines of a node's status output.
///
/// The first non-empty line must echo `hostname`. Unknown keys are kept in
/// [`NodeStatus::extra`] and reported through `diagnostics`.
///
/// # Errors
///
/// - [`ParseError::HostnameMismatch`] if the output is for another host
/// - [`ParseError::Field`] if a numeric attribute cannot be parsed
pub fn parse_top_level(
    hostname: &str,
    raw: &str,
    diagnostics: &mut Diagnostics,
) -> Result<NodeStatus, ParseError> {
    let mut lines = raw.lines();
    let reported = lines
        .by_ref()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or_default();

    if reported != hostname {
        return Err(ParseError::HostnameMismatch {
            requested: hostname.to_owned(),
            reported: reported.to_owned(),
        });
    }

    let mut node = NodeStatus::new(hostname);
    for line in lines {
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        assign(
            &mut node,
            hostname,
            key.trim(),
            value.trim(),
            FieldPolicy::Lenient,
            diagnostics,
        )?;
    }

    tracing::debug!(hostname, state = ?node.state, np = node.np, gpus = node.gpus, "Parsed node attributes");
    Ok(node)
}
