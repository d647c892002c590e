//! Parsers for `pbsnodes <hostname>` output
//!
//! A node is parsed in three passes: the top-level `key = value` lines, then the
//! comma separated CPU `status` blob, then the nested `gpu_status` blob.

mod cpu;
mod gpu;
mod node;

pub use cpu::parse_cpu_status;
pub use gpu::parse_gpu_status;
pub use node::parse_top_level;

use crate::diagnostics::Diagnostics;
use crate::error::{FieldError, ParseError};
use crate::model::NodeStatus;
use crate::record::AttributeRecord;

/// How CPU and GPU sub-parsers treat keys that have no dedicated field.
///
/// Unknown top-level node keys are always kept in `extra`, whatever the policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FieldPolicy {
    /// Keep the value in the record's `extra` map and record a diagnostic
    #[default]
    Lenient,
    /// Fail the node with [`FieldError::InvalidField`]
    Strict,
}

impl FieldPolicy {
    #[must_use]
    pub fn from_strict(strict: bool) -> Self {
        if strict { Self::Strict } else { Self::Lenient }
    }
}

/// Parse the full status output of one node.
///
/// # Errors
///
/// Returns the first fatal [`ParseError`]; non-fatal findings are pushed to `diagnostics`.
pub fn parse_node(
    hostname: &str,
    raw: &str,
    policy: FieldPolicy,
    diagnostics: &mut Diagnostics,
) -> Result<NodeStatus, ParseError> {
    let mut node = parse_top_level(hostname, raw, diagnostics)?;
    parse_cpu_status(&mut node, policy, diagnostics)?;
    parse_gpu_status(&mut node, policy, diagnostics)?;
    Ok(node)
}

/// Assign one `key=value` pair to a record, applying the unknown-key policy.
fn assign<R: AttributeRecord>(
    record: &mut R,
    hostname: &str,
    key: &str,
    value: &str,
    policy: FieldPolicy,
    diagnostics: &mut Diagnostics,
) -> Result<(), ParseError> {
    match record.set_field(key, value) {
        Ok(()) => Ok(()),
        Err(FieldError::InvalidField { .. }) if policy == FieldPolicy::Lenient => {
            diagnostics.unknown_field(hostname, R::RECORD, key, value);
            record
                .extra_mut()
                .insert(key.to_owned(), value.trim().to_owned());
            Ok(())
        }
        Err(err) => Err(ParseError::field(hostname, err)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GPU_NODE: &str = "r23g34
     state = job-exclusive
     power_state = Running
     np = 36
     properties = skylake,gpu,p100
     ntype = cluster
     jobs = 0-8/501.master,9-17/502.master
     status = opsys=linux,uname=Linux r23g34 3.10.0,sessions=1234 5678,nsessions=2,loadave=17.91,state=free,jobs=501.master 502.master
     mom_service_port = 15002
     mom_manager_port = 15003
     gpus = 2
     gpu_status = gpu[1]=gpu_id=00000000:AF:00.0;gpu_utilization=88%;gpu_memory_utilization=40%;gpu_temperature=61 C,gpu[0]=gpu_id=00000000:3B:00.0;gpu_utilization=0%;gpu_memory_utilization=0%;gpu_temperature=33 C,driver_ver=390.46,timestamp=Wed Aug 29 15:20:41 2018
     total_sockets = 2
     total_numa_nodes = 2
     total_cores = 36
     total_threads = 36
     dedicated_sockets = 0
     dedicated_numa_nodes = 0
     dedicated_cores = 18
     dedicated_threads = 18
";

    #[test]
    fn test_parse_full_gpu_node() {
        let mut diagnostics = Diagnostics::new();
        let node = parse_node("r23g34", GPU_NODE, FieldPolicy::Lenient, &mut diagnostics).unwrap();

        assert_eq!(node.hostname, "r23g34");
        assert_eq!(node.np, 36);
        assert_eq!(node.mom_manager_port, 15003);
        assert_eq!(node.dedicated_cores, 18);
        assert_eq!(node.cpu.nsessions, 2);
        assert_eq!(node.cpu.uname.as_deref(), Some("Linux r23g34 3.10.0"));
        assert_eq!(node.gpus, 2);
        assert_eq!(node.gpu_list.len(), 2);
        assert_eq!(node.gpu_list[0].index, 0);
        assert_eq!(node.gpu_list[0].gpu_temperature.as_deref(), Some("33 C"));
        assert_eq!(node.gpu_list[1].gpu_utilization, 88);
        assert_eq!(
            node.gpu_attributes.get("driver_ver").map(String::as_str),
            Some("390.46")
        );
        assert!(diagnostics.is_empty(), "{} unexpected diagnostics", diagnostics.len());
    }

    #[test]
    fn test_coercion_failure_in_cpu_status_is_fatal() {
        let raw = "r22i13n01\n     status = nsessions=many,loadave=0.5\n";
        let err = parse_node("r22i13n01", raw, FieldPolicy::Lenient, &mut Diagnostics::new())
            .unwrap_err();
        assert!(matches!(
            err,
            ParseError::Field {
                source: FieldError::TypeCoercion { .. },
                ..
            }
        ));
    }

    #[test]
    fn test_policy_from_strict_flag() {
        assert_eq!(FieldPolicy::from_strict(true), FieldPolicy::Strict);
        assert_eq!(FieldPolicy::from_strict(false), FieldPolicy::Lenient);
        assert_eq!(FieldPolicy::default(), FieldPolicy::Lenient);
    }
}
