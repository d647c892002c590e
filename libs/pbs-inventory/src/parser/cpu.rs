use super::{FieldPolicy, assign};
use crate::diagnostics::Diagnostics;
use crate::error::ParseError;
use crate::model::{CpuStatus, NodeStatus};

/// Parse the node's comma separated `status` blob into [`NodeStatus::cpu`].
///
/// Entries without `=` are skipped. A node without a `status` attribute keeps
/// a default CPU record.
///
/// # Errors
///
/// Returns [`ParseError::Field`] if a numeric field cannot be parsed, or if an
/// unknown key is met under [`FieldPolicy::Strict`].
pub fn parse_cpu_status(
    node: &mut NodeStatus,
    policy: FieldPolicy,
    diagnostics: &mut Diagnostics,
) -> Result<(), ParseError> {
    let Some(status) = node.status.as_deref() else {
        return Ok(());
    };

    let mut cpu = CpuStatus::default();
    for entry in status.split(',') {
        let Some((key, value)) = entry.split_once('=') else {
            continue;
        };
        assign(&mut cpu, &node.hostname, key.trim(), value, policy, diagnostics)?;
    }

    node.cpu = cpu;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FieldError;

    fn node_with_status(status: &str) -> NodeStatus {
        NodeStatus {
            status: Some(status.to_owned()),
            ..NodeStatus::new("r22i13n01")
        }
    }

    #[test]
    fn test_parse_cpu_fields() {
        let mut node = node_with_status(
            "rectime=1535549162,macaddr=7c:d3:0a:b1:2c:3e,cpuclock=Fixed,varattr=,jobs=,state=free,netload=4227421352703,opsys=linux,uname=Linux r22i13n01 3.10.0-693.21.1.el7.x86_64 #1 SMP x86_64,sessions=4321,nsessions=1,loadave=0.00",
        );

        parse_cpu_status(&mut node, FieldPolicy::Strict, &mut Diagnostics::new()).unwrap();

        let cpu = &node.cpu;
        assert_eq!(cpu.rectime, 1_535_549_162);
        assert_eq!(cpu.macaddr.as_deref(), Some("7c:d3:0a:b1:2c:3e"));
        assert_eq!(cpu.varattr.as_deref(), Some(""));
        assert_eq!(cpu.state.as_deref(), Some("free"));
        assert_eq!(cpu.sessions.as_deref(), Some("4321"));
        assert_eq!(cpu.nsessions, 1);
        assert!(cpu.loadave.abs() < f64::EPSILON);
        assert_eq!(cpu.netload.as_deref(), Some("4227421352703"));
    }

    #[test]
    fn test_entries_without_equals_are_skipped() {
        let mut node = node_with_status("opsys=linux,garbage,loadave=1.5");
        parse_cpu_status(&mut node, FieldPolicy::Strict, &mut Diagnostics::new()).unwrap();
        assert_eq!(node.cpu.opsys.as_deref(), Some("linux"));
        assert!((node.cpu.loadave - 1.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_missing_status_keeps_defaults() {
        let mut node = NodeStatus::new("r22i13n01");
        parse_cpu_status(&mut node, FieldPolicy::Strict, &mut Diagnostics::new()).unwrap();
        assert_eq!(node.cpu, CpuStatus::default());
    }

    #[test]
    fn test_unknown_key_is_kept_when_lenient() {
        let mut node = node_with_status("opsys=linux,message=ERROR: disk full");
        let mut diagnostics = Diagnostics::new();
        parse_cpu_status(&mut node, FieldPolicy::Lenient, &mut diagnostics).unwrap();
        assert_eq!(
            node.cpu.extra.get("message").map(String::as_str),
            Some("ERROR: disk full")
        );
        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn test_unknown_key_is_fatal_when_strict() {
        let mut node = node_with_status("opsys=linux,message=ERROR: disk full");
        let err = parse_cpu_status(&mut node, FieldPolicy::Strict, &mut Diagnostics::new())
            .unwrap_err();
        assert!(matches!(
            err,
            ParseError::Field {
                source: FieldError::InvalidField { record: "cpu", ref field },
                ..
            } if field == "message"
        ));
    }

    #[test]
    fn test_bad_load_average_is_fatal() {
        let mut node = node_with_status("loadave=high");
        let err = parse_cpu_status(&mut node, FieldPolicy::Lenient, &mut Diagnostics::new())
            .unwrap_err();
        assert!(matches!(
            err,
            ParseError::Field {
                source: FieldError::TypeCoercion { expected: "f64", .. },
                ..
            }
        ));
    }
}
