//! Terminal rendering of node and cluster inventories

use std::fmt;

use colored::{ColoredString, Colorize};
use pbs_inventory::{ClusterInventory, Diagnostic, Diagnostics, GpuStatus, NodeStatus};

const RULE_WIDTH: usize = 80;
const DEVICE_WIDTH: usize = 18;
const VALUE_WIDTH: usize = 7;
const HOT_TEMPERATURE: u32 = 80;

/// State, jobs and GPU table of one node
pub struct NodeReport<'a> {
    node: &'a NodeStatus,
}

impl<'a> NodeReport<'a> {
    #[must_use]
    pub fn new(node: &'a NodeStatus) -> Self {
        Self { node }
    }
}

impl fmt::Display for NodeReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let node = self.node;
        let state = node.state.as_deref().unwrap_or("unknown");
        writeln!(
            f,
            "{} {}  np={} gpus={}",
            format!("{:<12}", node.hostname).bold(),
            state_color(state),
            node.np,
            node.gpus
        )?;

        let jobs = node.job_ids();
        if jobs.is_empty() {
            writeln!(f, "  Jobs on {}: {}", node.hostname, "none".dimmed())?;
        } else {
            writeln!(f, "  Jobs on {}: {}", node.hostname, jobs.join(", "))?;
        }

        if node.has_gpus() {
            write_gpu_table(f, &node.gpu_list)?;
        }
        Ok(())
    }
}

fn write_gpu_table(f: &mut fmt::Formatter<'_>, devices: &[GpuStatus]) -> fmt::Result {
    writeln!(
        f,
        "  {:<DEVICE_WIDTH$}{:<VALUE_WIDTH$}{:<VALUE_WIDTH$}{:<VALUE_WIDTH$}",
        "Device ID", "Use", "Mem", "Tempr"
    )?;
    writeln!(
        f,
        "  {:<DEVICE_WIDTH$}{:<VALUE_WIDTH$}{:<VALUE_WIDTH$}{:<VALUE_WIDTH$}",
        "", "[%]", "[%]", "[C]"
    )?;

    for device in devices {
        let id = device
            .gpu_id
            .clone()
            .unwrap_or_else(|| format!("gpu[{}]", device.index));
        writeln!(
            f,
            "  {:<DEVICE_WIDTH$}{}{:<VALUE_WIDTH$}{}",
            id,
            utilization_color(device.gpu_utilization),
            device.gpu_memory_utilization,
            temperature_color(device.gpu_temperature.as_deref()),
        )?;
    }
    Ok(())
}

fn state_color(state: &str) -> ColoredString {
    if state.contains("down") || state.contains("offline") {
        state.red()
    } else if state == "free" {
        state.green()
    } else {
        state.yellow()
    }
}

fn utilization_color(utilization: u32) -> ColoredString {
    let cell = format!("{utilization:<VALUE_WIDTH$}");
    if utilization == 0 {
        cell.dimmed()
    } else {
        cell.green()
    }
}

/// Torque reports temperatures as `55 C`; only the number is shown.
fn temperature_color(raw: Option<&str>) -> ColoredString {
    let Some(value) = raw.map(|t| t.trim().trim_end_matches('C').trim()) else {
        return format!("{:<VALUE_WIDTH$}", "-").dimmed();
    };
    let cell = format!("{value:<VALUE_WIDTH$}");
    if value
        .parse::<u32>()
        .is_ok_and(|celsius| celsius >= HOT_TEMPERATURE)
    {
        cell.red()
    } else {
        cell.normal()
    }
}

/// Every node of an inventory followed by a summary footer
pub struct ClusterReport<'a> {
    inventory: &'a ClusterInventory,
    gpu_only: bool,
}

impl<'a> ClusterReport<'a> {
    #[must_use]
    pub fn new(inventory: &'a ClusterInventory, gpu_only: bool) -> Self {
        Self {
            inventory,
            gpu_only,
        }
    }
}

impl fmt::Display for ClusterReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inventory = self.inventory;
        writeln!(f, "{}", "=".repeat(RULE_WIDTH))?;
        writeln!(
            f,
            "  {}",
            format!("CLUSTER {}", inventory.cluster.as_str().to_uppercase()).bold()
        )?;
        writeln!(
            f,
            "  Collected at {}",
            inventory.collected_at.format("%Y-%m-%d %H:%M:%S UTC")
        )?;
        writeln!(f, "{}", "=".repeat(RULE_WIDTH))?;

        for node in &inventory.nodes {
            if self.gpu_only && !node.has_gpus() {
                continue;
            }
            writeln!(f)?;
            write!(f, "{}", NodeReport::new(node))?;
        }

        let summary = inventory.summary();
        writeln!(f)?;
        writeln!(f, "{}", "-".repeat(RULE_WIDTH))?;
        writeln!(f, "  {}", "SUMMARY".bold())?;
        writeln!(f, "{}", "-".repeat(RULE_WIDTH))?;
        writeln!(f, "  Nodes:      {}", summary.nodes)?;
        writeln!(f, "  GPU nodes:  {}", summary.gpu_nodes)?;
        writeln!(f, "  GPUs:       {} ({} busy)", summary.gpus, summary.busy_gpus)?;
        writeln!(f, "  Jobs:       {}", summary.jobs)?;
        let states: Vec<String> = summary
            .states
            .iter()
            .map(|(state, count)| format!("{state}: {count}"))
            .collect();
        writeln!(f, "  States:     {}", states.join(", "))?;

        write!(f, "{}", DiagnosticsReport::new(&inventory.diagnostics))
    }
}

/// Warnings and a count of the unknown fields kept aside
pub struct DiagnosticsReport<'a> {
    diagnostics: &'a Diagnostics,
}

impl<'a> DiagnosticsReport<'a> {
    #[must_use]
    pub fn new(diagnostics: &'a Diagnostics) -> Self {
        Self { diagnostics }
    }
}

impl fmt::Display for DiagnosticsReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let unknown = self
            .diagnostics
            .iter()
            .filter(|d| matches!(d, Diagnostic::UnknownField { .. }))
            .count();
        let warnings: Vec<&Diagnostic> = self.diagnostics.warnings().collect();
        if unknown == 0 && warnings.is_empty() {
            return Ok(());
        }

        writeln!(f)?;
        for warning in warnings {
            writeln!(f, "  {} {warning}", "warning:".yellow().bold())?;
        }
        if unknown > 0 {
            writeln!(
                f,
                "  {}",
                format!("{unknown} unknown status field(s) kept aside, run with -v for details")
                    .dimmed()
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pbs_inventory::Cluster;

    fn device(index: u32, utilization: u32, memory: u32, temperature: &str) -> GpuStatus {
        GpuStatus {
            index,
            gpu_id: Some(format!("00000000:{:02X}:00.0", 0x3b + index)),
            gpu_utilization: utilization,
            gpu_memory_utilization: memory,
            gpu_temperature: Some(temperature.to_owned()),
            ..GpuStatus::default()
        }
    }

    fn gpu_node() -> NodeStatus {
        NodeStatus {
            state: Some("job-exclusive".to_owned()),
            np: 36,
            gpus: 2,
            jobs: Some("0-17/4100.master,18-35/4101.master".to_owned()),
            gpu_list: vec![device(0, 94, 47, "61 C"), device(1, 0, 0, "33 C")],
            ..NodeStatus::new("r22g35")
        }
    }

    #[test]
    fn test_node_report_lists_jobs_and_devices() {
        colored::control::set_override(false);
        let text = NodeReport::new(&gpu_node()).to_string();

        assert!(text.starts_with("r22g35"));
        assert!(text.contains("job-exclusive"));
        assert!(text.contains("Jobs on r22g35: 4100.master, 4101.master"));
        assert!(text.contains("Device ID"));
        assert!(text.contains("[%]"));
        assert!(text.contains("00000000:3B:00.0  94     47     61"));
        assert!(text.contains("00000000:3C:00.0  0      0      33"));
    }

    #[test]
    fn test_cpu_node_report_has_no_gpu_table() {
        colored::control::set_override(false);
        let node = NodeStatus {
            state: Some("free".to_owned()),
            ..NodeStatus::new("r22i13n01")
        };
        let text = NodeReport::new(&node).to_string();
        assert!(text.contains("Jobs on r22i13n01: none"));
        assert!(!text.contains("Device ID"));
    }

    #[test]
    fn test_cluster_report_filters_and_summarizes() {
        colored::control::set_override(false);
        let cpu = NodeStatus {
            state: Some("free".to_owned()),
            ..NodeStatus::new("r22i13n01")
        };
        let inventory = ClusterInventory {
            cluster: Cluster::Genius,
            gpu_hostnames: vec!["r22g35".to_owned()],
            cpu_hostnames: vec!["r22i13n01".to_owned()],
            hostnames: vec!["r22g35".to_owned(), "r22i13n01".to_owned()],
            nodes: vec![gpu_node(), cpu],
            diagnostics: Diagnostics::default(),
            collected_at: chrono::Utc::now(),
        };

        let all = ClusterReport::new(&inventory, false).to_string();
        assert!(all.contains("CLUSTER GENIUS"));
        assert!(all.contains("r22i13n01"));
        assert!(all.contains("GPUs:       2 (1 busy)"));
        assert!(all.contains("States:     free: 1, job-exclusive: 1"));

        let gpu_only = ClusterReport::new(&inventory, true).to_string();
        assert!(gpu_only.contains("Jobs on r22g35"));
        assert!(!gpu_only.contains("Jobs on r22i13n01"));
        assert!(gpu_only.contains("Nodes:      2"));
    }

    #[test]
    fn test_missing_temperature_is_a_dash() {
        colored::control::set_override(false);
        assert_eq!(temperature_color(None).to_string().trim(), "-");
        assert_eq!(temperature_color(Some("85 C")).to_string().trim(), "85");
    }
}
