//! Typed node, CPU and GPU records and the cluster inventory built from them

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::diagnostics::Diagnostics;
use crate::hostnames::Cluster;

attribute_record! {
    /// CPU side of a node, parsed from the comma separated `status` entry
    pub struct CpuStatus as "cpu" {
        opsys = "opsys": text,
        uname = "uname": text,
        kernel = "kernel": text,
        macaddr = "macaddr": text,
        cpuclock = "cpuclock": text,
        sessions = "sessions": text,
        nsessions = "nsessions": (u32),
        loadave = "loadave": (f64),
        netload = "netload": text,
        state = "state": text,
        varattr = "varattr": text,
        jobs = "jobs": text,
        puppethpccode = "puppethpccode": text,
        sudo = "sudo": text,
        version = "version": text,
        gres = "gres": text,
        availmem = "availmem": text,
        physmem = "physmem": text,
        totmem = "totmem": text,
        ncpus = "ncpus": (u32),
        idletime = "idletime": (u64),
        /// Time the status was recorded, seconds since the epoch
        rectime = "rectime": (u64),
    }
}

attribute_record! {
    /// One GPU device, parsed from a `gpu[N]=...` chunk of `gpu_status`
    pub struct GpuStatus as "gpu" {
        gpu_id = "gpu_id": text,
        gpu_pci_device_id = "gpu_pci_device_id": (u64),
        gpu_pci_location_id = "gpu_pci_location_id": text,
        gpu_product_name = "gpu_product_name": text,
        gpu_memory_total = "gpu_memory_total": text,
        /// Used device memory in MB
        gpu_memory_used = "gpu_memory_used": (u64),
        gpu_mode = "gpu_mode": text,
        gpu_state = "gpu_state": text,
        /// Compute utilization in percent
        gpu_utilization = "gpu_utilization": (u32),
        /// Memory utilization in percent
        gpu_memory_utilization = "gpu_memory_utilization": (u32),
        gpu_ecc_mode = "gpu_ecc_mode": text,
        gpu_single_bit_ecc_errors = "gpu_single_bit_ecc_errors": (u64),
        gpu_double_bit_ecc_errors = "gpu_double_bit_ecc_errors": (u64),
        gpu_temperature = "gpu_temperature": text,
    }
    extra {
        /// Device index taken from the `gpu[N]` tag
        index: u32,
    }
}

attribute_record! {
    /// A compute node as reported by one `pbsnodes <hostname>` call
    pub struct NodeStatus as "node" {
        state = "state": text,
        power_state = "power_state": text,
        np = "np": (u32),
        properties = "properties": text,
        ntype = "ntype": text,
        jobs = "jobs": text,
        /// Raw CPU status blob
        status = "status": text,
        note = "note": text,
        mom_service_port = "mom_service_port": (u32),
        mom_manager_port = "mom_manager_port": (u32),
        gpus = "gpus": (u32),
        /// Raw GPU status blob, only reported by GPU nodes
        gpu_status = "gpu_status": text,
        total_sockets = "total_sockets": (u32),
        total_numa_nodes = "total_numa_nodes": (u32),
        total_cores = "total_cores": (u32),
        total_threads = "total_threads": (u32),
        dedicated_sockets = "dedicated_sockets": (u32),
        dedicated_numa_nodes = "dedicated_numa_nodes": (u32),
        dedicated_cores = "dedicated_cores": (u32),
        dedicated_threads = "dedicated_threads": (u32),
    }
    extra {
        hostname: String,
        cpu: CpuStatus,
        /// Devices ordered by ascending index
        gpu_list: Vec<GpuStatus>,
        /// Node level entries of `gpu_status`, e.g. `driver_ver` and `timestamp`
        gpu_attributes: BTreeMap<String, String>,
    }
}

impl NodeStatus {
    #[must_use]
    pub fn new(hostname: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            ..Self::default()
        }
    }

    /// Job ids assigned to the node.
    ///
    /// The `jobs` attribute lists `core-range/jobid` entries separated by commas;
    /// a job spanning several cores appears once.
    #[must_use]
    pub fn job_ids(&self) -> Vec<&str> {
        let Some(jobs) = self.jobs.as_deref() else {
            return Vec::new();
        };
        let mut seen = BTreeSet::new();
        jobs.split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(|entry| entry.rsplit_once('/').map_or(entry, |(_, job)| job))
            .filter(|job| seen.insert(*job))
            .collect()
    }

    #[must_use]
    pub fn has_gpus(&self) -> bool {
        !self.gpu_list.is_empty()
    }
}

/// Aggregate counters over a cluster inventory
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InventorySummary {
    pub nodes: usize,
    pub gpu_nodes: usize,
    pub gpus: usize,
    /// GPUs with a non-zero utilization
    pub busy_gpus: usize,
    pub jobs: usize,
    /// Node count per scheduler state (e.g. `free`, `job-exclusive`)
    pub states: BTreeMap<String, usize>,
}

/// Snapshot of all nodes of one cluster
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusterInventory {
    pub cluster: Cluster,
    pub gpu_hostnames: Vec<String>,
    pub cpu_hostnames: Vec<String>,
    pub hostnames: Vec<String>,
    pub nodes: Vec<NodeStatus>,
    pub diagnostics: Diagnostics,
    pub collected_at: chrono::DateTime<chrono::Utc>,
}

impl ClusterInventory {
    #[must_use]
    pub fn node(&self, hostname: &str) -> Option<&NodeStatus> {
        self.nodes.iter().find(|node| node.hostname == hostname)
    }

    pub fn gpu_nodes(&self) -> impl Iterator<Item = &NodeStatus> {
        self.nodes.iter().filter(|node| node.has_gpus())
    }

    #[must_use]
    pub fn summary(&self) -> InventorySummary {
        let mut summary = InventorySummary {
            nodes: self.nodes.len(),
            ..InventorySummary::default()
        };
        let mut jobs = BTreeSet::new();

        for node in &self.nodes {
            if node.has_gpus() {
                summary.gpu_nodes += 1;
            }
            summary.gpus += node.gpu_list.len();
            summary.busy_gpus += node
                .gpu_list
                .iter()
                .filter(|gpu| gpu.gpu_utilization > 0)
                .count();
            jobs.extend(node.job_ids());

            let state = node.state.clone().unwrap_or_else(|| "unknown".to_owned());
            *summary.states.entry(state).or_default() += 1;
        }

        summary.jobs = jobs.len();
        summary
    }
}
