//! Cluster identifiers and the static hostname rules of each cluster

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::InventoryError;

/// GPU racks of genius: `(rack, first index, last index)`
const GENIUS_GPU_RACKS: &[(u32, u32, u32)] = &[(22, 35, 41), (23, 34, 39), (24, 35, 41)];
const GENIUS_CPU_RACKS: &[u32] = &[22, 23];
const GENIUS_CPU_ISLANDS: &[u32] = &[13, 27];
const GENIUS_NODES_PER_ISLAND: u32 = 24;

/// Clusters with a known naming scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Cluster {
    Thinking,
    Genius,
    Breniac,
}

impl Cluster {
    pub const ALL: [Self; 3] = [Self::Thinking, Self::Genius, Self::Breniac];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Thinking => "thinking",
            Self::Genius => "genius",
            Self::Breniac => "breniac",
        }
    }

    /// Hostnames of the GPU nodes
    #[must_use]
    pub fn gpu_hostnames(self) -> Vec<String> {
        match self {
            Self::Genius => GENIUS_GPU_RACKS
                .iter()
                .flat_map(|&(rack, first, last)| {
                    (first..=last).map(move |index| format!("r{rack}g{index:02}"))
                })
                .collect(),
            // TODO: add naming rules once the thinking and breniac node lists are available
            Self::Thinking | Self::Breniac => Vec::new(),
        }
    }

    /// Hostnames of the CPU-only nodes
    #[must_use]
    pub fn cpu_hostnames(self) -> Vec<String> {
        match self {
            Self::Genius => {
                let mut hosts = Vec::new();
                for rack in GENIUS_CPU_RACKS {
                    for island in GENIUS_CPU_ISLANDS {
                        hosts.extend(
                            (1..=GENIUS_NODES_PER_ISLAND)
                                .map(|node| format!("r{rack:02}i{island:02}n{node:02}")),
                        );
                    }
                }
                hosts
            }
            Self::Thinking | Self::Breniac => Vec::new(),
        }
    }

    #[must_use]
    pub fn hostnames(self) -> HostnameSet {
        HostnameSet {
            gpu: self.gpu_hostnames(),
            cpu: self.cpu_hostnames(),
        }
    }
}

impl fmt::Display for Cluster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Cluster {
    type Err = InventoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|cluster| cluster.as_str() == name)
            .ok_or_else(|| InventoryError::UnknownCluster(s.to_owned()))
    }
}

/// Disjoint GPU and CPU hostname lists of one cluster
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HostnameSet {
    pub gpu: Vec<String>,
    pub cpu: Vec<String>,
}

impl HostnameSet {
    /// GPU hostnames followed by CPU hostnames
    #[must_use]
    pub fn all(&self) -> Vec<String> {
        self.gpu.iter().chain(&self.cpu).cloned().collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.gpu.len() + self.cpu.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.gpu.is_empty() && self.cpu.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_genius_hostname_counts() {
        let hosts = Cluster::Genius.hostnames();
        assert_eq!(hosts.gpu.len(), 7 + 6 + 7);
        assert_eq!(hosts.cpu.len(), 2 * 2 * 24);
        assert_eq!(hosts.len(), 116);
    }

    #[test]
    fn test_genius_gpu_and_cpu_lists_are_disjoint() {
        let hosts = Cluster::Genius.hostnames();
        let gpu: HashSet<_> = hosts.gpu.iter().collect();
        let cpu: HashSet<_> = hosts.cpu.iter().collect();
        assert_eq!(gpu.len(), hosts.gpu.len());
        assert_eq!(cpu.len(), hosts.cpu.len());
        assert!(gpu.is_disjoint(&cpu));
    }

    #[test]
    fn test_genius_hostname_formats() {
        let hosts = Cluster::Genius.hostnames();
        assert_eq!(hosts.gpu.first().map(String::as_str), Some("r22g35"));
        assert_eq!(hosts.gpu.get(7).map(String::as_str), Some("r23g34"));
        assert_eq!(hosts.gpu.last().map(String::as_str), Some("r24g41"));
        assert_eq!(hosts.cpu.first().map(String::as_str), Some("r22i13n01"));
        assert_eq!(hosts.cpu.get(24).map(String::as_str), Some("r22i27n01"));
        assert_eq!(hosts.cpu.last().map(String::as_str), Some("r23i27n24"));
    }

    #[test]
    fn test_all_lists_gpu_hosts_first() {
        let hosts = Cluster::Genius.hostnames();
        let all = hosts.all();
        assert_eq!(all.len(), 116);
        assert_eq!(all[0], "r22g35");
        assert_eq!(all[20], "r22i13n01");
    }

    #[test]
    fn test_placeholder_clusters_are_empty() {
        assert!(Cluster::Thinking.hostnames().is_empty());
        assert!(Cluster::Breniac.hostnames().is_empty());
    }

    #[test]
    fn test_parse_cluster_is_case_insensitive() {
        assert_eq!("Genius".parse::<Cluster>().unwrap(), Cluster::Genius);
        assert_eq!(" thinking ".parse::<Cluster>().unwrap(), Cluster::Thinking);
        assert_eq!(Cluster::Breniac.to_string(), "breniac");
    }

    #[test]
    fn test_parse_unknown_cluster_fails() {
        let err = "foo".parse::<Cluster>().unwrap_err();
        assert!(matches!(err, InventoryError::UnknownCluster(ref name) if name == "foo"));
    }
}
