#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Cluster inventory library
//!
//! Builds a point-in-time snapshot of a Torque/PBS cluster by running the
//! scheduler's node status command (`pbsnodes <host>`) for every host and
//! parsing its output into typed records:
//! - [`NodeStatus`] with the top-level node attributes
//! - [`CpuStatus`] parsed from the node's `status` blob
//! - [`GpuStatus`] list parsed from the node's `gpu_status` blob
//!
//! The data structure tree is `ClusterInventory -> [NodeStatus] -> {CpuStatus, [GpuStatus]}`.

#[macro_use]
mod record;

pub mod collector;
pub mod diagnostics;
pub mod error;
pub mod hostnames;
pub mod model;
pub mod parser;
pub mod source;

pub use collector::{CollectOptions, InventoryCollector};
pub use diagnostics::{Diagnostic, Diagnostics};
pub use error::{FieldError, InventoryError, ParseError, StatusCommandError};
pub use hostnames::{Cluster, HostnameSet};
pub use model::{ClusterInventory, CpuStatus, GpuStatus, InventorySummary, NodeStatus};
pub use parser::{FieldPolicy, parse_node};
pub use record::{AttributeRecord, FieldValue};
pub use source::{CommandStatusSource, StatusSource};
