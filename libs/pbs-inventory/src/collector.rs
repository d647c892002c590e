//! Assembly of node records and cluster inventories from a status source

use futures::{StreamExt, TryStreamExt, stream};
use tokio_util::sync::CancellationToken;

use crate::diagnostics::Diagnostics;
use crate::error::InventoryError;
use crate::hostnames::Cluster;
use crate::model::{ClusterInventory, NodeStatus};
use crate::parser::{FieldPolicy, parse_node};
use crate::source::StatusSource;

/// Options of an inventory build
#[derive(Debug, Clone)]
pub struct CollectOptions {
    /// Maximum number of status queries in flight; `1` queries hosts one by one
    pub concurrency: usize,
    pub field_policy: FieldPolicy,
    /// Aborts the build with [`InventoryError::Cancelled`] when triggered
    pub cancel: Option<CancellationToken>,
}

impl Default for CollectOptions {
    fn default() -> Self {
        Self {
            concurrency: 1,
            field_policy: FieldPolicy::Lenient,
            cancel: None,
        }
    }
}

/// Builds node records and cluster inventories from a [`StatusSource`]
pub struct InventoryCollector<S> {
    source: S,
    options: CollectOptions,
}

impl<S: StatusSource> InventoryCollector<S> {
    pub fn new(source: S) -> Self {
        Self::with_options(source, CollectOptions::default())
    }

    pub fn with_options(source: S, options: CollectOptions) -> Self {
        Self { source, options }
    }

    /// Query and parse a single host.
    ///
    /// # Errors
    ///
    /// Returns [`InventoryError::StatusCommand`] if the status command fails and
    /// [`InventoryError::Parse`] if its output cannot be parsed.
    pub async fn collect_node(
        &self,
        hostname: &str,
    ) -> Result<(NodeStatus, Diagnostics), InventoryError> {
        let raw = self
            .source
            .query(hostname)
            .await
            .map_err(|source| InventoryError::StatusCommand {
                hostname: hostname.to_owned(),
                source,
            })?;

        let mut diagnostics = Diagnostics::new();
        let node = parse_node(hostname, &raw, self.options.field_policy, &mut diagnostics)?;
        Ok((node, diagnostics))
    }

    /// Validate a cluster name and build its inventory.
    ///
    /// # Errors
    ///
    /// Returns [`InventoryError::UnknownCluster`] before any host is queried if
    /// `name` is not a known cluster, otherwise see [`Self::collect`].
    pub async fn collect_cluster(&self, name: &str) -> Result<ClusterInventory, InventoryError> {
        let cluster: Cluster = name.parse()?;
        self.collect(cluster).await
    }

    /// Build the inventory of every host of `cluster`, in hostname order.
    ///
    /// The first failing host aborts the whole build; no partial inventory is returned.
    ///
    /// # Errors
    ///
    /// Returns the first [`InventoryError`] met, or [`InventoryError::Cancelled`]
    /// if the cancellation token fires first.
    pub async fn collect(&self, cluster: Cluster) -> Result<ClusterInventory, InventoryError> {
        let hosts = cluster.hostnames();
        let hostnames = hosts.all();
        tracing::info!(
            cluster = %cluster,
            hosts = hostnames.len(),
            concurrency = self.options.concurrency,
            "Collecting cluster inventory"
        );

        let build = self.collect_hosts(&hostnames);
        let results = match &self.options.cancel {
            Some(cancel) => tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    tracing::warn!(cluster = %cluster, "Inventory collection cancelled");
                    return Err(InventoryError::Cancelled);
                }
                results = build => results?,
            },
            None => build.await?,
        };

        let mut diagnostics = Diagnostics::new();
        let mut nodes = Vec::with_capacity(results.len());
        for (node, node_diagnostics) in results {
            diagnostics.extend(node_diagnostics);
            nodes.push(node);
        }

        tracing::info!(
            cluster = %cluster,
            nodes = nodes.len(),
            diagnostics = diagnostics.len(),
            "Cluster inventory collected"
        );

        Ok(ClusterInventory {
            cluster,
            gpu_hostnames: hosts.gpu,
            cpu_hostnames: hosts.cpu,
            hostnames,
            nodes,
            diagnostics,
            collected_at: chrono::Utc::now(),
        })
    }

    async fn collect_hosts(
        &self,
        hostnames: &[String],
    ) -> Result<Vec<(NodeStatus, Diagnostics)>, InventoryError> {
        stream::iter(hostnames)
            .map(|hostname| self.collect_node(hostname))
            .buffered(self.options.concurrency.max(1))
            .try_collect()
            .await
    }
}
