use std::collections::{BTreeMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;

use super::{FieldPolicy, assign};
use crate::diagnostics::Diagnostics;
use crate::error::ParseError;
use crate::model::{GpuStatus, NodeStatus};

#[allow(clippy::expect_used)]
static DEVICE_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^gpu\[(\d+)\]$").expect("device tag regex is valid"));

/// Parse the node's `gpu_status` blob into [`NodeStatus::gpu_list`].
///
/// The blob is a comma separated list of `gpu[N]=key=value;key=value;...`
/// chunks, optionally followed by node level entries such as `driver_ver=...`
/// that end up in [`NodeStatus::gpu_attributes`]. Torque lists devices from the
/// highest index down, so the parsed list is reversed to ascending index order.
///
/// A node without `gpu_status` keeps an empty device list. A device count that
/// disagrees with the node's `gpus` attribute is reported as a diagnostic.
///
/// # Errors
///
/// - [`ParseError::MalformedGpuField`] for chunks or fields that are not `key=value`,
///   and for duplicate devices
/// - [`ParseError::Field`] for numeric fields that cannot be parsed, or unknown
///   keys under [`FieldPolicy::Strict`]
pub fn parse_gpu_status(
    node: &mut NodeStatus,
    policy: FieldPolicy,
    diagnostics: &mut Diagnostics,
) -> Result<(), ParseError> {
    let Some(raw) = node
        .gpu_status
        .as_deref()
        .map(str::trim)
        .filter(|raw| !raw.is_empty())
    else {
        return Ok(());
    };
    let hostname = node.hostname.as_str();

    let blob = raw
        .strip_prefix("gpu_status")
        .and_then(|rest| rest.trim_start().strip_prefix('='))
        .unwrap_or(raw);

    let mut devices = Vec::new();
    let mut attributes = BTreeMap::new();

    for chunk in blob.split(',').map(str::trim).filter(|c| !c.is_empty()) {
        let Some((tag, fields)) = chunk.split_once('=') else {
            return Err(ParseError::malformed_gpu(hostname, chunk, "missing '='"));
        };
        let tag = tag.trim();

        match device_index(tag) {
            Some(index) => {
                devices.push(parse_device(hostname, chunk, index, fields, policy, diagnostics)?);
            }
            None if is_device_shaped(tag, fields) => {
                return Err(ParseError::malformed_gpu(hostname, chunk, "invalid device tag"));
            }
            None => {
                attributes.insert(tag.to_owned(), fields.trim().to_owned());
            }
        }
    }

    // Devices are enumerated from the highest index to the lowest
    devices.reverse();
    if !devices.is_sorted_by_key(|device| device.index) {
        tracing::debug!(hostname, "gpu_status devices not in descending order, sorting by index");
        devices.sort_by_key(|device| device.index);
    }
    check_unique(hostname, &devices)?;

    if usize::try_from(node.gpus).ok() != Some(devices.len()) {
        diagnostics.gpu_count_mismatch(hostname, node.gpus, devices.len());
    }

    tracing::debug!(hostname, devices = devices.len(), "Parsed GPU status");
    node.gpu_list = devices;
    node.gpu_attributes = attributes;
    Ok(())
}

fn device_index(tag: &str) -> Option<u32> {
    DEVICE_TAG
        .captures(tag)
        .and_then(|caps| caps.get(1))
        .and_then(|index| index.as_str().parse().ok())
}

/// A chunk that carries device fields, or whose tag starts like `gpu[N]`.
///
/// Node level entries such as `driver_ver=390.46` hold a single plain value.
fn is_device_shaped(tag: &str, fields: &str) -> bool {
    tag.starts_with("gpu[") || fields.contains([';', '='])
}

fn parse_device(
    hostname: &str,
    chunk: &str,
    index: u32,
    fields: &str,
    policy: FieldPolicy,
    diagnostics: &mut Diagnostics,
) -> Result<GpuStatus, ParseError> {
    let mut device = GpuStatus {
        index,
        ..GpuStatus::default()
    };

    for entry in fields.split(';').map(str::trim).filter(|e| !e.is_empty()) {
        let mut parts = entry.split('=');
        let (Some(key), Some(value), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(ParseError::malformed_gpu(
                hostname,
                chunk,
                format!("field '{entry}' is not a single key=value pair"),
            ));
        };
        assign(&mut device, hostname, key.trim(), value, policy, diagnostics)?;
    }

    Ok(device)
}

fn check_unique(hostname: &str, devices: &[GpuStatus]) -> Result<(), ParseError> {
    let mut indices = HashSet::new();
    let mut ids = HashSet::new();
    for device in devices {
        let tag = format!("gpu[{}]", device.index);
        if !indices.insert(device.index) {
            return Err(ParseError::malformed_gpu(hostname, &tag, "duplicate device index"));
        }
        if let Some(id) = device.gpu_id.as_deref()
            && !ids.insert(id)
        {
            return Err(ParseError::malformed_gpu(
                hostname,
                &tag,
                format!("duplicate gpu_id '{id}'"),
            ));
        }
    }
    Ok(())
}
