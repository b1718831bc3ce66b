//! Inventory data model
//!
//! VM → adapter → MAC relationships as handed to renderers.

use serde::Serialize;
use std::fmt;

/// Sentinel for data that could not be retrieved
pub const UNKNOWN: &str = "Unknown";

/// One VM from the list call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VirtualMachineRecord {
    pub id: String,
    /// Display only; not guaranteed unique
    pub name: String,
}

/// One network adapter of a VM
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdapterRecord {
    /// Unique only within the parent VM
    pub id: String,
    pub label: String,
    pub adapter_type: String,
    /// Plausible MAC or [`UNKNOWN`]
    pub mac_address: String,
}

impl AdapterRecord {
    /// Adapter whose detail could not be fetched
    pub fn unresolved(id: String, label: String) -> Self {
        Self {
            id,
            label,
            adapter_type: UNKNOWN.to_string(),
            mac_address: UNKNOWN.to_string(),
        }
    }

    pub fn has_known_mac(&self) -> bool {
        self.mac_address != UNKNOWN
    }
}

/// A VM with its adapters in service order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatedEntry {
    pub vm: VirtualMachineRecord,
    pub adapters: Vec<AdapterRecord>,
    /// Set when the adapter list itself could not be fetched
    #[serde(skip_serializing_if = "Option::is_none")]
    pub adapter_error: Option<String>,
}

impl AggregatedEntry {
    pub fn new(vm: VirtualMachineRecord, adapters: Vec<AdapterRecord>) -> Self {
        Self {
            vm,
            adapters,
            adapter_error: None,
        }
    }

    /// Entry for a VM whose adapter enumeration failed
    pub fn failed(vm: VirtualMachineRecord, error: String) -> Self {
        Self {
            vm,
            adapters: Vec::new(),
            adapter_error: Some(error),
        }
    }
}

/// Ordered result of a run, one entry per enumerated VM
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Dataset {
    entries: Vec<AggregatedEntry>,
}

impl Dataset {
    pub fn new(entries: Vec<AggregatedEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[AggregatedEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, AggregatedEntry> {
        self.entries.iter()
    }

    pub fn summary(&self) -> DatasetSummary {
        let mut summary = DatasetSummary {
            vms: self.entries.len(),
            ..DatasetSummary::default()
        };
        for entry in &self.entries {
            summary.adapters += entry.adapters.len();
            summary.unknown_macs += entry.adapters.iter().filter(|a| !a.has_known_mac()).count();
            if entry.adapters.is_empty() {
                summary.vms_without_adapters += 1;
            }
            if entry.adapter_error.is_some() {
                summary.vms_with_errors += 1;
            }
        }
        summary
    }
}

impl<'a> IntoIterator for &'a Dataset {
    type Item = &'a AggregatedEntry;
    type IntoIter = std::slice::Iter<'a, AggregatedEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Counts over a dataset
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DatasetSummary {
    pub vms: usize,
    pub adapters: usize,
    pub unknown_macs: usize,
    pub vms_without_adapters: usize,
    pub vms_with_errors: usize,
}

impl fmt::Display for DatasetSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} VMs, {} adapters ({} unknown MACs), {} VMs without adapters, {} adapter lookups failed",
            self.vms, self.adapters, self.unknown_macs, self.vms_without_adapters, self.vms_with_errors
        )
    }
}

/// Six two-digit hex groups, uniformly separated by `:` or `-`
pub fn is_plausible_mac(candidate: &str) -> bool {
    let separator = match candidate.as_bytes().get(2) {
        Some(b':') => ':',
        Some(b'-') => '-',
        _ => return false,
    };

    let groups: Vec<&str> = candidate.split(separator).collect();
    groups.len() == 6
        && groups
            .iter()
            .all(|g| g.len() == 2 && g.chars().all(|c| c.is_ascii_hexdigit()))
}

/// The MAC if it is plausible, otherwise [`UNKNOWN`]
pub fn mac_or_unknown(candidate: Option<String>) -> String {
    match candidate {
        Some(mac) if is_plausible_mac(&mac) => mac,
        _ => UNKNOWN.to_string(),
    }
}
