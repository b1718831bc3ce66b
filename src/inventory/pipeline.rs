//! Aggregation pipeline
//!
//! VM list → per-VM adapter list → per-adapter detail, assembled into a
//! [`Dataset`]. Only a failed login or a failed VM list aborts a run; adapter
//! list and adapter detail failures are recorded in the dataset instead.

use super::models::{
    mac_or_unknown, AdapterRecord, AggregatedEntry, Dataset, VirtualMachineRecord, UNKNOWN,
};
use super::shape::{first_present, to_list, to_record};
use crate::vsphere::{Credentials, Generation, HttpTransport, VsphereClient, VsphereError};
use futures::stream::{self, StreamExt};
use serde_json::Value;
use std::future::Future;
use std::time::Duration;
use tokio::sync::Semaphore;

const VM_ID_ALIASES: &[&str] = &["vm", "vm_id", "id"];
const VM_NAME_ALIASES: &[&str] = &["name", "vm_name"];
const NIC_ID_ALIASES: &[&str] = &["nic", "nic_id", "id", "pci_slot_number"];
const ADAPTER_TYPE_ALIASES: &[&str] = &["adapter_type", "type"];

/// Pipeline tuning
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Maximum number of requests in flight; 1 means strictly sequential
    pub concurrency: usize,
    /// Overall deadline for the run
    pub deadline: Option<Duration>,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            concurrency: 1,
            deadline: None,
        }
    }
}

/// Turns a session into a [`Dataset`]
pub struct AggregationPipeline<'a> {
    client: &'a VsphereClient,
    options: PipelineOptions,
    permits: Semaphore,
}

impl<'a> AggregationPipeline<'a> {
    pub fn new(client: &'a VsphereClient, options: PipelineOptions) -> Self {
        let options = PipelineOptions {
            concurrency: options.concurrency.max(1),
            ..options
        };
        let permits = Semaphore::new(options.concurrency);
        Self {
            client,
            options,
            permits,
        }
    }

    /// Enumerate everything, honoring the configured deadline
    pub async fn run(&self) -> Result<Dataset, VsphereError> {
        with_deadline(self.options.deadline, self.collect()).await
    }

    async fn collect(&self) -> Result<Dataset, VsphereError> {
        let (generation, payload) = self.fetch(|| self.client.list_vms()).await?;
        let vms: Vec<VirtualMachineRecord> = to_list(&payload).iter().map(vm_from_record).collect();
        tracing::info!("Enumerating {} VMs (list served by {} generation)", vms.len(), generation);

        let entries = stream::iter(vms)
            .map(|vm| self.collect_entry(vm))
            .buffered(self.options.concurrency)
            .collect::<Vec<_>>()
            .await;

        Ok(Dataset::new(entries))
    }

    async fn collect_entry(&self, vm: VirtualMachineRecord) -> AggregatedEntry {
        if vm.id.is_empty() {
            tracing::warn!("VM record '{}' has no identifier, skipping adapter lookup", vm.name);
            return AggregatedEntry::failed(vm, "VM record has no identifier".to_string());
        }

        let payload = match self.fetch(|| self.client.list_ethernet(&vm.id)).await {
            Ok((_, payload)) => payload,
            Err(err) => {
                tracing::warn!("Adapter list for VM {} failed: {}", vm.id, err);
                return AggregatedEntry::failed(vm, err.to_string());
            }
        };

        let summaries = to_list(&payload);
        tracing::debug!("VM {} has {} adapters", vm.id, summaries.len());

        let adapters = stream::iter(summaries.iter())
            .map(|summary| self.collect_adapter(&vm.id, summary))
            .buffered(self.options.concurrency)
            .collect::<Vec<_>>()
            .await;

        AggregatedEntry::new(vm, adapters)
    }

    async fn collect_adapter(&self, vm_id: &str, summary: &Value) -> AdapterRecord {
        let summary = to_record(summary);
        let id = first_present(&summary, NIC_ID_ALIASES).unwrap_or_default();
        let label = first_present(&summary, &["label"]);

        if id.is_empty() {
            tracing::warn!("Adapter of VM {} has no identifier", vm_id);
            return AdapterRecord::unresolved(id, label.unwrap_or_else(|| "NIC".to_string()));
        }

        let detail = match self.fetch(|| self.client.get_ethernet(vm_id, &id)).await {
            Ok((_, payload)) => to_record(&payload),
            Err(err) => {
                tracing::warn!("Adapter {} of VM {} detail failed: {}", id, vm_id, err);
                let label = label.unwrap_or_else(|| format!("NIC {}", id));
                return AdapterRecord::unresolved(id, label);
            }
        };

        let label = label
            .or_else(|| first_present(&detail, &["label"]))
            .unwrap_or_else(|| format!("NIC {}", id));

        AdapterRecord {
            adapter_type: first_present(&detail, ADAPTER_TYPE_ALIASES)
                .unwrap_or_else(|| UNKNOWN.to_string()),
            mac_address: mac_or_unknown(first_present(&detail, &["mac_address"])),
            id,
            label,
        }
    }

    /// Run one fetch under the global in-flight cap
    async fn fetch<F, Fut>(&self, request: F) -> Result<(Generation, Value), VsphereError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<(Generation, Value), VsphereError>>,
    {
        // The semaphore is never closed
        let _permit = self.permits.acquire().await.ok();
        request().await
    }
}

/// Negotiate a session and run the pipeline, all under one deadline
pub async fn collect_inventory(
    transport: HttpTransport,
    base_url: &str,
    credentials: &Credentials,
    options: &PipelineOptions,
) -> Result<Dataset, VsphereError> {
    let work = async {
        let client = VsphereClient::connect(transport, base_url, credentials).await?;
        tracing::debug!("Session issued by {} generation", client.session().generation());
        AggregationPipeline::new(&client, options.clone()).collect().await
    };

    with_deadline(options.deadline, work).await
}

async fn with_deadline<T>(
    deadline: Option<Duration>,
    work: impl Future<Output = Result<T, VsphereError>>,
) -> Result<T, VsphereError> {
    match deadline {
        Some(limit) => tokio::time::timeout(limit, work)
            .await
            .map_err(|_| VsphereError::DeadlineExceeded(limit))?,
        None => work.await,
    }
}

fn vm_from_record(record: &Value) -> VirtualMachineRecord {
    let record = to_record(record);
    VirtualMachineRecord {
        id: first_present(&record, VM_ID_ALIASES).unwrap_or_default(),
        name: first_present(&record, VM_NAME_ALIASES).unwrap_or_default(),
    }
}
