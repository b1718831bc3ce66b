//! Inventory aggregation layer
//!
//! Turns raw vCenter payloads into a normalized VM → adapter → MAC dataset.
//!
//! # Architecture
//!
//! - [`shape`] - Normalizes the envelope conventions of both API generations
//! - [`models`] - Records, dataset and the "Unknown" sentinel
//! - [`pipeline`] - VM/adapter/detail traversal with partial-failure isolation
//!
//! # Example
//!
//! ```ignore
//! use vcmac::inventory::{AggregationPipeline, PipelineOptions};
//! use vcmac::vsphere::VsphereClient;
//!
//! async fn macs(client: &VsphereClient) -> anyhow::Result<()> {
//!     let dataset = AggregationPipeline::new(client, PipelineOptions::default()).run().await?;
//!     for entry in &dataset {
//!         println!("{} has {} adapters", entry.vm.name, entry.adapters.len());
//!     }
//!     Ok(())
//! }
//! ```

pub mod models;
pub mod pipeline;
pub mod shape;

pub use models::{
    is_plausible_mac, AdapterRecord, AggregatedEntry, Dataset, DatasetSummary,
    VirtualMachineRecord, UNKNOWN,
};
pub use pipeline::{collect_inventory, AggregationPipeline, PipelineOptions};
pub use shape::{to_list, to_record};
