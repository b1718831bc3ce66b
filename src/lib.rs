//! vCenter VM network adapter inventory
//!
//! Logs into vCenter through whichever API generation answers, enumerates
//! VMs and their ethernet adapters, and assembles a VM → adapter → MAC
//! [`inventory::Dataset`] that the [`report`] renderers turn into files.

pub mod config;
pub mod inventory;
pub mod report;
pub mod vsphere;
