//! Report rendering
//!
//! Renderers consume a finished [`Dataset`]; they never talk to vCenter.

mod html;

pub use html::HtmlRenderer;

use crate::inventory::Dataset;
use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Turns a dataset into report text
pub trait Renderer {
    fn render(&self, dataset: &Dataset) -> Result<String>;
}

/// Output format of the report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Html,
    Json,
    Yaml,
}

impl OutputFormat {
    /// Default report file name for this format
    pub fn default_file_name(&self) -> &'static str {
        match self {
            Self::Html => "vm_mac_report.html",
            Self::Json => "vm_mac_report.json",
            Self::Yaml => "vm_mac_report.yaml",
        }
    }
}

/// Pretty-printed JSON dump of the dataset
pub struct JsonRenderer;

impl Renderer for JsonRenderer {
    fn render(&self, dataset: &Dataset) -> Result<String> {
        serde_json::to_string_pretty(dataset).context("Failed to serialize dataset as JSON")
    }
}

/// YAML dump of the dataset
pub struct YamlRenderer;

impl Renderer for YamlRenderer {
    fn render(&self, dataset: &Dataset) -> Result<String> {
        serde_yaml::to_string(dataset).context("Failed to serialize dataset as YAML")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::{AdapterRecord, AggregatedEntry, VirtualMachineRecord};

    fn dataset() -> Dataset {
        Dataset::new(vec![AggregatedEntry::new(
            VirtualMachineRecord {
                id: "vm-1".into(),
                name: "web".into(),
            },
            vec![AdapterRecord {
                id: "4000".into(),
                label: "Network adapter 1".into(),
                adapter_type: "VMXNET3".into(),
                mac_address: "00:50:56:aa:bb:cc".into(),
            }],
        )])
    }

    #[test]
    fn test_json_renderer() {
        let text = JsonRenderer.render(&dataset()).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed[0]["adapters"][0]["macAddress"], "00:50:56:aa:bb:cc");
    }

    #[test]
    fn test_yaml_renderer() {
        let text = YamlRenderer.render(&dataset()).unwrap();
        assert!(text.contains("macAddress:"));
        assert!(text.contains("00:50:56:aa:bb:cc"));
        assert!(text.contains("adapterType: VMXNET3"));
    }

    #[test]
    fn test_default_file_names() {
        assert_eq!(OutputFormat::Html.default_file_name(), "vm_mac_report.html");
        assert_eq!(OutputFormat::Yaml.default_file_name(), "vm_mac_report.yaml");
        assert_eq!(OutputFormat::default(), OutputFormat::Html);
    }
}
