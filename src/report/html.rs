//! HTML report rendering
//!
//! The template carries a `{% for vm in vms %}` ... `{% endfor %}` block; the
//! whole block is replaced by one table row per VM.

use super::Renderer;
use crate::inventory::{AggregatedEntry, Dataset};
use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use std::path::Path;

const DEFAULT_TEMPLATE: &str = include_str!("default_template.html");
const ROWS_START: &str = "{% for vm in vms %}";
const ROWS_END: &str = "{% endfor %}";
const GENERATED_AT: &str = "{{ generated_at }}";

/// Renders the dataset into an HTML table inside a template
#[derive(Debug, Clone)]
pub struct HtmlRenderer {
    template: String,
}

impl Default for HtmlRenderer {
    fn default() -> Self {
        Self::new(DEFAULT_TEMPLATE)
    }
}

impl HtmlRenderer {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    /// Load a template from disk
    pub fn from_file(path: &Path) -> Result<Self> {
        let template = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read template {}", path.display()))?;
        Ok(Self::new(template))
    }

    /// Render with an explicit timestamp
    pub fn render_at(&self, dataset: &Dataset, generated_at: DateTime<Utc>) -> Result<String> {
        let start = self
            .template
            .find(ROWS_START)
            .context("Template marker '{% for vm in vms %}' not found")?;
        let end = self.template[start..]
            .find(ROWS_END)
            .map(|offset| start + offset + ROWS_END.len())
            .context("Template marker '{% endfor %}' not found after the row block start")?;

        // Only template text is stamped; row content is dataset data
        let stamp = generated_at.to_rfc3339_opts(SecondsFormat::Secs, true);
        let head = self.template[..start].replace(GENERATED_AT, &stamp);
        let tail = self.template[end..].replace(GENERATED_AT, &stamp);
        let rows: String = dataset.iter().map(render_row).collect();

        Ok(format!("{}{}{}", head, rows, tail))
    }
}

impl Renderer for HtmlRenderer {
    fn render(&self, dataset: &Dataset) -> Result<String> {
        self.render_at(dataset, Utc::now())
    }
}

fn render_row(entry: &AggregatedEntry) -> String {
    let adapters = badges(
        entry
            .adapters
            .iter()
            .map(|a| format!("{} ({})", a.label, a.adapter_type)),
        "adapter-badge",
        "No Adapters",
    );
    let macs = badges(
        entry.adapters.iter().map(|a| a.mac_address.clone()),
        "mac-badge",
        "No MAC addresses",
    );

    format!(
        "\n            <tr>\n                <td>{}</td>\n                <td>{}</td>\n                <td>{}</td>\n                <td>{}</td>\n            </tr>",
        html_escape(&entry.vm.name),
        html_escape(&entry.vm.id),
        adapters,
        macs
    )
}

fn badges(items: impl Iterator<Item = String>, class: &str, empty: &str) -> String {
    let rendered: Vec<String> = items
        .map(|item| format!(r#"<span class="{}">{}</span>"#, class, html_escape(&item)))
        .collect();
    if rendered.is_empty() {
        format!("<em>{}</em>", empty)
    } else {
        rendered.join(" ")
    }
}

fn html_escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::{AdapterRecord, VirtualMachineRecord, UNKNOWN};
    use chrono::TimeZone;

    fn vm(id: &str, name: &str) -> VirtualMachineRecord {
        VirtualMachineRecord {
            id: id.into(),
            name: name.into(),
        }
    }

    fn timestamp() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, 8, 30, 0).unwrap()
    }

    #[test]
    fn test_rows_replace_marker_block() {
        let renderer = HtmlRenderer::new("<table>{% for vm in vms %}<tr>{{ vm }}</tr>{% endfor %}</table>");
        let dataset = Dataset::new(vec![AggregatedEntry::new(
            vm("vm-1", "web"),
            vec![AdapterRecord {
                id: "4000".into(),
                label: "Network adapter 1".into(),
                adapter_type: "VMXNET3".into(),
                mac_address: "00:50:56:aa:bb:cc".into(),
            }],
        )]);

        let html = renderer.render_at(&dataset, timestamp()).unwrap();
        assert!(html.starts_with("<table>"));
        assert!(html.ends_with("</table>"));
        assert!(!html.contains("{% for"));
        assert!(!html.contains("{{ vm }}"));
        assert!(html.contains(r#"<span class="adapter-badge">Network adapter 1 (VMXNET3)</span>"#));
        assert!(html.contains(r#"<span class="mac-badge">00:50:56:aa:bb:cc</span>"#));
    }

    #[test]
    fn test_empty_adapters_and_escaping() {
        let renderer = HtmlRenderer::new("{% for vm in vms %}{% endfor %}");
        let dataset = Dataset::new(vec![AggregatedEntry::failed(
            vm("vm-2", "<script>&'\""),
            "404".into(),
        )]);

        let html = renderer.render_at(&dataset, timestamp()).unwrap();
        assert!(html.contains("&lt;script&gt;&amp;&#39;&quot;"));
        assert!(html.contains("<em>No Adapters</em>"));
        assert!(html.contains("<em>No MAC addresses</em>"));
    }

    #[test]
    fn test_placeholder_in_vm_data_is_kept_verbatim() {
        let renderer = HtmlRenderer::new("<p>{{ generated_at }}</p>{% for vm in vms %}{% endfor %}<p>{{ generated_at }}</p>");
        let dataset = Dataset::new(vec![AggregatedEntry::new(
            vm("{{ generated_at }}", "{{ generated_at }}"),
            vec![AdapterRecord {
                id: "4000".into(),
                label: "{{ generated_at }}".into(),
                adapter_type: "E1000".into(),
                mac_address: UNKNOWN.into(),
            }],
        )]);

        let html = renderer.render_at(&dataset, timestamp()).unwrap();
        assert_eq!(html.matches("<td>{{ generated_at }}</td>").count(), 2);
        assert!(html.contains(r#"<span class="adapter-badge">{{ generated_at }} (E1000)</span>"#));
        assert!(html.starts_with("<p>2026-10-19T08:30:00Z</p>"));
        assert!(html.ends_with("<p>2026-10-19T08:30:00Z</p>"));
    }

    #[test]
    fn test_missing_markers_is_an_error() {
        let dataset = Dataset::default();
        assert!(HtmlRenderer::new("<html></html>").render_at(&dataset, timestamp()).is_err());
        assert!(HtmlRenderer::new("{% for vm in vms %} no end")
            .render_at(&dataset, timestamp())
            .is_err());
        assert!(HtmlRenderer::new("{% endfor %}{% for vm in vms %}")
            .render_at(&dataset, timestamp())
            .is_err());
    }

    #[test]
    fn test_default_template_renders_timestamp() {
        let html = HtmlRenderer::default()
            .render_at(&Dataset::default(), timestamp())
            .unwrap();
        assert!(html.contains("Generated 2026-10-19T08:30:00Z"));
        assert!(!html.contains("{% endfor %}"));
    }
}
