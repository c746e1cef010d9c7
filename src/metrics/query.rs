use std::collections::HashMap;

use super::kind::MetricKind;

/// Placeholder substituted with `<address>:<exporter port>` in query templates
pub const INSTANCE_PLACEHOLDER: &str = "{instance}";

/// Default node_exporter port
pub const DEFAULT_EXPORTER_PORT: u16 = 9100;

/// Builds the backend query text for one (kind, address) pair
pub trait QueryBuilder: Send + Sync {
    fn build(&self, kind: MetricKind, address: &str) -> String;
}

/// PromQL templates keyed by metric kind
#[derive(Debug, Clone)]
pub struct PromQlTemplates {
    templates: HashMap<MetricKind, String>,
    exporter_port: u16,
}

impl PromQlTemplates {
    pub fn new(exporter_port: u16) -> Self {
        let templates = MetricKind::ALL
            .iter()
            .map(|kind| (*kind, default_template(*kind).to_string()))
            .collect();

        Self {
            templates,
            exporter_port,
        }
    }

    /// Replace the template for a kind
    pub fn with_template(mut self, kind: MetricKind, template: impl Into<String>) -> Self {
        self.templates.insert(kind, template.into());
        self
    }

    pub fn template(&self, kind: MetricKind) -> &str {
        self.templates
            .get(&kind)
            .map(String::as_str)
            .unwrap_or_else(|| default_template(kind))
    }

    pub fn exporter_port(&self) -> u16 {
        self.exporter_port
    }
}

impl Default for PromQlTemplates {
    fn default() -> Self {
        Self::new(DEFAULT_EXPORTER_PORT)
    }
}

impl QueryBuilder for PromQlTemplates {
    fn build(&self, kind: MetricKind, address: &str) -> String {
        let instance = format!("{}:{}", address, self.exporter_port);
        self.template(kind).replace(INSTANCE_PLACEHOLDER, &instance)
    }
}

/// Built-in node_exporter queries
pub fn default_template(kind: MetricKind) -> &'static str {
    match kind {
        MetricKind::Cpu => {
            r#"100 - (avg(irate(node_cpu_seconds_total{mode="idle", instance="{instance}"}[1m])) * 100)"#
        }
        MetricKind::Memory => r#"node_memory_MemAvailable_bytes{instance="{instance}"}/10^9"#,
        MetricKind::Disk => {
            r#"100 - (node_filesystem_free_bytes{mountpoint="/run",instance="{instance}"} / node_filesystem_size_bytes{mountpoint="/run",instance="{instance}"} * 100)"#
        }
    }
}
