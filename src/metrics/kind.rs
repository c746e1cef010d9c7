use anyhow::{anyhow, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Resource metric sampled from a node exporter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    /// CPU utilisation in percent
    Cpu,
    /// Available memory in GB
    Memory,
    /// Filesystem usage of /run in percent
    Disk,
}

impl MetricKind {
    pub const ALL: [MetricKind; 3] = [MetricKind::Cpu, MetricKind::Memory, MetricKind::Disk];

    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Cpu => "cpu",
            MetricKind::Memory => "memory",
            MetricKind::Disk => "disk",
        }
    }

    /// Kinds sampled when nothing else is configured
    pub fn default_set() -> Vec<MetricKind> {
        vec![MetricKind::Cpu, MetricKind::Memory]
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetricKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "cpu" => Ok(MetricKind::Cpu),
            "memory" | "mem" => Ok(MetricKind::Memory),
            "disk" => Ok(MetricKind::Disk),
            other => Err(anyhow!("Unknown metric kind: '{}'. Valid kinds: cpu, memory, disk", other)),
        }
    }
}

/// Parse a comma separated list of kinds, e.g. "cpu,memory,disk"
pub fn parse_kind_list(value: &str) -> Result<Vec<MetricKind>> {
    let kinds = value
        .split(',')
        .filter(|part| !part.trim().is_empty())
        .map(str::parse::<MetricKind>)
        .collect::<Result<Vec<_>>>()?;

    if kinds.is_empty() {
        return Err(anyhow!("At least one metric kind is required"));
    }

    Ok(kinds)
}
