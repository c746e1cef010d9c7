use anyhow::{Context, Result};
use comfy_table::{presets::UTF8_FULL, Cell, ContentArrangement, Table};
use std::path::Path;

use super::sink::read_snapshots;
use crate::metrics::{MetricKind, MetricSample, Snapshot};

/// Aggregate over every snapshot for one vector position
#[derive(Debug, Clone, PartialEq)]
pub struct PairStats {
    pub label: String,
    pub samples: usize,
    pub failures: usize,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub mean: Option<f64>,
}

/// `address/kind` labels in vector order
pub fn pair_labels(addresses: &[String], kinds: &[MetricKind]) -> Vec<String> {
    addresses
        .iter()
        .flat_map(|address| kinds.iter().map(move |kind| format!("{}/{}", address, kind)))
        .collect()
}

/// Per-position statistics; `labels` are used only when they cover every position
pub fn summarize(snapshots: &[Snapshot], labels: &[String]) -> Vec<PairStats> {
    let width = snapshots.iter().map(|s| s.round().len()).max().unwrap_or(0);
    let use_labels = labels.len() == width;

    (0..width)
        .map(|index| {
            let mut samples = 0;
            let mut failures = 0;
            let mut values = Vec::new();

            for sample in snapshots.iter().filter_map(|s| s.round().get(index)) {
                samples += 1;
                match sample {
                    MetricSample::Value(v) if v.is_finite() => values.push(*v),
                    MetricSample::Value(_) => {}
                    MetricSample::Failed(_) => failures += 1,
                }
            }

            let min = values.iter().copied().reduce(f64::min);
            let max = values.iter().copied().reduce(f64::max);
            let mean = (!values.is_empty()).then(|| values.iter().sum::<f64>() / values.len() as f64);

            PairStats {
                label: if use_labels { labels[index].clone() } else { format!("#{}", index) },
                samples,
                failures,
                min,
                max,
                mean,
            }
        })
        .collect()
}

pub fn render_table(stats: &[PairStats]) -> Table {
    let fmt = |v: Option<f64>| v.map(|v| format!("{:.3}", v)).unwrap_or_else(|| "-".to_string());

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Pair", "Samples", "Failed", "Min", "Mean", "Max"]);

    for stat in stats {
        table.add_row(vec![
            Cell::new(&stat.label),
            Cell::new(stat.samples),
            Cell::new(stat.failures),
            Cell::new(fmt(stat.min)),
            Cell::new(fmt(stat.mean)),
            Cell::new(fmt(stat.max)),
        ]);
    }
    table
}

/// Read a results file and print its statistics table
pub fn print_summary(path: &Path, addresses: &[String], kinds: Option<&[MetricKind]>) -> Result<()> {
    let log = read_snapshots(path)
        .with_context(|| format!("Failed to read results file {}", path.display()))?;

    if log.snapshots.is_empty() {
        println!("No snapshots found in {}", path.display());
        return Ok(());
    }

    let default_kinds = MetricKind::default_set();
    let labels = pair_labels(addresses, kinds.unwrap_or(default_kinds.as_slice()));
    let stats = summarize(&log.snapshots, &labels);

    let first = log.snapshots.first().map(Snapshot::timestamp);
    let last = log.snapshots.last().map(Snapshot::timestamp);
    if let (Some(first), Some(last)) = (first, last) {
        println!("📊 {} snapshots from {} to {}", log.snapshots.len(), first, last);
    }
    if log.skipped_lines > 0 {
        println!("⚠️  {} unparseable lines skipped", log.skipped_lines);
    }
    println!("{}", render_table(&stats));
    Ok(())
}
