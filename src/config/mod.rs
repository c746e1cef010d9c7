use anyhow::{anyhow, Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::metrics::kind::parse_kind_list;
use crate::metrics::{MetricKind, PromQlTemplates};

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub telemetry: TelemetryConfig,
    pub workload: WorkloadConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TelemetryConfig {
    pub prometheus_url: String,
    pub interval_secs: u64,
    pub output_file: String,
    pub exporter_port: u16,
    pub query_timeout_secs: u64, // 0 disables the per-query timeout
    pub max_concurrency: usize,  // 0 means one task per pair
    pub metrics: Vec<MetricKind>,
    pub queries: QueryOverrides,
}

/// Optional PromQL templates replacing the built-in ones; `{instance}` is substituted
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct QueryOverrides {
    pub cpu: Option<String>,
    pub memory: Option<String>,
    pub disk: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WorkloadConfig {
    pub namespace: Option<String>,
    pub num_pods: usize,
    pub image: String,
    pub command: Vec<String>,
    pub name_prefix: String,
    pub app_label: String,
    pub cpu_options: Vec<String>,
    pub memory_options: Vec<String>,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            prometheus_url: "http://localhost:9090/api/v1/query".to_string(),
            interval_secs: 60,
            output_file: "results.txt".to_string(),
            exporter_port: crate::metrics::query::DEFAULT_EXPORTER_PORT,
            query_timeout_secs: 30,
            max_concurrency: 0,
            metrics: MetricKind::default_set(),
            queries: QueryOverrides::default(),
        }
    }
}

impl Default for WorkloadConfig {
    fn default() -> Self {
        Self {
            namespace: None,
            num_pods: 100,
            image: "busybox".to_string(),
            command: vec!["sh".to_string(), "-c".to_string(), "sleep 3600".to_string()],
            name_prefix: "auto-pod-".to_string(),
            app_label: "auto-demo".to_string(),
            cpu_options: ["100m", "200m", "500m", "1"].iter().map(|s| s.to_string()).collect(),
            memory_options: ["128Mi", "256Mi", "512Mi", "1Gi"].iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl QueryOverrides {
    fn slot(&mut self, kind: MetricKind) -> &mut Option<String> {
        match kind {
            MetricKind::Cpu => &mut self.cpu,
            MetricKind::Memory => &mut self.memory,
            MetricKind::Disk => &mut self.disk,
        }
    }

    pub fn get(&self, kind: MetricKind) -> Option<&str> {
        match kind {
            MetricKind::Cpu => self.cpu.as_deref(),
            MetricKind::Memory => self.memory.as_deref(),
            MetricKind::Disk => self.disk.as_deref(),
        }
    }
}

impl TelemetryConfig {
    /// Built-in templates with any configured overrides applied
    pub fn query_templates(&self) -> PromQlTemplates {
        MetricKind::ALL
            .iter()
            .fold(PromQlTemplates::new(self.exporter_port), |templates, kind| {
                match self.queries.get(*kind) {
                    Some(template) => templates.with_template(*kind, template),
                    None => templates,
                }
            })
    }
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn unset(value: &str) -> bool {
    value.is_empty() || value == "<not-set>" || value == "reset"
}

impl Config {
    /// Get the configuration file path
    pub fn config_file_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("com", "podpulse", "podpulse")
            .context("Unable to determine project directories")?;

        let config_dir = proj_dirs.config_dir();
        fs::create_dir_all(config_dir)
            .context("Failed to create config directory")?;

        Ok(config_dir.join("config.toml"))
    }

    /// Load configuration from the default location
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_file_path()?)
    }

    /// Load configuration from `path`; a missing or unparseable file yields defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .context("Failed to read config file")?;

        match toml::from_str::<Config>(&content) {
            Ok(config) => Ok(config),
            Err(e) => {
                eprintln!("⚠️  Warning: Failed to parse config file ({}). Using defaults.", e);
                Ok(Self::default())
            }
        }
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_file_path()?;
        self.save_to(&config_path)?;
        println!("Configuration saved to: {}", config_path.display());
        Ok(())
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .context("Failed to serialize config")?;

        fs::write(path, content)
            .context("Failed to write config file")?;

        Ok(())
    }

    /// Set any configuration value using dot notation
    pub fn set_value(&mut self, key: &str, value: &str) -> Result<()> {
        if let Some(kind) = key.strip_prefix("telemetry.queries.") {
            let kind: MetricKind = kind.parse()?;
            *self.telemetry.queries.slot(kind) = if unset(value) { None } else { Some(value.to_string()) };
            return Ok(());
        }

        match key {
            "telemetry.prometheus_url" => {
                if !value.starts_with("http://") && !value.starts_with("https://") {
                    return Err(anyhow!("Invalid Prometheus URL: '{}'. Must be a valid HTTP/HTTPS URL", value));
                }
                self.telemetry.prometheus_url = value.to_string();
            }
            "telemetry.interval_secs" => {
                let interval = value.parse::<u64>()
                    .map_err(|_| anyhow!("Invalid interval: '{}'. Must be a positive integer (seconds)", value))?;
                if interval == 0 {
                    return Err(anyhow!("Interval must be at least 1 second"));
                }
                self.telemetry.interval_secs = interval;
            }
            "telemetry.output_file" => {
                if value.trim().is_empty() {
                    return Err(anyhow!("Output file cannot be empty"));
                }
                self.telemetry.output_file = value.to_string();
            }
            "telemetry.exporter_port" => {
                self.telemetry.exporter_port = value.parse::<u16>()
                    .map_err(|_| anyhow!("Invalid exporter port: '{}'", value))?;
            }
            "telemetry.query_timeout_secs" => {
                self.telemetry.query_timeout_secs = value.parse::<u64>()
                    .map_err(|_| anyhow!("Invalid query timeout: '{}'. Must be an integer (0 disables)", value))?;
            }
            "telemetry.max_concurrency" => {
                self.telemetry.max_concurrency = value.parse::<usize>()
                    .map_err(|_| anyhow!("Invalid max concurrency: '{}'. Must be an integer (0 = unbounded)", value))?;
            }
            "telemetry.metrics" => {
                self.telemetry.metrics = parse_kind_list(value)?;
            }
            "workload.namespace" => {
                self.workload.namespace = if unset(value) { None } else { Some(value.to_string()) };
            }
            "workload.num_pods" => {
                self.workload.num_pods = value.parse::<usize>()
                    .map_err(|_| anyhow!("Invalid num_pods value: '{}'. Must be an integer.", value))?;
            }
            "workload.image" => {
                if value.trim().is_empty() {
                    return Err(anyhow!("Image cannot be empty"));
                }
                self.workload.image = value.to_string();
            }
            "workload.command" => {
                self.workload.command = value.split_whitespace().map(str::to_string).collect();
            }
            "workload.name_prefix" => {
                if value.trim().is_empty() {
                    return Err(anyhow!("Name prefix cannot be empty, it protects unrelated pods from deletion"));
                }
                self.workload.name_prefix = value.to_string();
            }
            "workload.app_label" => {
                self.workload.app_label = value.to_string();
            }
            "workload.cpu_options" => {
                let options = parse_list(value);
                if options.is_empty() {
                    return Err(anyhow!("At least one CPU option is required"));
                }
                self.workload.cpu_options = options;
            }
            "workload.memory_options" => {
                let options = parse_list(value);
                if options.is_empty() {
                    return Err(anyhow!("At least one memory option is required"));
                }
                self.workload.memory_options = options;
            }
            _ => return Err(anyhow!("Unknown configuration key: '{}'. Available keys: {}", key, self.get_all_keys().join(", "))),
        }

        Ok(())
    }

    /// Get all available configuration keys
    pub fn get_all_keys(&self) -> Vec<String> {
        vec![
            "telemetry.prometheus_url".to_string(),
            "telemetry.interval_secs".to_string(),
            "telemetry.output_file".to_string(),
            "telemetry.exporter_port".to_string(),
            "telemetry.query_timeout_secs".to_string(),
            "telemetry.max_concurrency".to_string(),
            "telemetry.metrics".to_string(),
            "telemetry.queries.cpu".to_string(),
            "telemetry.queries.memory".to_string(),
            "telemetry.queries.disk".to_string(),
            "workload.namespace".to_string(),
            "workload.num_pods".to_string(),
            "workload.image".to_string(),
            "workload.command".to_string(),
            "workload.name_prefix".to_string(),
            "workload.app_label".to_string(),
            "workload.cpu_options".to_string(),
            "workload.memory_options".to_string(),
        ]
    }

    /// Get any configuration value using dot notation
    pub fn get_value(&self, key: &str) -> Result<String> {
        if let Some(kind) = key.strip_prefix("telemetry.queries.") {
            let kind: MetricKind = kind.parse()?;
            return Ok(self
                .telemetry
                .queries
                .get(kind)
                .map(str::to_string)
                .unwrap_or_else(|| "<built-in>".to_string()));
        }

        match key {
            "telemetry.prometheus_url" => Ok(self.telemetry.prometheus_url.clone()),
            "telemetry.interval_secs" => Ok(self.telemetry.interval_secs.to_string()),
            "telemetry.output_file" => Ok(self.telemetry.output_file.clone()),
            "telemetry.exporter_port" => Ok(self.telemetry.exporter_port.to_string()),
            "telemetry.query_timeout_secs" => Ok(self.telemetry.query_timeout_secs.to_string()),
            "telemetry.max_concurrency" => Ok(self.telemetry.max_concurrency.to_string()),
            "telemetry.metrics" => Ok(self
                .telemetry
                .metrics
                .iter()
                .map(MetricKind::as_str)
                .collect::<Vec<_>>()
                .join(",")),
            "workload.namespace" => {
                if let Some(ns) = self.workload.namespace.clone() {
                    Ok(ns)
                } else if let Some(ctx_ns) = crate::k8s::client::get_current_context_namespace() {
                    Ok(ctx_ns)
                } else {
                    Ok("default".to_string())
                }
            }
            "workload.num_pods" => Ok(self.workload.num_pods.to_string()),
            "workload.image" => Ok(self.workload.image.clone()),
            "workload.command" => Ok(self.workload.command.join(" ")),
            "workload.name_prefix" => Ok(self.workload.name_prefix.clone()),
            "workload.app_label" => Ok(self.workload.app_label.clone()),
            "workload.cpu_options" => Ok(self.workload.cpu_options.join(",")),
            "workload.memory_options" => Ok(self.workload.memory_options.join(",")),
            _ => Err(anyhow!("Configuration key not found: {}", key)),
        }
    }

    /// Display current configuration in tabular format
    pub fn display(&self) -> String {
        let mut output = self.render_rows(&self.get_all_keys(), "");

        if let Ok(config_path) = Self::config_file_path() {
            output.push_str(&format!("\nConfig file: {}\n", config_path.display()));
        }

        output
    }

    /// Display one key, or every key under a section such as `telemetry`
    pub fn display_key(&self, key: &str) -> Result<String> {
        let matching_keys: Vec<String> = self
            .get_all_keys()
            .into_iter()
            .filter(|k| k == key || k.starts_with(&format!("{}.", key)))
            .collect();

        if matching_keys.is_empty() {
            return Err(anyhow!("Configuration key not found: {}", key));
        }

        let prefix = if matching_keys.len() == 1 && matching_keys[0] == key {
            String::new()
        } else {
            format!("{}.", key)
        };
        Ok(self.render_rows(&matching_keys, &prefix))
    }

    fn render_rows(&self, keys: &[String], strip_prefix: &str) -> String {
        let mut output = String::new();
        output.push_str("┌────────────────────────────────┬──────────────────────────────────────────┐\n");
        output.push_str("│ Setting                        │ Value                                    │\n");
        output.push_str("├────────────────────────────────┼──────────────────────────────────────────┤\n");

        for key in keys {
            if let Ok(value) = self.get_value(key) {
                let display_key = key.strip_prefix(strip_prefix).unwrap_or(key);
                let display_value = if value.chars().count() > 40 {
                    format!("{}...", value.chars().take(37).collect::<String>())
                } else {
                    value
                };
                output.push_str(&format!("│ {:<30} │ {:<40} │\n", display_key, display_value));
            }
        }

        output.push_str("└────────────────────────────────┴──────────────────────────────────────────┘\n");
        output
    }
}
