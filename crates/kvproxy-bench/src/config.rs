//! Configuration types and loading logic.

use figment::providers::{Env, Format, Toml};
use figment::Figment;
use kvproxy_tracing::TracingConfig;
use serde::{Deserialize, Serialize};

/// Environment prefix; `__` separates nested keys, e.g.
/// `KVPROXY_REDISPROXY__ADDR=10.0.0.5:8080`.
pub const ENV_PREFIX: &str = "KVPROXY_";

/// Settings the bench driver itself reads. Store sections (such as
/// `[redisproxy]`) are left in the figment for the store creators.
#[derive(Debug, Clone, Deserialize)]
pub struct BenchConfig {
    #[serde(default)]
    pub workload: WorkloadConfig,
    #[serde(default)]
    pub tracing: TracingConfig,
}

/// Which phases of the workload to execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Load,
    Run,
    #[default]
    Both,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WorkloadConfig {
    /// Registered name of the store to drive.
    #[serde(default = "default_store")]
    pub store: String,

    #[serde(default)]
    pub phase: Phase,

    #[serde(default = "default_table")]
    pub table: String,

    #[serde(default = "default_record_count")]
    pub record_count: u64,

    #[serde(default = "default_operation_count")]
    pub operation_count: u64,

    #[serde(default = "default_thread_count")]
    pub thread_count: usize,

    #[serde(default = "default_field_count")]
    pub field_count: usize,

    #[serde(default = "default_field_length")]
    pub field_length: usize,

    #[serde(default = "default_read_proportion")]
    pub read_proportion: f64,

    #[serde(default = "default_update_proportion")]
    pub update_proportion: f64,

    #[serde(default)]
    pub insert_proportion: f64,

    #[serde(default)]
    pub delete_proportion: f64,
}

fn default_store() -> String {
    "redisproxy".to_string()
}

fn default_table() -> String {
    "usertable".to_string()
}

fn default_record_count() -> u64 {
    1000
}

fn default_operation_count() -> u64 {
    1000
}

fn default_thread_count() -> usize {
    4
}

fn default_field_count() -> usize {
    10
}

fn default_field_length() -> usize {
    100
}

fn default_read_proportion() -> f64 {
    0.5
}

fn default_update_proportion() -> f64 {
    0.5
}

impl Default for WorkloadConfig {
    fn default() -> Self {
        Self {
            store: default_store(),
            phase: Phase::default(),
            table: default_table(),
            record_count: default_record_count(),
            operation_count: default_operation_count(),
            thread_count: default_thread_count(),
            field_count: default_field_count(),
            field_length: default_field_length(),
            read_proportion: default_read_proportion(),
            update_proportion: default_update_proportion(),
            insert_proportion: 0.0,
            delete_proportion: 0.0,
        }
    }
}

impl WorkloadConfig {
    /// Reject settings the driver cannot execute.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.thread_count == 0 {
            anyhow::bail!("workload.thread_count must be at least 1");
        }
        let proportions = [
            self.read_proportion,
            self.update_proportion,
            self.insert_proportion,
            self.delete_proportion,
        ];
        if proportions.iter().any(|p| !p.is_finite() || *p < 0.0) {
            anyhow::bail!("workload proportions must be finite and non-negative");
        }
        if self.phase != Phase::Load && proportions.iter().sum::<f64>() <= 0.0 {
            anyhow::bail!("run phase needs at least one positive operation proportion");
        }
        Ok(())
    }
}

/// Layered configuration source.
///
/// Priority (highest to lowest):
/// 1. Environment variables (KVPROXY_ prefix, __ for nesting)
/// 2. TOML config file
/// 3. Defaults
pub fn load_figment(config_path: &str) -> Figment {
    Figment::new()
        .merge(Toml::file(config_path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
}

impl BenchConfig {
    pub fn load(figment: &Figment) -> anyhow::Result<Self> {
        let config: BenchConfig = figment.extract()?;
        config.workload.validate()?;
        Ok(config)
    }
}
