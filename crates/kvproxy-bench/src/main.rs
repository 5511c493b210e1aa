//! kvproxy-bench: drives a registered record store with a load/run workload
//! and prints a JSON summary per phase.

mod config;
mod stats;
mod workload;

use config::{BenchConfig, Phase};
use workload::Workload;

fn main() -> anyhow::Result<()> {
    // Determine config path
    let config_path = {
        let args: Vec<String> = std::env::args().collect();
        args.iter()
            .position(|a| a == "--config")
            .and_then(|i| args.get(i + 1).cloned())
            .or_else(|| args.get(1).filter(|a| !a.starts_with('-')).cloned())
            .or_else(|| std::env::var("KVPROXY_CONFIG").ok())
            .unwrap_or_else(|| "kvproxy.toml".to_string())
    };

    let figment = config::load_figment(&config_path);
    let config = BenchConfig::load(&figment)?;

    // The gRPC OTLP exporter needs a reactor; store calls stay on plain threads.
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .enable_all()
        .build()?;
    let _tracing_guard = runtime.block_on(async { kvproxy_tracing::init_tracing(&config.tracing) });

    tracing::info!(
        config_path = %config_path,
        store = %config.workload.store,
        phase = ?config.workload.phase,
        threads = config.workload.thread_count,
        "Starting kvproxy-bench"
    );

    let registry = kvproxy_store::default_registry();
    let store = registry.create(&config.workload.store, &figment)?;
    let phase = config.workload.phase;
    let workload = Workload::new(config.workload, store.clone());

    let mut reports = Vec::new();
    if matches!(phase, Phase::Load | Phase::Both) {
        reports.push(workload.load());
    }
    if matches!(phase, Phase::Run | Phase::Both) {
        reports.push(workload.run());
    }

    store.close()?;

    for report in &reports {
        tracing::info!(
            phase = report.phase,
            operations = report.operations,
            errors = report.errors,
            elapsed_ms = report.elapsed_ms,
            throughput_ops_sec = report.throughput_ops_sec,
            "Phase complete"
        );
    }
    println!("{}", serde_json::to_string_pretty(&reports)?);

    Ok(())
}
