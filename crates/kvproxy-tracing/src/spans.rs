//! Span builder helpers for store and workload instrumentation.

/// Create a tracing span for one store operation against the proxy.
///
/// Usage: `let _span = store_op_span!("read", composite_key).entered();`
///
/// Fields recorded after the round trip:
/// - `status`: HTTP status of the last proxy response (0 on transport failure)
/// - `latency_ms`: wall time of the whole operation, including both round
///   trips of an update
#[macro_export]
macro_rules! store_op_span {
    ($op:expr, $composite_key:expr) => {
        tracing::info_span!(
            "store_op",
            op = %$op,
            key = %$composite_key,
            status = tracing::field::Empty,
            latency_ms = tracing::field::Empty,
        )
    };
}

/// Create a tracing span for one workload phase on one worker thread.
#[macro_export]
macro_rules! workload_phase_span {
    ($phase:expr, $thread_id:expr) => {
        tracing::info_span!(
            "workload_phase",
            phase = %$phase,
            thread_id = $thread_id,
            operations = tracing::field::Empty,
            errors = tracing::field::Empty,
        )
    };
}
