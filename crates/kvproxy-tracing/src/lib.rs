//! Logging and OTLP tracing setup shared by the kvproxy store and bench tools.

pub mod config;
pub mod otlp;
pub mod spans;

pub use config::{OtlpProtocol, TracingConfig};
pub use otlp::{init_tracing, TracingGuard};
