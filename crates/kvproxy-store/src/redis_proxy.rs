//! Record store backed by the redis HTTP proxy.
//!
//! Every operation is one blocking round trip to the proxy except `update`,
//! which reads the current record, merges the new fields in, and writes the
//! result back. The proxy offers no conditional write, so two concurrent
//! updates of the same key race and the last `set` wins.

use std::sync::Arc;
use std::time::{Duration, Instant};

use figment::Figment;
use reqwest::blocking::{Client, Response};
use reqwest::StatusCode;
use serde::Deserialize;

use crate::error::{Result, StoreError};
use crate::record::{composite_key, decode_record, encode_record, Record, ResponseEncoding};
use crate::registry::StoreCreator;
use crate::store::RecordStore;

/// Name the proxy store is registered under, and its config section.
pub const STORE_NAME: &str = "redisproxy";

const GET_PATH: &str = "/redis/get";
const SET_PATH: &str = "/redis/set";
const DELETE_PATH: &str = "/redis/delete";

/// `[redisproxy]` configuration section.
#[derive(Debug, Clone, Deserialize)]
pub struct ProxyConfig {
    /// Proxy address as `host:port`.
    pub addr: String,

    /// Value of the `service` parameter sent with every request.
    #[serde(default = "default_service")]
    pub service: String,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Idle keep-alive connections kept per host.
    #[serde(default = "default_max_idle_connections")]
    pub max_idle_connections: usize,

    #[serde(default)]
    pub response_encoding: ResponseEncoding,
}

fn default_service() -> String {
    "service1".to_string()
}

fn default_timeout() -> u64 {
    5
}

fn default_max_idle_connections() -> usize {
    20
}

impl ProxyConfig {
    /// Config for `addr` with every other setting at its default.
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            service: default_service(),
            timeout_secs: default_timeout(),
            max_idle_connections: default_max_idle_connections(),
            response_encoding: ResponseEncoding::default(),
        }
    }
}

/// HTTP client adapter for the proxy. Holds only immutable state, so one
/// instance serves every worker thread.
pub struct ProxyRecordStore {
    client: Client,
    base_url: String,
    config: ProxyConfig,
}

impl ProxyRecordStore {
    pub fn new(config: ProxyConfig) -> Result<Self> {
        let client = Client::builder()
            .pool_max_idle_per_host(config.max_idle_connections)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| StoreError::transport("build client", e))?;

        Ok(Self {
            client,
            base_url: format!("http://{}", config.addr),
            config,
        })
    }

    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Run one operation inside a `store_op` span, recording its latency.
    fn instrumented<T>(
        &self,
        op: &'static str,
        key: &str,
        f: impl FnOnce() -> Result<T>,
    ) -> Result<T> {
        let span = kvproxy_tracing::store_op_span!(op, key);
        span.in_scope(|| {
            let start = Instant::now();
            let result = f();
            let latency = start.elapsed().as_millis() as u64;
            let span = tracing::Span::current();
            span.record("latency_ms", latency);

            match &result {
                Ok(_) => tracing::debug!(latency_ms = latency, "Store operation complete"),
                Err(e @ StoreError::Transport { .. }) => {
                    span.record("status", 0_u16);
                    if e.is_timeout() {
                        tracing::error!(error = %e, latency_ms = latency, "Proxy request timed out");
                    } else {
                        tracing::error!(error = %e, latency_ms = latency, "Proxy connection error");
                    }
                }
                Err(e) => tracing::error!(error = %e, latency_ms = latency, "Store operation failed"),
            }
            result
        })
    }

    /// GET the current record stored under `key`.
    fn fetch(&self, op: &'static str, key: &str) -> Result<Record> {
        let resp = self
            .client
            .get(self.url(GET_PATH))
            .query(&[("key", key), ("service", self.config.service.as_str())])
            .send()
            .map_err(|e| StoreError::transport(op, e))?;

        let status = resp.status();
        tracing::Span::current().record("status", status.as_u16());
        let body = resp.text().map_err(|e| StoreError::transport(op, e))?;

        if status == StatusCode::NOT_FOUND {
            tracing::debug!(key = %key, "Proxy has no record for key");
            return Ok(Record::new());
        }
        if !status.is_success() {
            return Err(StoreError::Status { op, status, body });
        }

        decode_record(&body, self.config.response_encoding)
    }

    /// POST a form to one of the write endpoints.
    fn post_form(&self, op: &'static str, path: &str, form: &[(&str, &str)]) -> Result<()> {
        let resp = self
            .client
            .post(self.url(path))
            .form(form)
            .send()
            .map_err(|e| StoreError::transport(op, e))?;
        check_status(op, resp)
    }

    fn set(&self, op: &'static str, key: &str, record: &Record) -> Result<()> {
        let value = encode_record(record)?;
        self.post_form(
            op,
            SET_PATH,
            &[
                ("key", key),
                ("value", value.as_str()),
                ("service", self.config.service.as_str()),
            ],
        )
    }
}

fn check_status(op: &'static str, resp: Response) -> Result<()> {
    let status = resp.status();
    tracing::Span::current().record("status", status.as_u16());
    if status.is_success() {
        return Ok(());
    }
    let body = resp.text().unwrap_or_default();
    Err(StoreError::Status { op, status, body })
}

impl RecordStore for ProxyRecordStore {
    /// Returns the whole stored record; `fields` is not applied.
    fn read(&self, table: &str, key: &str, _fields: Option<&[String]>) -> Result<Record> {
        let key = composite_key(table, key);
        self.instrumented("read", &key, || self.fetch("read", &key))
    }

    fn scan(
        &self,
        _table: &str,
        _start_key: &str,
        _count: usize,
        _fields: Option<&[String]>,
    ) -> Result<Vec<Record>> {
        Err(StoreError::Unsupported("scan"))
    }

    /// Read-modify-write; not atomic with respect to other writers.
    fn update(&self, table: &str, key: &str, values: Record) -> Result<()> {
        let key = composite_key(table, key);
        self.instrumented("update", &key, || {
            let mut current = self.fetch("update", &key)?;
            current.extend(values);
            self.set("update", &key, &current)
        })
    }

    fn insert(&self, table: &str, key: &str, values: Record) -> Result<()> {
        let key = composite_key(table, key);
        self.instrumented("insert", &key, || self.set("insert", &key, &values))
    }

    fn delete(&self, table: &str, key: &str) -> Result<()> {
        let key = composite_key(table, key);
        self.instrumented("delete", &key, || {
            self.post_form(
                "delete",
                DELETE_PATH,
                &[("key", key.as_str()), ("service", self.config.service.as_str())],
            )
        })
    }
}

/// Builds a [`ProxyRecordStore`] from the `[redisproxy]` config section.
pub struct RedisProxyCreator;

impl StoreCreator for RedisProxyCreator {
    fn create(&self, properties: &Figment) -> Result<Arc<dyn RecordStore>> {
        let config: ProxyConfig = properties.extract_inner(STORE_NAME)?;

        tracing::info!(
            addr = %config.addr,
            service = %config.service,
            timeout_secs = config.timeout_secs,
            max_idle_connections = config.max_idle_connections,
            response_encoding = ?config.response_encoding,
            "Creating redis proxy store"
        );

        Ok(Arc::new(ProxyRecordStore::new(config)?))
    }
}
