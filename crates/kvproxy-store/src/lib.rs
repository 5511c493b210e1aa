//! Record store adapter for a key/value store fronted by an HTTP proxy.
//!
//! [`ProxyRecordStore`] maps record-level CRUD calls onto the proxy's
//! `/redis/get`, `/redis/set` and `/redis/delete` endpoints. Stores are built
//! by name through a [`StoreRegistry`], which a workload driver fills at
//! startup and queries with its loaded configuration.

pub mod error;
pub mod record;
pub mod redis_proxy;
pub mod registry;
pub mod store;

#[cfg(test)]
mod test_proxy;

pub use error::{Result, StoreError};
pub use record::{composite_key, Record, ResponseEncoding};
pub use redis_proxy::{ProxyConfig, ProxyRecordStore, RedisProxyCreator};
pub use registry::{default_registry, StoreCreator, StoreRegistry};
pub use store::RecordStore;
