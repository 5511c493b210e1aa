//! The record store interface a workload driver programs against.

use crate::error::Result;
use crate::record::Record;

/// CRUD operations over records addressed by `(table, key)`.
///
/// Implementations are shared by every worker thread, so they must be safe
/// to call concurrently. All calls block until the backend answers.
pub trait RecordStore: Send + Sync {
    /// Called once by each worker before its first operation.
    fn init_thread(&self, _thread_id: usize, _thread_count: usize) {}

    /// Called once by each worker after its last operation.
    fn cleanup_thread(&self) {}

    /// Fetch one record. `fields`, when given, names the fields the caller
    /// is interested in; implementations may return more.
    fn read(&self, table: &str, key: &str, fields: Option<&[String]>) -> Result<Record>;

    /// Fetch up to `count` records starting at `start_key`.
    fn scan(
        &self,
        table: &str,
        start_key: &str,
        count: usize,
        fields: Option<&[String]>,
    ) -> Result<Vec<Record>>;

    /// Merge `values` into an existing record.
    fn update(&self, table: &str, key: &str, values: Record) -> Result<()>;

    /// Write a full record, replacing whatever was stored under the key.
    fn insert(&self, table: &str, key: &str, values: Record) -> Result<()>;

    fn delete(&self, table: &str, key: &str) -> Result<()>;

    /// Release backend resources.
    fn close(&self) -> Result<()> {
        Ok(())
    }
}
