pub mod csv_dir;
#[cfg(test)]
pub(crate) mod memory;
pub mod table;

use crate::domain::profile::ClientRecord;
use table::SourceTable;

/// Read-only access to the client master table and the per-client tables.
///
/// `Ok(None)` means the table does not exist for that client; `Err` means it exists but could not
/// be read or parsed.
pub trait ClientDataSource: Send + Sync {
    fn source_name(&self) -> &'static str;

    fn clients(&self) -> anyhow::Result<Vec<ClientRecord>>;

    fn transactions(&self, client_code: i64) -> anyhow::Result<Option<SourceTable>>;

    fn transfers(&self, client_code: i64) -> anyhow::Result<Option<SourceTable>>;
}
