use crate::domain::profile::ClientRecord;
use crate::source::table::{deserialize_rows, SourceTable};
use crate::source::ClientDataSource;
use anyhow::Context;
use std::path::{Path, PathBuf};

pub const DEFAULT_CLIENTS_FILE: &str = "clients.csv";

/// Directory of CSV exports: one master table plus `client_{code}_transactions_3m.csv` and
/// `client_{code}_transfers_3m.csv` per client.
#[derive(Debug, Clone)]
pub struct CsvDirSource {
    dir: PathBuf,
    clients_file: PathBuf,
}

impl CsvDirSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        let clients_file = dir.join(DEFAULT_CLIENTS_FILE);
        Self { dir, clients_file }
    }

    pub fn with_clients_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.clients_file = path.into();
        self
    }

    pub fn transactions_path(&self, client_code: i64) -> PathBuf {
        self.dir
            .join(format!("client_{client_code}_transactions_3m.csv"))
    }

    pub fn transfers_path(&self, client_code: i64) -> PathBuf {
        self.dir.join(format!("client_{client_code}_transfers_3m.csv"))
    }

    fn read_optional_table(path: &Path) -> anyhow::Result<Option<SourceTable>> {
        if !path.exists() {
            return Ok(None);
        }
        let bytes = std::fs::read(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let table = SourceTable::from_csv_bytes(&bytes)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        Ok(Some(table))
    }
}

impl ClientDataSource for CsvDirSource {
    fn source_name(&self) -> &'static str {
        "csv_dir"
    }

    fn clients(&self) -> anyhow::Result<Vec<ClientRecord>> {
        let bytes = std::fs::read(&self.clients_file)
            .with_context(|| format!("failed to read {}", self.clients_file.display()))?;
        deserialize_rows::<ClientRecord>(&bytes)
            .with_context(|| format!("failed to parse {}", self.clients_file.display()))
    }

    fn transactions(&self, client_code: i64) -> anyhow::Result<Option<SourceTable>> {
        Self::read_optional_table(&self.transactions_path(client_code))
    }

    fn transfers(&self, client_code: i64) -> anyhow::Result<Option<SourceTable>> {
        Self::read_optional_table(&self.transfers_path(client_code))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn per_client_paths_follow_export_naming() {
        let src = CsvDirSource::new("db");
        assert_eq!(
            src.transactions_path(17),
            Path::new("db").join("client_17_transactions_3m.csv")
        );
        assert_eq!(
            src.transfers_path(17),
            Path::new("db").join("client_17_transfers_3m.csv")
        );
    }

    #[test]
    fn missing_per_client_file_is_not_an_error() {
        let src = CsvDirSource::new("definitely/not/a/real/dir");
        assert!(src.transactions(1).unwrap().is_none());
        assert!(src.transfers(1).unwrap().is_none());
        assert!(src.clients().is_err());
    }
}
