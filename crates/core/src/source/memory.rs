use crate::domain::profile::ClientRecord;
use crate::source::table::SourceTable;
use crate::source::ClientDataSource;
use std::collections::{HashMap, HashSet};

/// In-memory source for pipeline tests.
#[derive(Debug, Default)]
pub(crate) struct InMemorySource {
    pub clients: Vec<ClientRecord>,
    pub transactions: HashMap<i64, SourceTable>,
    pub transfers: HashMap<i64, SourceTable>,
    pub broken: HashSet<i64>,
}

impl InMemorySource {
    pub fn client(code: i64, status: &str, age: i64, balance: f64) -> ClientRecord {
        ClientRecord {
            client_code: code,
            name: None,
            status: status.to_string(),
            age,
            city: None,
            avg_monthly_balance: balance,
        }
    }

    pub fn table(headers: &[&str], rows: &[&[&str]]) -> SourceTable {
        SourceTable::new(
            headers.iter().map(|h| h.to_string()).collect(),
            rows.iter()
                .map(|r| r.iter().map(|v| v.to_string()).collect())
                .collect(),
        )
    }

    /// Registers a client with one-row transaction and transfer tables.
    pub fn with_full_client(mut self, record: ClientRecord, name: &str, category: &str, kind: &str) -> Self {
        let code = record.client_code;
        self.clients.push(record);
        self.transactions
            .insert(code, Self::table(&["name", "category"], &[&[name, category]]));
        self.transfers
            .insert(code, Self::table(&["name", "type"], &[&[name, kind]]));
        self
    }
}

impl ClientDataSource for InMemorySource {
    fn source_name(&self) -> &'static str {
        "in_memory"
    }

    fn clients(&self) -> anyhow::Result<Vec<ClientRecord>> {
        Ok(self.clients.clone())
    }

    fn transactions(&self, client_code: i64) -> anyhow::Result<Option<SourceTable>> {
        anyhow::ensure!(
            !self.broken.contains(&client_code),
            "transactions table for client {client_code} is unreadable"
        );
        Ok(self.transactions.get(&client_code).cloned())
    }

    fn transfers(&self, client_code: i64) -> anyhow::Result<Option<SourceTable>> {
        Ok(self.transfers.get(&client_code).cloned())
    }
}
