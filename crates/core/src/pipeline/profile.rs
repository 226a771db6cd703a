use crate::domain::profile::{ClientProfile, ClientRecord, TOP_N};
use crate::source::table::SourceTable;
use crate::source::ClientDataSource;
use std::collections::HashMap;
use std::fmt;

const TRANSACTIONS: &str = "transactions";
const TRANSFERS: &str = "transfers";

/// Why a client was given the sentinel profile. Never fatal to a run.
#[derive(Debug, Clone, PartialEq)]
pub enum ProfileError {
    MissingClientData {
        client_code: i64,
        table: &'static str,
    },
    MalformedSourceTable {
        client_code: i64,
        table: &'static str,
        detail: String,
    },
}

impl fmt::Display for ProfileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingClientData { client_code, table } => {
                write!(f, "no {table} table for client {client_code}")
            }
            Self::MalformedSourceTable {
                client_code,
                table,
                detail,
            } => write!(f, "malformed {table} table for client {client_code}: {detail}"),
        }
    }
}

impl std::error::Error for ProfileError {}

/// Reduces one client's tables into a profile.
///
/// Both tables are required; `name` comes from the first transaction row, everything else
/// numeric from the master record.
pub fn build_profile(
    client: &ClientRecord,
    transactions: Option<&SourceTable>,
    transfers: Option<&SourceTable>,
) -> Result<ClientProfile, ProfileError> {
    let client_code = client.client_code;
    let transactions = transactions.ok_or(ProfileError::MissingClientData {
        client_code,
        table: TRANSACTIONS,
    })?;
    let transfers = transfers.ok_or(ProfileError::MissingClientData {
        client_code,
        table: TRANSFERS,
    })?;

    let malformed = |table: &'static str, detail: String| ProfileError::MalformedSourceTable {
        client_code,
        table,
        detail,
    };

    let categories = transactions
        .column("category")
        .ok_or_else(|| malformed(TRANSACTIONS, "missing column `category`".to_string()))?;
    let top_category = top_values(categories, TOP_N);

    let kinds = transfers
        .column("type")
        .ok_or_else(|| malformed(TRANSFERS, "missing column `type`".to_string()))?;
    let top_transfer = top_values(kinds, TOP_N);

    if transactions.column_index("name").is_none() {
        return Err(malformed(TRANSACTIONS, "missing column `name`".to_string()));
    }
    let name = transactions
        .value(0, "name")
        .ok_or_else(|| malformed(TRANSACTIONS, "no rows to take the client name from".to_string()))?
        .trim()
        .to_string();

    Ok(ClientProfile {
        client_code,
        name,
        status: client.status.clone(),
        top_category,
        top_transfer,
        avg_balance: client.avg_monthly_balance,
        age: client.age,
    })
}

/// The `n` most frequent distinct non-blank values, most frequent first. Ties keep the order in
/// which values were first seen.
pub fn top_values<'a>(values: impl Iterator<Item = &'a str>, n: usize) -> Vec<String> {
    let mut counts: HashMap<&str, (usize, usize)> = HashMap::new();
    for (idx, value) in values.enumerate() {
        let value = value.trim();
        if value.is_empty() {
            continue;
        }
        counts.entry(value).or_insert((0, idx)).0 += 1;
    }

    let mut ranked: Vec<(&str, usize, usize)> = counts
        .into_iter()
        .map(|(value, (count, first_seen))| (value, count, first_seen))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.2.cmp(&b.2)));

    ranked
        .into_iter()
        .take(n)
        .map(|(value, _, _)| value.to_string())
        .collect()
}

/// Loads the client's tables from `source` and builds the profile, substituting the sentinel
/// profile on any per-client failure.
pub fn load_profile(source: &dyn ClientDataSource, client: &ClientRecord) -> ClientProfile {
    let client_code = client.client_code;
    let fetch = |table: &'static str, res: anyhow::Result<Option<SourceTable>>| {
        res.map_err(|err| ProfileError::MalformedSourceTable {
            client_code,
            table,
            detail: format!("{err:#}"),
        })
    };

    let result = fetch(TRANSACTIONS, source.transactions(client_code)).and_then(|transactions| {
        let transfers = fetch(TRANSFERS, source.transfers(client_code))?;
        build_profile(client, transactions.as_ref(), transfers.as_ref())
    });

    match result {
        Ok(profile) => profile,
        Err(err @ ProfileError::MissingClientData { .. }) => {
            tracing::info!(client_code, reason = %err, "no behavioral data; using sentinel profile");
            ClientProfile::no_data(client_code)
        }
        Err(err @ ProfileError::MalformedSourceTable { .. }) => {
            tracing::warn!(client_code, error = %err, "unusable source table; using sentinel profile");
            ClientProfile::no_data(client_code)
        }
    }
}
