use serde::{Deserialize, Serialize};

/// Placeholder used for every text field of a client without behavioral data.
pub const NO_DATA: &str = "Нет данных";

/// Number of ranked categories / transfer types kept per profile.
pub const TOP_N: usize = 5;

/// One row of the client master table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientRecord {
    pub client_code: i64,
    #[serde(default)]
    pub name: Option<String>,
    pub status: String,
    pub age: i64,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(rename = "avg_monthly_balance_KZT", alias = "avg_monthly_balance")]
    pub avg_monthly_balance: f64,
}

/// Compact per-client summary sent to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientProfile {
    pub client_code: i64,
    pub name: String,
    pub status: String,
    pub top_category: Vec<String>,
    pub top_transfer: Vec<String>,
    pub avg_balance: f64,
    pub age: i64,
}

impl ClientProfile {
    /// Sentinel profile for a client whose transaction or transfer table is unusable.
    pub fn no_data(client_code: i64) -> Self {
        Self {
            client_code,
            name: NO_DATA.to_string(),
            status: NO_DATA.to_string(),
            top_category: Vec::new(),
            top_transfer: Vec::new(),
            avg_balance: 0.0,
            age: 0,
        }
    }

    pub fn is_no_data(&self) -> bool {
        self.name == NO_DATA && self.status == NO_DATA && self.age == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn master_row_deserializes_from_csv_headers() {
        let data = "client_code,name,status,age,city,avg_monthly_balance_KZT\n\
                    7,Айгерим,Премиальный клиент,41,Алматы,1250000.5\n";
        let mut rdr = csv::Reader::from_reader(data.as_bytes());
        let rows: Vec<ClientRecord> = rdr.deserialize().collect::<Result<_, _>>().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].client_code, 7);
        assert_eq!(rows[0].status, "Премиальный клиент");
        assert_eq!(rows[0].avg_monthly_balance, 1_250_000.5);
        assert_eq!(rows[0].name.as_deref(), Some("Айгерим"));
    }

    #[test]
    fn sentinel_profile_serializes_all_fields() {
        let profile = ClientProfile::no_data(42);
        assert!(profile.is_no_data());

        let v = serde_json::to_value(&profile).unwrap();
        assert_eq!(v["client_code"], 42);
        assert_eq!(v["name"], NO_DATA);
        assert_eq!(v["status"], NO_DATA);
        assert_eq!(v["top_category"], serde_json::json!([]));
        assert_eq!(v["top_transfer"], serde_json::json!([]));
        assert_eq!(v["avg_balance"], 0.0);
        assert_eq!(v["age"], 0);
    }
}
