use crate::domain::recommendation::RecommendationRecord;
use serde_json::Value;

/// Run-scoped, append-only collection of reconciled records.
#[derive(Debug, Default)]
pub struct ResultAggregator {
    records: Vec<RecommendationRecord>,
    batches: usize,
}

impl ResultAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one batch's records after everything appended so far.
    pub fn append_batch(&mut self, records: Vec<RecommendationRecord>) {
        self.batches += 1;
        self.records.extend(records);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn batches(&self) -> usize {
        self.batches
    }

    pub fn records(&self) -> &[RecommendationRecord] {
        &self.records
    }

    pub fn into_table(self) -> ResultTable {
        ResultTable::from_records(self.records)
    }
}

/// Final output: one row per record, columns in order of first appearance across all rows.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultTable {
    columns: Vec<String>,
    rows: Vec<RecommendationRecord>,
}

impl ResultTable {
    pub fn from_records(rows: Vec<RecommendationRecord>) -> Self {
        let mut columns: Vec<String> = Vec::new();
        for row in &rows {
            for key in row.fields().keys() {
                if !columns.iter().any(|c| c == key) {
                    columns.push(key.clone());
                }
            }
        }
        Self { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[RecommendationRecord] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Row cells as text, aligned with `columns()`. Absent keys and nulls become empty cells.
    pub fn cells(&self, row: &RecommendationRecord) -> Vec<String> {
        self.columns
            .iter()
            .map(|c| match row.fields().get(c) {
                None | Some(Value::Null) => String::new(),
                Some(Value::String(s)) => s.clone(),
                Some(other) => other.to_string(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(v: Value) -> RecommendationRecord {
        serde_json::from_value(v).unwrap()
    }

    #[test]
    fn appends_batches_in_submission_order() {
        let mut agg = ResultAggregator::new();
        agg.append_batch(vec![RecommendationRecord::new(3, "a", "x"), RecommendationRecord::new(1, "b", "y")]);
        agg.append_batch(vec![RecommendationRecord::fallback(2)]);
        agg.append_batch(vec![RecommendationRecord::new(3, "c", "z")]);

        assert_eq!(agg.batches(), 3);
        let codes: Vec<_> = agg.records().iter().map(|r| r.client_code()).collect();
        assert_eq!(codes, vec![Some(3), Some(1), Some(2), Some(3)]);
        assert_eq!(agg.into_table().len(), 4);
    }

    #[test]
    fn columns_follow_first_appearance() {
        let table = ResultTable::from_records(vec![
            RecommendationRecord::new(1, "a", "x"),
            record(json!({"client_code": 2, "note": "extra", "recomend_product": "b"})),
        ]);
        assert_eq!(
            table.columns(),
            &["client_code", "recomend_product", "push_notification", "note"]
        );

        let cells = table.cells(&table.rows()[1]);
        assert_eq!(cells, vec!["2", "b", "", "extra"]);
    }

    #[test]
    fn empty_aggregator_yields_empty_table() {
        let table = ResultAggregator::new().into_table();
        assert!(table.is_empty());
        assert!(table.columns().is_empty());
    }
}
