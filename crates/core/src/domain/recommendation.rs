use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const FIELD_CLIENT_CODE: &str = "client_code";
pub const FIELD_PRODUCT: &str = "recomend_product";
pub const FIELD_PUSH: &str = "push_notification";

pub const FALLBACK_PRODUCT: &str = "Ошибка";
pub const FALLBACK_PUSH: &str = "Ошибка генерации уведомления";

/// One output row.
///
/// Model-sourced records keep whatever keys the model returned, in the order it returned them,
/// so a partially malformed entry still reaches the output table unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecommendationRecord {
    fields: Map<String, Value>,
}

impl RecommendationRecord {
    pub fn new(client_code: i64, recomend_product: &str, push_notification: &str) -> Self {
        let mut fields = Map::new();
        fields.insert(FIELD_CLIENT_CODE.to_string(), Value::from(client_code));
        fields.insert(FIELD_PRODUCT.to_string(), Value::from(recomend_product));
        fields.insert(FIELD_PUSH.to_string(), Value::from(push_notification));
        Self { fields }
    }

    pub fn fallback(client_code: i64) -> Self {
        Self::new(client_code, FALLBACK_PRODUCT, FALLBACK_PUSH)
    }

    pub fn from_fields(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Accepts both `17` and `"17"`; models are not consistent about it.
    pub fn client_code(&self) -> Option<i64> {
        match self.fields.get(FIELD_CLIENT_CODE)? {
            Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn recomend_product(&self) -> Option<&str> {
        self.fields.get(FIELD_PRODUCT).and_then(Value::as_str)
    }

    pub fn push_notification(&self) -> Option<&str> {
        self.fields.get(FIELD_PUSH).and_then(Value::as_str)
    }

    pub fn is_fallback(&self) -> bool {
        self.recomend_product() == Some(FALLBACK_PRODUCT)
            && self.push_notification() == Some(FALLBACK_PUSH)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn fallback_record_carries_placeholder_texts() {
        let r = RecommendationRecord::fallback(9);
        assert_eq!(r.client_code(), Some(9));
        assert_eq!(r.recomend_product(), Some("Ошибка"));
        assert_eq!(r.push_notification(), Some("Ошибка генерации уведомления"));
        assert!(r.is_fallback());
    }

    #[test]
    fn client_code_accepts_numeric_strings() {
        let r: RecommendationRecord =
            serde_json::from_value(json!({"client_code": " 12 ", "recomend_product": "Кредитная карта"}))
                .unwrap();
        assert_eq!(r.client_code(), Some(12));
        assert_eq!(r.push_notification(), None);
        assert!(!r.is_fallback());
    }

    #[test]
    fn preserves_model_key_order() {
        let r: RecommendationRecord = serde_json::from_str(
            r#"{"push_notification":"p","client_code":3,"recomend_product":"x"}"#,
        )
        .unwrap();
        let keys: Vec<_> = r.fields().keys().cloned().collect();
        assert_eq!(keys, vec![FIELD_PUSH, FIELD_CLIENT_CODE, FIELD_PRODUCT]);
    }
}
