use serde::{Deserialize, Deserializer, Serialize};

/// Entry of the product selector (`/api/products`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductOption {
    #[serde(deserialize_with = "id_as_string")]
    pub product_id: String,
    #[serde(default)]
    pub product_name: String,
}

impl ProductOption {
    /// Value the product filter compares records against.
    ///
    /// Records are keyed by `product_name` and fall back to `product_id`
    /// when the name is missing, so the selector does the same.
    #[must_use]
    pub fn filter_value(&self) -> &str {
        if self.product_name.is_empty() {
            &self.product_id
        } else {
            &self.product_name
        }
    }
}

/// Entry of the store selector (`/api/stores`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreOption {
    #[serde(deserialize_with = "id_as_string")]
    pub store_id: String,
    #[serde(default)]
    pub store_name: String,
}

impl StoreOption {
    /// Value the store filter compares records against.
    #[must_use]
    pub fn filter_value(&self) -> &str {
        if self.store_name.is_empty() {
            &self.store_id
        } else {
            &self.store_name
        }
    }
}

/// Ids come back as integers from some deployments and strings from others.
fn id_as_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {other}"
        ))),
    }
}
