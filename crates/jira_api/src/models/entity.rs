use serde::de::Deserializer;
use serde::Deserialize;
use serde_json::Value;

/// Named reference shared by status, priority, issue type, component and version payloads.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct NamedEntity {
    #[serde(default, deserialize_with = "deserialize_string_field")]
    pub id: Option<String>,
    pub name: Option<String>,
    pub icon_url: Option<String>,
    pub released: Option<bool>,
    pub status_category: Option<Box<NamedEntity>>,
}

/// Field metadata returned by `GET field`.
#[derive(Debug, Deserialize, Clone)]
pub struct FieldDefinition {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub custom: bool,
}

/// Accepts ids the API sends either as strings or as bare numbers.
pub(crate) fn deserialize_string_field<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|val| match val {
        Value::String(text) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Null => None,
        other => serde_json::to_string(&other).ok(),
    }))
}
