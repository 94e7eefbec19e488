use serde::{ Serialize, Deserialize };
use serde_json::{ Map, Value as JsonValue };

#[derive(Serialize, Debug)]
pub struct ChatRequest<'a> {
    pub message: &'a str,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct ChatResponse {
    pub answer: String,
    #[serde(default)]
    pub sources: Option<Vec<JsonValue>>,
    #[serde(default)]
    pub processing_time: Option<f64>,
}

#[derive(Deserialize, Debug, Default)]
pub struct ErrorBody {
    #[serde(default)]
    pub error: Option<String>,
}

/// Whatever the backend reports after a reset.
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
#[serde(transparent)]
pub struct ResetStatus(pub Map<String, JsonValue>);

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct HealthStatus {
    pub online: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(flatten)]
    pub fields: Map<String, JsonValue>,
}

impl HealthStatus {
    pub fn offline(message: impl Into<String>) -> Self {
        let mut fields = Map::new();
        fields.insert("status".to_string(), JsonValue::String("error".to_string()));
        Self {
            online: false,
            message: Some(message.into()),
            fields,
        }
    }

    /// Passes the backend's fields through, with `online` forced to true.
    pub fn online(mut fields: Map<String, JsonValue>) -> Self {
        fields.remove("online");
        let message = match fields.remove("message") {
            Some(JsonValue::String(s)) => Some(s),
            Some(other) => {
                fields.insert("message".to_string(), other);
                None
            }
            None => None,
        };
        Self { online: true, message, fields }
    }
}
