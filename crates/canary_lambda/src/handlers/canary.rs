use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

pub const CONTENT_TYPE_JSON: &str = "application/json";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiGatewayResponse {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub headers: Value,
    pub body: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CanaryPayload {
    pub first_name: String,
    pub surname: String,
    pub age: u32,
}

impl Default for CanaryPayload {
    fn default() -> Self {
        Self {
            first_name: "John".to_string(),
            surname: "Doe".to_string(),
            age: 42,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CanaryError {
    #[error("failed to serialize canary payload: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Answers every invocation with the fixed canary payload; the event is ignored.
pub fn handle_canary_event(_event: &Value) -> Result<ApiGatewayResponse, CanaryError> {
    success_response(200, &CanaryPayload::default())
}

fn success_response(
    status_code: u16,
    payload: &impl Serialize,
) -> Result<ApiGatewayResponse, CanaryError> {
    Ok(ApiGatewayResponse {
        status_code,
        headers: json!({"Content-Type": CONTENT_TYPE_JSON}),
        body: serde_json::to_string(payload)?,
    })
}
