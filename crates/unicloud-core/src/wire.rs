//! Request and response bodies exchanged with the design service.

use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};

/// Body of `POST /chat`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct ChatRequest {
    /// Intake answers rendered as free text
    pub context: String,
    /// Earlier chat turns, oldest first
    #[serde(default)]
    pub history: Vec<String>,
    /// Latest user ask
    pub message: String,
}

/// Reply of `POST /chat`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct ChatResponse {
    /// Component descriptors, e.g. `aws:ecs_service x2 | region=us-west-2; cost=120/mo`
    pub components: Vec<String>,
    /// Index pairs into `components`, e.g. `0->1`
    #[serde(default)]
    pub connections: Vec<String>,
    #[serde(default, deserialize_with = "string_or_null")]
    #[schemars(with = "Option<String>")]
    pub notes: String,
}

/// Body of `POST /terraform`. The reply is a zip archive.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct TerraformRequest {
    pub components: Vec<String>,
    #[serde(default)]
    pub connections: Vec<String>,
    #[serde(default, deserialize_with = "string_or_null")]
    #[schemars(with = "Option<String>")]
    pub notes: String,
}

/// Error body returned with HTTP 400.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct ApiError {
    pub error: String,
}

// The service may send `"notes": null`.
fn string_or_null<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// JSON schemas of the wire types, keyed by type name.
pub fn wire_schemas() -> serde_json::Value {
    serde_json::json!({
        "ChatRequest": schemars::schema_for!(ChatRequest),
        "ChatResponse": schemars::schema_for!(ChatResponse),
        "TerraformRequest": schemars::schema_for!(TerraformRequest),
        "ApiError": schemars::schema_for!(ApiError),
    })
}
