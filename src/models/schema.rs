use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An extraction schema: named field definitions the parser fills in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Schema {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub schema_json: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Body for creating or updating a schema.
#[derive(Debug, Clone, Serialize)]
pub struct SchemaPayload {
    pub name: String,
    pub description: String,
    pub schema_json: serde_json::Value,
}

/// Body of `POST /schemas/{id}/test/` — a dry-run extraction.
#[derive(Debug, Clone, Serialize)]
pub struct SchemaTestRequest {
    pub document_id: i64,
    pub page_number: u32,
}

/// Response of `GET /schemas/example/`.
#[derive(Debug, Clone, Deserialize)]
pub struct ExampleSchemaResponse {
    pub example: serde_json::Value,
}

/// Response of a schema dry run.
#[derive(Debug, Clone, Deserialize)]
pub struct SchemaTestResponse {
    pub result: serde_json::Value,
}
