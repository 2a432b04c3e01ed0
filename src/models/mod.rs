//! Wire types for the document-parsing service.
//!
//! Entities carry server-assigned integer ids; collection ordering is
//! fetch order with created entities appended at the tail.

pub mod document;
pub mod item;
pub mod schema;

pub use document::{Document, DocumentUpload, ParseRequest, ParsedResult, PreviewResponse};
pub use item::{Item, ItemPayload};
pub use schema::{ExampleSchemaResponse, Schema, SchemaPayload, SchemaTestRequest, SchemaTestResponse};

use serde::Deserialize;

/// Response of the authenticated service root — the login probe target.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiRootResponse {
    pub message: String,
    pub status: String,
}
