//! Extraction schema store: CRUD plus the example template and dry-run
//! testing.

use std::sync::RwLock;

use crate::models::{Schema, SchemaPayload, SchemaTestRequest};
use crate::transport::ApiClient;

use super::{failure_message, OpState};

/// Collection cache over `/schemas/`, with two extra single slots: the
/// canned example template and the latest dry-run result. The dry-run
/// slot is separate from the documents store's parse result so testing a
/// schema never clobbers a real extraction.
pub struct SchemasStore {
    client: ApiClient,
    schemas: RwLock<Vec<Schema>>,
    current_schema: RwLock<Option<Schema>>,
    example_schema: RwLock<Option<serde_json::Value>>,
    test_result: RwLock<Option<serde_json::Value>>,
    op: OpState,
}

impl SchemasStore {
    pub fn new(client: ApiClient) -> Self {
        Self {
            client,
            schemas: RwLock::new(Vec::new()),
            current_schema: RwLock::new(None),
            example_schema: RwLock::new(None),
            test_result: RwLock::new(None),
            op: OpState::new(),
        }
    }

    // ── Observable state ─────────────────────────────────

    pub fn schemas(&self) -> Vec<Schema> {
        self.schemas.read().map(|guard| guard.clone()).unwrap_or_default()
    }

    pub fn current_schema(&self) -> Option<Schema> {
        self.current_schema.read().ok().and_then(|guard| guard.clone())
    }

    pub fn example_schema(&self) -> Option<serde_json::Value> {
        self.example_schema.read().ok().and_then(|guard| guard.clone())
    }

    pub fn test_result(&self) -> Option<serde_json::Value> {
        self.test_result.read().ok().and_then(|guard| guard.clone())
    }

    pub fn is_loading(&self) -> bool {
        self.op.is_loading()
    }

    pub fn error(&self) -> Option<String> {
        self.op.error()
    }

    // ── Operations ───────────────────────────────────────

    pub async fn fetch_schemas(&self) -> Vec<Schema> {
        self.op.begin();
        let result = match self.client.get_schemas().await {
            Ok(schemas) => {
                if let Ok(mut guard) = self.schemas.write() {
                    *guard = schemas.clone();
                }
                schemas
            }
            Err(e) => {
                tracing::error!(%e, "Failed to fetch schemas");
                self.op.fail(failure_message(&e, "Failed to fetch schemas"));
                Vec::new()
            }
        };
        self.op.finish();
        result
    }

    /// Fetch one schema by id and make it current.
    pub async fn fetch_schema(&self, id: i64) -> Option<Schema> {
        self.op.begin();
        let result = match self.client.get_schema(id).await {
            Ok(schema) => {
                if let Ok(mut guard) = self.current_schema.write() {
                    *guard = Some(schema.clone());
                }
                Some(schema)
            }
            Err(e) => {
                tracing::error!(%e, id, "Failed to fetch schema");
                self.op.fail(failure_message(&e, "Failed to fetch schema"));
                None
            }
        };
        self.op.finish();
        result
    }

    pub async fn create_schema(&self, schema: &SchemaPayload) -> Option<Schema> {
        self.op.begin();
        let result = match self.client.create_schema(schema).await {
            Ok(created) => {
                if let Ok(mut guard) = self.schemas.write() {
                    guard.push(created.clone());
                }
                Some(created)
            }
            Err(e) => {
                tracing::error!(%e, "Failed to create schema");
                self.op.fail(failure_message(&e, "Failed to create schema"));
                None
            }
        };
        self.op.finish();
        result
    }

    pub async fn update_schema(&self, id: i64, schema: &SchemaPayload) -> Option<Schema> {
        self.op.begin();
        let result = match self.client.update_schema(id, schema).await {
            Ok(updated) => {
                if let Ok(mut guard) = self.schemas.write() {
                    if let Some(slot) = guard.iter_mut().find(|s| s.id == id) {
                        *slot = updated.clone();
                    }
                }
                Some(updated)
            }
            Err(e) => {
                tracing::error!(%e, id, "Failed to update schema");
                self.op.fail(failure_message(&e, "Failed to update schema"));
                None
            }
        };
        self.op.finish();
        result
    }

    /// Delete a schema; clears the current-schema slot when it was the
    /// one removed.
    pub async fn delete_schema(&self, id: i64) -> bool {
        self.op.begin();
        let result = match self.client.delete_schema(id).await {
            Ok(()) => {
                if let Ok(mut guard) = self.schemas.write() {
                    guard.retain(|s| s.id != id);
                }
                if let Ok(mut guard) = self.current_schema.write() {
                    if guard.as_ref().is_some_and(|s| s.id == id) {
                        *guard = None;
                    }
                }
                true
            }
            Err(e) => {
                tracing::error!(%e, id, "Failed to delete schema");
                self.op.fail(failure_message(&e, "Failed to delete schema"));
                false
            }
        };
        self.op.finish();
        result
    }

    /// Fetch the canned example template; cached singly.
    pub async fn get_example_schema(&self) -> Option<serde_json::Value> {
        self.op.begin();
        let result = match self.client.get_example_schema().await {
            Ok(response) => {
                if let Ok(mut guard) = self.example_schema.write() {
                    *guard = Some(response.example.clone());
                }
                Some(response.example)
            }
            Err(e) => {
                tracing::error!(%e, "Failed to get example schema");
                self.op.fail(failure_message(&e, "Failed to get example schema"));
                None
            }
        };
        self.op.finish();
        result
    }

    /// Dry-run a schema against one page of a document. The result lands
    /// in the separate `test_result` slot.
    pub async fn test_schema(
        &self,
        schema_id: i64,
        document_id: i64,
        page_number: u32,
    ) -> Option<serde_json::Value> {
        self.op.begin();
        let request = SchemaTestRequest {
            document_id,
            page_number,
        };
        let result = match self.client.test_schema(schema_id, &request).await {
            Ok(response) => {
                if let Ok(mut guard) = self.test_result.write() {
                    *guard = Some(response.result.clone());
                }
                Some(response.result)
            }
            Err(e) => {
                tracing::error!(%e, schema_id, document_id, "Failed to test schema");
                self.op.fail(failure_message(&e, "Failed to test schema"));
                None
            }
        };
        self.op.finish();
        result
    }

    pub fn set_current_schema(&self, schema: Option<Schema>) {
        if let Ok(mut guard) = self.current_schema.write() {
            *guard = schema;
        }
    }

    /// Return the store to its initial empty state.
    pub fn reset(&self) {
        if let Ok(mut guard) = self.schemas.write() {
            guard.clear();
        }
        if let Ok(mut guard) = self.current_schema.write() {
            *guard = None;
        }
        if let Ok(mut guard) = self.example_schema.write() {
            *guard = None;
        }
        if let Ok(mut guard) = self.test_result.write() {
            *guard = None;
        }
        self.op.reset();
    }
}
