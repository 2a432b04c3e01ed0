//! Generic item collection store.

use std::sync::RwLock;

use crate::models::{Item, ItemPayload};
use crate::transport::ApiClient;

use super::{failure_message, OpState};

/// Read-mostly collection cache over `/items/`.
pub struct ItemsStore {
    client: ApiClient,
    items: RwLock<Vec<Item>>,
    op: OpState,
}

impl ItemsStore {
    pub fn new(client: ApiClient) -> Self {
        Self {
            client,
            items: RwLock::new(Vec::new()),
            op: OpState::new(),
        }
    }

    // ── Observable state ─────────────────────────────────

    pub fn items(&self) -> Vec<Item> {
        self.items.read().map(|guard| guard.clone()).unwrap_or_default()
    }

    pub fn is_loading(&self) -> bool {
        self.op.is_loading()
    }

    pub fn error(&self) -> Option<String> {
        self.op.error()
    }

    // ── Operations ───────────────────────────────────────

    /// Fetch the full collection, replacing the cache.
    pub async fn fetch_items(&self) -> Vec<Item> {
        self.op.begin();
        let result = match self.client.get_items().await {
            Ok(items) => {
                if let Ok(mut guard) = self.items.write() {
                    *guard = items.clone();
                }
                items
            }
            Err(e) => {
                tracing::error!(%e, "Failed to fetch items");
                self.op.fail(failure_message(&e, "Failed to fetch items"));
                Vec::new()
            }
        };
        self.op.finish();
        result
    }

    /// Create an item; on success it is appended at the cache tail.
    pub async fn add_item(&self, item: &ItemPayload) -> Option<Item> {
        self.op.begin();
        let result = match self.client.create_item(item).await {
            Ok(created) => {
                if let Ok(mut guard) = self.items.write() {
                    guard.push(created.clone());
                }
                Some(created)
            }
            Err(e) => {
                tracing::error!(%e, "Failed to add item");
                self.op.fail(failure_message(&e, "Failed to add item"));
                None
            }
        };
        self.op.finish();
        result
    }

    /// Update an item; the cached entry is replaced in place.
    pub async fn update_item(&self, id: i64, item: &ItemPayload) -> Option<Item> {
        self.op.begin();
        let result = match self.client.update_item(id, item).await {
            Ok(updated) => {
                if let Ok(mut guard) = self.items.write() {
                    if let Some(slot) = guard.iter_mut().find(|i| i.id == id) {
                        *slot = updated.clone();
                    }
                }
                Some(updated)
            }
            Err(e) => {
                tracing::error!(%e, id, "Failed to update item");
                self.op.fail(failure_message(&e, "Failed to update item"));
                None
            }
        };
        self.op.finish();
        result
    }

    /// Delete an item and drop it from the cache.
    pub async fn remove_item(&self, id: i64) -> bool {
        self.op.begin();
        let result = match self.client.delete_item(id).await {
            Ok(()) => {
                if let Ok(mut guard) = self.items.write() {
                    guard.retain(|i| i.id != id);
                }
                true
            }
            Err(e) => {
                tracing::error!(%e, id, "Failed to remove item");
                self.op.fail(failure_message(&e, "Failed to remove item"));
                false
            }
        };
        self.op.finish();
        result
    }
}
