use serde::{Deserialize, Serialize};

use crate::{BoxFuture, Document, DocumentId, StoreError};

// ════════════════════════════════════════════════════════════════
//  Change Event
// ════════════════════════════════════════════════════════════════

/// Operation recorded in the store's mutation log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationType {
    Insert,
    Update,
    /// Physical removal. The workload itself never issues one.
    Delete,
}

/// Поля, изменённые update-операцией.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDescription {
    /// Field name → new value.
    pub updated_fields: Document,
    #[serde(default)]
    pub removed_fields: Vec<String>,
}

/// One entry of the store's ordered, per-collection mutation log.
///
/// Produced by the store, read-only to consumers. `full_document` is set
/// for inserts, `update_description` for updates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeEvent {
    /// Position in the collection's log, strictly increasing.
    pub seq: u64,
    pub operation_type: OperationType,
    pub collection: String,
    pub document_key: DocumentId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_document: Option<Document>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_description: Option<UpdateDescription>,
}

// ════════════════════════════════════════════════════════════════
//  ChangeStream
// ════════════════════════════════════════════════════════════════

/// Подписка на mutation log одной коллекции — асинхронный итератор.
///
/// - `Some(Ok(event))` — следующее событие по порядку;
/// - `Some(Err(e))` — feed прерван, поток дальше не используется;
/// - `None` — store закрыт.
pub trait ChangeStream: Send {
    fn next(&mut self) -> BoxFuture<'_, Option<Result<ChangeEvent, StoreError>>>;
}
