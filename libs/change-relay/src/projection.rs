use serde_json::{Map, Value};

use churn_api::{fields, ChangeEvent, CollectionKind, OperationType};

pub const INSERT_EVENT: &str = "newData";
pub const UPDATE_EVENT: &str = "updatedData";
pub const DELETE_EVENT: &str = "deletedData";

/// Ключ id документа во всех payload.
pub const DOCUMENT_ID: &str = "documentId";

/// Поля, которые уходят подписчикам при insert.
pub fn allow_list(kind: CollectionKind) -> &'static [&'static str] {
    match kind {
        CollectionKind::UserProfile => &["userId", "score", "age", "accountBalance", "isActive"],
        CollectionKind::Geolocation => {
            &["userId", "latitude", "longitude", "city", "country", "timestamp"]
        }
        CollectionKind::Sales => {
            &["productId", "userId", "price", "quantity", "storeLocation", "paymentMethod"]
        }
    }
}

/// How a change event is presented to subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Insert,
    Update,
    /// Physical delete, or an update that flips `isDeleted` to true.
    Delete,
}

impl Classification {
    pub fn event_name(self) -> &'static str {
        match self {
            Classification::Insert => INSERT_EVENT,
            Classification::Update => UPDATE_EVENT,
            Classification::Delete => DELETE_EVENT,
        }
    }
}

pub fn classify(event: &ChangeEvent) -> Classification {
    match event.operation_type {
        OperationType::Insert => Classification::Insert,
        OperationType::Delete => Classification::Delete,
        OperationType::Update => {
            let soft_deleted = event
                .update_description
                .as_ref()
                .and_then(|d| d.updated_fields.get(fields::IS_DELETED))
                .and_then(Value::as_bool)
                .unwrap_or(false);
            if soft_deleted {
                Classification::Delete
            } else {
                Classification::Update
            }
        }
    }
}

/// Payload for one event, shaped by [`classify`]:
///
/// - insert: allow-listed fields present in the full document + `documentId`;
/// - update: `{documentId, updatedFields: [names], removedFields: [names]}`;
/// - delete: `{documentId}`.
pub fn project(kind: CollectionKind, event: &ChangeEvent) -> (Classification, Value) {
    let class = classify(event);
    let mut payload = Map::new();
    payload.insert(DOCUMENT_ID.into(), Value::String(event.document_key.to_string()));

    match class {
        Classification::Insert => {
            if let Some(doc) = &event.full_document {
                for &name in allow_list(kind) {
                    if let Some(v) = doc.get(name) {
                        payload.insert(name.into(), v.clone());
                    }
                }
            }
        }
        Classification::Update => {
            let (updated, removed) = match &event.update_description {
                Some(d) => (
                    d.updated_fields.keys().cloned().map(Value::String).collect(),
                    d.removed_fields.iter().cloned().map(Value::String).collect(),
                ),
                None => (Vec::new(), Vec::new()),
            };
            payload.insert("updatedFields".into(), Value::Array(updated));
            payload.insert("removedFields".into(), Value::Array(removed));
        }
        Classification::Delete => {}
    }

    (class, Value::Object(payload))
}
