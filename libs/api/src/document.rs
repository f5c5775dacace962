use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Semi-structured document body (field name → value).
pub type Document = serde_json::Map<String, Value>;

/// Lifecycle envelope field names shared by every collection.
pub mod fields {
    pub const CREATED_AT: &str = "createdAt";
    pub const UPDATED_AT: &str = "updatedAt";
    pub const DELETED_AT: &str = "deletedAt";
    pub const IS_DELETED: &str = "isDeleted";
    pub const ACTION: &str = "action";
}

// ════════════════════════════════════════════════════════════════
//  DocumentId
// ════════════════════════════════════════════════════════════════

/// Store-assigned document identifier (opaque string).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(String);

impl DocumentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A document as read back from the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredDocument {
    pub id: DocumentId,
    pub body: Document,
}

impl StoredDocument {
    pub fn is_deleted(&self) -> bool {
        self.body
            .get(fields::IS_DELETED)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }
}

// ════════════════════════════════════════════════════════════════
//  Filter
// ════════════════════════════════════════════════════════════════

/// Conjunction of field-equality predicates. Empty filter matches all.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    equals: Vec<(String, Value)>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.equals.push((field.into(), value.into()));
        self
    }

    /// Records still visible to the workload (`isDeleted = false`).
    pub fn not_deleted() -> Self {
        Self::new().eq(fields::IS_DELETED, false)
    }

    pub fn matches(&self, doc: &Document) -> bool {
        self.equals
            .iter()
            .all(|(field, expected)| doc.get(field) == Some(expected))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(v: Value) -> Document {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn not_deleted_filter() {
        let live = doc(json!({"isDeleted": false, "userId": 7}));
        let gone = doc(json!({"isDeleted": true, "userId": 7}));
        let missing = doc(json!({"userId": 7}));

        let f = Filter::not_deleted();
        assert!(f.matches(&live));
        assert!(!f.matches(&gone));
        assert!(!f.matches(&missing));
    }

    #[test]
    fn empty_filter_matches_everything() {
        assert!(Filter::new().matches(&Document::new()));
    }

    #[test]
    fn conjunction() {
        let d = doc(json!({"isDeleted": false, "userId": 7}));
        assert!(Filter::not_deleted().eq("userId", 7).matches(&d));
        assert!(!Filter::not_deleted().eq("userId", 8).matches(&d));
    }
}
