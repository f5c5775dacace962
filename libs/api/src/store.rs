use crate::{BoxFuture, ChangeStream, Document, DocumentId, Filter, StoredDocument, StoreError};

/// Result of a point update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateOutcome {
    /// `false` if no document with that id exists.
    pub matched: bool,
}

/// Read/write surface of the document store, shared by every workload loop
/// and the relay through one `Arc<dyn DocumentStore>`.
///
/// Lifecycle (open/close) belongs to the process bootstrap, not to the
/// tasks holding the handle.
pub trait DocumentStore: Send + Sync {
    /// Bulk insert. Returns the assigned ids in input order.
    fn insert_many(
        &self,
        collection: &str,
        docs: Vec<Document>,
    ) -> BoxFuture<'_, Result<Vec<DocumentId>, StoreError>>;

    /// Set `fields` on one document (merge, like `$set`).
    fn update(
        &self,
        collection: &str,
        id: &DocumentId,
        fields: Document,
    ) -> BoxFuture<'_, Result<UpdateOutcome, StoreError>>;

    /// Up to `limit` documents matching `filter`. Order is unspecified.
    fn find(
        &self,
        collection: &str,
        filter: &Filter,
        limit: usize,
    ) -> BoxFuture<'_, Result<Vec<StoredDocument>, StoreError>>;

    /// Open a change stream positioned at "now" (no historical replay).
    fn watch(&self, collection: &str) -> BoxFuture<'_, Result<Box<dyn ChangeStream>, StoreError>>;
}
