use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{watch, RwLock};

use churn_api::{
    BoxFuture, ChangeEvent, ChangeStream, Document, DocumentId, DocumentStore, Filter,
    OperationType, StoreError, StoredDocument, UpdateDescription, UpdateOutcome,
};

// ═══════════════════════════════════════════════════════════════
//  MemoryStoreConfig
// ═══════════════════════════════════════════════════════════════

fn default_change_log_capacity() -> usize {
    100_000
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct MemoryStoreConfig {
    /// Сколько последних событий mutation log хранится на коллекцию.
    /// Подписчик, отставший сильнее, получает ошибку подписки.
    #[serde(default = "default_change_log_capacity")]
    pub change_log_capacity: usize,
}

impl Default for MemoryStoreConfig {
    fn default() -> Self {
        Self {
            change_log_capacity: default_change_log_capacity(),
        }
    }
}

// ═══════════════════════════════════════════════════════════════
//  Collection
// ═══════════════════════════════════════════════════════════════

struct CollectionState {
    docs: HashMap<DocumentId, Document>,
    /// Ring buffer of the most recent events, oldest first.
    log: VecDeque<ChangeEvent>,
    next_seq: u64,
}

struct Collection {
    name: String,
    state: RwLock<CollectionState>,
    /// Log head (next seq). Wakes change streams.
    head_tx: watch::Sender<u64>,
    /// Bumped by `interrupt`; streams opened under an older epoch fail.
    epoch: AtomicU64,
    closed: AtomicBool,
}

impl Collection {
    fn new(name: &str) -> Self {
        let (head_tx, _) = watch::channel(0);
        Self {
            name: name.to_string(),
            state: RwLock::new(CollectionState {
                docs: HashMap::new(),
                log: VecDeque::new(),
                next_seq: 0,
            }),
            head_tx,
            epoch: AtomicU64::new(0),
            closed: AtomicBool::new(false),
        }
    }

    fn wake(&self) {
        self.head_tx.send_modify(|_| {});
    }
}

impl CollectionState {
    fn append(&mut self, capacity: usize, event: ChangeEvent) {
        if self.log.len() >= capacity {
            self.log.pop_front();
        }
        self.log.push_back(event);
        self.next_seq += 1;
    }
}

// ═══════════════════════════════════════════════════════════════
//  MemoryStore
// ═══════════════════════════════════════════════════════════════

/// In-memory document store with a per-collection ordered change log.
///
/// Collections are created on first use. Cloning shares the same data.
#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

struct Inner {
    collections: RwLock<HashMap<String, Arc<Collection>>>,
    capacity: usize,
    next_id: AtomicU64,
    closed: AtomicBool,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(MemoryStoreConfig::default())
    }
}

impl MemoryStore {
    pub fn new(config: MemoryStoreConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                collections: RwLock::new(HashMap::new()),
                capacity: config.change_log_capacity.max(1),
                next_id: AtomicU64::new(1),
                closed: AtomicBool::new(false),
            }),
        }
    }

    async fn collection(&self, name: &str) -> Result<Arc<Collection>, StoreError> {
        if self.inner.closed.load(Ordering::Acquire) {
            return Err(StoreError::transient("store closed"));
        }
        if let Some(c) = self.inner.collections.read().await.get(name) {
            return Ok(c.clone());
        }
        let mut map = self.inner.collections.write().await;
        Ok(map
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(Collection::new(name)))
            .clone())
    }

    fn assign_id(&self) -> DocumentId {
        let n = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        DocumentId::new(format!("{n:024x}"))
    }

    /// Number of documents (soft-deleted included).
    pub async fn count(&self, collection: &str) -> usize {
        match self.inner.collections.read().await.get(collection) {
            Some(c) => c.state.read().await.docs.len(),
            None => 0,
        }
    }

    pub async fn get(&self, collection: &str, id: &DocumentId) -> Option<Document> {
        let coll = self.inner.collections.read().await.get(collection).cloned()?;
        let state = coll.state.read().await;
        state.docs.get(id).cloned()
    }

    /// Fail every open change stream of `collection` with a subscription
    /// error. Streams opened afterwards are unaffected.
    pub async fn interrupt(&self, collection: &str) {
        if let Some(c) = self.inner.collections.read().await.get(collection) {
            c.epoch.fetch_add(1, Ordering::AcqRel);
            c.wake();
            tracing::warn!(collection = %c.name, "change feed interrupted");
        }
    }

    /// Reject further calls and end all change streams.
    pub async fn close(&self) {
        self.inner.closed.store(true, Ordering::Release);
        for c in self.inner.collections.read().await.values() {
            c.closed.store(true, Ordering::Release);
            c.wake();
        }
    }
}

impl DocumentStore for MemoryStore {
    fn insert_many(
        &self,
        collection: &str,
        docs: Vec<Document>,
    ) -> BoxFuture<'_, Result<Vec<DocumentId>, StoreError>> {
        let collection = collection.to_string();
        Box::pin(async move {
            let coll = self.collection(&collection).await?;
            let mut ids = Vec::with_capacity(docs.len());
            {
                let mut state = coll.state.write().await;
                for doc in docs {
                    let id = self.assign_id();
                    let seq = state.next_seq;
                    state.append(
                        self.inner.capacity,
                        ChangeEvent {
                            seq,
                            operation_type: OperationType::Insert,
                            collection: collection.clone(),
                            document_key: id.clone(),
                            full_document: Some(doc.clone()),
                            update_description: None,
                        },
                    );
                    state.docs.insert(id.clone(), doc);
                    ids.push(id);
                }
                coll.head_tx.send_replace(state.next_seq);
            }
            Ok(ids)
        })
    }

    fn update(
        &self,
        collection: &str,
        id: &DocumentId,
        fields: Document,
    ) -> BoxFuture<'_, Result<UpdateOutcome, StoreError>> {
        let collection = collection.to_string();
        let id = id.clone();
        Box::pin(async move {
            let coll = self.collection(&collection).await?;
            let mut state = coll.state.write().await;
            let Some(doc) = state.docs.get_mut(&id) else {
                return Ok(UpdateOutcome { matched: false });
            };
            if fields.is_empty() {
                return Ok(UpdateOutcome { matched: true });
            }
            for (k, v) in &fields {
                doc.insert(k.clone(), v.clone());
            }
            let seq = state.next_seq;
            state.append(
                self.inner.capacity,
                ChangeEvent {
                    seq,
                    operation_type: OperationType::Update,
                    collection: collection.clone(),
                    document_key: id,
                    full_document: None,
                    update_description: Some(UpdateDescription {
                        updated_fields: fields,
                        removed_fields: Vec::new(),
                    }),
                },
            );
            coll.head_tx.send_replace(state.next_seq);
            Ok(UpdateOutcome { matched: true })
        })
    }

    fn find(
        &self,
        collection: &str,
        filter: &Filter,
        limit: usize,
    ) -> BoxFuture<'_, Result<Vec<StoredDocument>, StoreError>> {
        let collection = collection.to_string();
        let filter = filter.clone();
        Box::pin(async move {
            let coll = self.collection(&collection).await?;
            let state = coll.state.read().await;
            Ok(state
                .docs
                .iter()
                .filter(|(_, body)| filter.matches(body))
                .take(limit)
                .map(|(id, body)| StoredDocument {
                    id: id.clone(),
                    body: body.clone(),
                })
                .collect())
        })
    }

    fn watch(&self, collection: &str) -> BoxFuture<'_, Result<Box<dyn ChangeStream>, StoreError>> {
        let collection = collection.to_string();
        Box::pin(async move {
            let coll = self.collection(&collection).await?;
            // Remember the head under the lock so no write slips between
            // reading it and subscribing.
            let (cursor, head_rx) = {
                let state = coll.state.read().await;
                (state.next_seq, coll.head_tx.subscribe())
            };
            let epoch = coll.epoch.load(Ordering::Acquire);
            Ok(Box::new(MemoryChangeStream {
                collection: coll,
                cursor,
                epoch,
                head_rx,
                done: false,
            }) as Box<dyn ChangeStream>)
        })
    }
}

// ═══════════════════════════════════════════════════════════════
//  MemoryChangeStream
// ═══════════════════════════════════════════════════════════════

/// Cursor over one collection's log. After the first error it stays inert.
pub struct MemoryChangeStream {
    collection: Arc<Collection>,
    cursor: u64,
    epoch: u64,
    head_rx: watch::Receiver<u64>,
    done: bool,
}

impl MemoryChangeStream {
    fn fail(&mut self, msg: String) -> Option<Result<ChangeEvent, StoreError>> {
        self.done = true;
        Some(Err(StoreError::subscription(msg)))
    }
}

impl ChangeStream for MemoryChangeStream {
    fn next(&mut self) -> BoxFuture<'_, Option<Result<ChangeEvent, StoreError>>> {
        Box::pin(async move {
            loop {
                if self.done || self.collection.closed.load(Ordering::Acquire) {
                    return None;
                }
                if self.collection.epoch.load(Ordering::Acquire) != self.epoch {
                    let msg = format!("change feed for '{}' interrupted", self.collection.name);
                    return self.fail(msg);
                }

                self.head_rx.borrow_and_update();
                {
                    let state = self.collection.state.read().await;
                    if self.cursor < state.next_seq {
                        let oldest = state.log.front().map(|e| e.seq).unwrap_or(state.next_seq);
                        if self.cursor < oldest {
                            let msg = format!(
                                "change log for '{}' truncated: cursor {} behind oldest {oldest}",
                                self.collection.name, self.cursor
                            );
                            drop(state);
                            return self.fail(msg);
                        }
                        let event = state.log[(self.cursor - oldest) as usize].clone();
                        self.cursor += 1;
                        return Some(Ok(event));
                    }
                }

                if self.head_rx.changed().await.is_err() {
                    return None;
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use churn_api::{fields, ErrorKind};
    use serde_json::json;

    fn doc(v: serde_json::Value) -> Document {
        v.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn insert_then_find_not_deleted() {
        let store = MemoryStore::default();
        let ids = store
            .insert_many(
                "sales",
                vec![
                    doc(json!({"isDeleted": false, "quantity": 1})),
                    doc(json!({"isDeleted": true, "quantity": 2})),
                ],
            )
            .await
            .unwrap();
        assert_eq!(ids.len(), 2);
        assert_eq!(ids[0].as_str().len(), 24);

        let live = store.find("sales", &Filter::not_deleted(), 10).await.unwrap();
        assert_eq!(live.len(), 1);
        assert_eq!(live[0].id, ids[0]);
        assert_eq!(store.count("sales").await, 2);
    }

    #[tokio::test]
    async fn find_respects_limit() {
        let store = MemoryStore::default();
        let docs = (0..5).map(|i| doc(json!({"isDeleted": false, "n": i}))).collect();
        store.insert_many("geolocation", docs).await.unwrap();
        let found = store.find("geolocation", &Filter::not_deleted(), 3).await.unwrap();
        assert_eq!(found.len(), 3);
    }

    #[tokio::test]
    async fn update_merges_and_reports_fields() {
        let store = MemoryStore::default();
        let mut stream = store.watch("sales").await.unwrap();
        let ids = store
            .insert_many("sales", vec![doc(json!({"isDeleted": false, "quantity": 1}))])
            .await
            .unwrap();

        let out = store
            .update("sales", &ids[0], doc(json!({"quantity": 9})))
            .await
            .unwrap();
        assert!(out.matched);
        let body = store.get("sales", &ids[0]).await.unwrap();
        assert_eq!(body["quantity"], json!(9));
        assert_eq!(body[fields::IS_DELETED], json!(false));

        let insert = stream.next().await.unwrap().unwrap();
        assert_eq!(insert.operation_type, OperationType::Insert);
        assert_eq!(insert.full_document.unwrap()["quantity"], json!(1));

        let update = stream.next().await.unwrap().unwrap();
        assert_eq!(update.operation_type, OperationType::Update);
        assert!(update.seq > insert.seq);
        let desc = update.update_description.unwrap();
        assert_eq!(desc.updated_fields["quantity"], json!(9));
        assert!(desc.removed_fields.is_empty());
    }

    #[tokio::test]
    async fn update_unknown_id_is_noop() {
        let store = MemoryStore::default();
        let out = store
            .update("sales", &DocumentId::new("missing"), doc(json!({"quantity": 1})))
            .await
            .unwrap();
        assert!(!out.matched);
    }

    #[tokio::test]
    async fn watch_starts_at_now() {
        let store = MemoryStore::default();
        store
            .insert_many("sales", vec![doc(json!({"old": true}))])
            .await
            .unwrap();
        let mut stream = store.watch("sales").await.unwrap();
        store
            .insert_many("sales", vec![doc(json!({"old": false}))])
            .await
            .unwrap();

        let ev = stream.next().await.unwrap().unwrap();
        assert_eq!(ev.full_document.unwrap()["old"], json!(false));
    }

    #[tokio::test]
    async fn lagging_stream_gets_subscription_error_then_stays_inert() {
        let store = MemoryStore::new(MemoryStoreConfig { change_log_capacity: 2 });
        let mut stream = store.watch("sales").await.unwrap();
        let docs = (0..5).map(|i| doc(json!({"n": i}))).collect();
        store.insert_many("sales", docs).await.unwrap();

        let err = stream.next().await.unwrap().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Subscription);
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn interrupt_fails_open_streams_only() {
        let store = MemoryStore::default();
        let mut old = store.watch("sales").await.unwrap();
        store.interrupt("sales").await;
        let mut fresh = store.watch("sales").await.unwrap();

        let err = old.next().await.unwrap().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Subscription);

        store.insert_many("sales", vec![doc(json!({"n": 1}))]).await.unwrap();
        assert!(fresh.next().await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn close_ends_streams_and_rejects_writes() {
        let store = MemoryStore::default();
        let mut stream = store.watch("sales").await.unwrap();
        let waiter = tokio::spawn(async move { stream.next().await.is_none() });
        tokio::task::yield_now().await;
        store.close().await;
        assert!(waiter.await.unwrap());

        let err = store.insert_many("sales", vec![Document::new()]).await.unwrap_err();
        assert!(err.is_transient());
    }
}
