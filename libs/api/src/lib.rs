//! Shared contracts between the workload engine, the change relay and
//! store backends: documents, change events, store and sink traits.

use std::future::Future;
use std::pin::Pin;

mod change;
mod collection;
mod document;
mod error;
mod sink;
mod store;
mod util;

pub use change::{ChangeEvent, ChangeStream, OperationType, UpdateDescription};
pub use collection::{CollectionKind, OperationKind};
pub use document::{fields, Document, DocumentId, Filter, StoredDocument};
pub use error::{ErrorKind, StoreError};
pub use sink::{BroadcastEvent, BroadcastSink};
pub use store::{DocumentStore, UpdateOutcome};
pub use util::now_ms;

/// Boxed `Send` future returned by the object-safe async traits.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
