use churn_api::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("watch '{collection}': {source}")]
    Watch {
        collection: String,
        #[source]
        source: StoreError,
    },

    #[error("relay queue size must be > 0")]
    ZeroQueue,

    #[error("no collections to watch")]
    NothingToWatch,
}
