/// Category of a store error. Loops retry `Transient`; the relay gives up
/// on a subscription after `Subscription`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Retry after a pause.
    Transient,
    /// Change feed interrupted. The subscription is no longer usable.
    Subscription,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::Transient => f.write_str("transient"),
            ErrorKind::Subscription => f.write_str("subscription"),
        }
    }
}

/// Unified error type for every `DocumentStore` / `ChangeStream` method:
/// an `ErrorKind` plus a human-readable message.
#[derive(Clone)]
pub struct StoreError {
    kind: ErrorKind,
    message: String,
}

impl StoreError {
    pub fn transient(msg: impl Into<String>) -> Self {
        Self { kind: ErrorKind::Transient, message: msg.into() }
    }

    /// Терминальная ошибка для подписки.
    pub fn subscription(msg: impl Into<String>) -> Self {
        Self { kind: ErrorKind::Subscription, message: msg.into() }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn is_transient(&self) -> bool {
        self.kind == ErrorKind::Transient
    }
}

impl std::fmt::Debug for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.kind, self.message)
    }
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for StoreError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors_pick_kind() {
        let e = StoreError::transient("store closed");
        assert_eq!(e.kind(), ErrorKind::Transient);
        assert!(e.is_transient());

        let e = StoreError::subscription("feed closed");
        assert_eq!(e.kind(), ErrorKind::Subscription);
        assert!(!e.is_transient());
    }

    #[test]
    fn debug_includes_kind() {
        let e = StoreError::subscription("feed closed");
        assert_eq!(format!("{e:?}"), "[subscription] feed closed");
        assert_eq!(e.to_string(), "feed closed");
    }
}
