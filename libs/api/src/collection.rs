use serde::{Deserialize, Serialize};

// ════════════════════════════════════════════════════════════════
//  Collection kinds
// ════════════════════════════════════════════════════════════════

/// Логическая коллекция. Каждая имеет свою форму документа,
/// но общий lifecycle envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CollectionKind {
    /// Numeric-heavy user profile records.
    #[serde(alias = "dummyuser")]
    UserProfile,
    Geolocation,
    Sales,
}

impl CollectionKind {
    pub const ALL: [CollectionKind; 3] = [
        CollectionKind::UserProfile,
        CollectionKind::Geolocation,
        CollectionKind::Sales,
    ];

    /// Collection name in the store.
    pub fn name(self) -> &'static str {
        match self {
            CollectionKind::UserProfile => "user-profile",
            CollectionKind::Geolocation => "geolocation",
            CollectionKind::Sales => "sales",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "user-profile" | "dummyuser" => Some(CollectionKind::UserProfile),
            "geolocation" => Some(CollectionKind::Geolocation),
            "sales" => Some(CollectionKind::Sales),
            _ => None,
        }
    }
}

impl std::fmt::Display for CollectionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// ════════════════════════════════════════════════════════════════
//  Operation kinds
// ════════════════════════════════════════════════════════════════

/// Workload operation. Also used as the `action` tag in the lifecycle
/// envelope of every record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Insert,
    Update,
    Delete,
}

impl OperationKind {
    pub const ALL: [OperationKind; 3] = [
        OperationKind::Insert,
        OperationKind::Update,
        OperationKind::Delete,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            OperationKind::Insert => "insert",
            OperationKind::Update => "update",
            OperationKind::Delete => "delete",
        }
    }
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip_through_from_name() {
        for kind in CollectionKind::ALL {
            assert_eq!(CollectionKind::from_name(kind.name()), Some(kind));
        }
        assert_eq!(CollectionKind::from_name("dummyuser"), Some(CollectionKind::UserProfile));
        assert_eq!(CollectionKind::from_name("orders"), None);
    }

    #[test]
    fn serde_accepts_legacy_alias() {
        let kind: CollectionKind = serde_json::from_str(r#""dummyuser""#).unwrap();
        assert_eq!(kind, CollectionKind::UserProfile);
        assert_eq!(serde_json::to_string(&kind).unwrap(), r#""user-profile""#);
    }
}
