use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a user account.
///
/// Wraps a UUID to provide type safety and prevent mixing up
/// user IDs with other UUID-based identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(Uuid);

impl UserId {
    /// Creates a new random user ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a user ID from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for UserId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl From<UserId> for Uuid {
    fn from(id: UserId) -> Self {
        id.0
    }
}

/// Unique identifier for a book in the catalog.
///
/// The book's stock quantity is the only concurrency-sensitive field in
/// the system, so these IDs show up in every inventory operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BookId(Uuid);

impl BookId {
    /// Creates a new random book ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a book ID from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for BookId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for BookId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for BookId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl From<BookId> for Uuid {
    fn from(id: BookId) -> Self {
        id.0
    }
}

/// Unique identifier for an order record.
///
/// Generated client-side when the placement workflow builds the order,
/// before the insert, so the ID is known inside the transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(Uuid);

impl OrderId {
    /// Creates a new random order ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates an order ID from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for OrderId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for OrderId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl From<OrderId> for Uuid {
    fn from(id: OrderId) -> Self {
        id.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_id_new_creates_unique_ids() {
        let id1 = UserId::new();
        let id2 = UserId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn book_id_from_uuid_preserves_value() {
        let uuid = Uuid::new_v4();
        let id = BookId::from_uuid(uuid);
        assert_eq!(id.as_uuid(), uuid);
    }

    #[test]
    fn order_id_serialization_roundtrip() {
        let id = OrderId::new();
        let json = serde_json::to_string(&id).unwrap();
        let deserialized: OrderId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, deserialized);
    }

    #[test]
    fn ids_serialize_as_bare_uuid_strings() {
        let uuid = Uuid::new_v4();
        let json = serde_json::to_string(&BookId::from_uuid(uuid)).unwrap();
        assert_eq!(json, format!("\"{uuid}\""));
    }
}
