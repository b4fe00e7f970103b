/// Authenticated user ids are issued by the auth provider as UUIDs.
pub type UserId = uuid::Uuid;

/// Character ids are opaque strings owned by the catalog.
pub type CharacterId = String;

/// Book ids are opaque strings owned by the catalog.
pub type BookId = String;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
