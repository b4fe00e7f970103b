//! Client-local state for anonymous visitors.

pub mod actions;
pub mod schema;
pub mod state;
pub mod storage;
pub mod store;

pub use schema::{GuestSchema, GuestStateV1, SchemaError};
pub use state::{sort_by_recency, GuestMatch, GuestState, GuestStatePatch, ReturnVisit};
pub use storage::{FileStorage, GuestStorage, MemoryStorage, StorageError};
pub use store::GuestStore;

/// Key of the single slot holding the serialized guest state.
pub const GUEST_STORAGE_KEY: &str = "booklove_guest";

/// Number of matches at which a guest is invited to sign up.
pub const SIGNUP_PROMPT_THRESHOLD: usize = 3;
