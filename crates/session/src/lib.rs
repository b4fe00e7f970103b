//! Mode-aware user state for BookLove.
//!
//! A visitor is either a guest, whose swipes live in the client-local
//! [`GuestStore`](booklove_core::guest::GuestStore), or an authenticated user
//! whose activity lives in a [`UserDataStore`]. [`UserState`] hides the
//! difference behind one async API and publishes a [`UserSnapshot`] after
//! every operation. [`migrate_guest_to_user`] carries guest activity over to
//! the server when a visitor signs up.

pub mod backend;
pub mod data_store;
pub mod error;
pub mod facade;
pub mod memory;
pub mod migration;
pub mod pg;
pub mod snapshot;

pub use data_store::{MatchRecord, Preferences, UserActivity, UserDataStore};
pub use error::{DataStoreError, SessionError};
pub use facade::UserState;
pub use memory::{MemoryUserDataStore, StoreOp};
pub use migration::{migrate_guest_to_user, MigrationError, MigrationReport, MigrationStep};
pub use pg::PgUserDataStore;
pub use snapshot::{AuthSession, SessionMode, UserSnapshot};
