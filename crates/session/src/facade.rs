//! One async API over guest and authenticated state.

use std::sync::Arc;

use booklove_core::error::validate_entity_id;
use booklove_core::guest::{GuestStore, MemoryStorage};
use indexmap::IndexSet;
use tokio::sync::{watch, Mutex};

use crate::backend::{GuestBackend, ServerBackend, UserStateBackend};
use crate::data_store::{Preferences, UserDataStore};
use crate::error::SessionError;
use crate::migration::{migrate_guest_to_user, MigrationReport};
use crate::snapshot::{AuthSession, UserSnapshot};

/// The visitor's state, routed to the guest store or the server depending on
/// whether someone is signed in.
///
/// Operations are serialised; each one publishes a fresh [`UserSnapshot`] to
/// every [`subscribe`](Self::subscribe)r, including after a failed server
/// write. The guest store is only ever cleared by a successful migration.
///
/// # Usage
///
/// ```rust,no_run
/// # async fn demo(guest: booklove_core::guest::GuestStore,
/// #               data: std::sync::Arc<dyn booklove_session::UserDataStore>) {
/// use booklove_session::UserState;
///
/// let state = UserState::new(guest, data);
/// let mut rx = state.subscribe();
///
/// state.add_match("char-1", Some("char-2")).await.ok();
/// assert!(rx.has_changed().unwrap());
/// # }
/// ```
pub struct UserState {
    guest: GuestStore,
    data: Arc<dyn UserDataStore>,
    backend: Mutex<Box<dyn UserStateBackend>>,
    snapshots: watch::Sender<UserSnapshot>,
}

impl UserState {
    /// Start in guest mode.
    ///
    /// If `guest` cannot persist, the session keeps guest state in memory
    /// only and it is lost when the process exits.
    pub fn new(guest: GuestStore, data: Arc<dyn UserDataStore>) -> Self {
        let guest = if guest.is_available() {
            guest
        } else {
            tracing::warn!("Guest storage unavailable, keeping guest state in memory");
            GuestStore::new(Arc::new(MemoryStorage::new()))
        };

        let backend = GuestBackend::new(guest.clone());
        let (snapshots, _) = watch::channel(backend.snapshot());
        Self {
            guest,
            data,
            backend: Mutex::new(Box::new(backend)),
            snapshots,
        }
    }

    /// Latest published snapshot.
    pub fn snapshot(&self) -> UserSnapshot {
        self.snapshots.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<UserSnapshot> {
        self.snapshots.subscribe()
    }

    /// The guest store this session reads and migrates from.
    pub fn guest_store(&self) -> &GuestStore {
        &self.guest
    }

    fn publish(&self, backend: &dyn UserStateBackend) {
        self.snapshots.send_replace(backend.snapshot());
    }

    // -- Mode changes --------------------------------------------------------

    /// Switch to authenticated mode and load the user's activity.
    ///
    /// The mode switches even if the fetch fails; the cache then starts
    /// empty until [`refresh`](Self::refresh) succeeds.
    pub async fn sign_in(&self, session: AuthSession) -> Result<(), SessionError> {
        let mut backend = self.backend.lock().await;
        self.enter_authenticated(&mut backend, session).await
    }

    /// Return to guest mode, resuming whatever the guest store holds.
    pub async fn sign_out(&self) {
        let mut backend = self.backend.lock().await;
        *backend = Box::new(GuestBackend::new(self.guest.clone()));
        self.publish(&**backend);
        tracing::info!("Returned to guest mode");
    }

    /// Carry guest activity over to a newly created account, then sign in.
    ///
    /// Signs in even when the migration fails; the guest state is kept so a
    /// later call can retry. A migration error takes precedence over a
    /// fetch error.
    pub async fn handle_signup(
        &self,
        session: AuthSession,
    ) -> Result<MigrationReport, SessionError> {
        let mut backend = self.backend.lock().await;
        let migrated =
            migrate_guest_to_user(&self.guest, self.data.as_ref(), session.user_id).await;
        let signed_in = self.enter_authenticated(&mut backend, session).await;

        let report = migrated?;
        signed_in?;
        Ok(report)
    }

    async fn enter_authenticated(
        &self,
        backend: &mut Box<dyn UserStateBackend>,
        session: AuthSession,
    ) -> Result<(), SessionError> {
        let mut server = ServerBackend::new(Arc::clone(&self.data), session.user_id);
        let fetched = server.refresh().await;
        *backend = Box::new(server);
        self.publish(&**backend);
        tracing::info!(user_id = %session.user_id, "Entered authenticated mode");
        fetched
    }

    /// Reload state from its source, discarding optimistic divergence.
    pub async fn refresh(&self) -> Result<(), SessionError> {
        let mut backend = self.backend.lock().await;
        let result = backend.refresh().await;
        self.publish(&**backend);
        result
    }

    // -- Swipes --------------------------------------------------------------

    pub async fn add_match(
        &self,
        character_id: &str,
        next_character_id: Option<&str>,
    ) -> Result<(), SessionError> {
        validate_entity_id(character_id, "Character")?;
        let mut backend = self.backend.lock().await;
        let result = backend.add_match(character_id, next_character_id).await;
        self.publish(&**backend);
        result
    }

    pub async fn add_pass(
        &self,
        character_id: &str,
        next_character_id: Option<&str>,
    ) -> Result<(), SessionError> {
        validate_entity_id(character_id, "Character")?;
        let mut backend = self.backend.lock().await;
        let result = backend.add_pass(character_id, next_character_id).await;
        self.publish(&**backend);
        result
    }

    pub async fn remove_match(&self, character_id: &str) -> Result<(), SessionError> {
        validate_entity_id(character_id, "Character")?;
        let mut backend = self.backend.lock().await;
        let result = backend.remove_match(character_id).await;
        self.publish(&**backend);
        result
    }

    pub async fn remove_pass(&self, character_id: &str) -> Result<(), SessionError> {
        validate_entity_id(character_id, "Character")?;
        let mut backend = self.backend.lock().await;
        let result = backend.remove_pass(character_id).await;
        self.publish(&**backend);
        result
    }

    pub async fn mark_match_read(&self, character_id: &str) -> Result<(), SessionError> {
        validate_entity_id(character_id, "Character")?;
        let mut backend = self.backend.lock().await;
        let result = backend.mark_match_read(character_id).await;
        self.publish(&**backend);
        result
    }

    pub async fn reset_passes(&self) -> Result<(), SessionError> {
        let mut backend = self.backend.lock().await;
        let result = backend.reset_passes().await;
        self.publish(&**backend);
        result
    }

    pub async fn reset_all(&self) -> Result<(), SessionError> {
        let mut backend = self.backend.lock().await;
        let result = backend.reset_all().await;
        self.publish(&**backend);
        result
    }

    pub async fn set_current_character(
        &self,
        character_id: Option<&str>,
    ) -> Result<(), SessionError> {
        if let Some(id) = character_id {
            validate_entity_id(id, "Character")?;
        }
        let mut backend = self.backend.lock().await;
        let result = backend.set_current_character(character_id).await;
        self.publish(&**backend);
        result
    }

    // -- Books ---------------------------------------------------------------

    pub async fn mark_book_read(&self, book_id: &str) -> Result<(), SessionError> {
        validate_entity_id(book_id, "Book")?;
        let mut backend = self.backend.lock().await;
        let result = backend.mark_book_read(book_id).await;
        self.publish(&**backend);
        result
    }

    pub async fn unmark_book_read(&self, book_id: &str) -> Result<(), SessionError> {
        validate_entity_id(book_id, "Book")?;
        let mut backend = self.backend.lock().await;
        let result = backend.unmark_book_read(book_id).await;
        self.publish(&**backend);
        result
    }

    // -- Preferences ---------------------------------------------------------

    pub async fn set_preferences(
        &self,
        genres: IndexSet<String>,
        prefers_spicy: Option<bool>,
    ) -> Result<(), SessionError> {
        let mut backend = self.backend.lock().await;
        let result = backend
            .set_preferences(Preferences {
                genres,
                prefers_spicy,
            })
            .await;
        self.publish(&**backend);
        result
    }

    /// Hide the signup prompt for good. No effect once signed in.
    pub async fn dismiss_signup_prompt(&self) -> Result<(), SessionError> {
        let mut backend = self.backend.lock().await;
        let result = backend.dismiss_signup_prompt().await;
        self.publish(&**backend);
        result
    }
}
