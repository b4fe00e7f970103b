//! Versioned persistence of [`GuestState`] on top of a [`GuestStorage`] slot.
//!
//! Storage failures and corrupt blobs never reach callers: every operation
//! degrades to `None` (or a silent no-op for [`GuestStore::clear`]) and logs
//! the cause.

use std::sync::Arc;

use chrono::{Duration, Utc};

use crate::types::Timestamp;

use super::schema::{GuestSchema, SchemaError};
use super::state::{GuestState, GuestStatePatch, ReturnVisit};
use super::storage::{GuestStorage, StorageError};

/// Explicit, injectable guest-state store.
///
/// Construct once per client profile and share by reference (or `Arc`).
#[derive(Clone)]
pub struct GuestStore {
    storage: Arc<dyn GuestStorage>,
}

/// Result of reading the slot, before any fallback is applied.
enum Loaded {
    Empty,
    Valid(GuestState),
    Corrupt,
}

impl GuestStore {
    pub fn new(storage: Arc<dyn GuestStorage>) -> Self {
        Self { storage }
    }

    /// Whether the underlying medium currently accepts writes.
    pub fn is_available(&self) -> bool {
        match self.storage.probe() {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!(error = %e, "Guest storage unavailable");
                false
            }
        }
    }

    /// Return the persisted state, creating and persisting a fresh one when
    /// the slot is empty or corrupt. `None` only when storage is unavailable.
    pub fn init(&self) -> Option<GuestState> {
        if !self.is_available() {
            return None;
        }

        match self.load()? {
            Loaded::Valid(state) => Some(state),
            Loaded::Empty | Loaded::Corrupt => {
                let state = GuestState::with_random_visitor();
                tracing::info!(visitor_id = %state.visitor_id, "Created new guest state");
                self.persist(&state)?;
                Some(state)
            }
        }
    }

    /// Return the persisted state without creating one.
    pub fn get(&self) -> Option<GuestState> {
        if !self.is_available() {
            return None;
        }
        match self.load()? {
            Loaded::Valid(state) => Some(state),
            Loaded::Empty | Loaded::Corrupt => None,
        }
    }

    /// Merge `patch` into the current state, stamp `lastVisit`, and persist.
    pub fn update(&self, patch: GuestStatePatch) -> Option<GuestState> {
        let mut state = self.init()?;
        patch.apply(&mut state);
        state.last_visit = next_stamp(state.last_visit);
        self.persist(&state)?;
        Some(state)
    }

    /// Delete the persisted state.
    pub fn clear(&self) {
        if let Err(e) = self.storage.clear() {
            tracing::debug!(error = %e, "Failed to clear guest state");
        }
    }

    /// Describe the visitor without creating state for a first-timer.
    pub fn return_visit(&self) -> ReturnVisit {
        self.get()
            .map(|state| state.return_visit())
            .unwrap_or_default()
    }

    /// Read and decode the slot, upgrading legacy shapes in place.
    ///
    /// Returns `None` only when storage fails mid-read.
    fn load(&self) -> Option<Loaded> {
        let raw = match self.storage.load() {
            Ok(Some(raw)) => raw,
            Ok(None) => return Some(Loaded::Empty),
            Err(e) => {
                log_storage_error("load", &e);
                return None;
            }
        };

        match GuestSchema::decode(&raw) {
            Ok(schema) if schema.is_current() => Some(Loaded::Valid(schema.upgrade())),
            Ok(schema) => {
                let mut state = schema.upgrade();
                state.last_visit = next_stamp(state.last_visit);
                tracing::info!(
                    visitor_id = %state.visitor_id,
                    matches = state.matches.len(),
                    "Upgraded legacy guest state"
                );
                self.persist(&state)?;
                Some(Loaded::Valid(state))
            }
            Err(e) => {
                log_corrupt(&e);
                Some(Loaded::Corrupt)
            }
        }
    }

    fn persist(&self, state: &GuestState) -> Option<()> {
        let raw = match serde_json::to_string(state) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize guest state");
                return None;
            }
        };
        match self.storage.save(&raw) {
            Ok(()) => Some(()),
            Err(e) => {
                log_storage_error("save", &e);
                None
            }
        }
    }
}

/// The next `lastVisit` value: now, but never at or before `previous`.
fn next_stamp(previous: Timestamp) -> Timestamp {
    let now = Utc::now();
    if now > previous {
        now
    } else {
        previous + Duration::microseconds(1)
    }
}

fn log_storage_error(op: &'static str, err: &StorageError) {
    tracing::debug!(op, error = %err, "Guest storage operation failed");
}

fn log_corrupt(err: &SchemaError) {
    tracing::warn!(error = %err, "Discarding corrupt guest state");
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
