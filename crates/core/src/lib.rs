//! Domain types and client-local guest state for BookLove.
//!
//! The [`guest`] module owns everything an anonymous visitor accumulates
//! before signing up: the persisted [`guest::GuestState`] blob, its schema
//! history, the injected storage slot, and the state-transition actions.

pub mod error;
pub mod guest;
pub mod types;
