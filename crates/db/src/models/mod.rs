//! Row structs for the user tables.
//!
//! Each submodule contains a `FromRow` + `Serialize` entity struct matching
//! the database row.

pub mod user_match;
pub mod user_pass;
pub mod user_profile;
pub mod user_read_book;
