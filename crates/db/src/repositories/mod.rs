//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async CRUD methods
//! that accept `&PgPool` as the first argument.

pub mod user_match_repo;
pub mod user_pass_repo;
pub mod user_profile_repo;
pub mod user_read_book_repo;

pub use user_match_repo::UserMatchRepo;
pub use user_pass_repo::UserPassRepo;
pub use user_profile_repo::UserProfileRepo;
pub use user_read_book_repo::UserReadBookRepo;
