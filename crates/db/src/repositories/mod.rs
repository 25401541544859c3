//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async query methods
//! that accept `&PgPool` as the first argument.

pub mod key_repo;
pub mod metadata_repo;
pub mod user_repo;

pub use key_repo::KeyRepo;
pub use metadata_repo::MetadataRepo;
pub use user_repo::UserRepo;
