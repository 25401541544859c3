//! Row structs for the directory mirror tables.

pub mod key;
pub mod metadata;
pub mod user;
