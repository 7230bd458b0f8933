//! STREAK Storage Layer
//!
//! SQLite persistence for client-local state that must survive a restart.
//! Values live in named slots; a slot is either populated or absent.

mod database;
mod error;
mod migrations;

pub use database::Database;
pub use error::StorageError;

pub type Result<T> = std::result::Result<T, StorageError>;
