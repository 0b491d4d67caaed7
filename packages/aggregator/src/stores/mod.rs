//! Seen-set storage backends.
//!
//! Available backends:
//! - `MemorySeenStore` - In-memory storage (always available)
//! - `SqliteSeenStore` - SQLite storage (requires `sqlite` feature)

pub mod memory;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use memory::MemorySeenStore;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteSeenStore;
