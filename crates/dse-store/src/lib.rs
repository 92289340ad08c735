#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Store implementations for the DSE market data service.
//!
//! This crate implements the [`CacheStore`] and [`ArchiveStore`] traits from
//! `dse-core`:
//!
//! - [`SqliteStore`] - Persistent SQLite-backed store (default, requires the
//!   `sqlite` feature)
//! - [`MemoryStore`] - In-memory store for tests and no-persistence runs

/// In-memory store implementation.
pub mod memory;

/// SQLite-based store implementation.
#[cfg(feature = "sqlite")]
pub mod sqlite;

// Re-export the traits for convenience
pub use dse_core::{ArchiveStore, CacheStore};

// Re-export implementations
pub use memory::MemoryStore;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStore;
