//! SQLite backend for the token sale engine.
//!
//! [`SqliteDatabase`] implements the [`crate::traits`] contracts over a connection pool. The
//! low-level statements live in [`db`] as plain functions over `&mut SqliteConnection`, so they
//! compose under a pooled connection or a transaction as the caller requires.
pub mod db;
mod sqlite_impl;

pub use sqlite_impl::SqliteDatabase;
