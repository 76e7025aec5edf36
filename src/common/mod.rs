//! Common types and utilities shared across pagetree.
//!
//! This module contains fundamental primitives used throughout the codebase:
//! - Configuration constants and [`TreeConfig`](config::TreeConfig)
//! - Error types
//! - [`PageId`]

pub mod config;
pub mod error;
mod page_id;

pub use error::{Result, StorageError, StorageResult, TreeError};
pub use page_id::PageId;
