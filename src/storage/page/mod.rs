//! Page types and layout.
//!
//! This module contains:
//! - [`Page`] - The raw 512-byte data container
//! - [`codec`] - The fixed node layout inside a page

pub mod codec;
#[allow(clippy::module_inception)]
mod page;

pub use page::Page;
