//! Data Models
//!
//! This module contains the persisted data structures of the page tree:
//!
//! - [`PageNode`] - one row per tree position (materialized path encoding)
//! - [`StatusFlags`] - lifecycle bitmask stored as a single integer column
//! - [`Field`] / [`FIELDS`] - compile-time column descriptors for bulk updates

mod page;
mod status;

pub use page::{
    slugify, validate_slug, Field, FieldDescriptor, FieldValue, PageNode, ValidationError, FIELDS,
};
pub use status::StatusFlags;
