//! Page Node Data Structures
//!
//! This module defines the persisted `PageNode` entity: one row per tree
//! position. The node itself is a thin index: `path`/`depth`/`numchild`
//! encode its place in the hierarchy, `url_path` the denormalized route, and
//! the optional `content_type`/`page_id` pair points at the externally
//! stored "specific" object that carries the domain fields.
//!
//! # Denormalized columns
//!
//! `depth`, `numchild` and `url_path` are all derivable from `path` plus the
//! slugs along it. They are kept as columns so that ancestry, child counts
//! and routing never need recursive queries; the mutation layer keeps them
//! consistent, and `fix_tree` can rebuild them from scratch.

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use thiserror::Error;

use crate::models::StatusFlags;
use crate::path;

/// Validation errors for page node input
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid slug: {0:?} (lowercase letters, digits, '-' and '_' only)")]
    InvalidSlug(String),

    #[error("Title must not be blank")]
    BlankTitle,
}

fn slug_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[a-z0-9_-]+$").expect("slug pattern is valid"))
}

/// Check that a slug is URL-safe: non-empty, lowercase ASCII alphanumerics
/// plus `-` and `_`.
pub fn validate_slug(slug: &str) -> Result<(), ValidationError> {
    if slug_pattern().is_match(slug) {
        Ok(())
    } else {
        Err(ValidationError::InvalidSlug(slug.to_string()))
    }
}

/// Derive a URL-safe slug from a human title.
///
/// Lowercases, collapses every run of non-alphanumeric characters to a
/// single `-`, and trims leading/trailing separators.
pub fn slugify(title: &str) -> String {
    static SEPARATORS: OnceLock<Regex> = OnceLock::new();
    let separators =
        SEPARATORS.get_or_init(|| Regex::new(r"[^a-z0-9_]+").expect("separator pattern is valid"));
    let lowered = title.to_lowercase();
    separators
        .replace_all(&lowered, "-")
        .trim_matches('-')
        .to_string()
}

/// One row of the page tree.
///
/// A freshly constructed node has `pk == 0` (unsaved) and an empty `path`;
/// both are assigned when the node is persisted through the tree mutator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageNode {
    /// Store-assigned identity; 0 until the row is inserted
    #[serde(default)]
    pub pk: i64,

    /// Human label
    pub title: String,

    /// URL-safe label, unique per `(slug, depth)`
    pub slug: String,

    /// Materialized path: one fixed-width segment per level, root first
    #[serde(default)]
    pub path: String,

    /// Number of ancestors (root = 0); always `path.len() / STEP_LEN - 1`
    #[serde(default)]
    pub depth: u32,

    /// Denormalized count of direct children
    #[serde(default)]
    pub numchild: u32,

    /// Denormalized route: parent `url_path` + "/" + `slug`
    #[serde(default)]
    pub url_path: String,

    /// Lifecycle bitmask
    #[serde(default)]
    pub status: StatusFlags,

    /// Identity of the bound specific object, if any
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub page_id: Option<i64>,

    /// Content type of the bound specific object, if any
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub content_type: Option<String>,

    /// Latest editorial revision, if revisions are tracked for this node
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub latest_revision_id: Option<i64>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last modification timestamp
    pub updated_at: DateTime<Utc>,
}

impl PageNode {
    /// Create an unsaved node with a slug derived from the title.
    pub fn new(title: impl Into<String>) -> Self {
        let title = title.into();
        let slug = slugify(&title);
        Self::with_slug(title, slug)
    }

    /// Create an unsaved node with an explicit slug.
    pub fn with_slug(title: impl Into<String>, slug: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            pk: 0,
            title: title.into(),
            slug: slug.into(),
            path: String::new(),
            depth: 0,
            numchild: 0,
            url_path: String::new(),
            status: StatusFlags::empty(),
            page_id: None,
            content_type: None,
            latest_revision_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Attach a specific object reference (content type + external id).
    pub fn with_specific(mut self, content_type: impl Into<String>, page_id: i64) -> Self {
        self.content_type = Some(content_type.into());
        self.page_id = Some(page_id);
        self
    }

    /// True for depth-0 nodes (one path segment, no parent).
    pub fn is_root(&self) -> bool {
        self.depth == 0
    }

    /// Path prefix of the direct parent, or `None` for roots.
    pub fn parent_path(&self) -> Option<&str> {
        path::parent_path(&self.path).ok().flatten()
    }

    /// True if `self` lies strictly inside the subtree rooted at `other_path`.
    pub fn is_descendant_of(&self, other_path: &str) -> bool {
        self.path.len() > other_path.len() && self.path.starts_with(other_path)
    }

    /// Validate the fields a caller controls before any store access.
    pub fn validate_input(&self) -> Result<(), ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::BlankTitle);
        }
        validate_slug(&self.slug)?;
        Ok(())
    }

    /// The denormalized route for this node given its parent's route.
    ///
    /// Roots hang off the empty prefix, so every `url_path` starts with "/".
    pub fn derive_url_path(parent_url_path: &str, slug: &str) -> String {
        format!("{}/{}", parent_url_path, slug)
    }
}

/// Persisted columns of [`PageNode`].
///
/// Used to name the columns a bulk update writes, replacing the original
/// system's runtime struct reflection with a compile-time table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Title,
    Slug,
    Path,
    Depth,
    Numchild,
    UrlPath,
    Status,
    PageId,
    ContentType,
    LatestRevisionId,
    UpdatedAt,
}

/// A field value lifted out of a node through its descriptor.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Str(String),
    Int(i64),
    OptInt(Option<i64>),
    OptStr(Option<String>),
    Time(DateTime<Utc>),
}

/// Descriptor tying a [`Field`] to its column name and accessor.
pub struct FieldDescriptor {
    pub field: Field,
    pub column: &'static str,
    pub get: fn(&PageNode) -> FieldValue,
}

/// Compile-time field-descriptor table for [`PageNode`].
pub const FIELDS: &[FieldDescriptor] = &[
    FieldDescriptor {
        field: Field::Title,
        column: "title",
        get: |n| FieldValue::Str(n.title.clone()),
    },
    FieldDescriptor {
        field: Field::Slug,
        column: "slug",
        get: |n| FieldValue::Str(n.slug.clone()),
    },
    FieldDescriptor {
        field: Field::Path,
        column: "path",
        get: |n| FieldValue::Str(n.path.clone()),
    },
    FieldDescriptor {
        field: Field::Depth,
        column: "depth",
        get: |n| FieldValue::Int(n.depth as i64),
    },
    FieldDescriptor {
        field: Field::Numchild,
        column: "numchild",
        get: |n| FieldValue::Int(n.numchild as i64),
    },
    FieldDescriptor {
        field: Field::UrlPath,
        column: "url_path",
        get: |n| FieldValue::Str(n.url_path.clone()),
    },
    FieldDescriptor {
        field: Field::Status,
        column: "status_flags",
        get: |n| FieldValue::Int(n.status.0 as i64),
    },
    FieldDescriptor {
        field: Field::PageId,
        column: "page_id",
        get: |n| FieldValue::OptInt(n.page_id),
    },
    FieldDescriptor {
        field: Field::ContentType,
        column: "content_type",
        get: |n| FieldValue::OptStr(n.content_type.clone()),
    },
    FieldDescriptor {
        field: Field::LatestRevisionId,
        column: "latest_revision_id",
        get: |n| FieldValue::OptInt(n.latest_revision_id),
    },
    FieldDescriptor {
        field: Field::UpdatedAt,
        column: "updated_at",
        get: |n| FieldValue::Time(n.updated_at),
    },
];

impl Field {
    /// Column name for this field.
    pub fn column(self) -> &'static str {
        FIELDS
            .iter()
            .find(|d| d.field == self)
            .map(|d| d.column)
            .unwrap_or("?")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Hello World"), "hello-world");
        assert_eq!(slugify("  About Us!  "), "about-us");
        assert_eq!(slugify("already-good"), "already-good");
    }

    #[test]
    fn test_validate_slug() {
        assert!(validate_slug("home").is_ok());
        assert!(validate_slug("team_a-2").is_ok());
        assert!(validate_slug("").is_err());
        assert!(validate_slug("Has Spaces").is_err());
        assert!(validate_slug("Upper").is_err());
    }

    #[test]
    fn test_new_node_is_unsaved() {
        let node = PageNode::new("About Us");
        assert_eq!(node.pk, 0);
        assert_eq!(node.path, "");
        assert_eq!(node.slug, "about-us");
        assert!(node.validate_input().is_ok());
    }

    #[test]
    fn test_validate_input_rejects_blank_title() {
        let node = PageNode::with_slug("   ", "blank");
        assert_eq!(node.validate_input(), Err(ValidationError::BlankTitle));
    }

    #[test]
    fn test_is_descendant_of() {
        let mut node = PageNode::new("Leaf");
        node.path = "001002003".to_string();
        node.depth = 2;
        assert!(node.is_descendant_of("001"));
        assert!(node.is_descendant_of("001002"));
        assert!(!node.is_descendant_of("001002003"));
        assert!(!node.is_descendant_of("002"));
    }

    #[test]
    fn test_field_descriptor_accessors() {
        let mut node = PageNode::new("Home");
        node.path = "001".to_string();
        node.numchild = 3;

        let descriptor = FIELDS.iter().find(|d| d.field == Field::Path).unwrap();
        assert_eq!(descriptor.column, "path");
        assert_eq!((descriptor.get)(&node), FieldValue::Str("001".to_string()));

        let descriptor = FIELDS.iter().find(|d| d.field == Field::Numchild).unwrap();
        assert_eq!((descriptor.get)(&node), FieldValue::Int(3));
    }

    #[test]
    fn test_derive_url_path() {
        assert_eq!(PageNode::derive_url_path("", "home"), "/home");
        assert_eq!(PageNode::derive_url_path("/home", "news"), "/home/news");
    }
}
