//! Materialized Path Codec
//!
//! Every node's position in the tree is a single string column: one
//! fixed-width segment per ancestor level, root segment first. Lexicographic
//! order of full paths is pre-order traversal order, so ancestry, depth and
//! sibling rank are all derivable from the string alone, with no recursive joins.
//!
//! Segments are one-based zero-padded decimal numbers of [`STEP_LEN`]
//! characters: the first child of a node gets `"001"`, the second `"002"`,
//! and so on. One-based digits keep the all-zero segment unused, which makes
//! a truncated or corrupted path visually obvious in the database.

use thiserror::Error;

/// Fixed character width of one path segment.
///
/// Bounds the number of children per node to [`MAX_CHILDREN`].
pub const STEP_LEN: usize = 3;

/// Maximum number of children a single node can hold (999 for 3 decimal digits).
pub const MAX_CHILDREN: u32 = 10u32.pow(STEP_LEN as u32) - 1;

/// Path encoding/decoding errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    /// Sibling index does not fit in one fixed-width segment
    #[error("Sibling index {index} exceeds the {max} children one node can hold")]
    Overflow { index: u32, max: u32 },

    /// Path length is not a multiple of the segment width (or empty where forbidden)
    #[error("Invalid path length {len} for path {path:?}")]
    InvalidPathLength { path: String, len: usize },

    /// Segment contains characters outside the codec alphabet
    #[error("Malformed path segment {segment:?}")]
    MalformedSegment { segment: String },

    /// Asked for more ancestor levels than the path has
    #[error("Cannot go {levels_up} level(s) up from path {path:?}")]
    NoSuchAncestor { path: String, levels_up: u32 },
}

/// Encode a zero-based sibling index into one fixed-width path segment.
///
/// Lexicographic order of segments matches numeric order of indexes:
/// `encode(0) == "001"`, `encode(1) == "002"`, `encode(998) == "999"`.
pub fn encode(index: u32) -> Result<String, PathError> {
    if index >= MAX_CHILDREN {
        return Err(PathError::Overflow {
            index,
            max: MAX_CHILDREN,
        });
    }
    Ok(format!("{:0width$}", index + 1, width = STEP_LEN))
}

/// Decode one fixed-width segment back into its zero-based sibling index.
pub fn decode(segment: &str) -> Result<u32, PathError> {
    if segment.len() != STEP_LEN || !segment.bytes().all(|b| b.is_ascii_digit()) {
        return Err(PathError::MalformedSegment {
            segment: segment.to_string(),
        });
    }
    let value: u32 = segment.parse().map_err(|_| PathError::MalformedSegment {
        segment: segment.to_string(),
    })?;
    if value == 0 {
        // The all-zero segment is outside the one-based alphabet.
        return Err(PathError::MalformedSegment {
            segment: segment.to_string(),
        });
    }
    Ok(value - 1)
}

/// Validate that a path is non-empty and cut cleanly into whole segments.
pub fn validate(path: &str) -> Result<(), PathError> {
    if path.is_empty() || path.len() % STEP_LEN != 0 {
        return Err(PathError::InvalidPathLength {
            path: path.to_string(),
            len: path.len(),
        });
    }
    for segment in segments(path) {
        decode(segment)?;
    }
    Ok(())
}

/// Zero-based depth of a path: number of ancestors (root = 0).
pub fn depth_of(path: &str) -> Result<u32, PathError> {
    if path.is_empty() || path.len() % STEP_LEN != 0 {
        return Err(PathError::InvalidPathLength {
            path: path.to_string(),
            len: path.len(),
        });
    }
    Ok((path.len() / STEP_LEN - 1) as u32)
}

/// Path truncated by `levels_up` trailing segments.
///
/// `ancestor_path(p, 0)` is `p` itself; `ancestor_path(p, depth_of(p))` is
/// the root prefix. Fails when the path is a root (or too short) and
/// `levels_up >= 1`.
pub fn ancestor_path(path: &str, levels_up: u32) -> Result<&str, PathError> {
    let depth = depth_of(path)?;
    if levels_up > depth {
        return Err(PathError::NoSuchAncestor {
            path: path.to_string(),
            levels_up,
        });
    }
    let keep = path.len() - levels_up as usize * STEP_LEN;
    Ok(&path[..keep])
}

/// Direct parent prefix, or `None` for a root path.
pub fn parent_path(path: &str) -> Result<Option<&str>, PathError> {
    if depth_of(path)? == 0 {
        return Ok(None);
    }
    Ok(Some(&path[..path.len() - STEP_LEN]))
}

/// Append the segment for `child_index` to a (possibly empty, for roots) prefix.
pub fn child_path(parent: &str, child_index: u32) -> Result<String, PathError> {
    let segment = encode(child_index)?;
    let mut path = String::with_capacity(parent.len() + STEP_LEN);
    path.push_str(parent);
    path.push_str(&segment);
    Ok(path)
}

/// Iterate a path's segments root-first.
pub fn segments(path: &str) -> impl Iterator<Item = &str> {
    (0..path.len() / STEP_LEN).map(move |i| &path[i * STEP_LEN..(i + 1) * STEP_LEN])
}

/// All strict ancestor prefixes of a path, root-first.
pub fn ancestor_paths(path: &str) -> Result<Vec<String>, PathError> {
    let depth = depth_of(path)?;
    let mut out = Vec::with_capacity(depth as usize);
    for level in 1..=depth {
        out.push(path[..level as usize * STEP_LEN].to_string());
    }
    Ok(out)
}
