//! Path expressions addressing a field inside a document
//!
//! A path is `/segment(/segment)*` where each segment is
//! `[prefix:]name[<>|<n>|{key}]`. The final segment may instead be an
//! attribute, `@[prefix:]name`, written either on its own (`/id/@custId`) or
//! glued to the owning element (`/id@custId`). Both spellings parse to the same
//! addressing and each formats back to the spelling it was parsed from.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Separator between path segments.
pub const PATH_SEPARATOR: char = '/';

/// Marker introducing an attribute segment.
pub const ATTRIBUTE_MARKER: char = '@';

/// Upper bound (exclusive) on any collection index or row count
pub const MAX_INDEX: u32 = 1_000_000;

/// Errors raised while parsing or assembling a path
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    #[error("Malformed path '{path}': {reason}")]
    Malformed { path: String, reason: String },
}

impl PathError {
    /// Build a malformed-path error with the offending input.
    pub fn malformed(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Malformed {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// How a segment repeats within its parent
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Repetition {
    /// Plain, non-repeating segment
    #[default]
    None,
    /// `name<>`: every element of the collection
    Unindexed,
    /// `name<n>`: one element by zero-based position
    Indexed(u32),
    /// `name{key}`: keyed map entry; an empty key addresses every entry
    MapKeyed(String),
}

impl Repetition {
    /// True for any repeating form.
    #[must_use]
    pub fn is_collection(&self) -> bool {
        !matches!(self, Self::None)
    }

    /// Position carried by an indexed repetition.
    #[must_use]
    pub fn index(&self) -> Option<u32> {
        match self {
            Self::Indexed(index) => Some(*index),
            _ => None,
        }
    }
}

/// One step of a path
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PathSegment {
    /// Local name
    pub name: String,

    /// Namespace prefix, if written as `prefix:name`
    pub namespace_prefix: Option<String>,

    /// Repetition marker
    pub repetition: Repetition,

    /// Whether this segment names an attribute
    pub is_attribute: bool,

    /// Attribute spelled glued to its element (`id@custId`)
    pub joined: bool,
}

impl PathSegment {
    /// Create a plain element segment.
    pub fn element(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace_prefix: None,
            repetition: Repetition::None,
            is_attribute: false,
            joined: false,
        }
    }

    /// Create an attribute segment.
    pub fn attribute(name: impl Into<String>) -> Self {
        Self {
            is_attribute: true,
            ..Self::element(name)
        }
    }

    /// Set the namespace prefix.
    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.namespace_prefix = Some(prefix.into());
        self
    }

    /// Set the repetition marker.
    #[must_use]
    pub fn with_repetition(mut self, repetition: Repetition) -> Self {
        self.repetition = repetition;
        self
    }

    /// Position carried by an indexed repetition.
    #[must_use]
    pub fn index(&self) -> Option<u32> {
        self.repetition.index()
    }

    /// Name including the namespace prefix, e.g. `x:order`.
    #[must_use]
    pub fn qualified_name(&self) -> String {
        match &self.namespace_prefix {
            Some(prefix) => format!("{prefix}:{}", self.name),
            None => self.name.clone(),
        }
    }

    /// Same node addressing, ignoring repetition and spelling.
    #[must_use]
    pub fn same_node(&self, other: &PathSegment) -> bool {
        self.name == other.name
            && self.namespace_prefix == other.namespace_prefix
            && self.is_attribute == other.is_attribute
    }
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_attribute {
            return write!(f, "{ATTRIBUTE_MARKER}{}", self.qualified_name());
        }
        write!(f, "{}", self.qualified_name())?;
        match &self.repetition {
            Repetition::None => Ok(()),
            Repetition::Unindexed => write!(f, "<>"),
            Repetition::Indexed(index) => write!(f, "<{index}>"),
            Repetition::MapKeyed(key) => write!(f, "{{{key}}}"),
        }
    }
}

/// A parsed path: a non-empty sequence of segments, the first of which
/// denotes the document root
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Path {
    segments: Vec<PathSegment>,
}

impl Path {
    /// Build a path from segments, enforcing the structural rules.
    ///
    /// # Errors
    ///
    /// Returns `PathError::Malformed` for an empty sequence, an empty segment
    /// name, or an attribute that is not the final segment.
    pub fn new(segments: Vec<PathSegment>) -> Result<Self, PathError> {
        let path = Self { segments };
        path.check()?;
        Ok(path)
    }

    /// Parse the textual form.
    ///
    /// # Errors
    ///
    /// Returns `PathError::Malformed` when the grammar is violated.
    pub fn parse(input: &str) -> Result<Self, PathError> {
        let Some(body) = input.strip_prefix(PATH_SEPARATOR) else {
            return Err(PathError::malformed(input, "path must start with '/'"));
        };

        let mut segments = Vec::new();
        for raw in body.split(PATH_SEPARATOR) {
            if raw.is_empty() {
                return Err(PathError::malformed(input, "empty segment name"));
            }
            if let Some(attribute) = raw.strip_prefix(ATTRIBUTE_MARKER) {
                segments.push(parse_attribute(input, attribute, false)?);
                continue;
            }
            match raw.split_once(ATTRIBUTE_MARKER) {
                Some((element, attribute)) => {
                    segments.push(parse_element(input, element)?);
                    segments.push(parse_attribute(input, attribute, true)?);
                }
                None => segments.push(parse_element(input, raw)?),
            }
        }

        let path = Self { segments };
        path.check().map_err(|_| {
            PathError::malformed(input, "attribute marker is only allowed on the final segment")
        })?;
        Ok(path)
    }

    fn check(&self) -> Result<(), PathError> {
        if self.segments.is_empty() {
            return Err(PathError::malformed("", "path has no segments"));
        }
        let last = self.segments.len() - 1;
        for (position, segment) in self.segments.iter().enumerate() {
            if segment.name.is_empty() {
                return Err(PathError::malformed(self.format(), "empty segment name"));
            }
            if segment.is_attribute && position != last {
                return Err(PathError::malformed(
                    self.format(),
                    "attribute marker is only allowed on the final segment",
                ));
            }
            if segment.is_attribute && segment.repetition.is_collection() {
                return Err(PathError::malformed(
                    self.format(),
                    "attribute segments cannot repeat",
                ));
            }
        }
        Ok(())
    }

    /// Render the textual form; the exact inverse of [`Path::parse`].
    #[must_use]
    pub fn format(&self) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            if !(segment.is_attribute && segment.joined) {
                out.push(PATH_SEPARATOR);
            }
            out.push_str(&segment.to_string());
        }
        out
    }

    /// All segments, root first.
    #[must_use]
    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// The segment denoting the document root.
    #[must_use]
    pub fn root(&self) -> &PathSegment {
        &self.segments[0]
    }

    /// The final segment.
    #[must_use]
    pub fn last_segment(&self) -> &PathSegment {
        &self.segments[self.segments.len() - 1]
    }

    /// Number of segments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Always false: paths hold at least one segment.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Whether the path ends in an attribute.
    #[must_use]
    pub fn is_attribute(&self) -> bool {
        self.last_segment().is_attribute
    }

    /// Whether any segment repeats.
    #[must_use]
    pub fn has_collection(&self) -> bool {
        self.segments.iter().any(|s| s.repetition.is_collection())
    }

    /// Whether the path repeats and every repeating segment is indexed.
    #[must_use]
    pub fn is_indexed_collection(&self) -> bool {
        self.has_collection()
            && self
                .segments
                .iter()
                .filter(|s| s.repetition.is_collection())
                .all(|s| matches!(s.repetition, Repetition::Indexed(_)))
    }

    /// Position of the first repeating segment.
    #[must_use]
    pub fn collection_position(&self) -> Option<usize> {
        self.segments
            .iter()
            .position(|s| s.repetition.is_collection())
    }

    /// Position of the last repeating segment.
    #[must_use]
    pub fn last_collection_position(&self) -> Option<usize> {
        self.segments
            .iter()
            .rposition(|s| s.repetition.is_collection())
    }

    /// Index carried by the segment at `position`, if it is indexed.
    #[must_use]
    pub fn index_of(&self, position: usize) -> Option<u32> {
        self.segments.get(position).and_then(PathSegment::index)
    }

    /// A copy of this path with `segment` appended.
    ///
    /// # Errors
    ///
    /// Fails when this path already ends in an attribute, or the new segment
    /// is itself malformed.
    pub fn with_appended_segment(&self, segment: PathSegment) -> Result<Self, PathError> {
        let mut segments = self.segments.clone();
        segments.push(segment);
        Self::new(segments)
    }

    /// A copy with the repetition at `position` replaced.
    #[must_use]
    pub fn with_repetition(&self, position: usize, repetition: Repetition) -> Self {
        let mut path = self.clone();
        if let Some(segment) = path.segments.get_mut(position) {
            segment.repetition = repetition;
        }
        path
    }

    /// A copy with the segment at `position` indexed as `index`.
    #[must_use]
    pub fn with_index(&self, position: usize, index: u32) -> Self {
        self.with_repetition(position, Repetition::Indexed(index))
    }

    /// The path without its final segment, if any remains.
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        if self.segments.len() < 2 {
            return None;
        }
        Some(Self {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        })
    }

    /// Whether `prefix` addresses an ancestor-or-self of this path, ignoring
    /// repetition markers.
    #[must_use]
    pub fn starts_with_nodes(&self, prefix: &Path) -> bool {
        prefix.len() <= self.len()
            && prefix
                .segments
                .iter()
                .zip(&self.segments)
                .all(|(a, b)| a.same_node(b))
    }

    /// Rewrite the segment addressed by `collection`'s last segment to
    /// `<index>`, if this path lies beneath that collection.
    #[must_use]
    pub fn with_collection_index(&self, collection: &Path, index: u32) -> Option<Self> {
        if !self.starts_with_nodes(collection) {
            return None;
        }
        let position = collection.len() - 1;
        if !self.segments[position].repetition.is_collection() {
            return None;
        }
        Some(self.with_index(position, index))
    }

    /// The index to use for a newly materialized sibling: one past the
    /// largest existing index, or zero when there is none.
    #[must_use]
    pub fn next_vacant_index(existing_sibling_indices: &[u32]) -> u32 {
        existing_sibling_indices
            .iter()
            .max()
            .map_or(0, |max| max.saturating_add(1))
    }
}

fn parse_element(input: &str, raw: &str) -> Result<PathSegment, PathError> {
    let (head, repetition) = split_repetition(input, raw)?;
    let (prefix, name) = split_prefix(input, head)?;
    Ok(PathSegment {
        name: name.to_string(),
        namespace_prefix: prefix.map(str::to_string),
        repetition,
        is_attribute: false,
        joined: false,
    })
}

fn parse_attribute(input: &str, raw: &str, joined: bool) -> Result<PathSegment, PathError> {
    if raw.contains(['<', '>', '{', '}']) {
        return Err(PathError::malformed(
            input,
            "attribute segments cannot repeat",
        ));
    }
    if raw.contains(ATTRIBUTE_MARKER) {
        return Err(PathError::malformed(input, "duplicate attribute marker"));
    }
    let (prefix, name) = split_prefix(input, raw)?;
    Ok(PathSegment {
        name: name.to_string(),
        namespace_prefix: prefix.map(str::to_string),
        repetition: Repetition::None,
        is_attribute: true,
        joined,
    })
}

fn split_repetition<'a>(input: &str, raw: &'a str) -> Result<(&'a str, Repetition), PathError> {
    let (head, repetition) = if let Some(stripped) = raw.strip_suffix('>') {
        let open = stripped
            .rfind('<')
            .ok_or_else(|| PathError::malformed(input, "unbalanced '>'"))?;
        let inner = &stripped[open + 1..];
        (&stripped[..open], parse_index(input, inner)?)
    } else if let Some(stripped) = raw.strip_suffix('}') {
        let open = stripped
            .rfind('{')
            .ok_or_else(|| PathError::malformed(input, "unbalanced '}'"))?;
        let key = &stripped[open + 1..];
        (&stripped[..open], Repetition::MapKeyed(key.to_string()))
    } else {
        (raw, Repetition::None)
    };

    if head.contains(['<', '>', '{', '}']) {
        return Err(PathError::malformed(input, "misplaced repetition marker"));
    }
    Ok((head, repetition))
}

fn parse_index(input: &str, inner: &str) -> Result<Repetition, PathError> {
    if inner.is_empty() {
        return Ok(Repetition::Unindexed);
    }
    if !inner.chars().all(|c| c.is_ascii_digit()) || (inner.len() > 1 && inner.starts_with('0'))
    {
        return Err(PathError::malformed(
            input,
            format!("unparsable index '{inner}'"),
        ));
    }
    inner
        .parse::<u32>()
        .map(Repetition::Indexed)
        .map_err(|_| PathError::malformed(input, format!("unparsable index '{inner}'")))
}

fn split_prefix<'a>(input: &str, raw: &'a str) -> Result<(Option<&'a str>, &'a str), PathError> {
    match raw.split_once(':') {
        Some((prefix, name)) => {
            if prefix.is_empty() || name.is_empty() || name.contains(':') {
                return Err(PathError::malformed(
                    input,
                    format!("invalid qualified name '{raw}'"),
                ));
            }
            Ok((Some(prefix), name))
        }
        None if raw.is_empty() => Err(PathError::malformed(input, "empty segment name")),
        None => Ok((None, raw)),
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format())
    }
}

impl FromStr for Path {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Path {
    type Error = PathError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Path> for String {
    fn from(path: Path) -> Self {
        path.format()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let inputs = [
            "/orders",
            "/orders/order/id",
            "/orders/order<>/id",
            "/orders/order<0>/id",
            "/orders/order<12>/items<>/sku",
            "/contacts{}/name",
            "/contacts{home}/phone",
            "/x:orders/x:order/@x:totalCost",
            "/orders/order/id/@custId",
            "/orders/order/id@custId",
            "/ns:orders/ns:order<3>@ns:code",
            "/a-b/c_d/e.f",
        ];
        for input in inputs {
            let path = Path::parse(input).unwrap();
            assert_eq!(path.format(), input);
        }
    }

    #[test]
    fn test_parse_segments() {
        let path = Path::parse("/x:orders/order<2>/id@custId").unwrap();
        assert_eq!(path.len(), 4);

        let root = path.root();
        assert_eq!(root.name, "orders");
        assert_eq!(root.namespace_prefix.as_deref(), Some("x"));
        assert_eq!(path.segments()[1].repetition, Repetition::Indexed(2));

        let last = path.last_segment();
        assert!(last.is_attribute);
        assert!(last.joined);
        assert_eq!(last.name, "custId");
    }

    #[test]
    fn test_malformed_paths() {
        let inputs = [
            "",
            "orders",
            "/",
            "/orders//id",
            "/orders/@id/name",
            "/orders/order<x>",
            "/orders/order<-1>",
            "/orders/order<+1>",
            "/orders/order<01>",
            "/orders/order<99999999999>",
            "/orders/@id<1>",
            "/orders/:id",
            "/orders/x:",
            "/orders/or<1>der",
            "/orders/order>",
            "/orders/id@a@b",
        ];
        for input in inputs {
            let result = Path::parse(input);
            assert!(
                matches!(result, Err(PathError::Malformed { .. })),
                "expected malformed for {input:?}"
            );
        }
    }

    #[test]
    fn test_collection_queries() {
        let plain = Path::parse("/orders/order/id").unwrap();
        assert!(!plain.has_collection());
        assert!(!plain.is_indexed_collection());

        let unindexed = Path::parse("/orders/order<>/id").unwrap();
        assert!(unindexed.has_collection());
        assert!(!unindexed.is_indexed_collection());
        assert_eq!(unindexed.collection_position(), Some(1));

        let indexed = Path::parse("/orders/order<4>/id").unwrap();
        assert!(indexed.is_indexed_collection());
        assert_eq!(indexed.index_of(1), Some(4));
        assert_eq!(indexed.index_of(2), None);
    }

    #[test]
    fn test_with_appended_segment() {
        let path = Path::parse("/orders/order").unwrap();
        let extended = path
            .with_appended_segment(PathSegment::attribute("id"))
            .unwrap();
        assert_eq!(extended.format(), "/orders/order/@id");

        let result = extended.with_appended_segment(PathSegment::element("more"));
        assert!(result.is_err());
    }

    #[test]
    fn test_next_vacant_index() {
        assert_eq!(Path::next_vacant_index(&[]), 0);
        assert_eq!(Path::next_vacant_index(&[0, 1, 2]), 3);
        assert_eq!(Path::next_vacant_index(&[5, 1]), 6);
    }

    #[test]
    fn test_with_collection_index() {
        let collection = Path::parse("/orders/order<>").unwrap();
        let nested = Path::parse("/orders/order<>/id").unwrap();
        let rewritten = nested.with_collection_index(&collection, 3).unwrap();
        assert_eq!(rewritten.format(), "/orders/order<3>/id");

        let unrelated = Path::parse("/customers/customer/id").unwrap();
        assert!(unrelated.with_collection_index(&collection, 0).is_none());
    }

    #[test]
    fn test_parent() {
        let path = Path::parse("/orders/order/@id").unwrap();
        assert_eq!(path.parent().unwrap().format(), "/orders/order");
        assert!(Path::parse("/orders").unwrap().parent().is_none());
    }

    #[test]
    fn test_serde_as_string() {
        let path = Path::parse("/orders/order<>/id").unwrap();
        let json = serde_json::to_string(&path).unwrap();
        assert_eq!(json, "\"/orders/order<>/id\"");

        let back: Path = serde_json::from_str(&json).unwrap();
        assert_eq!(back, path);

        let bad: Result<Path, _> = serde_json::from_str("\"/orders//id\"");
        assert!(bad.is_err());
    }
}
