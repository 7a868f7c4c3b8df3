//! Dotted/indexed references into a variable scope.
//!
//! A reference is a `.`-separated list of segments. Each segment is a key
//! optionally followed by one or more `[n]` indices, e.g. `data[1].msg[0]`.

use thiserror::Error;

use crate::vars::Variables;

/// Why a reference could not be resolved.
///
/// Callers of [`super::render`] never see this: both kinds leave the
/// placeholder as literal text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    /// The text is not a reference at all (e.g. `data[1` or `a..b`)
    #[error("not a valid reference: {0}")]
    Invalid(String),

    /// The reference is well formed but names nothing in scope
    #[error("reference not found: {0}")]
    NotFound(String),
}

/// One segment of a reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    /// Mapping key
    pub key: String,
    /// Sequence indices applied after the key lookup, in order
    pub indices: Vec<usize>,
}

/// A parsed reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    segments: Vec<Segment>,
}

impl Reference {
    /// Segments in lookup order.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Whether this is a plain top-level name.
    pub fn is_simple(&self) -> bool {
        self.segments.len() == 1 && self.segments[0].indices.is_empty()
    }
}

/// Identifier characters accepted in keys.
pub(crate) fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Parse `path` into a [`Reference`].
pub fn parse_reference(path: &str) -> Result<Reference, LookupError> {
    let invalid = || LookupError::Invalid(path.to_string());

    let mut segments = Vec::new();
    for part in path.split('.') {
        let (key, mut rest) = match part.find('[') {
            Some(pos) => (&part[..pos], &part[pos..]),
            None => (part, ""),
        };
        if key.is_empty() || !key.chars().all(is_ident_char) {
            return Err(invalid());
        }

        let mut indices = Vec::new();
        while !rest.is_empty() {
            let inner = rest.strip_prefix('[').ok_or_else(invalid)?;
            let close = inner.find(']').ok_or_else(invalid)?;
            let digits = &inner[..close];
            if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid());
            }
            indices.push(digits.parse().map_err(|_| invalid())?);
            rest = &inner[close + 1..];
        }

        segments.push(Segment {
            key: key.to_string(),
            indices,
        });
    }

    Ok(Reference { segments })
}

/// Resolve an already-parsed reference against `scope`.
pub fn resolve<'a>(
    reference: &Reference,
    scope: &'a Variables,
) -> Result<&'a serde_yaml::Value, LookupError> {
    let not_found = |segment: &Segment| LookupError::NotFound(segment.key.clone());

    let mut segments = reference.segments.iter();
    let first = segments
        .next()
        .ok_or_else(|| LookupError::Invalid(String::new()))?;

    let mut current = scope.get(&first.key).ok_or_else(|| not_found(first))?;
    current = apply_indices(current, first).ok_or_else(|| not_found(first))?;

    for segment in segments {
        current = match current {
            serde_yaml::Value::Mapping(map) => map
                .get(segment.key.as_str())
                .ok_or_else(|| not_found(segment))?,
            _ => return Err(not_found(segment)),
        };
        current = apply_indices(current, segment).ok_or_else(|| not_found(segment))?;
    }

    Ok(current)
}

fn apply_indices<'a>(
    mut value: &'a serde_yaml::Value,
    segment: &Segment,
) -> Option<&'a serde_yaml::Value> {
    for &index in &segment.indices {
        // Only a real sequence may be indexed; a mapping with integer keys
        // does not count.
        value = match value {
            serde_yaml::Value::Sequence(items) => items.get(index)?,
            _ => return None,
        };
    }
    Some(value)
}

/// Look up a dotted/indexed `path` in `scope`.
pub fn lookup<'a>(path: &str, scope: &'a Variables) -> Result<&'a serde_yaml::Value, LookupError> {
    let reference = parse_reference(path)?;
    resolve(&reference, scope)
}
