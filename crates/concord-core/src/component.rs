//! The three primitive components of a text operation.

use crate::attributes::Attributes;

/// A single step of a text operation.
///
/// Lengths are measured in Unicode scalar values, never bytes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TextOperation {
    /// Skip over `count` characters, applying `attributes` to them.
    Retain { count: usize, attributes: Attributes },
    /// Insert `text` carrying `attributes`.
    Insert { text: String, attributes: Attributes },
    /// Remove `count` characters.
    Delete { count: usize },
}

impl TextOperation {
    /// Number of characters this component spans.
    pub fn len(&self) -> usize {
        match self {
            TextOperation::Retain { count, .. } | TextOperation::Delete { count } => *count,
            TextOperation::Insert { text, .. } => char_len(text),
        }
    }

    /// Components are never materialized with zero length.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether this keeps characters.
    pub fn is_retain(&self) -> bool {
        matches!(self, TextOperation::Retain { .. })
    }

    /// Whether this adds text.
    pub fn is_insert(&self) -> bool {
        matches!(self, TextOperation::Insert { .. })
    }

    /// Whether this removes characters.
    pub fn is_delete(&self) -> bool {
        matches!(self, TextOperation::Delete { .. })
    }

    /// The attribute map, if this kind of component carries one.
    pub fn attributes(&self) -> Option<&Attributes> {
        match self {
            TextOperation::Retain { attributes, .. } | TextOperation::Insert { attributes, .. } => {
                Some(attributes)
            }
            TextOperation::Delete { .. } => None,
        }
    }

    /// True for deletes and for components without formatting.
    pub fn has_empty_attributes(&self) -> bool {
        self.attributes().map_or(true, |attributes| attributes.is_empty())
    }
}

/// Character count of a string.
pub(crate) fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Split a string after `n` characters.
pub(crate) fn split_chars(text: &str, n: usize) -> (&str, &str) {
    let index = text
        .char_indices()
        .nth(n)
        .map(|(index, _)| index)
        .unwrap_or(text.len());
    text.split_at(index)
}
