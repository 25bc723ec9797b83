//! Plain text operations - the OT algebra.
//!
//! An operation is an ordered list of [`TextOperation`] components that walks
//! a document from left to right. It knows the length of the documents it can
//! be applied to (`base_length`) and the length of the result
//! (`target_length`).
//!
//! Components are kept in canonical form as they are built:
//! - adjacent components of the same kind with equal attributes are merged
//! - an insert that follows a delete is placed before it
//! - zero-length components are never stored
//!
//! so two operations with the same effect compare equal.
//!
//! # Laws
//!
//! ```text
//! apply(apply(S, A), B)  == apply(S, A.compose(B))
//! apply(apply(S, A), B') == apply(apply(S, B), A')   where (A', B') = A.transform(B)
//! apply(apply(S, A), A.invert(S)) == S
//! ```

use crate::attributes::{apply_attributes, compose_attributes, transform_attributes, Attributes};
use crate::component::{char_len, split_chars, TextOperation};
use crate::error::{OperationError, Result};
use std::cmp::Ordering;
use std::fmt;

/// A sequence of retain, insert and delete components.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PlainTextOperation {
    ops: Vec<TextOperation>,
    base_length: usize,
    target_length: usize,
}

impl PlainTextOperation {
    /// Create an empty operation (a no-op on the empty document).
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an operation from raw components, canonicalizing along the way.
    pub fn from_ops<I: IntoIterator<Item = TextOperation>>(ops: I) -> Self {
        let mut operation = Self::new();
        for op in ops {
            operation.push(op);
        }
        operation
    }

    /// Length of the documents this operation can be applied to.
    pub fn base_length(&self) -> usize {
        self.base_length
    }

    /// Length of the document after this operation has been applied.
    pub fn target_length(&self) -> usize {
        self.target_length
    }

    /// The canonical components.
    pub fn ops(&self) -> &[TextOperation] {
        &self.ops
    }

    // === Builders ===

    /// Skip over `count` characters.
    pub fn retain(mut self, count: usize) -> Self {
        self.push_retain(count, Attributes::new());
        self
    }

    /// Skip over `count` characters, updating their attributes.
    pub fn retain_with(mut self, count: usize, attributes: Attributes) -> Self {
        self.push_retain(count, attributes);
        self
    }

    /// Insert plain text at the current position.
    pub fn insert(mut self, text: &str) -> Self {
        self.push_insert(text, Attributes::new());
        self
    }

    /// Insert attributed text at the current position.
    pub fn insert_with(mut self, text: &str, attributes: Attributes) -> Self {
        self.push_insert(text, attributes);
        self
    }

    /// Delete `count` characters at the current position.
    pub fn delete(mut self, count: usize) -> Self {
        self.push_delete(count);
        self
    }

    /// Delete as many characters as `text` holds.
    pub fn delete_text(mut self, text: &str) -> Self {
        self.push_delete(char_len(text));
        self
    }

    pub(crate) fn push(&mut self, op: TextOperation) {
        match op {
            TextOperation::Retain { count, attributes } => self.push_retain(count, attributes),
            TextOperation::Insert { text, attributes } => self.push_insert(&text, attributes),
            TextOperation::Delete { count } => self.push_delete(count),
        }
    }

    pub(crate) fn push_retain(&mut self, count: usize, attributes: Attributes) {
        if count == 0 {
            return;
        }
        self.base_length += count;
        self.target_length += count;

        if let Some(TextOperation::Retain { count: prev, attributes: prev_attributes }) = self.ops.last_mut() {
            if *prev_attributes == attributes {
                *prev += count;
                return;
            }
        }
        self.ops.push(TextOperation::Retain { count, attributes });
    }

    pub(crate) fn push_insert(&mut self, text: &str, attributes: Attributes) {
        if text.is_empty() {
            return;
        }
        self.target_length += char_len(text);

        if let Some(TextOperation::Insert { text: prev, attributes: prev_attributes }) = self.ops.last_mut() {
            if *prev_attributes == attributes {
                prev.push_str(text);
                return;
            }
        }

        // Insert-before-delete at a shared position.
        let len = self.ops.len();
        if matches!(self.ops.last(), Some(TextOperation::Delete { .. })) {
            if len >= 2 {
                if let TextOperation::Insert { text: prev, attributes: prev_attributes } = &mut self.ops[len - 2] {
                    if *prev_attributes == attributes {
                        prev.push_str(text);
                        return;
                    }
                }
            }
            self.ops.insert(
                len - 1,
                TextOperation::Insert {
                    text: text.to_owned(),
                    attributes,
                },
            );
            return;
        }

        self.ops.push(TextOperation::Insert {
            text: text.to_owned(),
            attributes,
        });
    }

    pub(crate) fn push_delete(&mut self, count: usize) {
        if count == 0 {
            return;
        }
        self.base_length += count;

        if let Some(TextOperation::Delete { count: prev }) = self.ops.last_mut() {
            *prev += count;
            return;
        }
        self.ops.push(TextOperation::Delete { count });
    }

    // === Queries ===

    /// Whether applying this operation leaves every document unchanged.
    pub fn is_noop(&self) -> bool {
        match self.ops.as_slice() {
            [] => true,
            [op] => op.is_retain() && op.has_empty_attributes(),
            _ => false,
        }
    }

    // === Algebra ===

    /// Apply the operation to plain text.
    pub fn apply(&self, content: &str) -> Result<String> {
        self.apply_with_attributes(content, &[]).map(|(text, _)| text)
    }

    /// Apply the operation to text with per-character attributes.
    ///
    /// `attributes` may be shorter than `content`; missing entries count as
    /// empty. Returns the new text and one attribute map per character.
    pub fn apply_with_attributes(
        &self,
        content: &str,
        attributes: &[Attributes],
    ) -> Result<(String, Vec<Attributes>)> {
        let chars: Vec<char> = content.chars().collect();
        if chars.len() != self.base_length {
            return Err(OperationError::BaseLengthMismatch {
                expected: self.base_length,
                actual: chars.len(),
            });
        }

        let empty = Attributes::new();
        let mut output = String::with_capacity(content.len());
        let mut output_attributes = Vec::with_capacity(self.target_length);
        let mut index = 0;

        for op in &self.ops {
            match op {
                TextOperation::Retain { count, attributes: update } => {
                    if index + count > chars.len() {
                        return Err(OperationError::RetainPastEnd {
                            offset: index,
                            count: *count,
                            length: chars.len(),
                        });
                    }
                    output.extend(&chars[index..index + count]);
                    for k in index..index + count {
                        let current = attributes.get(k).unwrap_or(&empty);
                        output_attributes.push(apply_attributes(current, update));
                    }
                    index += count;
                }
                TextOperation::Insert { text, attributes: inserted } => {
                    output.push_str(text);
                    for _ in 0..char_len(text) {
                        output_attributes.push(apply_attributes(&empty, inserted));
                    }
                }
                TextOperation::Delete { count } => {
                    index += count;
                }
            }
        }

        if index != chars.len() {
            return Err(OperationError::IncompleteApply {
                consumed: index,
                length: chars.len(),
            });
        }

        Ok((output, output_attributes))
    }

    /// Compute the operation that reverts this one on `content`.
    ///
    /// `content` must be the document *before* this operation was applied;
    /// deletes are turned back into inserts of the text they removed.
    pub fn invert(&self, content: &str) -> Result<Self> {
        let chars: Vec<char> = content.chars().collect();
        if chars.len() != self.base_length {
            return Err(OperationError::BaseLengthMismatch {
                expected: self.base_length,
                actual: chars.len(),
            });
        }

        let mut inverse = Self::new();
        let mut index = 0;
        for op in &self.ops {
            match op {
                TextOperation::Retain { count, attributes } => {
                    inverse.push_retain(*count, attributes.clone());
                    index += count;
                }
                TextOperation::Insert { text, .. } => {
                    inverse.push_delete(char_len(text));
                }
                TextOperation::Delete { count } => {
                    let deleted: String = chars[index..index + count].iter().collect();
                    inverse.push_insert(&deleted, Attributes::new());
                    index += count;
                }
            }
        }
        Ok(inverse)
    }

    /// Combine this operation with one applied right after it.
    pub fn compose(&self, other: &Self) -> Result<Self> {
        if self.target_length != other.base_length {
            return Err(OperationError::ComposeLengthMismatch {
                target: self.target_length,
                base: other.base_length,
            });
        }

        let mut composed = Self::new();
        let mut ops1 = self.ops.iter().cloned();
        let mut ops2 = other.ops.iter().cloned();
        let mut op1 = ops1.next();
        let mut op2 = ops2.next();

        loop {
            if op1.is_none() && op2.is_none() {
                break;
            }

            if let Some(TextOperation::Delete { count }) = op1 {
                composed.push_delete(count);
                op1 = ops1.next();
                continue;
            }
            if let Some(TextOperation::Insert { text, attributes }) = &op2 {
                composed.push_insert(text, attributes.clone());
                op2 = ops2.next();
                continue;
            }

            let (a, b) = match (op1.take(), op2.take()) {
                (Some(a), Some(b)) => (a, b),
                (None, _) => return Err(OperationError::ComposeTooShort),
                (_, None) => return Err(OperationError::ComposeTooLong),
            };

            match (a, b) {
                (
                    TextOperation::Retain { count: n1, attributes: a1 },
                    TextOperation::Retain { count: n2, attributes: a2 },
                ) => {
                    let attributes = compose_attributes(&a1, &a2, false);
                    match n1.cmp(&n2) {
                        Ordering::Greater => {
                            composed.push_retain(n2, attributes);
                            op1 = Some(TextOperation::Retain { count: n1 - n2, attributes: a1 });
                            op2 = ops2.next();
                        }
                        Ordering::Equal => {
                            composed.push_retain(n1, attributes);
                            op1 = ops1.next();
                            op2 = ops2.next();
                        }
                        Ordering::Less => {
                            composed.push_retain(n1, attributes);
                            op1 = ops1.next();
                            op2 = Some(TextOperation::Retain { count: n2 - n1, attributes: a2 });
                        }
                    }
                }
                (TextOperation::Insert { text, attributes }, TextOperation::Delete { count }) => {
                    // Deleting freshly inserted text cancels out.
                    let len = char_len(&text);
                    match len.cmp(&count) {
                        Ordering::Greater => {
                            let (_, rest) = split_chars(&text, count);
                            op1 = Some(TextOperation::Insert {
                                text: rest.to_owned(),
                                attributes,
                            });
                            op2 = ops2.next();
                        }
                        Ordering::Equal => {
                            op1 = ops1.next();
                            op2 = ops2.next();
                        }
                        Ordering::Less => {
                            op1 = ops1.next();
                            op2 = Some(TextOperation::Delete { count: count - len });
                        }
                    }
                }
                (
                    TextOperation::Insert { text, attributes: a1 },
                    TextOperation::Retain { count, attributes: a2 },
                ) => {
                    let attributes = compose_attributes(&a1, &a2, true);
                    let len = char_len(&text);
                    match len.cmp(&count) {
                        Ordering::Greater => {
                            let (head, rest) = split_chars(&text, count);
                            composed.push_insert(head, attributes);
                            op1 = Some(TextOperation::Insert {
                                text: rest.to_owned(),
                                attributes: a1,
                            });
                            op2 = ops2.next();
                        }
                        Ordering::Equal => {
                            composed.push_insert(&text, attributes);
                            op1 = ops1.next();
                            op2 = ops2.next();
                        }
                        Ordering::Less => {
                            composed.push_insert(&text, attributes);
                            op1 = ops1.next();
                            op2 = Some(TextOperation::Retain { count: count - len, attributes: a2 });
                        }
                    }
                }
                (TextOperation::Retain { count: n1, attributes }, TextOperation::Delete { count: n2 }) => {
                    match n1.cmp(&n2) {
                        Ordering::Greater => {
                            composed.push_delete(n2);
                            op1 = Some(TextOperation::Retain { count: n1 - n2, attributes });
                            op2 = ops2.next();
                        }
                        Ordering::Equal => {
                            composed.push_delete(n2);
                            op1 = ops1.next();
                            op2 = ops2.next();
                        }
                        Ordering::Less => {
                            composed.push_delete(n1);
                            op1 = ops1.next();
                            op2 = Some(TextOperation::Delete { count: n2 - n1 });
                        }
                    }
                }
                (a, b) => {
                    return Err(OperationError::Incompatible(format!(
                        "cannot compose {:?} with {:?}",
                        a, b
                    )))
                }
            }
        }

        Ok(composed)
    }

    /// Rebase two concurrent operations against each other.
    ///
    /// Returns `(self', other')` such that applying `self` then `other'`
    /// yields the same document as applying `other` then `self'`. When both
    /// sides insert at the same offset, `self`'s text ends up first.
    pub fn transform(&self, other: &Self) -> Result<(Self, Self)> {
        if self.base_length != other.base_length {
            return Err(OperationError::TransformLengthMismatch {
                left: self.base_length,
                right: other.base_length,
            });
        }

        let mut prime1 = Self::new();
        let mut prime2 = Self::new();
        let mut ops1 = self.ops.iter().cloned();
        let mut ops2 = other.ops.iter().cloned();
        let mut op1 = ops1.next();
        let mut op2 = ops2.next();

        loop {
            if op1.is_none() && op2.is_none() {
                break;
            }

            // Tie-break: this side's insert goes first.
            if let Some(TextOperation::Insert { text, attributes }) = &op1 {
                prime1.push_insert(text, attributes.clone());
                prime2.push_retain(char_len(text), Attributes::new());
                op1 = ops1.next();
                continue;
            }
            if let Some(TextOperation::Insert { text, attributes }) = &op2 {
                prime1.push_retain(char_len(text), Attributes::new());
                prime2.push_insert(text, attributes.clone());
                op2 = ops2.next();
                continue;
            }

            let (a, b) = match (op1.take(), op2.take()) {
                (Some(a), Some(b)) => (a, b),
                (None, _) => return Err(OperationError::TransformTooShort),
                (_, None) => return Err(OperationError::TransformTooLong),
            };

            match (a, b) {
                (
                    TextOperation::Retain { count: n1, attributes: a1 },
                    TextOperation::Retain { count: n2, attributes: a2 },
                ) => {
                    let (a1_prime, a2_prime) = transform_attributes(&a1, &a2);
                    let min = match n1.cmp(&n2) {
                        Ordering::Greater => {
                            op1 = Some(TextOperation::Retain { count: n1 - n2, attributes: a1 });
                            op2 = ops2.next();
                            n2
                        }
                        Ordering::Equal => {
                            op1 = ops1.next();
                            op2 = ops2.next();
                            n2
                        }
                        Ordering::Less => {
                            op1 = ops1.next();
                            op2 = Some(TextOperation::Retain { count: n2 - n1, attributes: a2 });
                            n1
                        }
                    };
                    prime1.push_retain(min, a1_prime);
                    prime2.push_retain(min, a2_prime);
                }
                (TextOperation::Delete { count: n1 }, TextOperation::Delete { count: n2 }) => {
                    // Both sides removed the same text; nothing left to do.
                    match n1.cmp(&n2) {
                        Ordering::Greater => {
                            op1 = Some(TextOperation::Delete { count: n1 - n2 });
                            op2 = ops2.next();
                        }
                        Ordering::Equal => {
                            op1 = ops1.next();
                            op2 = ops2.next();
                        }
                        Ordering::Less => {
                            op1 = ops1.next();
                            op2 = Some(TextOperation::Delete { count: n2 - n1 });
                        }
                    }
                }
                (TextOperation::Delete { count: n1 }, TextOperation::Retain { count: n2, attributes }) => {
                    let min = match n1.cmp(&n2) {
                        Ordering::Greater => {
                            op1 = Some(TextOperation::Delete { count: n1 - n2 });
                            op2 = ops2.next();
                            n2
                        }
                        Ordering::Equal => {
                            op1 = ops1.next();
                            op2 = ops2.next();
                            n2
                        }
                        Ordering::Less => {
                            op1 = ops1.next();
                            op2 = Some(TextOperation::Retain { count: n2 - n1, attributes });
                            n1
                        }
                    };
                    prime1.push_delete(min);
                }
                (TextOperation::Retain { count: n1, attributes }, TextOperation::Delete { count: n2 }) => {
                    let min = match n1.cmp(&n2) {
                        Ordering::Greater => {
                            op1 = Some(TextOperation::Retain { count: n1 - n2, attributes });
                            op2 = ops2.next();
                            n2
                        }
                        Ordering::Equal => {
                            op1 = ops1.next();
                            op2 = ops2.next();
                            n1
                        }
                        Ordering::Less => {
                            op1 = ops1.next();
                            op2 = Some(TextOperation::Delete { count: n2 - n1 });
                            n1
                        }
                    };
                    prime2.push_delete(min);
                }
                (a, b) => {
                    return Err(OperationError::Incompatible(format!(
                        "cannot transform {:?} against {:?}",
                        a, b
                    )))
                }
            }
        }

        Ok((prime1, prime2))
    }

    // === Undo grouping heuristics ===

    /// The single non-retain effect of the operation, if it has exactly one.
    fn simple_op(&self) -> Option<&TextOperation> {
        match self.ops.as_slice() {
            [op] => Some(op),
            [first, second] => {
                if first.is_retain() {
                    Some(second)
                } else if second.is_retain() {
                    Some(first)
                } else {
                    None
                }
            }
            [first, op, last] if first.is_retain() && last.is_retain() => Some(op),
            _ => None,
        }
    }

    /// Offset at which the operation starts to have an effect.
    fn start_index(&self) -> usize {
        match self.ops.first() {
            Some(TextOperation::Retain { count, .. }) => *count,
            _ => 0,
        }
    }

    /// Whether `other`, applied right after this operation, belongs in the
    /// same undo step (consecutive typing or deleting).
    pub fn should_be_composed_with(&self, other: &Self) -> bool {
        if self.is_noop() || other.is_noop() {
            return true;
        }

        let start_a = self.start_index();
        let start_b = other.start_index();
        let (Some(simple_a), Some(simple_b)) = (self.simple_op(), other.simple_op()) else {
            return false;
        };

        match (simple_a, simple_b) {
            (TextOperation::Insert { text, .. }, TextOperation::Insert { .. }) => {
                start_a + char_len(text) == start_b
            }
            // Backspace walks left, the delete key stays put.
            (TextOperation::Delete { .. }, TextOperation::Delete { count }) => {
                start_b + count == start_a || start_a == start_b
            }
            _ => false,
        }
    }

    /// Like [`should_be_composed_with`](Self::should_be_composed_with) but for
    /// inverses, which the undo stack stores in place of the edits themselves.
    pub fn should_be_composed_with_inverted(&self, other: &Self) -> bool {
        if self.is_noop() || other.is_noop() {
            return true;
        }

        let start_a = self.start_index();
        let start_b = other.start_index();
        let (Some(simple_a), Some(simple_b)) = (self.simple_op(), other.simple_op()) else {
            return false;
        };

        match (simple_a, simple_b) {
            (TextOperation::Insert { text, .. }, TextOperation::Insert { .. }) => {
                start_a + char_len(text) == start_b || start_a == start_b
            }
            (TextOperation::Delete { .. }, TextOperation::Delete { count }) => start_b + count == start_a,
            _ => false,
        }
    }
}

impl fmt::Display for PlainTextOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.ops.is_empty() {
            return write!(f, "noop");
        }
        for (i, op) in self.ops.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            match op {
                TextOperation::Retain { count, .. } => write!(f, "retain {}", count)?,
                TextOperation::Insert { text, .. } => write!(f, "insert '{}'", text)?,
                TextOperation::Delete { count } => write!(f, "delete {}", count)?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn bold() -> Attributes {
        let mut attributes = Attributes::new();
        attributes.insert("bold".to_string(), json!(true));
        attributes
    }

    #[test]
    fn test_lengths() {
        let op = PlainTextOperation::new().retain(5).insert("abc").delete(2).retain(1);
        assert_eq!(op.base_length(), 8);
        assert_eq!(op.target_length(), 9);
    }

    #[test]
    fn test_adjacent_components_merge() {
        let op = PlainTextOperation::new()
            .retain(2)
            .retain(3)
            .insert("a")
            .insert("b")
            .delete(1)
            .delete(2);
        assert_eq!(op.ops().len(), 3);
        assert_eq!(op, PlainTextOperation::new().retain(5).insert("ab").delete(3));
    }

    #[test]
    fn test_retains_with_different_attributes_stay_apart() {
        let op = PlainTextOperation::new().retain(2).retain_with(3, bold());
        assert_eq!(op.ops().len(), 2);
    }

    #[test]
    fn test_insert_moves_before_delete() {
        let op = PlainTextOperation::new().retain(1).delete(2).insert("x");
        assert_eq!(
            op.ops(),
            &[
                TextOperation::Retain { count: 1, attributes: Attributes::new() },
                TextOperation::Insert { text: "x".to_string(), attributes: Attributes::new() },
                TextOperation::Delete { count: 2 },
            ]
        );

        // Joins an existing insert sitting before the delete.
        let op = PlainTextOperation::new().insert("a").delete(2).insert("b");
        assert_eq!(op, PlainTextOperation::new().insert("ab").delete(2));
    }

    #[test]
    fn test_zero_length_components_are_skipped() {
        let op = PlainTextOperation::new().retain(0).insert("").delete(0);
        assert!(op.ops().is_empty());
        assert!(op.is_noop());
    }

    #[test]
    fn test_is_noop() {
        assert!(PlainTextOperation::new().retain(5).is_noop());
        assert!(!PlainTextOperation::new().retain_with(5, bold()).is_noop());
        assert!(!PlainTextOperation::new().retain(5).insert("a").is_noop());
    }

    #[test]
    fn test_apply_rejects_wrong_length() {
        let op = PlainTextOperation::new().retain(3);
        assert_eq!(
            op.apply("ab"),
            Err(OperationError::BaseLengthMismatch { expected: 3, actual: 2 })
        );
    }

    #[test]
    fn test_apply_with_attributes() {
        let mut remove_bold = Attributes::new();
        remove_bold.insert("bold".to_string(), json!(false));

        let op = PlainTextOperation::new()
            .retain_with(2, bold())
            .insert_with("X", bold())
            .retain_with(1, remove_bold);
        let (text, attributes) = op.apply_with_attributes("abc", &[]).unwrap();
        assert_eq!(text, "abXc");
        assert_eq!(attributes, vec![bold(), bold(), bold(), Attributes::new()]);
    }

    #[test]
    fn test_invert_restores_deleted_text() {
        let op = PlainTextOperation::new().retain(1).delete(3).insert("ZZ").retain(1);
        let inverse = op.invert("abcde").unwrap();
        assert_eq!(inverse, PlainTextOperation::new().retain(1).insert("bcd").delete(2).retain(1));
        assert_eq!(inverse.apply(&op.apply("abcde").unwrap()).unwrap(), "abcde");
    }

    #[test]
    fn test_compose() {
        let a = PlainTextOperation::new().retain(3).insert("XY");
        let b = PlainTextOperation::new().delete(1).retain(4);
        let composed = a.compose(&b).unwrap();
        assert_eq!(composed.apply("abc").unwrap(), "bcXY");
        assert_eq!(composed, PlainTextOperation::new().delete(1).retain(2).insert("XY"));
    }

    #[test]
    fn test_compose_insert_then_delete_cancels() {
        let a = PlainTextOperation::new().insert("hello");
        let b = PlainTextOperation::new().retain(1).delete(3).retain(1);
        assert_eq!(a.compose(&b).unwrap(), PlainTextOperation::new().insert("ho"));
    }

    #[test]
    fn test_compose_length_mismatch() {
        let a = PlainTextOperation::new().retain(3);
        let b = PlainTextOperation::new().retain(4);
        assert_eq!(
            a.compose(&b),
            Err(OperationError::ComposeLengthMismatch { target: 3, base: 4 })
        );
    }

    #[test]
    fn test_transform_tie_break() {
        let a = PlainTextOperation::new().insert("a").retain(2);
        let b = PlainTextOperation::new().insert("b").retain(2);
        let (a_prime, b_prime) = a.transform(&b).unwrap();

        let left = b_prime.apply(&a.apply("xy").unwrap()).unwrap();
        let right = a_prime.apply(&b.apply("xy").unwrap()).unwrap();
        assert_eq!(left, "abxy");
        assert_eq!(left, right);
    }

    #[test]
    fn test_transform_overlapping_deletes() {
        let a = PlainTextOperation::new().retain(1).delete(3).retain(1);
        let b = PlainTextOperation::new().retain(2).delete(3);
        let (a_prime, b_prime) = a.transform(&b).unwrap();

        assert_eq!(a_prime, PlainTextOperation::new().retain(1).delete(1));
        assert_eq!(b_prime, PlainTextOperation::new().retain(1).delete(1));
        assert_eq!(b_prime.apply(&a.apply("abcde").unwrap()).unwrap(), "a");
    }

    #[test]
    fn test_transform_length_mismatch() {
        let a = PlainTextOperation::new().retain(1);
        let b = PlainTextOperation::new().retain(2);
        assert!(matches!(
            a.transform(&b),
            Err(OperationError::TransformLengthMismatch { left: 1, right: 2 })
        ));
    }

    #[test]
    fn test_should_be_composed_with_typing() {
        let a = PlainTextOperation::new().retain(3).insert("a").retain(4);
        let b = PlainTextOperation::new().retain(4).insert("b").retain(4);
        assert!(a.should_be_composed_with(&b));

        let far = PlainTextOperation::new().retain(6).insert("b").retain(2);
        assert!(!a.should_be_composed_with(&far));
    }

    #[test]
    fn test_should_be_composed_with_deleting() {
        // Backspace
        let a = PlainTextOperation::new().retain(5).delete(1).retain(2);
        let b = PlainTextOperation::new().retain(4).delete(1).retain(2);
        assert!(a.should_be_composed_with(&b));

        // Delete key
        let c = PlainTextOperation::new().retain(5).delete(1).retain(1);
        assert!(a.should_be_composed_with(&c));

        let d = PlainTextOperation::new().retain(1).delete(1).retain(6);
        assert!(!a.should_be_composed_with(&d));
    }

    #[test]
    fn test_should_be_composed_with_inverted() {
        let a = PlainTextOperation::new().retain(3).insert("a").retain(4);
        let same_spot = PlainTextOperation::new().retain(3).insert("b").retain(4);
        assert!(a.should_be_composed_with_inverted(&same_spot));
        assert!(!a.should_be_composed_with(&same_spot));

        let a = PlainTextOperation::new().retain(5).delete(1).retain(2);
        let b = PlainTextOperation::new().retain(4).delete(1).retain(2);
        assert!(a.should_be_composed_with_inverted(&b));
        let c = PlainTextOperation::new().retain(5).delete(1).retain(1);
        assert!(!a.should_be_composed_with_inverted(&c));
    }

    #[test]
    fn test_noop_always_composes() {
        let noop = PlainTextOperation::new().retain(3);
        let edit = PlainTextOperation::new().delete(3);
        assert!(noop.should_be_composed_with(&edit));
        assert!(edit.should_be_composed_with_inverted(&noop));
    }

    #[test]
    fn test_display() {
        let op = PlainTextOperation::new().retain(6).insert("Me").delete(5);
        assert_eq!(op.to_string(), "retain 6, insert 'Me', delete 5");
        assert_eq!(PlainTextOperation::new().to_string(), "noop");
    }
}
