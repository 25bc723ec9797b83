//! Property-based tests for the operation algebra
//!
//! These verify the laws that keep collaborating replicas convergent:
//!  - Diamond: apply(apply(S, a), b') = apply(apply(S, b), a')
//!  - Compose: apply(apply(S, a), b) = apply(S, a.compose(b))
//!  - Invert: apply(apply(S, a), a.invert(S)) = S
//!  - Wire: from_json(to_json(a)) = a

use concord_core::{Attributes, Cursor, PlainTextOperation, TextOperation};
use proptest::prelude::*;
use serde_json::json;

type Step = (u8, usize, String, u8);

fn attributes(choice: u8) -> Attributes {
    let mut attributes = Attributes::new();
    match choice % 5 {
        1 => {
            attributes.insert("bold".to_string(), json!(true));
        }
        2 => {
            attributes.insert("bold".to_string(), json!(false));
        }
        3 => {
            attributes.insert("color".to_string(), json!("red"));
        }
        4 => {
            attributes.insert("color".to_string(), json!("blue"));
        }
        _ => {}
    }
    attributes
}

/// Build an operation over a document of `len` chars from random steps.
fn build_operation(len: usize, steps: &[Step]) -> PlainTextOperation {
    let mut op = PlainTextOperation::new();
    let mut remaining = len;

    for (kind, n, text, attrs) in steps {
        match kind % 3 {
            0 if remaining > 0 => {
                let count = 1 + n % remaining;
                op = op.retain_with(count, attributes(*attrs));
                remaining -= count;
            }
            1 => {
                op = op.insert_with(text, attributes(*attrs));
            }
            2 if remaining > 0 => {
                let count = 1 + n % remaining;
                op = op.delete(count);
                remaining -= count;
            }
            _ => {}
        }
    }

    op.retain(remaining)
}

fn plain(op: PlainTextOperation) -> PlainTextOperation {
    // Rebuild without attributes for laws that only concern text.
    PlainTextOperation::from_ops(op.ops().iter().cloned().map(|component| match component {
        TextOperation::Retain { count, .. } => TextOperation::Retain {
            count,
            attributes: Attributes::new(),
        },
        TextOperation::Insert { text, .. } => TextOperation::Insert {
            text,
            attributes: Attributes::new(),
        },
        delete => delete,
    }))
}

fn doc_strategy() -> impl Strategy<Value = String> {
    "[a-zé ]{0,24}"
}

fn steps_strategy() -> impl Strategy<Value = Vec<Step>> {
    prop::collection::vec((0u8..3, 0usize..8, "[A-Zñ]{1,4}", 0u8..5), 0..8)
}

proptest! {
    #[test]
    fn transform_converges(doc in doc_strategy(), steps_a in steps_strategy(), steps_b in steps_strategy()) {
        let len = doc.chars().count();
        let a = build_operation(len, &steps_a);
        let b = build_operation(len, &steps_b);
        let (a_prime, b_prime) = a.transform(&b).unwrap();

        let (after_a, attrs_a) = a.apply_with_attributes(&doc, &[]).unwrap();
        let (after_b, attrs_b) = b.apply_with_attributes(&doc, &[]).unwrap();
        let left = b_prime.apply_with_attributes(&after_a, &attrs_a).unwrap();
        let right = a_prime.apply_with_attributes(&after_b, &attrs_b).unwrap();

        prop_assert_eq!(left, right);
    }

    #[test]
    fn compose_matches_sequential_apply(doc in doc_strategy(), steps_a in steps_strategy(), steps_b in steps_strategy()) {
        let a = build_operation(doc.chars().count(), &steps_a);
        let b = build_operation(a.target_length(), &steps_b);
        let composed = a.compose(&b).unwrap();

        let (after_a, attrs_a) = a.apply_with_attributes(&doc, &[]).unwrap();
        let sequential = b.apply_with_attributes(&after_a, &attrs_a).unwrap();
        let at_once = composed.apply_with_attributes(&doc, &[]).unwrap();

        prop_assert_eq!(sequential, at_once);
        prop_assert_eq!(composed.base_length(), a.base_length());
        prop_assert_eq!(composed.target_length(), b.target_length());
    }

    #[test]
    fn invert_restores_document(doc in doc_strategy(), steps in steps_strategy()) {
        let op = plain(build_operation(doc.chars().count(), &steps));
        let inverse = op.invert(&doc).unwrap();
        let edited = op.apply(&doc).unwrap();

        prop_assert_eq!(inverse.apply(&edited).unwrap(), doc);
        prop_assert_eq!(inverse.base_length(), op.target_length());
    }

    #[test]
    fn wire_round_trip(len in 0usize..30, steps in steps_strategy()) {
        let op = build_operation(len, &steps);
        let json = serde_json::to_string(&op).unwrap();
        let back: PlainTextOperation = serde_json::from_str(&json).unwrap();
        prop_assert_eq!(back, op);
    }

    #[test]
    fn cursor_stays_in_bounds(len in 0usize..30, steps in steps_strategy(), a in 0usize..31, b in 0usize..31) {
        let op = build_operation(len, &steps);
        let cursor = Cursor::new(a.min(len), b.min(len));
        let moved = cursor.transform(&op);

        prop_assert!(moved.position <= op.target_length());
        prop_assert!(moved.selection_end <= op.target_length());
        prop_assert_eq!(moved.has_selection(), moved.position != moved.selection_end);
        if !cursor.has_selection() {
            prop_assert!(!moved.has_selection());
        }
    }

    /// An insert exactly at the caret pushes the caret past the inserted text.
    #[test]
    fn cursor_moves_past_insert_at_caret(at in 0usize..20, rest in 0usize..20, text in "[a-z]{1,6}") {
        let op = PlainTextOperation::new().retain(at).insert(&text).retain(rest);
        let moved = Cursor::caret(at).transform(&op);
        prop_assert_eq!(moved, Cursor::caret(at + text.len()));
    }

    /// A caret anywhere in a replaced range lands after the replacement text,
    /// even once the walk has consumed the caret's whole offset.
    #[test]
    fn cursor_in_replaced_range_lands_after_insert(
        start in 0usize..10,
        deleted in 1usize..10,
        rest in 0usize..10,
        offset in 0usize..10,
        text in "[a-z]{1,6}",
    ) {
        let op = PlainTextOperation::new()
            .retain(start)
            .delete(deleted)
            .insert(&text)
            .retain(rest);
        let caret = start + offset % (deleted + 1);
        let moved = Cursor::caret(caret).transform(&op);
        prop_assert_eq!(moved, Cursor::caret(start + text.len()));
    }
}

#[test]
fn should_be_composed_with_consecutive_typing() {
    let mut doc = String::from("abc");
    let mut previous: Option<PlainTextOperation> = None;

    for (i, ch) in ["x", "y", "z"].iter().enumerate() {
        let at = 3 + i;
        let op = PlainTextOperation::new().retain(at).insert(ch);
        if let Some(prev) = &previous {
            assert!(prev.should_be_composed_with(&op));
        }
        doc = op.apply(&doc).unwrap();
        previous = Some(op);
    }

    assert_eq!(doc, "abcxyz");
}
