//! JSON wire format for operations.
//!
//! An operation is a flat array of tokens, each optionally preceded by an
//! attributes object:
//!
//! ```text
//! [6, {"bold": true}, "Me", -5]     retain 6, insert bold "Me", delete 5
//! [0]                               the empty operation
//! ```
//!
//! Positive integers retain, negative integers delete and strings insert.

use crate::attributes::Attributes;
use crate::component::TextOperation;
use crate::error::{OperationError, Result};
use crate::operation::PlainTextOperation;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

impl PlainTextOperation {
    /// Encode as a wire token array.
    pub fn to_json(&self) -> Value {
        let mut tokens = Vec::with_capacity(self.ops().len());
        for op in self.ops() {
            if let Some(attributes) = op.attributes() {
                if !attributes.is_empty() {
                    tokens.push(Value::Object(attributes.clone().into_iter().collect()));
                }
            }
            tokens.push(match op {
                TextOperation::Retain { count, .. } => Value::from(*count as i64),
                TextOperation::Insert { text, .. } => Value::from(text.as_str()),
                TextOperation::Delete { count } => Value::from(-(*count as i64)),
            });
        }
        if tokens.is_empty() {
            tokens.push(Value::from(0));
        }
        Value::Array(tokens)
    }

    /// Decode a wire token array.
    pub fn from_json(value: &Value) -> Result<Self> {
        let tokens = value
            .as_array()
            .ok_or_else(|| OperationError::MalformedWire(format!("expected an array, got {}", value)))?;

        let mut operation = PlainTextOperation::new();
        let mut pending: Option<Attributes> = None;

        for token in tokens {
            match token {
                Value::Object(map) => {
                    if pending.is_some() {
                        return Err(OperationError::MalformedWire(
                            "two attribute objects in a row".to_string(),
                        ));
                    }
                    pending = Some(map.clone().into_iter().collect());
                }
                Value::String(text) => {
                    operation.push_insert(text, pending.take().unwrap_or_default());
                }
                Value::Number(number) => {
                    let count = number.as_i64().ok_or_else(|| {
                        OperationError::MalformedWire(format!("not an integer: {}", number))
                    })?;
                    let attributes = pending.take().unwrap_or_default();
                    if count > 0 {
                        operation.push_retain(count as usize, attributes);
                    } else if attributes.is_empty() {
                        operation.push_delete(count.unsigned_abs() as usize);
                    } else {
                        return Err(OperationError::MalformedWire(
                            "attributes cannot precede a delete".to_string(),
                        ));
                    }
                }
                other => {
                    return Err(OperationError::MalformedWire(format!(
                        "unexpected token {}",
                        other
                    )))
                }
            }
        }

        if pending.is_some() {
            return Err(OperationError::MalformedWire(
                "dangling attribute object".to_string(),
            ));
        }
        Ok(operation)
    }

    /// Parse an operation from a JSON string.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_json(&value)
    }
}

impl Serialize for PlainTextOperation {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for PlainTextOperation {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        PlainTextOperation::from_json(&value).map_err(D::Error::custom)
    }
}
