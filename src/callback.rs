//! Callback token codec
//!
//! Inline buttons carry a compact action token back to the bot. The token is
//! the JSON array `[type, id, value]` and must fit into 64 bytes.

#[cfg(test)]
mod proptests;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// Upper bound on the encoded token size, in bytes
pub const MAX_CALLBACK_BYTES: usize = 64;

/// The closed set of button actions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallbackType {
    Goto,
    Back,
    Done,
    Cancel,
    Pagination,
    Checkbox,
    Radiobutton,
}

impl CallbackType {
    pub fn as_str(self) -> &'static str {
        match self {
            CallbackType::Goto => "goto",
            CallbackType::Back => "back",
            CallbackType::Done => "done",
            CallbackType::Cancel => "cancel",
            CallbackType::Pagination => "pagination",
            CallbackType::Checkbox => "checkbox",
            CallbackType::Radiobutton => "radiobutton",
        }
    }
}

impl fmt::Display for CallbackType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum CallbackError {
    #[error("Encoded callback data is {len} bytes, limit is {MAX_CALLBACK_BYTES}: {encoded}")]
    Encoding { len: usize, encoded: String },
    #[error("Callback {field} must be a JSON scalar or null")]
    NotScalar { field: &'static str },
    #[error("Failed to serialize callback data: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("Malformed callback data: {0}")]
    Decode(String),
}

/// A decoded button action
#[derive(Debug, Clone, PartialEq)]
pub struct CallbackData {
    pub kind: CallbackType,
    /// Menu- or button-scoped identifier, usually `null`
    pub id: Value,
    /// Payload, meaning depends on `kind`
    pub value: Value,
}

impl CallbackData {
    pub fn new(kind: CallbackType, id: Value, value: Value) -> Self {
        Self { kind, id, value }
    }

    pub fn goto(menu_id: &str) -> Self {
        Self::new(CallbackType::Goto, Value::Null, Value::from(menu_id))
    }

    /// Back, done or cancel with a (negative) history delta
    pub fn history(kind: CallbackType, delta: i64) -> Self {
        Self::new(kind, Value::Null, Value::from(delta))
    }

    pub fn pagination(page: u32) -> Self {
        Self::new(CallbackType::Pagination, Value::Null, Value::from(page))
    }

    pub fn checkbox(value: &str) -> Self {
        Self::new(CallbackType::Checkbox, Value::Null, Value::from(value))
    }

    pub fn radio(value: &str) -> Self {
        Self::new(CallbackType::Radiobutton, Value::Null, Value::from(value))
    }

    /// Serialize into the wire token
    pub fn encode(&self) -> Result<String, CallbackError> {
        encode(self.kind, &self.id, &self.value)
    }

    pub fn value_str(&self) -> Option<&str> {
        self.value.as_str()
    }

    pub fn value_i64(&self) -> Option<i64> {
        self.value.as_i64()
    }
}

fn is_scalar(value: &Value) -> bool {
    !matches!(value, Value::Array(_) | Value::Object(_))
}

/// Encode `[kind, id, value]`, failing when the token would exceed
/// [`MAX_CALLBACK_BYTES`].
pub fn encode(kind: CallbackType, id: &Value, value: &Value) -> Result<String, CallbackError> {
    if !is_scalar(id) {
        return Err(CallbackError::NotScalar { field: "id" });
    }
    if !is_scalar(value) {
        return Err(CallbackError::NotScalar { field: "value" });
    }
    let encoded = serde_json::to_string(&(kind, id, value))?;
    if encoded.len() > MAX_CALLBACK_BYTES {
        return Err(CallbackError::Encoding {
            len: encoded.len(),
            encoded,
        });
    }
    Ok(encoded)
}

/// Decode a wire token. Any failure means "unrecognized action".
pub fn decode(token: &str) -> Result<CallbackData, CallbackError> {
    if token.len() > MAX_CALLBACK_BYTES {
        return Err(CallbackError::Decode(format!(
            "token is {} bytes, limit is {MAX_CALLBACK_BYTES}",
            token.len()
        )));
    }
    let (kind, id, value): (CallbackType, Value, Value) =
        serde_json::from_str(token).map_err(|e| CallbackError::Decode(e.to_string()))?;
    if !is_scalar(&id) || !is_scalar(&value) {
        return Err(CallbackError::Decode(
            "id and value must be JSON scalars".to_string(),
        ));
    }
    Ok(CallbackData { kind, id, value })
}
