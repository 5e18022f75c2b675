//! Documents and their field maps.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::StoreError;

/// Top-level fields of a document.
pub type Fields = Map<String, Value>;

/// A document as stored: its identifier plus its fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub data: Fields,
}

impl Document {
    #[must_use]
    pub fn new(id: impl Into<String>, data: Fields) -> Self {
        Self {
            id: id.into(),
            data,
        }
    }

    /// Decode into a typed record, exposing the identifier as an `id` field.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::DataCorruption` if the fields do not match `T`.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, StoreError> {
        let mut data = self.data.clone();
        data.insert("id".to_owned(), Value::String(self.id.clone()));
        serde_json::from_value(Value::Object(data)).map_err(|e| {
            StoreError::DataCorruption(format!("document {} does not decode: {e}", self.id))
        })
    }

    /// Read an integer field, treating a missing field as zero.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotAnInteger` if the field holds anything else.
    pub fn integer_field(&self, collection: &str, field: &str) -> Result<i64, StoreError> {
        match self.data.get(field) {
            None | Some(Value::Null) => Ok(0),
            Some(value) => value.as_i64().ok_or_else(|| StoreError::NotAnInteger {
                collection: collection.to_owned(),
                id: self.id.clone(),
                field: field.to_owned(),
            }),
        }
    }
}

/// Serialize a record into a field map.
///
/// # Errors
///
/// Returns `StoreError::Serialization` if `value` does not serialize to a
/// JSON object.
pub fn fields_of<T: Serialize>(value: &T) -> Result<Fields, StoreError> {
    match serde_json::to_value(value)? {
        Value::Object(fields) => Ok(fields),
        other => Err(StoreError::DataCorruption(format!(
            "expected an object, got {other}"
        ))),
    }
}
