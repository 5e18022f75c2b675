//! Writes that can be batched into one atomic [`apply_all`](crate::DocumentStore::apply_all).

use crate::document::Fields;

/// A single document mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum Write {
    /// Insert a document under a caller-chosen identifier.
    Create {
        collection: String,
        id: String,
        fields: Fields,
    },
    /// Merge fields into an existing document.
    Update {
        collection: String,
        id: String,
        fields: Fields,
    },
    /// Add `delta` to an integer field of an existing document.
    ///
    /// With a `floor`, the write is rejected if the result would fall below
    /// it. This is the decrement-if-sufficient primitive used for stock.
    Increment {
        collection: String,
        id: String,
        field: String,
        delta: i64,
        floor: Option<i64>,
    },
}

impl Write {
    #[must_use]
    pub fn create(collection: &str, id: impl Into<String>, fields: Fields) -> Self {
        Self::Create {
            collection: collection.to_owned(),
            id: id.into(),
            fields,
        }
    }

    #[must_use]
    pub fn update(collection: &str, id: impl Into<String>, fields: Fields) -> Self {
        Self::Update {
            collection: collection.to_owned(),
            id: id.into(),
            fields,
        }
    }

    #[must_use]
    pub fn increment(collection: &str, id: impl Into<String>, field: &str, delta: i64) -> Self {
        Self::Increment {
            collection: collection.to_owned(),
            id: id.into(),
            field: field.to_owned(),
            delta,
            floor: None,
        }
    }

    /// Require the incremented field to stay at or above `floor`.
    ///
    /// Has no effect on other write kinds.
    #[must_use]
    pub fn at_least(mut self, min: i64) -> Self {
        if let Self::Increment { floor, .. } = &mut self {
            *floor = Some(min);
        }
        self
    }

    /// Collection the write targets.
    #[must_use]
    pub fn collection(&self) -> &str {
        match self {
            Self::Create { collection, .. }
            | Self::Update { collection, .. }
            | Self::Increment { collection, .. } => collection,
        }
    }

    /// Identifier of the targeted document.
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::Create { id, .. } | Self::Update { id, .. } | Self::Increment { id, .. } => id,
        }
    }
}

/// Compute the new value of an incremented field, enforcing the floor.
pub(crate) fn incremented(
    collection: &str,
    id: &str,
    field: &str,
    current: i64,
    delta: i64,
    floor: Option<i64>,
) -> Result<i64, crate::StoreError> {
    let next = current.saturating_add(delta);
    match floor {
        Some(min) if next < min => Err(crate::StoreError::PreconditionFailed {
            collection: collection.to_owned(),
            id: id.to_owned(),
            field: field.to_owned(),
            floor: min,
        }),
        _ => Ok(next),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_at_least_only_affects_increments() {
        let write = Write::increment("products", "a", "stock", -2).at_least(0);
        assert!(matches!(write, Write::Increment { floor: Some(0), .. }));

        let update = Write::update("orders", "o", Fields::new()).at_least(0);
        assert!(matches!(update, Write::Update { .. }));
    }

    #[test]
    fn test_incremented_enforces_floor() {
        assert_eq!(incremented("p", "a", "stock", 5, -2, Some(0)).ok(), Some(3));
        assert!(incremented("p", "a", "stock", 1, -2, Some(0)).is_err());
        assert_eq!(incremented("p", "a", "stock", 1, -2, None).ok(), Some(-1));
    }
}
