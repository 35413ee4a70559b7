use thiserror::Error;

use crate::entity_metadata::EntityDescriptor;
use crate::value::Value;

/// Error reported by a driver behind the `Connection` seam, kept verbatim
pub type DriverError = Box<dyn std::error::Error + Send + Sync + 'static>;

// Crate-wide result alias
pub type KeelResult<T> = std::result::Result<T, KeelError>;

/// Typed keel errors
#[derive(Debug, Error)]
pub enum KeelError {
    /// Entity type is missing its table or id binding, or its descriptor is inconsistent
    #[error("configuration error for {entity}: {message}")]
    Configuration { entity: String, message: String },

    /// The driver rejected a statement
    #[error("query execution failed for `{sql}`: {source}")]
    QueryExecution {
        sql: String,
        #[source]
        source: DriverError,
    },

    /// An operation that requires exactly one row found none
    #[error("{entity} with id {id} not found")]
    NotFound { entity: String, id: String },

    #[error("cannot convert '{value}' from {from} to {to}")]
    TypeConversion {
        from: String,
        to: String,
        value: String,
    },

    /// The entity is not in a state that allows the operation (e.g. no id yet)
    #[error("illegal state for {entity}: {message}")]
    IllegalState { entity: String, message: String },
}

impl KeelError {
    pub fn configuration(entity: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Configuration {
            entity: entity.into(),
            message: message.into(),
        }
    }

    pub fn query_execution(sql: impl Into<String>, source: DriverError) -> Self {
        Self::QueryExecution {
            sql: sql.into(),
            source,
        }
    }

    pub fn not_found(entity: impl Into<String>, id: &Value) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    pub fn type_conversion(
        from: impl Into<String>,
        to: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self::TypeConversion {
            from: from.into(),
            to: to.into(),
            value: value.into(),
        }
    }

    pub fn illegal_state(entity: impl Into<String>, message: impl Into<String>) -> Self {
        Self::IllegalState {
            entity: entity.into(),
            message: message.into(),
        }
    }

    /// Whether the failure came from the database rather than from keel itself
    pub fn is_driver_error(&self) -> bool {
        matches!(self, Self::QueryExecution { .. })
    }
}

/// A persistable entity type.
///
/// Implementations supply their structural metadata once; the registry caches it
/// for the lifetime of the process. Usually generated by `#[derive(Entity)]`.
///
/// # Example
///
/// ```ignore
/// #[derive(Entity, Debug, Default)]
/// #[keel(table = "category")]
/// struct Category {
///     id: Option<i32>,
///     name: Option<String>,
/// }
/// ```
pub trait Entity: Sized + Send + Sync + 'static {
    fn descriptor() -> KeelResult<EntityDescriptor<Self>>;
}

/// The value of a foreign-key field.
#[derive(Debug, Clone, PartialEq)]
pub enum Reference<T> {
    /// No referenced row
    Unset,
    /// The stored key is known but the referenced row has not been loaded
    Deferred(Value),
    /// The referenced row, hydrated (or a stub carrying only its id when it closes a cycle)
    Loaded(Box<T>),
}

impl<T> Default for Reference<T> {
    fn default() -> Self {
        Reference::Unset
    }
}

impl<T> Reference<T> {
    pub fn to(entity: T) -> Self {
        Reference::Loaded(Box::new(entity))
    }

    pub fn deferred(key: impl Into<Value>) -> Self {
        let key = key.into();
        if key.is_null() {
            Reference::Unset
        } else {
            Reference::Deferred(key)
        }
    }

    pub fn get(&self) -> Option<&T> {
        match self {
            Reference::Loaded(entity) => Some(entity),
            _ => None,
        }
    }

    pub fn get_mut(&mut self) -> Option<&mut T> {
        match self {
            Reference::Loaded(entity) => Some(entity),
            _ => None,
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, Reference::Loaded(_))
    }

    pub fn is_unset(&self) -> bool {
        matches!(self, Reference::Unset)
    }

    /// The stored key of a deferred reference
    pub fn deferred_key(&self) -> Option<&Value> {
        match self {
            Reference::Deferred(key) => Some(key),
            _ => None,
        }
    }

    pub fn take(&mut self) -> Self {
        std::mem::take(self)
    }

    pub fn into_inner(self) -> Option<T> {
        match self {
            Reference::Loaded(entity) => Some(*entity),
            _ => None,
        }
    }
}

impl<T> From<T> for Reference<T> {
    fn from(entity: T) -> Self {
        Reference::to(entity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deferred_null_key_is_unset() {
        let r: Reference<()> = Reference::deferred(Value::Null);
        assert!(r.is_unset());
        let r: Reference<()> = Reference::deferred(3);
        assert_eq!(r.deferred_key(), Some(&Value::Int(3)));
        assert!(r.get().is_none());
    }

    #[test]
    fn driver_errors_keep_their_source() {
        let source: DriverError = "disk I/O error".into();
        let err = KeelError::query_execution("SELECT 1", source);
        assert!(err.is_driver_error());
        assert!(std::error::Error::source(&err).unwrap().to_string().contains("disk I/O"));
    }
}
