//! Error types for macro compilation failures

use proc_macro2::Span;
use syn::Error;

/// Misuse of `#[derive(Entity)]`, reported as a compile error at the offending span
#[derive(Debug, thiserror::Error)]
pub enum KeelMacroError {
    #[error("No table specified for entity '{entity_name}'.\n\nPlease add #[keel(table = \"table_name\")].\n\nExample:\n    #[derive(Entity, Default)]\n    #[keel(table = \"product\")]\n    struct Product {{ ... }}")]
    NoTableName { entity_name: String },

    #[error("No id field found in entity '{entity_name}'.\n\nPlease add #[keel(id)] to a field or name it 'id'.")]
    NoPrimaryKey { entity_name: String },

    #[error("Multiple id fields found in entity '{entity_name}': {fields}. Please mark exactly one field with #[keel(id)].")]
    MultiplePrimaryKeys { entity_name: String, fields: String },

    #[error("#[derive(Entity)] only supports structs with named fields and no generic parameters")]
    UnsupportedShape,

    #[error("Field '{field_name}' is marked #[keel(foreign_key)] but its type is not keel::Reference<T>")]
    ForeignKeyType { field_name: String },

    #[error("Unknown keel attribute '{attribute}'. Expected one of: {expected}")]
    UnknownAttribute { attribute: String, expected: &'static str },

    #[error("Field '{field_name}' cannot be both the id and a foreign key")]
    IdForeignKey { field_name: String },

    #[error("Id field '{field_name}' must be an Option<T> so it is unset until the entity is saved")]
    IdNotOptional { field_name: String },
}

impl KeelMacroError {
    /// Convert to syn::Error for compilation
    pub fn into_syn(self, span: Span) -> Error {
        Error::new(span, self.to_string())
    }
}
