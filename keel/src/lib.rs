//! Descriptor-driven active-record persistence over SQL connections.
//!
//! Entity types describe their table, id, columns and foreign keys once (usually
//! through `#[derive(Entity)]`); the [`Engine`] turns that metadata into
//! parameterised SQL, runs it on a caller-supplied [`Connection`] and maps rows
//! back, resolving foreign keys into live references.

// Lets `#[derive(Entity)]` refer to `::keel` from inside this crate too
extern crate self as keel;

pub mod blocking;
pub mod coercion;
pub mod config;
pub mod engine;
pub mod entity_metadata;
pub mod query_builders;
pub mod types;
pub mod value;

pub use blocking::BlockingConnection;
pub use coercion::convert;
pub use config::EngineConfig;
pub use engine::{ActiveRecord, Engine};
pub use entity_metadata::{
    describe, field_for_foreign_key_column, ColumnDescriptor, DescriptorBuilder, EntityDescriptor,
    ForeignKeyDef, ForeignKeyDescriptor,
};
pub use query_builders::{
    Combinator, Connection, Criterion, Dialect, Operand, Operator, QueryBuilder, RowCursor,
    Statement,
};
pub use types::{DriverError, Entity, KeelError, KeelResult, Reference};
pub use value::{ColumnValue, FieldType, Value};

// The derive shares its name with the trait; they live in different namespaces
pub use keel_macros::Entity;
