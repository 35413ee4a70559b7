//! Entity metadata: per-type descriptors and the process-wide registry that caches them

use heck::ToSnakeCase;
use once_cell::sync::Lazy;
use std::any::{Any, TypeId};
use std::collections::{HashMap, HashSet};
use std::sync::{PoisonError, RwLock};

use crate::coercion::convert;
use crate::query_builders::relation_fetcher::{ForeignKeyLink, RelationLink};
use crate::types::{Entity, KeelError, KeelResult, Reference};
use crate::value::{ColumnValue, FieldType, Value};

type ReadFn<E> = Box<dyn Fn(&E) -> Value + Send + Sync>;
type WriteFn<E> = Box<dyn Fn(&mut E, Value) -> KeelResult<()> + Send + Sync>;

/// Mapping between one scalar field and its column
pub struct ColumnDescriptor<E> {
    field: &'static str,
    column: String,
    field_type: FieldType,
    nullable: bool,
    read: ReadFn<E>,
    write: WriteFn<E>,
}

impl<E: 'static> ColumnDescriptor<E> {
    fn new<T: ColumnValue>(
        field: &'static str,
        column: String,
        get: fn(&E) -> &T,
        get_mut: fn(&mut E) -> &mut T,
    ) -> Self {
        Self {
            field,
            column,
            field_type: T::FIELD_TYPE,
            nullable: T::NULLABLE,
            read: Box::new(move |entity: &E| get(entity).to_value()),
            write: Box::new(move |entity: &mut E, value: Value| {
                *get_mut(entity) = T::from_value(value)?;
                Ok(())
            }),
        }
    }
}

impl<E> ColumnDescriptor<E> {
    pub fn field(&self) -> &'static str {
        self.field
    }

    pub fn column(&self) -> &str {
        &self.column
    }

    pub fn field_type(&self) -> FieldType {
        self.field_type
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    /// Current value of the field, `Value::Null` when unset
    pub fn read(&self, entity: &E) -> Value {
        (self.read)(entity)
    }

    /// Coerce `raw` to the declared field type and store it
    pub fn assign(&self, entity: &mut E, raw: Value) -> KeelResult<()> {
        let value = convert(raw, self.field_type)?;
        (self.write)(entity, value)
    }
}

/// Options for a foreign-key field, consumed by `DescriptorBuilder::foreign_key`
#[derive(Debug, Clone)]
pub struct ForeignKeyDef {
    field: &'static str,
    column: Option<String>,
    lazy: bool,
}

impl ForeignKeyDef {
    pub fn new(field: &'static str) -> Self {
        Self {
            field,
            column: None,
            lazy: false,
        }
    }

    /// Override the conventional `id_<field>` column
    pub fn column(mut self, column: impl Into<String>) -> Self {
        self.column = Some(column.into());
        self
    }

    pub fn lazy(mut self, lazy: bool) -> Self {
        self.lazy = lazy;
        self
    }
}

/// A foreign-key field: its column, its target and its loading policy
pub struct ForeignKeyDescriptor<E> {
    field: &'static str,
    column: String,
    lazy: bool,
    link: Box<dyn RelationLink<E>>,
}

impl<E> ForeignKeyDescriptor<E> {
    /// Conventional column for a foreign-key field: `id_` + field name, snake_cased
    pub fn default_column(field: &str) -> String {
        format!("id_{}", field).to_snake_case()
    }

    pub fn field(&self) -> &'static str {
        self.field
    }

    pub fn column(&self) -> &str {
        &self.column
    }

    pub fn is_lazy(&self) -> bool {
        self.lazy
    }

    pub fn target_entity(&self) -> &'static str {
        self.link.target_name()
    }

    /// Id column of the target entity, looked up on demand so self references
    /// do not recurse while descriptors are being built
    pub fn target_id_column(&self) -> KeelResult<String> {
        self.link.target_id_column()
    }

    pub(crate) fn link(&self) -> &dyn RelationLink<E> {
        self.link.as_ref()
    }
}

/// Inverse of the foreign-key naming convention: `id_category` -> `category`
pub fn field_for_foreign_key_column(column: &str) -> String {
    let lower = column.to_snake_case();
    lower.strip_prefix("id_").unwrap_or(&lower).to_string()
}

/// Immutable structural metadata for one entity type
pub struct EntityDescriptor<E> {
    entity_name: &'static str,
    table: String,
    id: ColumnDescriptor<E>,
    columns: Vec<ColumnDescriptor<E>>,
    foreign_keys: Vec<ForeignKeyDescriptor<E>>,
    factory: fn() -> E,
}

impl<E: Entity> EntityDescriptor<E> {
    pub fn builder(table: impl Into<String>, factory: fn() -> E) -> DescriptorBuilder<E> {
        DescriptorBuilder {
            table: table.into(),
            factory,
            ids: Vec::new(),
            columns: Vec::new(),
            foreign_keys: Vec::new(),
        }
    }
}

impl<E> EntityDescriptor<E> {
    pub fn entity_name(&self) -> &'static str {
        self.entity_name
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn id(&self) -> &ColumnDescriptor<E> {
        &self.id
    }

    /// Scalar columns in declaration order, id excluded
    pub fn columns(&self) -> &[ColumnDescriptor<E>] {
        &self.columns
    }

    pub fn foreign_keys(&self) -> &[ForeignKeyDescriptor<E>] {
        &self.foreign_keys
    }

    pub fn column(&self, field: &str) -> Option<&ColumnDescriptor<E>> {
        if self.id.field == field {
            return Some(&self.id);
        }
        self.columns.iter().find(|c| c.field == field)
    }

    pub fn foreign_key(&self, field: &str) -> Option<&ForeignKeyDescriptor<E>> {
        self.foreign_keys.iter().find(|fk| fk.field == field)
    }

    pub fn instantiate(&self) -> E {
        (self.factory)()
    }

    /// A fresh instance carrying only `id`
    pub fn stub(&self, id: Value) -> KeelResult<E> {
        let mut entity = self.instantiate();
        self.id.assign(&mut entity, id)?;
        Ok(entity)
    }

    pub fn id_value(&self, entity: &E) -> Value {
        self.id.read(entity)
    }
}

/// Collects the field mappings of one entity type and validates them
pub struct DescriptorBuilder<E> {
    table: String,
    factory: fn() -> E,
    ids: Vec<ColumnDescriptor<E>>,
    columns: Vec<ColumnDescriptor<E>>,
    foreign_keys: Vec<ForeignKeyDescriptor<E>>,
}

impl<E: Entity> DescriptorBuilder<E> {
    pub fn id<T: ColumnValue>(
        mut self,
        field: &'static str,
        column: impl Into<String>,
        get: fn(&E) -> &T,
        get_mut: fn(&mut E) -> &mut T,
    ) -> Self {
        self.ids.push(ColumnDescriptor::new(field, column.into(), get, get_mut));
        self
    }

    pub fn column<T: ColumnValue>(
        mut self,
        field: &'static str,
        column: impl Into<String>,
        get: fn(&E) -> &T,
        get_mut: fn(&mut E) -> &mut T,
    ) -> Self {
        self.columns.push(ColumnDescriptor::new(field, column.into(), get, get_mut));
        self
    }

    pub fn foreign_key<T: Entity>(
        mut self,
        def: ForeignKeyDef,
        get: fn(&E) -> &Reference<T>,
        get_mut: fn(&mut E) -> &mut Reference<T>,
    ) -> Self {
        let column = def
            .column
            .unwrap_or_else(|| ForeignKeyDescriptor::<E>::default_column(def.field));
        self.foreign_keys.push(ForeignKeyDescriptor {
            field: def.field,
            column,
            lazy: def.lazy,
            link: Box::new(ForeignKeyLink::new(get, get_mut)),
        });
        self
    }

    pub fn build(self) -> KeelResult<EntityDescriptor<E>> {
        let entity_name = short_type_name::<E>();

        if self.table.trim().is_empty() {
            return Err(KeelError::configuration(entity_name, "no table binding"));
        }

        let mut ids = self.ids;
        if ids.len() > 1 {
            let fields: Vec<&str> = ids.iter().map(|c| c.field).collect();
            return Err(KeelError::configuration(
                entity_name,
                format!("exactly one id field is allowed, found {}", fields.join(", ")),
            ));
        }
        let id = ids
            .pop()
            .ok_or_else(|| KeelError::configuration(entity_name, "no id field"))?;
        // The id must read as Null until save assigns it
        if !id.nullable {
            return Err(KeelError::configuration(
                entity_name,
                format!("id field '{}' must be an Option", id.field),
            ));
        }

        let mut seen_columns = HashSet::new();
        let mut seen_fields = HashSet::new();
        let names = std::iter::once((id.field, id.column.as_str()))
            .chain(self.columns.iter().map(|c| (c.field, c.column.as_str())))
            .chain(self.foreign_keys.iter().map(|fk| (fk.field, fk.column.as_str())));
        for (field, column) in names {
            if column.trim().is_empty() {
                return Err(KeelError::configuration(
                    entity_name,
                    format!("field '{}' has an empty column name", field),
                ));
            }
            if !seen_fields.insert(field) {
                return Err(KeelError::configuration(
                    entity_name,
                    format!("field '{}' is mapped twice", field),
                ));
            }
            if !seen_columns.insert(column.to_ascii_lowercase()) {
                return Err(KeelError::configuration(
                    entity_name,
                    format!("column '{}' is mapped twice", column),
                ));
            }
        }

        Ok(EntityDescriptor {
            entity_name,
            table: self.table,
            id,
            columns: self.columns,
            foreign_keys: self.foreign_keys,
            factory: self.factory,
        })
    }
}

pub(crate) fn short_type_name<E>() -> &'static str {
    let full = std::any::type_name::<E>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

// Descriptors are leaked once per type and live for the rest of the process
static ENTITY_METADATA: Lazy<RwLock<HashMap<TypeId, &'static (dyn Any + Send + Sync)>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

/// Descriptor for `E`, built and validated on first use and cached thereafter.
///
/// `Entity::descriptor` runs under the registry's write lock, so it must not
/// call `describe` itself.
pub fn describe<E: Entity>() -> KeelResult<&'static EntityDescriptor<E>> {
    let key = TypeId::of::<E>();

    let cached = ENTITY_METADATA
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(&key)
        .copied();
    if let Some(entry) = cached {
        return downcast::<E>(entry);
    }

    let mut registry = ENTITY_METADATA
        .write()
        .unwrap_or_else(PoisonError::into_inner);
    if let Some(entry) = registry.get(&key).copied() {
        return downcast::<E>(entry);
    }

    let descriptor: &'static EntityDescriptor<E> = Box::leak(Box::new(E::descriptor()?));
    registry.insert(key, descriptor);
    log::debug!(
        "described {} as table '{}' ({} columns, {} foreign keys)",
        descriptor.entity_name,
        descriptor.table,
        descriptor.columns.len() + 1,
        descriptor.foreign_keys.len()
    );
    Ok(descriptor)
}

fn downcast<E: Entity>(
    entry: &'static (dyn Any + Send + Sync),
) -> KeelResult<&'static EntityDescriptor<E>> {
    entry
        .downcast_ref::<EntityDescriptor<E>>()
        .ok_or_else(|| {
            KeelError::configuration(short_type_name::<E>(), "registry entry has a foreign type")
        })
}
