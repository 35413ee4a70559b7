use super::relation_fetcher::ForeignKeyValue;
use super::utils::Session;
use crate::entity_metadata::{describe, EntityDescriptor};
use crate::types::{Entity, KeelError, KeelResult};
use crate::value::Value;

/// Query builder for inserting a new entity record
pub struct CreateQueryBuilder<'a, E> {
    pub session: Session<'a>,
    pub entity: &'a mut E,
}

impl<'a, E: Entity> CreateQueryBuilder<'a, E> {
    pub fn new(session: Session<'a>, entity: &'a mut E) -> Self {
        Self { session, entity }
    }

    /// Insert the entity and store the generated id into it.
    ///
    /// Unset fields are left out of the statement so the column default applies.
    /// An id that is already set is inserted as given and no key is fetched.
    pub fn exec(self) -> KeelResult<()> {
        let Self { session, entity } = self;
        let descriptor = describe::<E>()?;
        let id_column = descriptor.id().column();
        let current_id = descriptor.id_value(entity);

        let mut values = Vec::new();
        if !current_id.is_null() {
            values.push((id_column, current_id.clone()));
        }
        values.extend(write_columns(session, descriptor, entity)?);
        let (columns, params): (Vec<&str>, Vec<Value>) = values.into_iter().unzip();

        let builder = session.builder();
        if !current_id.is_null() {
            let sql = builder.insert(descriptor.table(), &columns);
            session.execute(&sql, params)?;
            return Ok(());
        }

        let key = if builder.dialect().returns_inserted_key() {
            let sql = builder.insert_returning(descriptor.table(), &columns, id_column);
            session.query_scalar(&sql, params, id_column)?.unwrap_or(Value::Null)
        } else {
            let sql = builder.insert(descriptor.table(), &columns);
            session.insert_generated(&sql, params)?
        };
        if key.is_null() {
            return Err(KeelError::illegal_state(
                descriptor.entity_name(),
                "the database returned no generated key",
            ));
        }
        descriptor.id().assign(entity, key)
    }
}

/// Non-null scalar columns followed by the keys of referenced entities, in
/// declaration order. The id is not included.
pub(crate) fn write_columns<E: Entity>(
    session: Session<'_>,
    descriptor: &'static EntityDescriptor<E>,
    entity: &E,
) -> KeelResult<Vec<(&'static str, Value)>> {
    let mut values = Vec::new();
    for column in descriptor.columns() {
        let value = column.read(entity);
        if !value.is_null() {
            values.push((column.column(), value));
        }
    }

    for fk in descriptor.foreign_keys() {
        match fk.link().write_value(entity)? {
            ForeignKeyValue::Absent => {}
            ForeignKeyValue::Key(key) => values.push((fk.column(), key)),
            ForeignKeyValue::Unpersisted if session.config.strict_references => {
                return Err(KeelError::illegal_state(
                    descriptor.entity_name(),
                    format!(
                        "'{}' references a {} that has not been saved",
                        fk.field(),
                        fk.target_entity()
                    ),
                ));
            }
            ForeignKeyValue::Unpersisted => {
                log::warn!(
                    "{}.{} references a {} without an id, leaving {} out",
                    descriptor.entity_name(),
                    fk.field(),
                    fk.target_entity(),
                    fk.column()
                );
            }
        }
    }
    Ok(values)
}
