use super::create::write_columns;
use super::utils::Session;
use crate::entity_metadata::describe;
use crate::types::{Entity, KeelError, KeelResult};
use crate::value::Value;

/// Query builder for updating an existing entity record
pub struct UpdateQueryBuilder<'a, E> {
    pub session: Session<'a>,
    pub entity: &'a E,
}

impl<'a, E: Entity> UpdateQueryBuilder<'a, E> {
    pub fn new(session: Session<'a>, entity: &'a E) -> Self {
        Self { session, entity }
    }

    /// Write every non-null field back by id and return the rows affected.
    ///
    /// Null fields keep their stored value. With nothing to write no statement is
    /// issued and the result is 0.
    pub fn exec(self) -> KeelResult<u64> {
        let descriptor = describe::<E>()?;
        let id = descriptor.id_value(self.entity);
        if id.is_null() {
            return Err(KeelError::illegal_state(
                descriptor.entity_name(),
                "cannot update an entity without an id",
            ));
        }

        let values = write_columns(self.session, descriptor, self.entity)?;
        if values.is_empty() {
            log::debug!("{} {} has nothing to update", descriptor.entity_name(), id);
            return Ok(0);
        }

        let (columns, mut params): (Vec<&str>, Vec<Value>) = values.into_iter().unzip();
        params.push(id);
        let sql = self
            .session
            .builder()
            .update(descriptor.table(), &columns, descriptor.id().column());
        self.session.execute(&sql, params)
    }
}
