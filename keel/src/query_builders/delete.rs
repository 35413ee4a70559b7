use super::utils::Session;
use crate::entity_metadata::describe;
use crate::types::{Entity, KeelError, KeelResult};

/// Query builder for deleting an entity record by id
pub struct DeleteQueryBuilder<'a, E> {
    pub session: Session<'a>,
    pub entity: &'a E,
}

impl<'a, E: Entity> DeleteQueryBuilder<'a, E> {
    pub fn new(session: Session<'a>, entity: &'a E) -> Self {
        Self { session, entity }
    }

    /// Execute the delete and return the rows affected
    pub fn exec(self) -> KeelResult<u64> {
        let descriptor = describe::<E>()?;
        let id = descriptor.id_value(self.entity);
        if id.is_null() {
            return Err(KeelError::illegal_state(
                descriptor.entity_name(),
                "cannot delete an entity without an id",
            ));
        }
        let sql = self
            .session
            .builder()
            .delete(descriptor.table(), descriptor.id().column());
        self.session.execute(&sql, vec![id])
    }
}
