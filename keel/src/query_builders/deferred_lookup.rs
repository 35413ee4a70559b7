use super::relation_fetcher::ResolveContext;
use super::utils::Session;
use crate::entity_metadata::describe;
use crate::types::{Entity, KeelError, KeelResult};

/// On-demand load of one foreign-key field, typically a lazy one
pub struct DeferredLookup<'a, E> {
    pub session: Session<'a>,
    pub entity: &'a mut E,
    pub field: &'a str,
}

impl<'a, E: Entity> DeferredLookup<'a, E> {
    pub fn new(session: Session<'a>, entity: &'a mut E, field: &'a str) -> Self {
        Self {
            session,
            entity,
            field,
        }
    }

    /// Populate the field; a field that is already loaded is left alone.
    ///
    /// Without a deferred key the stored column is read from the owner's row.
    /// A null or dangling key leaves the field unset.
    pub fn exec(self) -> KeelResult<()> {
        let Self {
            session,
            entity,
            field,
        } = self;
        let descriptor = describe::<E>()?;
        let fk = descriptor.foreign_key(field).ok_or_else(|| {
            KeelError::configuration(
                descriptor.entity_name(),
                format!("'{}' is not a foreign key field", field),
            )
        })?;
        let link = fk.link();
        if link.is_loaded(entity) {
            return Ok(());
        }

        let owner_id = descriptor.id_value(entity);
        let key = match link.deferred_key(entity) {
            Some(key) => key,
            None if owner_id.is_null() => {
                log::debug!(
                    "{}.{} has no key and its owner is not persisted, nothing to load",
                    descriptor.entity_name(),
                    field
                );
                return Ok(());
            }
            None => {
                let id_column = descriptor.id().column();
                let sql = session
                    .builder()
                    .select_column(descriptor.table(), fk.column(), id_column);
                match session.query_scalar(&sql, vec![owner_id.clone()], fk.column())? {
                    Some(key) if !key.is_null() => key,
                    _ => return Ok(()),
                }
            }
        };

        let mut ctx = ResolveContext::new(session.config.max_resolve_depth);
        if !owner_id.is_null() {
            ctx.enter::<E>(&owner_id);
        }
        link.resolve(session, entity, key, &mut ctx)
    }
}
