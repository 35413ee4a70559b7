use super::relation_fetcher::ResolveContext;
use super::utils::Session;
use crate::entity_metadata::describe;
use crate::types::{Entity, KeelResult};

/// Query builder for the most recently inserted entity, i.e. the greatest id
pub struct LastQueryBuilder<'a, E> {
    pub session: Session<'a>,
    pub _phantom: std::marker::PhantomData<E>,
}

impl<'a, E: Entity> LastQueryBuilder<'a, E> {
    pub fn new(session: Session<'a>) -> Self {
        Self {
            session,
            _phantom: std::marker::PhantomData,
        }
    }

    pub fn exec(self) -> KeelResult<Option<E>> {
        let descriptor = describe::<E>()?;
        let sql = self
            .session
            .builder()
            .select_last(descriptor.table(), descriptor.id().column());
        let mut ctx = ResolveContext::new(self.session.config.max_resolve_depth);
        let rows = self.session.query_resolved::<E>(&sql, Vec::new(), &mut ctx)?;
        Ok(rows.into_iter().next())
    }
}
