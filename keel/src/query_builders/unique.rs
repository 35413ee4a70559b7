use super::relation_fetcher::{resolve_eager, ResolveContext};
use super::utils::Session;
use crate::coercion::convert;
use crate::entity_metadata::{describe, short_type_name};
use crate::types::{Entity, KeelError, KeelResult};
use crate::value::Value;

/// Query builder for finding one entity by its id
pub struct UniqueQueryBuilder<'a, E> {
    pub session: Session<'a>,
    pub id: Value,
    pub _phantom: std::marker::PhantomData<E>,
}

impl<'a, E: Entity> UniqueQueryBuilder<'a, E> {
    pub fn new(session: Session<'a>, id: Value) -> Self {
        Self {
            session,
            id,
            _phantom: std::marker::PhantomData,
        }
    }

    /// Execute the lookup; a missing row is `Ok(None)`
    pub fn exec(self) -> KeelResult<Option<E>> {
        let mut ctx = ResolveContext::new(self.session.config.max_resolve_depth);
        find_in_context::<E>(self.session, self.id, &mut ctx)
    }

    /// Execute the lookup, failing with `NotFound` when the row is missing
    pub fn exec_required(self) -> KeelResult<E> {
        let id = self.id.clone();
        self.exec()?
            .ok_or_else(|| KeelError::not_found(short_type_name::<E>(), &id))
    }
}

/// Find `E` by id inside an ongoing resolution.
///
/// When `(E, id)` is already being resolved further up the stack the row is not
/// read again and a stub carrying only the id is returned.
pub(crate) fn find_in_context<E: Entity>(
    session: Session<'_>,
    id: Value,
    ctx: &mut ResolveContext,
) -> KeelResult<Option<E>> {
    let descriptor = describe::<E>()?;
    let id = convert(id, descriptor.id().field_type())?;

    if !ctx.enter::<E>(&id) {
        log::debug!(
            "{} {} is already being resolved, returning a stub",
            descriptor.entity_name(),
            id
        );
        return descriptor.stub(id).map(Some);
    }

    let sql = session
        .builder()
        .select_by_id(descriptor.table(), descriptor.id().column());
    let found = session
        .query_rows::<E>(&sql, vec![id.clone()])
        .and_then(|rows| match rows.into_iter().next() {
            Some(mut entity) => resolve_eager(session, &mut entity, ctx).map(|_| Some(entity)),
            None => Ok(None),
        });

    ctx.leave::<E>(&id);
    found
}
