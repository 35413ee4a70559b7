use super::criteria::{Combinator, Criterion};
use super::relation_fetcher::ResolveContext;
use super::utils::Session;
use crate::entity_metadata::describe;
use crate::types::{Entity, KeelResult};

/// Query builder for listing entities, optionally filtered, always ordered by id
pub struct ManyQueryBuilder<'a, E> {
    pub session: Session<'a>,
    pub criteria: Vec<Criterion>,
    pub combinator: Combinator,
    pub _phantom: std::marker::PhantomData<E>,
}

impl<'a, E: Entity> ManyQueryBuilder<'a, E> {
    pub fn new(session: Session<'a>) -> Self {
        Self {
            session,
            criteria: Vec::new(),
            combinator: Combinator::And,
            _phantom: std::marker::PhantomData,
        }
    }

    /// Add a criterion
    pub fn filter(mut self, criterion: Criterion) -> Self {
        self.criteria.push(criterion);
        self
    }

    /// Join the criteria with AND (the default) or OR
    pub fn combine(mut self, combinator: Combinator) -> Self {
        self.combinator = combinator;
        self
    }

    /// Execute the query; no match is an empty vector
    pub fn exec(self) -> KeelResult<Vec<E>> {
        let descriptor = describe::<E>()?;
        let (sql, params) = self.session.builder().select_by_criteria(
            descriptor.table(),
            descriptor.id().column(),
            &self.criteria,
            self.combinator,
        );
        let mut ctx = ResolveContext::new(self.session.config.max_resolve_depth);
        self.session.query_resolved::<E>(&sql, params, &mut ctx)
    }
}
