//! The CRUD engine and the active-record extension over it

use crate::config::EngineConfig;
use crate::query_builders::{
    Combinator, Connection, CreateQueryBuilder, Criterion, DeferredLookup, DeleteQueryBuilder,
    LastQueryBuilder, ManyQueryBuilder, Session, UniqueQueryBuilder, UpdateQueryBuilder,
};
use crate::types::{Entity, KeelResult};
use crate::value::Value;

/// Stateless persistence service. Every operation runs on the connection it is
/// handed and holds nothing between calls.
#[derive(Debug, Clone, Default)]
pub struct Engine {
    config: EngineConfig,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn session<'a>(&'a self, conn: &'a dyn Connection) -> Session<'a> {
        Session::new(conn, &self.config)
    }

    /// Insert `entity` and assign its generated id
    pub fn save<E: Entity>(&self, conn: &dyn Connection, entity: &mut E) -> KeelResult<()> {
        CreateQueryBuilder::new(self.session(conn), entity).exec()
    }

    /// Write the non-null fields of `entity` by id
    pub fn update<E: Entity>(&self, conn: &dyn Connection, entity: &E) -> KeelResult<u64> {
        UpdateQueryBuilder::new(self.session(conn), entity).exec()
    }

    pub fn delete<E: Entity>(&self, conn: &dyn Connection, entity: &E) -> KeelResult<u64> {
        DeleteQueryBuilder::new(self.session(conn), entity).exec()
    }

    /// Look up one row by id, resolving eager foreign keys; `None` when missing
    pub fn find_by_id<E: Entity>(
        &self,
        conn: &dyn Connection,
        id: impl Into<Value>,
    ) -> KeelResult<Option<E>> {
        UniqueQueryBuilder::new(self.session(conn), id.into()).exec()
    }

    /// Like `find_by_id` but a missing row is `KeelError::NotFound`
    pub fn get<E: Entity>(&self, conn: &dyn Connection, id: impl Into<Value>) -> KeelResult<E> {
        UniqueQueryBuilder::new(self.session(conn), id.into()).exec_required()
    }

    pub fn get_all<E: Entity>(&self, conn: &dyn Connection) -> KeelResult<Vec<E>> {
        self.query::<E>(conn).exec()
    }

    /// Rows matching every criterion, ordered by id
    pub fn find_by_criteria<E: Entity>(
        &self,
        conn: &dyn Connection,
        criteria: &[Criterion],
    ) -> KeelResult<Vec<E>> {
        self.search(conn, criteria, Combinator::And)
    }

    /// Rows matching at least one criterion, ordered by id
    pub fn find_by_any_criteria<E: Entity>(
        &self,
        conn: &dyn Connection,
        criteria: &[Criterion],
    ) -> KeelResult<Vec<E>> {
        self.search(conn, criteria, Combinator::Or)
    }

    /// The row with the greatest id
    pub fn find_last<E: Entity>(&self, conn: &dyn Connection) -> KeelResult<Option<E>> {
        LastQueryBuilder::new(self.session(conn)).exec()
    }

    /// Load the foreign-key `field` of `entity` now. No-op when already loaded.
    pub fn load_relation<E: Entity>(
        &self,
        conn: &dyn Connection,
        entity: &mut E,
        field: &str,
    ) -> KeelResult<()> {
        DeferredLookup::new(self.session(conn), entity, field).exec()
    }

    /// A list query to refine with `filter` and `combine` before `exec`
    pub fn query<'a, E: Entity>(&'a self, conn: &'a dyn Connection) -> ManyQueryBuilder<'a, E> {
        ManyQueryBuilder::new(self.session(conn))
    }

    fn search<E: Entity>(
        &self,
        conn: &dyn Connection,
        criteria: &[Criterion],
        combinator: Combinator,
    ) -> KeelResult<Vec<E>> {
        criteria
            .iter()
            .cloned()
            .fold(self.query::<E>(conn), ManyQueryBuilder::filter)
            .combine(combinator)
            .exec()
    }
}

/// Persistence operations on the entity itself, run with the default engine
/// configuration.
///
/// ```ignore
/// let mut category = Category { name: Some("Books".into()), ..Default::default() };
/// category.save(&conn)?;
/// let found = Category::find_by_id(&conn, category.id)?;
/// ```
pub trait ActiveRecord: Entity {
    fn save(&mut self, conn: &dyn Connection) -> KeelResult<()> {
        Engine::default().save(conn, self)
    }

    fn update(&self, conn: &dyn Connection) -> KeelResult<u64> {
        Engine::default().update(conn, self)
    }

    fn delete(&self, conn: &dyn Connection) -> KeelResult<u64> {
        Engine::default().delete(conn, self)
    }

    fn find_by_id(conn: &dyn Connection, id: impl Into<Value>) -> KeelResult<Option<Self>> {
        Engine::default().find_by_id(conn, id)
    }

    fn get(conn: &dyn Connection, id: impl Into<Value>) -> KeelResult<Self> {
        Engine::default().get(conn, id)
    }

    fn get_all(conn: &dyn Connection) -> KeelResult<Vec<Self>> {
        Engine::default().get_all(conn)
    }

    fn find_by_criteria(conn: &dyn Connection, criteria: &[Criterion]) -> KeelResult<Vec<Self>> {
        Engine::default().find_by_criteria(conn, criteria)
    }

    fn find_by_any_criteria(
        conn: &dyn Connection,
        criteria: &[Criterion],
    ) -> KeelResult<Vec<Self>> {
        Engine::default().find_by_any_criteria(conn, criteria)
    }

    fn find_last(conn: &dyn Connection) -> KeelResult<Option<Self>> {
        Engine::default().find_last(conn)
    }

    fn load(&mut self, conn: &dyn Connection, field: &str) -> KeelResult<()> {
        Engine::default().load_relation(conn, self, field)
    }
}

impl<E: Entity> ActiveRecord for E {}
