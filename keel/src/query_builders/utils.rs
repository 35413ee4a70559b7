use super::connection_like::{Connection, RowCursor, Statement};
use super::relation_fetcher::{resolve_eager, ResolveContext};
use super::sql::QueryBuilder;
use crate::config::EngineConfig;
use crate::entity_metadata::{describe, EntityDescriptor};
use crate::types::{Entity, KeelError, KeelResult};
use crate::value::Value;

/// A connection paired with the configuration of the engine driving it
#[derive(Clone, Copy)]
pub struct Session<'a> {
    pub conn: &'a dyn Connection,
    pub config: &'a EngineConfig,
}

impl<'a> Session<'a> {
    pub fn new(conn: &'a dyn Connection, config: &'a EngineConfig) -> Self {
        Self { conn, config }
    }

    pub fn builder(&self) -> QueryBuilder {
        QueryBuilder::new(self.conn.dialect())
    }

    fn log(&self, sql: &str, params: &[Value]) {
        if self.config.log_statements {
            log::debug!(target: "keel::sql", "{} -- {:?}", sql, params);
        }
    }

    fn prepare(&self, sql: &str, params: Vec<Value>) -> KeelResult<Box<dyn Statement + 'a>> {
        self.log(sql, &params);
        let mut stmt = self
            .conn
            .prepare(sql)
            .map_err(|e| KeelError::query_execution(sql, e))?;
        for value in params {
            stmt.bind(value).map_err(|e| KeelError::query_execution(sql, e))?;
        }
        Ok(stmt)
    }

    /// Run a write and return the rows-affected count
    pub fn execute(&self, sql: &str, params: Vec<Value>) -> KeelResult<u64> {
        let mut stmt = self.prepare(sql, params)?;
        stmt.execute_update().map_err(|e| KeelError::query_execution(sql, e))
    }

    /// Run an insert and return the key the database generated for it
    pub fn insert_generated(&self, sql: &str, params: Vec<Value>) -> KeelResult<Value> {
        let mut stmt = self.prepare(sql, params)?;
        stmt.execute_update().map_err(|e| KeelError::query_execution(sql, e))?;
        stmt.generated_key().map_err(|e| KeelError::query_execution(sql, e))
    }

    /// `column` of the first row, `None` when the result is empty
    pub fn query_scalar(
        &self,
        sql: &str,
        params: Vec<Value>,
        column: &str,
    ) -> KeelResult<Option<Value>> {
        let mut stmt = self.prepare(sql, params)?;
        let mut cursor = stmt
            .execute_query()
            .map_err(|e| KeelError::query_execution(sql, e))?;
        if !cursor.next().map_err(|e| KeelError::query_execution(sql, e))? {
            return Ok(None);
        }
        cursor
            .get(column)
            .map(Some)
            .map_err(|e| KeelError::query_execution(sql, e))
    }

    /// Materialise every row into a fresh entity, foreign keys left deferred.
    ///
    /// The cursor is drained and released before returning, so callers can issue
    /// nested lookups on the same connection.
    pub fn query_rows<E: Entity>(&self, sql: &str, params: Vec<Value>) -> KeelResult<Vec<E>> {
        let descriptor = describe::<E>()?;
        let mut stmt = self.prepare(sql, params)?;
        let mut cursor = stmt
            .execute_query()
            .map_err(|e| KeelError::query_execution(sql, e))?;
        let mut rows = Vec::new();
        while cursor.next().map_err(|e| KeelError::query_execution(sql, e))? {
            rows.push(materialize(descriptor, cursor.as_ref(), sql)?);
        }
        Ok(rows)
    }

    /// `query_rows` followed by eager foreign-key resolution of each row
    pub(crate) fn query_resolved<E: Entity>(
        &self,
        sql: &str,
        params: Vec<Value>,
        ctx: &mut ResolveContext,
    ) -> KeelResult<Vec<E>> {
        let descriptor = describe::<E>()?;
        let mut rows = self.query_rows::<E>(sql, params)?;
        for row in rows.iter_mut() {
            // Each row takes part in cycle detection while its references resolve
            let id = descriptor.id_value(row);
            let entered = ctx.enter::<E>(&id);
            let resolved = resolve_eager(*self, row, ctx);
            if entered {
                ctx.leave::<E>(&id);
            }
            resolved?;
        }
        Ok(rows)
    }
}

fn materialize<E: Entity>(
    descriptor: &EntityDescriptor<E>,
    row: &dyn RowCursor,
    sql: &str,
) -> KeelResult<E> {
    let read = |column: &str| row.get(column).map_err(|e| KeelError::query_execution(sql, e));

    let mut entity = descriptor.instantiate();
    descriptor.id().assign(&mut entity, read(descriptor.id().column())?)?;
    for column in descriptor.columns() {
        column.assign(&mut entity, read(column.column())?)?;
    }
    for fk in descriptor.foreign_keys() {
        fk.link().set_deferred(&mut entity, read(fk.column())?);
    }
    Ok(entity)
}
