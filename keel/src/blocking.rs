//! Synchronous `Connection` over a SeaORM connection or transaction.
//!
//! SeaORM is async; the adapter owns a small Tokio runtime and blocks on it for
//! every call. It must not be used from inside an async context.

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DatabaseTransaction, DbBackend,
    DbErr, QueryResult, TransactionTrait,
};
use std::future::Future;
use std::sync::Arc;
use tokio::runtime::Runtime;
use uuid::Uuid;

use crate::query_builders::{Connection, Dialect, RowCursor, Statement};
use crate::types::{DriverError, KeelError, KeelResult};
use crate::value::Value;

/// A SeaORM connection (`DatabaseConnection` or `DatabaseTransaction`) driven
/// synchronously
pub struct BlockingConnection<C> {
    conn: C,
    runtime: Arc<Runtime>,
}

fn driver_error(context: &str, err: DbErr) -> KeelError {
    KeelError::query_execution(context, Box::new(err))
}

impl BlockingConnection<DatabaseConnection> {
    /// Open a connection, e.g. `BlockingConnection::connect("sqlite::memory:")`
    pub fn connect<O: Into<ConnectOptions>>(options: O) -> KeelResult<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()
            .map_err(|e| KeelError::query_execution("connect", Box::new(e)))?;
        let options = options.into();
        let conn = runtime
            .block_on(Database::connect(options))
            .map_err(|e| driver_error("connect", e))?;
        log::debug!("connected to {:?} database", conn.get_database_backend());
        Ok(Self {
            conn,
            runtime: Arc::new(runtime),
        })
    }

    /// Start a transaction; it rolls back when dropped without `commit`
    pub fn begin(&self) -> KeelResult<BlockingConnection<DatabaseTransaction>> {
        let txn = self
            .block_on(self.conn.begin())
            .map_err(|e| driver_error("BEGIN", e))?;
        Ok(BlockingConnection {
            conn: txn,
            runtime: Arc::clone(&self.runtime),
        })
    }
}

impl BlockingConnection<DatabaseTransaction> {
    pub fn commit(self) -> KeelResult<()> {
        let Self { conn, runtime } = self;
        runtime
            .block_on(conn.commit())
            .map_err(|e| driver_error("COMMIT", e))
    }

    pub fn rollback(self) -> KeelResult<()> {
        let Self { conn, runtime } = self;
        runtime
            .block_on(conn.rollback())
            .map_err(|e| driver_error("ROLLBACK", e))
    }
}

impl<C: ConnectionTrait> BlockingConnection<C> {
    pub fn inner(&self) -> &C {
        &self.conn
    }

    pub fn backend(&self) -> DbBackend {
        self.conn.get_database_backend()
    }

    /// Run raw SQL without parameters (DDL, seeding) and return the rows affected
    pub fn execute_unprepared(&self, sql: &str) -> KeelResult<u64> {
        log::debug!(target: "keel::sql", "{}", sql);
        self.block_on(self.conn.execute_unprepared(sql))
            .map(|result| result.rows_affected())
            .map_err(|e| driver_error(sql, e))
    }

    fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }

    fn statement(&self, sql: &str, params: &[sea_orm::Value]) -> sea_orm::Statement {
        sea_orm::Statement::from_sql_and_values(self.backend(), sql, params.iter().cloned())
    }

    fn to_sea_value(&self, value: Value) -> sea_orm::Value {
        let sqlite = self.backend() == DbBackend::Sqlite;
        match value {
            Value::Null => Option::<String>::None.into(),
            Value::Bool(v) => v.into(),
            Value::Int(v) => v.into(),
            Value::BigInt(v) => v.into(),
            Value::Double(v) => v.into(),
            // SQLite has no decimal or uuid storage class
            Value::Decimal(v) if sqlite => v.to_f64().into(),
            Value::Decimal(v) => v.into(),
            Value::String(v) => v.into(),
            Value::Uuid(v) if sqlite => v.to_string().into(),
            Value::Uuid(v) => v.into(),
            Value::Date(v) => v.into(),
            Value::DateTime(v) => v.into(),
            Value::Bytes(v) => v.into(),
        }
    }
}

impl<C: ConnectionTrait> Connection for BlockingConnection<C> {
    fn dialect(&self) -> Dialect {
        match self.backend() {
            DbBackend::Sqlite => Dialect::Sqlite,
            DbBackend::MySql => Dialect::MySql,
            DbBackend::Postgres => Dialect::Postgres,
            #[allow(unreachable_patterns)]
            _ => Dialect::Generic,
        }
    }

    fn prepare<'c>(&'c self, sql: &str) -> Result<Box<dyn Statement + 'c>, DriverError> {
        Ok(Box::new(BlockingStatement {
            conn: self,
            sql: sql.to_string(),
            params: Vec::new(),
            last_insert_id: None,
        }))
    }
}

struct BlockingStatement<'c, C> {
    conn: &'c BlockingConnection<C>,
    sql: String,
    params: Vec<sea_orm::Value>,
    last_insert_id: Option<u64>,
}

impl<C: ConnectionTrait> Statement for BlockingStatement<'_, C> {
    fn bind(&mut self, value: Value) -> Result<(), DriverError> {
        self.params.push(self.conn.to_sea_value(value));
        Ok(())
    }

    fn execute_update(&mut self) -> Result<u64, DriverError> {
        let stmt = self.conn.statement(&self.sql, &self.params);
        let result = self.conn.block_on(self.conn.conn.execute(stmt))?;
        // Postgres reports generated keys through RETURNING only
        if self.conn.backend() != DbBackend::Postgres {
            self.last_insert_id = Some(result.last_insert_id());
        }
        Ok(result.rows_affected())
    }

    fn execute_query(&mut self) -> Result<Box<dyn RowCursor + '_>, DriverError> {
        let stmt = self.conn.statement(&self.sql, &self.params);
        let rows = self.conn.block_on(self.conn.conn.query_all(stmt))?;
        Ok(Box::new(BlockingRows { rows, pos: None }))
    }

    fn generated_key(&mut self) -> Result<Value, DriverError> {
        let id = self
            .last_insert_id
            .ok_or("no generated key available for this statement")?;
        Ok(Value::BigInt(i64::try_from(id)?))
    }
}

struct BlockingRows {
    rows: Vec<QueryResult>,
    pos: Option<usize>,
}

impl RowCursor for BlockingRows {
    fn next(&mut self) -> Result<bool, DriverError> {
        let next = self.pos.map_or(0, |p| p + 1);
        self.pos = Some(next.min(self.rows.len()));
        Ok(next < self.rows.len())
    }

    fn get(&self, column: &str) -> Result<Value, DriverError> {
        let row = self
            .pos
            .and_then(|p| self.rows.get(p))
            .ok_or("cursor is not positioned on a row")?;
        read_column(row, column)
    }
}

macro_rules! probe {
    ($row:expr, $column:expr, $($ty:ty => $variant:ident),+ $(,)?) => {{
        let mut failures: Vec<DbErr> = Vec::new();
        $(
            match $row.try_get_by::<Option<$ty>, _>($column) {
                Ok(Some(v)) => return Ok(Value::$variant(v)),
                Ok(None) => return Ok(Value::Null),
                Err(e) => failures.push(e),
            }
        )+
        failures.pop()
    }};
}

/// Read a column without knowing its declared type by trying SeaORM's typed
/// getters from the most to the least common representation
fn read_column(row: &QueryResult, column: &str) -> Result<Value, DriverError> {
    let last = probe!(
        row, column,
        i64 => BigInt,
        i32 => Int,
        f64 => Double,
        bool => Bool,
        String => String,
        Decimal => Decimal,
        Uuid => Uuid,
        NaiveDateTime => DateTime,
        NaiveDate => Date,
        Vec<u8> => Bytes,
    );
    Err(match last {
        Some(e) => format!("cannot read column '{}': {}", column, e).into(),
        None => format!("cannot read column '{}'", column).into(),
    })
}
