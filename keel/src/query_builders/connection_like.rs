use crate::types::DriverError;
use crate::value::Value;

/// SQL flavour of a connection, used to pick placeholders and key retrieval
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dialect {
    #[default]
    Generic,
    Sqlite,
    MySql,
    Postgres,
}

impl Dialect {
    /// Whether generated keys come back through `INSERT ... RETURNING`
    pub fn returns_inserted_key(self) -> bool {
        matches!(self, Dialect::Postgres)
    }
}

/// Caller-owned database handle the engine runs statements on.
///
/// The engine never opens, pools or closes connections; a transaction handle
/// works the same way as long as it implements this trait.
pub trait Connection {
    fn dialect(&self) -> Dialect {
        Dialect::Generic
    }

    fn prepare<'c>(&'c self, sql: &str) -> Result<Box<dyn Statement + 'c>, DriverError>;
}

/// A prepared statement with positional parameters
pub trait Statement {
    /// Bind the next positional parameter
    fn bind(&mut self, value: Value) -> Result<(), DriverError>;

    fn execute_update(&mut self) -> Result<u64, DriverError>;

    fn execute_query(&mut self) -> Result<Box<dyn RowCursor + '_>, DriverError>;

    /// Key generated by the last `execute_update`
    fn generated_key(&mut self) -> Result<Value, DriverError>;
}

/// Forward-only cursor over a result set
pub trait RowCursor {
    fn next(&mut self) -> Result<bool, DriverError>;

    fn get(&self, column: &str) -> Result<Value, DriverError>;
}

impl<C: Connection + ?Sized> Connection for &C {
    fn dialect(&self) -> Dialect {
        (**self).dialect()
    }

    fn prepare<'c>(&'c self, sql: &str) -> Result<Box<dyn Statement + 'c>, DriverError> {
        (**self).prepare(sql)
    }
}
