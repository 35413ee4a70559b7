use keel::BlockingConnection;
use sea_orm::{ConnectOptions, DatabaseConnection};

#[cfg(test)]
#[allow(dead_code)]
pub fn setup_test_db() -> BlockingConnection<DatabaseConnection> {
    let _ = env_logger::builder().is_test(true).try_init();

    // A single pooled connection keeps the in-memory database alive and shared
    let mut options = ConnectOptions::new("sqlite::memory:");
    options
        .max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);
    BlockingConnection::connect(options).unwrap()
}

#[cfg(test)]
#[allow(dead_code)]
pub fn setup_with_schema(ddl: &[&str]) -> BlockingConnection<DatabaseConnection> {
    let db = setup_test_db();
    for statement in ddl {
        db.execute_unprepared(statement).unwrap();
    }
    db
}
