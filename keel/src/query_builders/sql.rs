//! Parameterised SQL text for every statement the engine issues.
//!
//! Table and column names come from entity descriptors and are rendered as is;
//! values never appear in the text, only placeholders.

use super::connection_like::Dialect;
use super::criteria::{Combinator, Criterion, Operand};
use crate::value::Value;

/// Renders statements for one dialect
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryBuilder {
    dialect: Dialect,
}

struct Placeholders {
    dialect: Dialect,
    issued: usize,
}

impl Placeholders {
    fn new(dialect: Dialect) -> Self {
        Self { dialect, issued: 0 }
    }

    fn next(&mut self) -> String {
        self.issued += 1;
        match self.dialect {
            Dialect::Postgres => format!("${}", self.issued),
            _ => "?".to_string(),
        }
    }

    fn take(&mut self, count: usize) -> String {
        (0..count).map(|_| self.next()).collect::<Vec<_>>().join(", ")
    }
}

impl QueryBuilder {
    pub fn new(dialect: Dialect) -> Self {
        Self { dialect }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// `INSERT INTO t (c1, c2) VALUES (?, ?)`, one placeholder per column in order
    pub fn insert(&self, table: &str, columns: &[&str]) -> String {
        if columns.is_empty() {
            return match self.dialect {
                Dialect::MySql => format!("INSERT INTO {} () VALUES ()", table),
                _ => format!("INSERT INTO {} DEFAULT VALUES", table),
            };
        }
        let mut placeholders = Placeholders::new(self.dialect);
        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            table,
            columns.join(", "),
            placeholders.take(columns.len())
        )
    }

    /// Insert that hands the generated id back as a one-row result
    pub fn insert_returning(&self, table: &str, columns: &[&str], id_column: &str) -> String {
        format!("{} RETURNING {}", self.insert(table, columns), id_column)
    }

    /// `UPDATE t SET c1 = ?, c2 = ? WHERE id = ?`; the id parameter is always last
    pub fn update(&self, table: &str, columns: &[&str], id_column: &str) -> String {
        let mut placeholders = Placeholders::new(self.dialect);
        let sets = columns
            .iter()
            .map(|column| format!("{} = {}", column, placeholders.next()))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "UPDATE {} SET {} WHERE {} = {}",
            table,
            sets,
            id_column,
            placeholders.next()
        )
    }

    pub fn delete(&self, table: &str, id_column: &str) -> String {
        let mut placeholders = Placeholders::new(self.dialect);
        format!("DELETE FROM {} WHERE {} = {}", table, id_column, placeholders.next())
    }

    pub fn select_by_id(&self, table: &str, id_column: &str) -> String {
        let mut placeholders = Placeholders::new(self.dialect);
        format!("SELECT * FROM {} WHERE {} = {}", table, id_column, placeholders.next())
    }

    pub fn select_all(&self, table: &str, id_column: &str) -> String {
        format!("SELECT * FROM {} ORDER BY {} ASC", table, id_column)
    }

    /// Criteria search ordered by id; returns the text and the parameters in bind order.
    ///
    /// No criteria renders no WHERE clause.
    pub fn select_by_criteria(
        &self,
        table: &str,
        id_column: &str,
        criteria: &[Criterion],
        combinator: Combinator,
    ) -> (String, Vec<Value>) {
        if criteria.is_empty() {
            return (self.select_all(table, id_column), Vec::new());
        }

        let mut placeholders = Placeholders::new(self.dialect);
        let mut params = Vec::new();
        let mut fragments = Vec::with_capacity(criteria.len());
        for criterion in criteria {
            let fragment = match criterion.operand() {
                Operand::Single(value) => {
                    params.push(value.clone());
                    format!(
                        "{} {} {}",
                        criterion.column(),
                        criterion.operator(),
                        placeholders.next()
                    )
                }
                // An empty IN list matches nothing
                Operand::List(values) if values.is_empty() => {
                    format!("{} IN (NULL)", criterion.column())
                }
                Operand::List(values) => {
                    params.extend(values.iter().cloned());
                    format!(
                        "{} {} ({})",
                        criterion.column(),
                        criterion.operator(),
                        placeholders.take(values.len())
                    )
                }
            };
            fragments.push(fragment);
        }

        let sql = format!(
            "SELECT * FROM {} WHERE {} ORDER BY {} ASC",
            table,
            fragments.join(combinator.as_sql()),
            id_column
        );
        (sql, params)
    }

    /// Single stored column of one row, used to load a lazy foreign key
    pub fn select_column(&self, table: &str, column: &str, id_column: &str) -> String {
        let mut placeholders = Placeholders::new(self.dialect);
        format!(
            "SELECT {} FROM {} WHERE {} = {}",
            column,
            table,
            id_column,
            placeholders.next()
        )
    }

    /// The row with the greatest id
    pub fn select_last(&self, table: &str, id_column: &str) -> String {
        format!("SELECT * FROM {} ORDER BY {} DESC LIMIT 1", table, id_column)
    }
}
