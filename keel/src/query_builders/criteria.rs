use std::fmt;
use std::str::FromStr;

use crate::value::Value;

/// Comparison operator of a `Criterion`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Like,
    In,
}

impl Operator {
    pub fn as_sql(self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::Ne => "!=",
            Operator::Lt => "<",
            Operator::Le => "<=",
            Operator::Gt => ">",
            Operator::Ge => ">=",
            Operator::Like => "LIKE",
            Operator::In => "IN",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

impl FromStr for Operator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "=" | "==" => Ok(Operator::Eq),
            "!=" | "<>" => Ok(Operator::Ne),
            "<" => Ok(Operator::Lt),
            "<=" => Ok(Operator::Le),
            ">" => Ok(Operator::Gt),
            ">=" => Ok(Operator::Ge),
            "LIKE" => Ok(Operator::Like),
            "IN" => Ok(Operator::In),
            other => Err(format!("unsupported operator '{}'", other)),
        }
    }
}

/// Right-hand side of a criterion
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Single(Value),
    List(Vec<Value>),
}

impl Operand {
    /// Parameters in bind order
    pub fn values(&self) -> &[Value] {
        match self {
            Operand::Single(value) => std::slice::from_ref(value),
            Operand::List(values) => values,
        }
    }
}

/// One `column operator value` predicate.
///
/// Column and operator come from code and are rendered as is; values are always
/// bound as parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Criterion {
    column: String,
    operator: Operator,
    operand: Operand,
}

impl Criterion {
    pub fn new(column: impl Into<String>, operator: Operator, value: impl Into<Value>) -> Self {
        let value = value.into();
        let operand = match operator {
            Operator::In => Operand::List(vec![value]),
            _ => Operand::Single(value),
        };
        Self {
            column: column.into(),
            operator,
            operand,
        }
    }

    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(column, Operator::Eq, value)
    }

    pub fn ne(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(column, Operator::Ne, value)
    }

    pub fn lt(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(column, Operator::Lt, value)
    }

    pub fn le(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(column, Operator::Le, value)
    }

    pub fn gt(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(column, Operator::Gt, value)
    }

    pub fn ge(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(column, Operator::Ge, value)
    }

    pub fn like(column: impl Into<String>, pattern: impl Into<Value>) -> Self {
        Self::new(column, Operator::Like, pattern)
    }

    pub fn is_in<V: Into<Value>>(
        column: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        Self {
            column: column.into(),
            operator: Operator::In,
            operand: Operand::List(values.into_iter().map(Into::into).collect()),
        }
    }

    pub fn column(&self) -> &str {
        &self.column
    }

    pub fn operator(&self) -> Operator {
        self.operator
    }

    pub fn operand(&self) -> &Operand {
        &self.operand
    }
}

/// How the WHERE fragments of a criteria search are joined
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
    And,
    Or,
}

impl Combinator {
    pub fn as_sql(self) -> &'static str {
        match self {
            Combinator::And => " AND ",
            Combinator::Or => " OR ",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operators_parse_case_insensitively() {
        assert_eq!("like".parse::<Operator>().unwrap(), Operator::Like);
        assert_eq!("<>".parse::<Operator>().unwrap(), Operator::Ne);
        assert_eq!(" >= ".parse::<Operator>().unwrap(), Operator::Ge);
        assert!("~".parse::<Operator>().is_err());
    }

    #[test]
    fn in_with_a_single_value_becomes_a_list() {
        let c = Criterion::new("id", Operator::In, 3);
        assert_eq!(c.operand(), &Operand::List(vec![Value::Int(3)]));
    }

    #[test]
    fn is_in_collects_values_in_order() {
        let c = Criterion::is_in("name", ["a", "b"]);
        assert_eq!(
            c.operand().values(),
            &[Value::String("a".into()), Value::String("b".into())]
        );
    }
}
