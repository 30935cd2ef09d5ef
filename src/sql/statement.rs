//! Prepared statement templates and bound statements.

use std::sync::Arc;

use super::types::Value;

/// A parameterized statement template, prepared once and bound many times.
///
/// Cloning is cheap; the SQL text is shared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedStatement {
    sql: Arc<str>,
}

impl PreparedStatement {
    /// Creates a template from SQL text with `?NNN` placeholders.
    pub fn new(sql: impl Into<Arc<str>>) -> Self {
        Self { sql: sql.into() }
    }

    /// The statement's SQL text.
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Binds positional parameters, producing an executable statement.
    pub fn bind<I>(&self, params: I) -> Statement
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        Statement {
            sql: Arc::clone(&self.sql),
            params: params.into_iter().map(Into::into).collect(),
        }
    }

    /// Binds no parameters.
    pub fn bind_none(&self) -> Statement {
        self.bind(std::iter::empty::<Value>())
    }
}

/// A statement with its positional parameters bound.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    sql: Arc<str>,
    params: Vec<Value>,
}

impl Statement {
    /// The statement's SQL text.
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Bound parameters in position order.
    pub fn params(&self) -> &[Value] {
        &self.params
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_shares_sql() {
        let prepared = PreparedStatement::new("SELECT ?1, ?2");
        let a = prepared.bind([Value::from("x"), Value::Integer(1)]);
        let b = prepared.bind_none();

        assert_eq!(a.sql(), "SELECT ?1, ?2");
        assert_eq!(a.params(), &[Value::Text("x".into()), Value::Integer(1)]);
        assert!(b.params().is_empty());
    }
}
