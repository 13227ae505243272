//! Bind parameter collection.

use crate::value::Value;
use tokio_postgres::types::ToSql;

/// Ordered bind parameters for one statement.
///
/// Placeholders are 1-based: the first pushed value renders as `$1`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ParamList {
    params: Vec<Value>,
}

impl ParamList {
    pub fn new() -> Self {
        Self { params: Vec::new() }
    }

    /// Add a parameter and return its 1-based index.
    pub fn push(&mut self, value: Value) -> usize {
        self.params.push(value);
        self.params.len()
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn values(&self) -> &[Value] {
        &self.params
    }

    /// Borrow all parameters for tokio-postgres.
    pub fn as_refs(&self) -> Vec<&(dyn ToSql + Sync)> {
        self.params.iter().map(|p| p as &(dyn ToSql + Sync)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indices_are_one_based() {
        let mut params = ParamList::new();
        assert_eq!(params.push(Value::Int(1)), 1);
        assert_eq!(params.push(Value::Null), 2);
        assert_eq!(params.as_refs().len(), 2);
    }
}
