//! ORDER BY specifications.

use crate::item::SelectExpr;
use crate::param::ParamList;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

/// Placement of NULLs. `Default` follows Postgres: last for ASC, first for DESC.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum NullsOrder {
    #[default]
    Default,
    First,
    Last,
}

/// One ORDER BY key.
#[derive(Clone, Debug, PartialEq)]
pub struct OrderSpec {
    target: SelectExpr,
    direction: Direction,
    nulls: NullsOrder,
}

impl OrderSpec {
    pub fn asc(target: SelectExpr) -> Self {
        Self {
            target,
            direction: Direction::Asc,
            nulls: NullsOrder::Default,
        }
    }

    pub fn desc(target: SelectExpr) -> Self {
        Self {
            target,
            direction: Direction::Desc,
            nulls: NullsOrder::Default,
        }
    }

    pub fn nulls_first(mut self) -> Self {
        self.nulls = NullsOrder::First;
        self
    }

    pub fn nulls_last(mut self) -> Self {
        self.nulls = NullsOrder::Last;
        self
    }

    pub fn target(&self) -> &SelectExpr {
        &self.target
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Whether NULLs sort before non-NULLs once defaults are resolved.
    pub fn nulls_come_first(&self) -> bool {
        match self.nulls {
            NullsOrder::First => true,
            NullsOrder::Last => false,
            NullsOrder::Default => self.direction == Direction::Desc,
        }
    }

    pub fn build(&self, params: &mut ParamList) -> String {
        let mut sql = self.target.build(params);
        sql.push_str(match self.direction {
            Direction::Asc => " ASC",
            Direction::Desc => " DESC",
        });
        match self.nulls {
            NullsOrder::Default => {}
            NullsOrder::First => sql.push_str(" NULLS FIRST"),
            NullsOrder::Last => sql.push_str(" NULLS LAST"),
        }
        sql
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::ColumnRef;

    fn username() -> SelectExpr {
        SelectExpr::Column(ColumnRef::new("m", "username"))
    }

    #[test]
    fn explicit_nulls_rendered() {
        let spec = OrderSpec::asc(username()).nulls_last();
        assert_eq!(
            spec.build(&mut ParamList::new()),
            "\"m\".\"username\" ASC NULLS LAST"
        );
        assert!(!spec.nulls_come_first());
    }

    #[test]
    fn default_nulls_follow_direction() {
        assert!(!OrderSpec::asc(username()).nulls_come_first());
        assert!(OrderSpec::desc(username()).nulls_come_first());
        assert_eq!(
            OrderSpec::desc(username()).build(&mut ParamList::new()),
            "\"m\".\"username\" DESC"
        );
    }
}
