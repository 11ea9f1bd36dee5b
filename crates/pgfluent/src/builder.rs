//! The fluent builder handle and its accumulated clause state.

use crate::compiler::CompiledQuery;
use crate::predicate::{
    Connective, Join, JoinKind, LockMode, OrderItem, Predicate, PredicateKind, UnionKind,
};
use crate::value::Value;

/// Accumulated clause state for one SELECT-shaped statement part.
#[derive(Debug, Clone, Default)]
pub(crate) struct ClauseState {
    pub(crate) table: Option<String>,
    pub(crate) columns: Vec<String>,
    pub(crate) select_raw: Option<String>,
    pub(crate) wheres: Vec<Predicate>,
    pub(crate) havings: Vec<Predicate>,
    pub(crate) joins: Vec<Join>,
    pub(crate) group_by: Vec<String>,
    pub(crate) order_by: Vec<OrderItem>,
    pub(crate) limit: Option<i64>,
    pub(crate) offset: Option<i64>,
    pub(crate) lock: Option<LockMode>,
}

/// Start a builder on the given table.
pub fn table(name: impl Into<String>) -> Builder {
    Builder::new().table(name)
}

/// A fluent statement builder.
///
/// Chaining methods consume and return the handle; terminal operations live in
/// the execution module and borrow it mutably so the compiled statement can be
/// retained for [`Builder::dump`].
///
/// ```ignore
/// let rows = pgfluent::table("users")
///     .select(&["name", "points"])
///     .where_("points", ">=", 50)
///     .order_by("name", "ASC")
///     .get(&client)
///     .await?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct Builder {
    pub(crate) state: ClauseState,
    pub(crate) union_parts: Vec<(ClauseState, UnionKind)>,
    pending_union: Option<UnionKind>,
    pub(crate) last_query: Option<CompiledQuery>,
}

impl Builder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Point the builder at a table.
    ///
    /// After [`Builder::union`]/[`Builder::union_all`], this snapshots the
    /// clauses built so far as the left part of the union and starts a fresh
    /// state for the right part.
    pub fn table(mut self, name: impl Into<String>) -> Self {
        if let Some(kind) = self.pending_union.take() {
            let left = std::mem::take(&mut self.state);
            self.union_parts.push((left, kind));
        }
        self.state.table = Some(name.into());
        self
    }

    /// Replace the select list. An empty builder selects `*`.
    pub fn select(mut self, columns: &[&str]) -> Self {
        self.state.columns = columns.iter().map(|c| c.to_string()).collect();
        self
    }

    /// Append one column to the select list.
    pub fn add_select(mut self, column: impl Into<String>) -> Self {
        self.state.columns.push(column.into());
        self
    }

    /// Replace the select list with a verbatim expression.
    pub fn select_raw(mut self, expr: impl Into<String>) -> Self {
        self.state.select_raw = Some(expr.into());
        self
    }

    // ----- WHERE -----

    fn push_where(mut self, connective: Connective, kind: PredicateKind) -> Self {
        self.state.wheres.push(Predicate { connective, kind });
        self
    }

    /// `column op $n`, joined with AND.
    pub fn where_(self, column: impl Into<String>, op: impl Into<String>, value: impl Into<Value>) -> Self {
        self.push_where(
            Connective::And,
            PredicateKind::Compare {
                column: column.into(),
                op: op.into(),
                value: value.into(),
            },
        )
    }

    /// Alias of [`Builder::where_`] for chains that read better with it.
    pub fn and_where(self, column: impl Into<String>, op: impl Into<String>, value: impl Into<Value>) -> Self {
        self.where_(column, op, value)
    }

    /// `column op $n`, joined with OR.
    pub fn or_where(self, column: impl Into<String>, op: impl Into<String>, value: impl Into<Value>) -> Self {
        self.push_where(
            Connective::Or,
            PredicateKind::Compare {
                column: column.into(),
                op: op.into(),
                value: value.into(),
            },
        )
    }

    pub fn where_between(self, column: impl Into<String>, low: impl Into<Value>, high: impl Into<Value>) -> Self {
        self.push_where(
            Connective::And,
            PredicateKind::Between {
                column: column.into(),
                low: low.into(),
                high: high.into(),
                negated: false,
            },
        )
    }

    pub fn and_where_between(self, column: impl Into<String>, low: impl Into<Value>, high: impl Into<Value>) -> Self {
        self.where_between(column, low, high)
    }

    pub fn or_where_between(self, column: impl Into<String>, low: impl Into<Value>, high: impl Into<Value>) -> Self {
        self.push_where(
            Connective::Or,
            PredicateKind::Between {
                column: column.into(),
                low: low.into(),
                high: high.into(),
                negated: false,
            },
        )
    }

    pub fn where_not_between(self, column: impl Into<String>, low: impl Into<Value>, high: impl Into<Value>) -> Self {
        self.push_where(
            Connective::And,
            PredicateKind::Between {
                column: column.into(),
                low: low.into(),
                high: high.into(),
                negated: true,
            },
        )
    }

    pub fn and_where_not_between(self, column: impl Into<String>, low: impl Into<Value>, high: impl Into<Value>) -> Self {
        self.where_not_between(column, low, high)
    }

    pub fn or_where_not_between(self, column: impl Into<String>, low: impl Into<Value>, high: impl Into<Value>) -> Self {
        self.push_where(
            Connective::Or,
            PredicateKind::Between {
                column: column.into(),
                low: low.into(),
                high: high.into(),
                negated: true,
            },
        )
    }

    pub fn where_in<V: Into<Value>>(self, column: impl Into<String>, values: Vec<V>) -> Self {
        self.push_where(
            Connective::And,
            PredicateKind::InList {
                column: column.into(),
                values: values.into_iter().map(Into::into).collect(),
                negated: false,
            },
        )
    }

    pub fn and_where_in<V: Into<Value>>(self, column: impl Into<String>, values: Vec<V>) -> Self {
        self.where_in(column, values)
    }

    pub fn or_where_in<V: Into<Value>>(self, column: impl Into<String>, values: Vec<V>) -> Self {
        self.push_where(
            Connective::Or,
            PredicateKind::InList {
                column: column.into(),
                values: values.into_iter().map(Into::into).collect(),
                negated: false,
            },
        )
    }

    pub fn where_not_in<V: Into<Value>>(self, column: impl Into<String>, values: Vec<V>) -> Self {
        self.push_where(
            Connective::And,
            PredicateKind::InList {
                column: column.into(),
                values: values.into_iter().map(Into::into).collect(),
                negated: true,
            },
        )
    }

    pub fn and_where_not_in<V: Into<Value>>(self, column: impl Into<String>, values: Vec<V>) -> Self {
        self.where_not_in(column, values)
    }

    pub fn or_where_not_in<V: Into<Value>>(self, column: impl Into<String>, values: Vec<V>) -> Self {
        self.push_where(
            Connective::Or,
            PredicateKind::InList {
                column: column.into(),
                values: values.into_iter().map(Into::into).collect(),
                negated: true,
            },
        )
    }

    pub fn where_null(self, column: impl Into<String>) -> Self {
        self.push_where(
            Connective::And,
            PredicateKind::Null {
                column: column.into(),
                negated: false,
            },
        )
    }

    pub fn and_where_null(self, column: impl Into<String>) -> Self {
        self.where_null(column)
    }

    pub fn or_where_null(self, column: impl Into<String>) -> Self {
        self.push_where(
            Connective::Or,
            PredicateKind::Null {
                column: column.into(),
                negated: false,
            },
        )
    }

    pub fn where_not_null(self, column: impl Into<String>) -> Self {
        self.push_where(
            Connective::And,
            PredicateKind::Null {
                column: column.into(),
                negated: true,
            },
        )
    }

    pub fn and_where_not_null(self, column: impl Into<String>) -> Self {
        self.where_not_null(column)
    }

    pub fn or_where_not_null(self, column: impl Into<String>) -> Self {
        self.push_where(
            Connective::Or,
            PredicateKind::Null {
                column: column.into(),
                negated: true,
            },
        )
    }

    /// Verbatim WHERE fragment, joined with AND. The caller owns safety.
    pub fn where_raw(self, sql: impl Into<String>) -> Self {
        self.push_where(Connective::And, PredicateKind::Raw(sql.into()))
    }

    pub fn and_where_raw(self, sql: impl Into<String>) -> Self {
        self.where_raw(sql)
    }

    pub fn or_where_raw(self, sql: impl Into<String>) -> Self {
        self.push_where(Connective::Or, PredicateKind::Raw(sql.into()))
    }

    /// `EXISTS (SELECT ...)` over another builder's clauses. Subquery binds
    /// are numbered inline at the predicate's position.
    pub fn where_exists(self, sub: Builder) -> Self {
        self.push_where(
            Connective::And,
            PredicateKind::Exists {
                state: Box::new(sub.state),
                negated: false,
            },
        )
    }

    pub fn where_not_exists(self, sub: Builder) -> Self {
        self.push_where(
            Connective::And,
            PredicateKind::Exists {
                state: Box::new(sub.state),
                negated: true,
            },
        )
    }

    // ----- JOIN -----

    fn push_join(mut self, kind: JoinKind, table: impl Into<String>, left: impl Into<String>, op: impl Into<String>, right: impl Into<String>) -> Self {
        self.state.joins.push(Join {
            kind,
            table: table.into(),
            left: left.into(),
            op: op.into(),
            right: right.into(),
        });
        self
    }

    pub fn inner_join(self, table: impl Into<String>, left: impl Into<String>, op: impl Into<String>, right: impl Into<String>) -> Self {
        self.push_join(JoinKind::Inner, table, left, op, right)
    }

    pub fn left_join(self, table: impl Into<String>, left: impl Into<String>, op: impl Into<String>, right: impl Into<String>) -> Self {
        self.push_join(JoinKind::Left, table, left, op, right)
    }

    pub fn right_join(self, table: impl Into<String>, left: impl Into<String>, op: impl Into<String>, right: impl Into<String>) -> Self {
        self.push_join(JoinKind::Right, table, left, op, right)
    }

    pub fn full_join(self, table: impl Into<String>, left: impl Into<String>, op: impl Into<String>, right: impl Into<String>) -> Self {
        self.push_join(JoinKind::Full, table, left, op, right)
    }

    pub fn full_outer_join(self, table: impl Into<String>, left: impl Into<String>, op: impl Into<String>, right: impl Into<String>) -> Self {
        self.push_join(JoinKind::FullOuter, table, left, op, right)
    }

    // ----- GROUP BY / HAVING -----

    pub fn group_by(mut self, column: impl Into<String>) -> Self {
        self.state.group_by.push(column.into());
        self
    }

    fn push_having(mut self, connective: Connective, kind: PredicateKind) -> Self {
        self.state.havings.push(Predicate { connective, kind });
        self
    }

    /// `column op $n` in HAVING, joined with AND.
    pub fn having(self, column: impl Into<String>, op: impl Into<String>, value: impl Into<Value>) -> Self {
        self.push_having(
            Connective::And,
            PredicateKind::Compare {
                column: column.into(),
                op: op.into(),
                value: value.into(),
            },
        )
    }

    pub fn or_having(self, column: impl Into<String>, op: impl Into<String>, value: impl Into<Value>) -> Self {
        self.push_having(
            Connective::Or,
            PredicateKind::Compare {
                column: column.into(),
                op: op.into(),
                value: value.into(),
            },
        )
    }

    pub fn having_raw(self, sql: impl Into<String>) -> Self {
        self.push_having(Connective::And, PredicateKind::Raw(sql.into()))
    }

    pub fn and_having_raw(self, sql: impl Into<String>) -> Self {
        self.having_raw(sql)
    }

    pub fn or_having_raw(self, sql: impl Into<String>) -> Self {
        self.push_having(Connective::Or, PredicateKind::Raw(sql.into()))
    }

    // ----- ORDER / LIMIT / LOCK -----

    /// `ORDER BY column direction`, direction passed through verbatim.
    pub fn order_by(mut self, column: impl Into<String>, direction: impl Into<String>) -> Self {
        self.state.order_by.push(OrderItem::Column {
            column: column.into(),
            direction: direction.into(),
        });
        self
    }

    pub fn order_by_raw(mut self, expr: impl Into<String>) -> Self {
        self.state.order_by.push(OrderItem::Raw(expr.into()));
        self
    }

    /// `ORDER BY RANDOM()`
    pub fn in_random_order(mut self) -> Self {
        self.state.order_by.push(OrderItem::Random);
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.state.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: i64) -> Self {
        self.state.offset = Some(offset);
        self
    }

    pub fn lock_for_update(mut self) -> Self {
        self.state.lock = Some(LockMode::ForUpdate);
        self
    }

    pub fn lock_for_share(mut self) -> Self {
        self.state.lock = Some(LockMode::ForShare);
        self
    }

    // ----- UNION -----

    /// Mark the clauses built so far as the left side of a `UNION`; the next
    /// [`Builder::table`] call starts the right side.
    pub fn union(mut self) -> Self {
        self.pending_union = Some(UnionKind::Distinct);
        self
    }

    /// Same as [`Builder::union`] with `UNION ALL`.
    pub fn union_all(mut self) -> Self {
        self.pending_union = Some(UnionKind::All);
        self
    }
}
