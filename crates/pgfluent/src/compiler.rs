//! Pure clause-state → SQL compilation.
//!
//! Every function here is side-effect free: it walks the accumulated clauses
//! and produces a [`CompiledQuery`] holding the statement text and its ordered
//! bind list. Placeholder indices come from [`Binds::push`] at render time, so
//! subqueries and union parts number continuously without string rewriting.

use crate::builder::ClauseState;
use crate::error::{DbError, DbResult};
use crate::predicate::{OrderItem, Predicate, PredicateKind, UnionKind};
use crate::value::{Binds, Value};

/// A compiled statement: SQL text plus its ordered binds.
#[derive(Debug, Clone)]
pub struct CompiledQuery {
    pub sql: String,
    pub binds: Binds,
}

/// Compile a SELECT, including any snapshotted union parts before the
/// current state. All parts share one bind list, numbered left to right.
pub(crate) fn select(state: &ClauseState, unions: &[(ClauseState, UnionKind)]) -> CompiledQuery {
    let mut binds = Binds::new();
    let mut sql = String::new();
    for (left, kind) in unions {
        select_into(left, None, &mut binds, &mut sql, true);
        sql.push_str(kind.sql());
    }
    select_into(state, None, &mut binds, &mut sql, true);
    CompiledQuery { sql, binds }
}

/// Compile a single-column aggregate SELECT. The given expression replaces
/// the select list; ordering, limit, offset and locks are dropped since they
/// cannot change a one-row aggregate.
pub(crate) fn aggregate(state: &ClauseState, expr: &str) -> CompiledQuery {
    let mut binds = Binds::new();
    let mut sql = String::new();
    select_into(state, Some(expr), &mut binds, &mut sql, false);
    CompiledQuery { sql, binds }
}

fn select_list(state: &ClauseState) -> String {
    if let Some(raw) = &state.select_raw {
        raw.clone()
    } else if state.columns.is_empty() {
        "*".to_string()
    } else {
        state.columns.join(", ")
    }
}

fn select_into(
    state: &ClauseState,
    select_override: Option<&str>,
    binds: &mut Binds,
    out: &mut String,
    with_tail: bool,
) {
    out.push_str("SELECT ");
    match select_override {
        Some(expr) => out.push_str(expr),
        None => out.push_str(&select_list(state)),
    }
    out.push_str(" FROM ");
    out.push_str(state.table.as_deref().unwrap_or_default());

    for join in &state.joins {
        out.push(' ');
        out.push_str(join.kind.sql());
        out.push(' ');
        out.push_str(&join.table);
        out.push_str(" ON ");
        out.push_str(&join.left);
        out.push(' ');
        out.push_str(&join.op);
        out.push(' ');
        out.push_str(&join.right);
    }

    render_predicates("WHERE", &state.wheres, binds, out);

    if !state.group_by.is_empty() {
        out.push_str(" GROUP BY ");
        out.push_str(&state.group_by.join(", "));
    }

    render_predicates("HAVING", &state.havings, binds, out);

    if !with_tail {
        return;
    }

    if !state.order_by.is_empty() {
        out.push_str(" ORDER BY ");
        for (i, item) in state.order_by.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            match item {
                OrderItem::Column { column, direction } => {
                    out.push_str(column);
                    out.push(' ');
                    out.push_str(direction);
                }
                OrderItem::Raw(expr) => out.push_str(expr),
                OrderItem::Random => out.push_str("RANDOM()"),
            }
        }
    }

    if let Some(limit) = state.limit {
        out.push_str(&format!(" LIMIT {limit}"));
    }
    if let Some(offset) = state.offset {
        out.push_str(&format!(" OFFSET {offset}"));
    }
    if let Some(lock) = state.lock {
        out.push_str(lock.sql());
    }
}

fn render_predicates(keyword: &str, preds: &[Predicate], binds: &mut Binds, out: &mut String) {
    if preds.is_empty() {
        return;
    }
    out.push(' ');
    out.push_str(keyword);
    out.push(' ');
    for (i, pred) in preds.iter().enumerate() {
        // The first node's connective is suppressed; the rest render strictly
        // left to right with no parenthesization.
        if i > 0 {
            out.push_str(pred.connective.sql());
        }
        render_kind(&pred.kind, binds, out);
    }
}

fn render_kind(kind: &PredicateKind, binds: &mut Binds, out: &mut String) {
    match kind {
        PredicateKind::Compare { column, op, value } => {
            let idx = binds.push(value.clone());
            out.push_str(&format!("{column} {op} ${idx}"));
        }
        PredicateKind::Between {
            column,
            low,
            high,
            negated,
        } => {
            let not = if *negated { "NOT " } else { "" };
            let lo = binds.push(low.clone());
            let hi = binds.push(high.clone());
            out.push_str(&format!("{column} {not}BETWEEN ${lo} AND ${hi}"));
        }
        PredicateKind::InList {
            column,
            values,
            negated,
        } => {
            let keyword = if *negated { "NOT IN" } else { "IN" };
            let placeholders: Vec<String> = values
                .iter()
                .map(|v| format!("${}", binds.push(v.clone())))
                .collect();
            out.push_str(&format!("{column} {keyword} ({})", placeholders.join(", ")));
        }
        PredicateKind::Null { column, negated } => {
            let not = if *negated { "NOT " } else { "" };
            out.push_str(&format!("{column} IS {not}NULL"));
        }
        PredicateKind::Raw(sql) => out.push_str(sql),
        PredicateKind::Exists { state, negated } => {
            if *negated {
                out.push_str("NOT ");
            }
            out.push_str("EXISTS (");
            select_into(state, None, binds, out, true);
            out.push(')');
        }
    }
}

/// Compile an INSERT of one row.
pub(crate) fn insert(table: &str, data: &[(&str, Value)], returning_id: bool) -> CompiledQuery {
    let mut binds = Binds::new();
    let columns: Vec<&str> = data.iter().map(|(c, _)| *c).collect();
    let placeholders: Vec<String> = data
        .iter()
        .map(|(_, v)| format!("${}", binds.push(v.clone())))
        .collect();
    let mut sql = format!(
        "INSERT INTO {table} ({}) VALUES ({})",
        columns.join(", "),
        placeholders.join(", ")
    );
    if returning_id {
        sql.push_str(" RETURNING id");
    }
    CompiledQuery { sql, binds }
}

/// Compile a multi-row INSERT. The first row fixes the column order; every
/// other row must carry exactly the same columns. Binds flatten row-major.
pub(crate) fn insert_batch(table: &str, rows: &[Vec<(&str, Value)>]) -> DbResult<CompiledQuery> {
    let first = rows
        .first()
        .ok_or_else(|| DbError::shape("batch insert requires at least one row"))?;
    let columns: Vec<&str> = first.iter().map(|(c, _)| *c).collect();

    let mut binds = Binds::new();
    let mut tuples = Vec::with_capacity(rows.len());
    for row in rows {
        if row.len() != columns.len() {
            return Err(DbError::shape(format!(
                "row has {} columns, first row has {}",
                row.len(),
                columns.len()
            )));
        }
        let mut placeholders = Vec::with_capacity(columns.len());
        for column in &columns {
            let (_, value) = row
                .iter()
                .find(|(c, _)| c == column)
                .ok_or_else(|| DbError::shape(format!("row is missing column '{column}'")))?;
            placeholders.push(format!("${}", binds.push(value.clone())));
        }
        tuples.push(format!("({})", placeholders.join(", ")));
    }

    Ok(CompiledQuery {
        sql: format!(
            "INSERT INTO {table} ({}) VALUES {}",
            columns.join(", "),
            tuples.join(", ")
        ),
        binds,
    })
}

/// Compile an upsert: INSERT with `ON CONFLICT (key) DO UPDATE SET` assigning
/// `EXCLUDED.column` for every non-key column.
pub(crate) fn replace(table: &str, data: &[(&str, Value)], conflict: &str) -> CompiledQuery {
    let mut query = insert(table, data, false);
    let assignments: Vec<String> = data
        .iter()
        .filter(|(c, _)| *c != conflict)
        .map(|(c, _)| format!("{c} = EXCLUDED.{c}"))
        .collect();
    query.sql.push_str(&format!(
        " ON CONFLICT ({conflict}) DO UPDATE SET {}",
        assignments.join(", ")
    ));
    query
}

/// Compile an UPDATE. SET binds come first, then WHERE binds.
pub(crate) fn update(state: &ClauseState, table: &str, data: &[(&str, Value)]) -> CompiledQuery {
    let mut binds = Binds::new();
    let assignments: Vec<String> = data
        .iter()
        .map(|(c, v)| format!("{c} = ${}", binds.push(v.clone())))
        .collect();
    let mut sql = format!("UPDATE {table} SET {}", assignments.join(", "));
    render_predicates("WHERE", &state.wheres, &mut binds, &mut sql);
    CompiledQuery { sql, binds }
}

/// Compile a DELETE honoring the accumulated WHERE clauses.
pub(crate) fn delete(state: &ClauseState, table: &str) -> CompiledQuery {
    let mut binds = Binds::new();
    let mut sql = format!("DELETE FROM {table}");
    render_predicates("WHERE", &state.wheres, &mut binds, &mut sql);
    CompiledQuery { sql, binds }
}

/// Compile an in-place increment or decrement of a numeric column.
pub(crate) fn crement(
    state: &ClauseState,
    table: &str,
    column: &str,
    sign: char,
    amount: i64,
) -> CompiledQuery {
    let mut binds = Binds::new();
    let idx = binds.push(Value::Int(amount));
    let mut sql = format!("UPDATE {table} SET {column} = {column} {sign} ${idx}");
    render_predicates("WHERE", &state.wheres, &mut binds, &mut sql);
    CompiledQuery { sql, binds }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{Builder, table};

    fn compile(b: &Builder) -> CompiledQuery {
        select(&b.state, &b.union_parts)
    }

    #[test]
    fn bare_table_selects_star() {
        let q = compile(&table("users"));
        assert_eq!(q.sql, "SELECT * FROM users");
        assert!(q.binds.is_empty());
    }

    #[test]
    fn select_list_and_add_select() {
        let q = compile(&table("users").select(&["name", "points"]).add_select("id"));
        assert_eq!(q.sql, "SELECT name, points, id FROM users");
    }

    #[test]
    fn select_raw_overrides_columns() {
        let q = compile(&table("users").select(&["name"]).select_raw("COUNT(*) AS n"));
        assert_eq!(q.sql, "SELECT COUNT(*) AS n FROM users");
    }

    #[test]
    fn where_chain_renders_left_to_right() {
        let q = compile(
            &table("users")
                .where_("points", ">=", 50)
                .and_where("name", "=", "alice")
                .or_where("id", "=", 3),
        );
        assert_eq!(
            q.sql,
            "SELECT * FROM users WHERE points >= $1 AND name = $2 OR id = $3"
        );
        assert_eq!(
            q.binds.values(),
            &[Value::Int(50), Value::Text("alice".into()), Value::Int(3)]
        );
    }

    #[test]
    fn mixed_connectives_are_not_parenthesized() {
        let q = compile(
            &table("t")
                .or_where("a", "=", 1)
                .or_where("b", "=", 2)
                .where_("c", "=", 3),
        );
        // First connective suppressed, even when the chain opened with or_where.
        assert_eq!(q.sql, "SELECT * FROM t WHERE a = $1 OR b = $2 AND c = $3");
    }

    #[test]
    fn between_variants() {
        let q = compile(
            &table("t")
                .where_between("points", 10, 20)
                .or_where_not_between("points", 50, 60),
        );
        assert_eq!(
            q.sql,
            "SELECT * FROM t WHERE points BETWEEN $1 AND $2 OR points NOT BETWEEN $3 AND $4"
        );
        assert_eq!(q.binds.len(), 4);
    }

    #[test]
    fn in_list_variants() {
        let q = compile(
            &table("t")
                .where_in("id", vec![1, 2, 3])
                .where_not_in("status", vec!["dead", "gone"]),
        );
        assert_eq!(
            q.sql,
            "SELECT * FROM t WHERE id IN ($1, $2, $3) AND status NOT IN ($4, $5)"
        );
    }

    #[test]
    fn null_checks_take_no_binds() {
        let q = compile(&table("t").where_null("deleted_at").or_where_not_null("points"));
        assert_eq!(
            q.sql,
            "SELECT * FROM t WHERE deleted_at IS NULL OR points IS NOT NULL"
        );
        assert!(q.binds.is_empty());
    }

    #[test]
    fn raw_fragment_is_verbatim() {
        let q = compile(&table("t").where_raw("points > 100").or_where("id", "=", 1));
        assert_eq!(q.sql, "SELECT * FROM t WHERE points > 100 OR id = $1");
    }

    #[test]
    fn exists_subquery_numbers_binds_inline() {
        let q = compile(
            &table("users")
                .where_("a", "=", 1)
                .where_exists(table("orders").where_("total", ">", 2))
                .where_("c", "=", 3),
        );
        assert_eq!(
            q.sql,
            "SELECT * FROM users WHERE a = $1 AND EXISTS (SELECT * FROM orders WHERE total > $2) AND c = $3"
        );
        assert_eq!(q.binds.len(), 3);
    }

    #[test]
    fn not_exists_subquery() {
        let q = compile(&table("users").where_not_exists(table("bans").where_("user_id", "=", 9)));
        assert_eq!(
            q.sql,
            "SELECT * FROM users WHERE NOT EXISTS (SELECT * FROM bans WHERE user_id = $1)"
        );
    }

    #[test]
    fn joins_render_in_order() {
        let q = compile(
            &table("users")
                .select(&["users.name", "orders.total"])
                .inner_join("orders", "users.id", "=", "orders.user_id")
                .left_join("plans", "users.plan_id", "=", "plans.id"),
        );
        assert_eq!(
            q.sql,
            "SELECT users.name, orders.total FROM users \
             INNER JOIN orders ON users.id = orders.user_id \
             LEFT JOIN plans ON users.plan_id = plans.id"
        );
    }

    #[test]
    fn group_by_and_having_bind_after_where() {
        let q = compile(
            &table("orders")
                .select(&["user_id"])
                .where_("status", "=", "paid")
                .group_by("user_id")
                .having("SUM(total)", ">", 100)
                .or_having_raw("COUNT(*) > 5"),
        );
        assert_eq!(
            q.sql,
            "SELECT user_id FROM orders WHERE status = $1 GROUP BY user_id \
             HAVING SUM(total) > $2 OR COUNT(*) > 5"
        );
        assert_eq!(
            q.binds.values(),
            &[Value::Text("paid".into()), Value::Int(100)]
        );
    }

    #[test]
    fn order_limit_offset_and_lock() {
        let q = compile(
            &table("users")
                .order_by("name", "ASC")
                .order_by_raw("points DESC NULLS LAST")
                .limit(10)
                .offset(20)
                .lock_for_update(),
        );
        assert_eq!(
            q.sql,
            "SELECT * FROM users ORDER BY name ASC, points DESC NULLS LAST \
             LIMIT 10 OFFSET 20 FOR UPDATE"
        );
    }

    #[test]
    fn random_order_and_share_lock() {
        let q = compile(&table("users").in_random_order().lock_for_share());
        assert_eq!(q.sql, "SELECT * FROM users ORDER BY RANDOM() FOR SHARE");
    }

    #[test]
    fn union_numbers_binds_continuously() {
        let q = compile(
            &table("test")
                .select(&["bar", "baz"])
                .where_("bar", "=", "x")
                .union()
                .table("users")
                .select(&["name", "points"])
                .where_("points", ">", 5),
        );
        assert_eq!(
            q.sql,
            "SELECT bar, baz FROM test WHERE bar = $1 \
             UNION SELECT name, points FROM users WHERE points > $2"
        );
        assert_eq!(q.binds.len(), 2);
    }

    #[test]
    fn union_all_keeps_duplicates_keyword() {
        let q = compile(&table("a").union_all().table("b"));
        assert_eq!(q.sql, "SELECT * FROM a UNION ALL SELECT * FROM b");
    }

    #[test]
    fn aggregate_drops_order_and_limit() {
        let b = table("users").where_("points", ">", 1).order_by("name", "ASC").limit(5);
        let q = aggregate(&b.state, "COUNT(*)");
        assert_eq!(q.sql, "SELECT COUNT(*) FROM users WHERE points > $1");
    }

    #[test]
    fn sum_casts_to_float8() {
        let b = table("users");
        let q = aggregate(&b.state, "SUM(points)::float8");
        assert_eq!(q.sql, "SELECT SUM(points)::float8 FROM users");
    }

    #[test]
    fn insert_single_row() {
        let q = insert(
            "users",
            &[("name", Value::from("alice")), ("points", Value::from(50))],
            false,
        );
        assert_eq!(q.sql, "INSERT INTO users (name, points) VALUES ($1, $2)");
        assert_eq!(q.binds.len(), 2);
    }

    #[test]
    fn insert_returning_id() {
        let q = insert("users", &[("name", Value::from("bob"))], true);
        assert_eq!(q.sql, "INSERT INTO users (name) VALUES ($1) RETURNING id");
    }

    #[test]
    fn batch_insert_flattens_row_major() {
        let q = insert_batch(
            "users",
            &[
                vec![("name", Value::from("a")), ("points", Value::from(1))],
                vec![("name", Value::from("b")), ("points", Value::from(2))],
            ],
        )
        .unwrap();
        assert_eq!(
            q.sql,
            "INSERT INTO users (name, points) VALUES ($1, $2), ($3, $4)"
        );
        assert_eq!(
            q.binds.values(),
            &[
                Value::Text("a".into()),
                Value::Int(1),
                Value::Text("b".into()),
                Value::Int(2)
            ]
        );
    }

    #[test]
    fn batch_insert_reorders_columns_to_first_row() {
        let q = insert_batch(
            "users",
            &[
                vec![("name", Value::from("a")), ("points", Value::from(1))],
                vec![("points", Value::from(2)), ("name", Value::from("b"))],
            ],
        )
        .unwrap();
        assert_eq!(
            q.binds.values(),
            &[
                Value::Text("a".into()),
                Value::Int(1),
                Value::Text("b".into()),
                Value::Int(2)
            ]
        );
    }

    #[test]
    fn batch_insert_rejects_shape_mismatch() {
        let err = insert_batch(
            "users",
            &[
                vec![("name", Value::from("a"))],
                vec![("name", Value::from("b")), ("points", Value::from(2))],
            ],
        )
        .unwrap_err();
        assert!(matches!(err, DbError::Shape(_)));

        let err = insert_batch(
            "users",
            &[
                vec![("name", Value::from("a"))],
                vec![("points", Value::from(2))],
            ],
        )
        .unwrap_err();
        assert!(matches!(err, DbError::Shape(_)));
    }

    #[test]
    fn replace_upserts_on_conflict_key() {
        let q = replace(
            "users",
            &[("id", Value::from(1)), ("name", Value::from("alice"))],
            "id",
        );
        assert_eq!(
            q.sql,
            "INSERT INTO users (id, name) VALUES ($1, $2) \
             ON CONFLICT (id) DO UPDATE SET name = EXCLUDED.name"
        );
    }

    #[test]
    fn update_binds_set_before_where() {
        let b = table("users").where_("id", "=", 7);
        let q = update(&b.state, "users", &[("name", Value::from("zoe"))]);
        assert_eq!(q.sql, "UPDATE users SET name = $1 WHERE id = $2");
        assert_eq!(q.binds.values(), &[Value::Text("zoe".into()), Value::Int(7)]);
    }

    #[test]
    fn delete_honors_where() {
        let b = table("users").where_("points", "<", 0);
        let q = delete(&b.state, "users");
        assert_eq!(q.sql, "DELETE FROM users WHERE points < $1");
    }

    #[test]
    fn delete_without_where_targets_all_rows() {
        let b = table("users");
        let q = delete(&b.state, "users");
        assert_eq!(q.sql, "DELETE FROM users");
    }

    #[test]
    fn increment_and_decrement() {
        let b = table("users").where_("id", "=", 1);
        let q = crement(&b.state, "users", "points", '+', 10);
        assert_eq!(
            q.sql,
            "UPDATE users SET points = points + $1 WHERE id = $2"
        );
        assert_eq!(q.binds.values(), &[Value::Int(10), Value::Int(1)]);

        let q = crement(&b.state, "users", "points", '-', 3);
        assert_eq!(q.sql, "UPDATE users SET points = points - $1 WHERE id = $2");
    }
}
