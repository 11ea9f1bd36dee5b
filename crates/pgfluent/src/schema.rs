//! information_schema shortcuts.

use crate::client::GenericClient;
use crate::error::{DbError, DbResult};
use crate::value::Value;
use tokio_postgres::types::ToSql;

/// Whether `schema.table` exists.
pub async fn has_table(
    conn: &impl GenericClient,
    schema: &str,
    table: &str,
) -> DbResult<bool> {
    const SQL: &str = "SELECT EXISTS(SELECT 1 FROM information_schema.tables \
                       WHERE table_schema = $1 AND table_name = $2)";
    let params: &[&(dyn ToSql + Sync)] = &[&schema, &table];
    let rows = conn.query(SQL, params).await?;
    match rows.first().and_then(|row| row.value_at(0)) {
        Some(Value::Bool(found)) => Ok(*found),
        other => Err(DbError::decode(
            "exists",
            format!("unexpected cell {other:?}"),
        )),
    }
}

/// Whether `schema.table` has every one of `columns`.
pub async fn has_columns(
    conn: &impl GenericClient,
    schema: &str,
    table: &str,
    columns: &[&str],
) -> DbResult<bool> {
    if columns.is_empty() {
        return Ok(true);
    }
    const SQL: &str = "SELECT COUNT(DISTINCT column_name) FROM information_schema.columns \
                       WHERE table_schema = $1 AND table_name = $2 AND column_name = ANY($3)";
    let mut wanted: Vec<String> = columns.iter().map(|c| c.to_string()).collect();
    wanted.sort();
    wanted.dedup();
    let params: &[&(dyn ToSql + Sync)] = &[&schema, &table, &wanted];
    let rows = conn.query(SQL, params).await?;
    match rows.first().and_then(|row| row.value_at(0)) {
        Some(Value::Int(count)) => Ok(*count as usize == wanted.len()),
        other => Err(DbError::decode(
            "count",
            format!("unexpected cell {other:?}"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row::Row;
    use crate::testutil::MockClient;

    #[tokio::test]
    async fn has_table_queries_information_schema() {
        let mock = MockClient::new();
        mock.queue(vec![Row::from_pairs(vec![("exists", Value::Bool(true))])]);
        assert!(has_table(&mock, "public", "users").await.unwrap());
        assert_eq!(mock.param_counts(), vec![2]);
        assert!(mock.statements()[0].contains("information_schema.tables"));
    }

    #[tokio::test]
    async fn has_columns_compares_distinct_count() {
        let mock = MockClient::new();
        mock.queue(vec![Row::from_pairs(vec![("count", Value::Int(2))])]);
        assert!(
            has_columns(&mock, "public", "users", &["name", "points", "name"])
                .await
                .unwrap()
        );

        mock.queue(vec![Row::from_pairs(vec![("count", Value::Int(1))])]);
        assert!(
            !has_columns(&mock, "public", "users", &["name", "missing"])
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn has_columns_with_no_columns_is_trivially_true() {
        let mock = MockClient::new();
        assert!(has_columns(&mock, "public", "users", &[]).await.unwrap());
        assert!(mock.statements().is_empty());
    }
}
