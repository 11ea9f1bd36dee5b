//! Terminal operations: compile the accumulated clauses and run them.

use crate::builder::Builder;
use crate::client::GenericClient;
use crate::compiler::{self, CompiledQuery};
use crate::error::{DbError, DbResult};
use crate::row::{FromRow, Row};
use crate::value::Value;

impl Builder {
    fn require_table(&self) -> DbResult<&str> {
        self.state.table.as_deref().ok_or(DbError::NoTable)
    }

    /// Retain the compiled statement for [`Builder::dump`] and dispatch it.
    async fn run_query(
        &mut self,
        conn: &impl GenericClient,
        query: CompiledQuery,
    ) -> DbResult<Vec<Row>> {
        tracing::debug!(sql = %query.sql, binds = %query.binds, "executing query");
        let query = self.last_query.insert(query);
        conn.query(&query.sql, &query.binds.as_refs()).await
    }

    async fn run_execute(
        &mut self,
        conn: &impl GenericClient,
        query: CompiledQuery,
    ) -> DbResult<u64> {
        tracing::debug!(sql = %query.sql, binds = %query.binds, "executing statement");
        let query = self.last_query.insert(query);
        conn.execute(&query.sql, &query.binds.as_refs()).await
    }

    // ----- reads -----

    /// Run the accumulated SELECT and return all rows.
    pub async fn get(&mut self, conn: &impl GenericClient) -> DbResult<Vec<Row>> {
        self.require_table()?;
        let query = compiler::select(&self.state, &self.union_parts);
        self.run_query(conn, query).await
    }

    /// Run the SELECT and map every row through `T`'s [`FromRow`].
    pub async fn get_as<T: FromRow>(&mut self, conn: &impl GenericClient) -> DbResult<Vec<T>> {
        let rows = self.get(conn).await?;
        rows.iter().map(T::from_row).collect()
    }

    /// First row of the result set; empty results are [`DbError::NoRecords`].
    pub async fn first(&mut self, conn: &impl GenericClient) -> DbResult<Row> {
        let rows = self.get(conn).await?;
        rows.into_iter().next().ok_or(DbError::NoRecords)
    }

    /// First row mapped through `T`'s [`FromRow`].
    pub async fn first_as<T: FromRow>(&mut self, conn: &impl GenericClient) -> DbResult<T> {
        let row = self.first(conn).await?;
        T::from_row(&row)
    }

    /// Single cell of the first row.
    pub async fn value(&mut self, conn: &impl GenericClient, column: &str) -> DbResult<Value> {
        let row = self.first(conn).await?;
        row.try_get(column).cloned()
    }

    /// One column across all rows, in result order.
    pub async fn pluck(&mut self, conn: &impl GenericClient, column: &str) -> DbResult<Vec<Value>> {
        let rows = self.get(conn).await?;
        rows.iter()
            .map(|row| row.try_get(column).cloned())
            .collect()
    }

    /// Key/value pairs across all rows, in result order.
    pub async fn pluck_map(
        &mut self,
        conn: &impl GenericClient,
        key: &str,
        value: &str,
    ) -> DbResult<Vec<(Value, Value)>> {
        let rows = self.get(conn).await?;
        rows.iter()
            .map(|row| Ok((row.try_get(key)?.clone(), row.try_get(value)?.clone())))
            .collect()
    }

    /// Look a row up by its `id` column.
    pub async fn find(&mut self, conn: &impl GenericClient, id: impl Into<Value>) -> DbResult<Row> {
        use crate::predicate::{Connective, Predicate, PredicateKind};
        self.state.wheres.push(Predicate {
            connective: Connective::And,
            kind: PredicateKind::Compare {
                column: "id".to_string(),
                op: "=".to_string(),
                value: id.into(),
            },
        });
        self.first(conn).await
    }

    /// Whether the accumulated SELECT matches at least one row.
    pub async fn exists(&mut self, conn: &impl GenericClient) -> DbResult<bool> {
        self.require_table()?;
        let inner = compiler::select(&self.state, &self.union_parts);
        let query = CompiledQuery {
            sql: format!("SELECT EXISTS({})", inner.sql),
            binds: inner.binds,
        };
        let rows = self.run_query(conn, query).await?;
        let row = rows.first().ok_or(DbError::NoRecords)?;
        match row.value_at(0) {
            Some(Value::Bool(b)) => Ok(*b),
            other => Err(DbError::decode(
                "exists",
                format!("unexpected cell {other:?}"),
            )),
        }
    }

    /// Negation of [`Builder::exists`].
    pub async fn doesnt_exist(&mut self, conn: &impl GenericClient) -> DbResult<bool> {
        Ok(!self.exists(conn).await?)
    }

    // ----- aggregates -----

    /// `SELECT COUNT(*)` honoring the accumulated WHERE clauses.
    pub async fn count(&mut self, conn: &impl GenericClient) -> DbResult<i64> {
        self.require_table()?;
        let query = compiler::aggregate(&self.state, "COUNT(*)");
        let rows = self.run_query(conn, query).await?;
        let row = rows.first().ok_or(DbError::NoRecords)?;
        match row.value_at(0) {
            Some(Value::Int(n)) => Ok(*n),
            other => Err(DbError::decode(
                "count",
                format!("unexpected cell {other:?}"),
            )),
        }
    }

    pub async fn sum(&mut self, conn: &impl GenericClient, column: &str) -> DbResult<f64> {
        self.aggregate_f64(conn, "SUM", column).await
    }

    pub async fn avg(&mut self, conn: &impl GenericClient, column: &str) -> DbResult<f64> {
        self.aggregate_f64(conn, "AVG", column).await
    }

    pub async fn min(&mut self, conn: &impl GenericClient, column: &str) -> DbResult<f64> {
        self.aggregate_f64(conn, "MIN", column).await
    }

    pub async fn max(&mut self, conn: &impl GenericClient, column: &str) -> DbResult<f64> {
        self.aggregate_f64(conn, "MAX", column).await
    }

    /// The `::float8` cast fixes the wire type regardless of the column's
    /// storage type (Postgres yields `numeric` for SUM/AVG over integers).
    async fn aggregate_f64(
        &mut self,
        conn: &impl GenericClient,
        func: &str,
        column: &str,
    ) -> DbResult<f64> {
        self.require_table()?;
        let query = compiler::aggregate(&self.state, &format!("{func}({column})::float8"));
        let rows = self.run_query(conn, query).await?;
        let row = rows.first().ok_or(DbError::NoRecords)?;
        match row.value_at(0) {
            Some(Value::Float(v)) => Ok(*v),
            Some(Value::Int(i)) => Ok(*i as f64),
            // Aggregates over zero rows come back NULL.
            Some(Value::Null) => Ok(0.0),
            other => Err(DbError::decode(
                column,
                format!("unexpected aggregate cell {other:?}"),
            )),
        }
    }

    // ----- writes -----

    /// Insert one row.
    pub async fn insert(
        &mut self,
        conn: &impl GenericClient,
        data: &[(&str, Value)],
    ) -> DbResult<()> {
        let query = compiler::insert(self.require_table()?, data, false);
        self.run_execute(conn, query).await?;
        Ok(())
    }

    /// Insert one row and return its generated `id`.
    pub async fn insert_get_id(
        &mut self,
        conn: &impl GenericClient,
        data: &[(&str, Value)],
    ) -> DbResult<i64> {
        let query = compiler::insert(self.require_table()?, data, true);
        let rows = self.run_query(conn, query).await?;
        let row = rows.first().ok_or(DbError::NoRecords)?;
        row.try_get_as("id")
    }

    /// Insert many rows in one statement. Every row must carry the same
    /// columns as the first; a mismatch fails the whole batch before any SQL
    /// is sent.
    pub async fn insert_batch(
        &mut self,
        conn: &impl GenericClient,
        rows: &[Vec<(&str, Value)>],
    ) -> DbResult<()> {
        let query = compiler::insert_batch(self.require_table()?, rows)?;
        self.run_execute(conn, query).await?;
        Ok(())
    }

    /// Upsert keyed on `conflict`: insert, or overwrite the non-key columns
    /// of the existing row.
    pub async fn replace(
        &mut self,
        conn: &impl GenericClient,
        data: &[(&str, Value)],
        conflict: &str,
    ) -> DbResult<u64> {
        let query = compiler::replace(self.require_table()?, data, conflict);
        self.run_execute(conn, query).await
    }

    /// Update matching rows; returns the affected-row count.
    pub async fn update(
        &mut self,
        conn: &impl GenericClient,
        data: &[(&str, Value)],
    ) -> DbResult<u64> {
        let query = compiler::update(&self.state, self.require_table()?, data);
        self.run_execute(conn, query).await
    }

    /// Delete matching rows; with no WHERE clauses this clears the table.
    pub async fn delete(&mut self, conn: &impl GenericClient) -> DbResult<u64> {
        let query = compiler::delete(&self.state, self.require_table()?);
        self.run_execute(conn, query).await
    }

    /// Add `amount` to a numeric column in place.
    pub async fn increment(
        &mut self,
        conn: &impl GenericClient,
        column: &str,
        amount: i64,
    ) -> DbResult<u64> {
        let query = compiler::crement(&self.state, self.require_table()?, column, '+', amount);
        self.run_execute(conn, query).await
    }

    /// Subtract `amount` from a numeric column in place.
    pub async fn decrement(
        &mut self,
        conn: &impl GenericClient,
        column: &str,
        amount: i64,
    ) -> DbResult<u64> {
        let query = compiler::crement(&self.state, self.require_table()?, column, '-', amount);
        self.run_execute(conn, query).await
    }

    // ----- chunked iteration -----

    /// Page through the result set `size` rows at a time.
    ///
    /// Each batch is handed to `callback`; returning `false` stops early.
    /// Iteration also stops after the first short batch. The callback is
    /// never invoked for an empty batch.
    pub async fn chunk<F>(
        &mut self,
        conn: &impl GenericClient,
        size: i64,
        mut callback: F,
    ) -> DbResult<()>
    where
        F: FnMut(&[Row]) -> bool,
    {
        if size <= 0 {
            return Err(DbError::validation(format!(
                "chunk size must be positive, got {size}"
            )));
        }
        self.require_table()?;

        let mut page = 0i64;
        loop {
            let mut state = self.state.clone();
            state.limit = Some(size);
            state.offset = Some(page * size);
            let query = compiler::select(&state, &self.union_parts);
            let rows = self.run_query(conn, query).await?;
            if rows.is_empty() {
                break;
            }
            let full = rows.len() as i64 >= size;
            if !callback(&rows) || !full {
                break;
            }
            page += 1;
        }
        Ok(())
    }

    // ----- introspection -----

    /// The most recently compiled statement, if any terminal operation ran.
    /// Also logs it, so a `dump()` dropped into a chain shows up in traces.
    pub fn dump(&self) -> Option<&CompiledQuery> {
        if let Some(query) = &self.last_query {
            tracing::debug!(sql = %query.sql, binds = %query.binds, "last compiled statement");
        }
        self.last_query.as_ref()
    }
}
