//! Scripted client for exercising terminal operations without a database.

use crate::client::GenericClient;
use crate::error::DbResult;
use crate::row::Row;
use std::collections::VecDeque;
use std::sync::Mutex;
use tokio_postgres::types::ToSql;

pub(crate) struct MockClient {
    responses: Mutex<VecDeque<Vec<Row>>>,
    statements: Mutex<Vec<String>>,
    param_counts: Mutex<Vec<usize>>,
    affected: u64,
}

impl MockClient {
    pub(crate) fn new() -> Self {
        Self::with_affected(0)
    }

    pub(crate) fn with_affected(affected: u64) -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            statements: Mutex::new(Vec::new()),
            param_counts: Mutex::new(Vec::new()),
            affected,
        }
    }

    /// Queue the rows the next query call hands back. Queries beyond the
    /// queued responses return empty result sets.
    pub(crate) fn queue(&self, rows: Vec<Row>) {
        self.responses.lock().unwrap().push_back(rows);
    }

    pub(crate) fn statements(&self) -> Vec<String> {
        self.statements.lock().unwrap().clone()
    }

    pub(crate) fn param_counts(&self) -> Vec<usize> {
        self.param_counts.lock().unwrap().clone()
    }

    fn record(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) {
        self.statements.lock().unwrap().push(sql.to_string());
        self.param_counts.lock().unwrap().push(params.len());
    }
}

impl GenericClient for MockClient {
    async fn query(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> DbResult<Vec<Row>> {
        self.record(sql, params);
        Ok(self.responses.lock().unwrap().pop_front().unwrap_or_default())
    }

    async fn execute(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> DbResult<u64> {
        self.record(sql, params);
        Ok(self.affected)
    }
}
