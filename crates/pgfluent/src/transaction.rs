//! Transaction helper macro.

/// Run a block inside a database transaction.
///
/// Begins a transaction on `$client`, binds it to `$tx`, and evaluates the
/// block. An `Ok` result commits; an `Err` rolls back and returns the
/// original error. Begin/commit/rollback failures surface as
/// [`DbError::Transaction`](crate::DbError::Transaction); when both the block
/// and the rollback fail, the rollback failure is folded into the message so
/// neither is lost.
///
/// The block must evaluate to a [`DbResult`](crate::DbResult).
///
/// ```ignore
/// let moved: i64 = pgfluent::transaction!(&mut client, tx, {
///     pgfluent::table("accounts")
///         .where_("id", "=", from)
///         .decrement(&tx, "balance", amount)
///         .await?;
///     pgfluent::table("accounts")
///         .where_("id", "=", to)
///         .increment(&tx, "balance", amount)
///         .await
/// })?;
/// ```
#[macro_export]
macro_rules! transaction {
    ($client:expr, $tx:ident, $body:block) => {{
        let $tx = ($client)
            .transaction()
            .await
            .map_err($crate::DbError::tx)?;
        let __tx_result = async { $body }.await;
        match __tx_result {
            Ok(value) => {
                $tx.commit().await.map_err($crate::DbError::tx)?;
                Ok(value)
            }
            Err(error) => match $tx.rollback().await {
                Ok(()) => Err(error),
                Err(rollback_error) => Err($crate::DbError::Transaction(format!(
                    "{error} (rollback also failed: {rollback_error})"
                ))),
            },
        }
    }};
}
