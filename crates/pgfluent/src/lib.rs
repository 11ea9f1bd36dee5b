//! # pgfluent
//!
//! A fluent SQL query builder and executor for PostgreSQL.
//!
//! ## Features
//!
//! - **Chainable clauses**: WHERE/JOIN/GROUP/ORDER/UNION accumulate on a handle
//!   and compile to a single `$n`-parameterized statement
//! - **Flat predicates**: conditions render strictly left to right, exactly as
//!   chained, with no hidden grouping
//! - **Type-safe mapping**: Row → Struct via the `FromRow` trait
//! - **Transaction-friendly**: pass a transaction anywhere a `GenericClient`
//!   is expected, or wrap work in the `transaction!` macro
//! - **Chunked iteration**: page large result sets through a callback
//!
//! ```ignore
//! use pgfluent::{table, Value};
//!
//! let rows = table("users")
//!     .select(&["name", "points"])
//!     .where_("points", ">=", 50)
//!     .or_where_null("points")
//!     .order_by("name", "ASC")
//!     .get(&client)
//!     .await?;
//!
//! table("users")
//!     .where_("id", "=", 1)
//!     .update(&client, &[("points", Value::from(0))])
//!     .await?;
//! ```

pub mod builder;
pub mod client;
pub mod compiler;
pub mod error;
pub mod exec;
mod predicate;
pub mod row;
pub mod schema;
pub mod transaction;
pub mod value;

pub use builder::{Builder, table};
pub use client::GenericClient;
pub use compiler::CompiledQuery;
pub use error::{DbError, DbResult};
pub use row::{FromRow, FromValue, Row};
pub use schema::{has_columns, has_table};
pub use value::{Binds, Value};

#[cfg(feature = "pool")]
pub mod pool;

#[cfg(feature = "pool")]
pub use pool::{create_pool, create_pool_with_config};

#[cfg(test)]
pub(crate) mod testutil;
