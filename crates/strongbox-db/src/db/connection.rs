use std::time::Duration;

use diesel_async::AsyncPgConnection;
use diesel_async::pooled_connection::AsyncDieselConnectionManager;
use diesel_async::pooled_connection::bb8::{Pool, PooledConnection};

use crate::error::DbResult;

pub type DbPool = Pool<AsyncPgConnection>;
pub type DbConnection<'pool> = PooledConnection<'pool, AsyncPgConnection>;

/// Longest a request waits for a free connection.
const CHECKOUT_TIMEOUT: Duration = Duration::from_secs(5);

/// ## Summary
/// Opens the bb8 pool backing `PgStore`.
///
/// Connections open lazily up to `max_size`, which is clamped to at least one.
///
/// ## Errors
/// Returns an error if the pool cannot be built for `database_url`.
#[tracing::instrument(skip(database_url))]
pub async fn create_pool(database_url: &str, max_size: u32) -> DbResult<DbPool> {
    let manager = AsyncDieselConnectionManager::<AsyncPgConnection>::new(database_url);

    let pool = Pool::builder()
        .max_size(max_size.max(1))
        .connection_timeout(CHECKOUT_TIMEOUT)
        .build(manager)
        .await?;

    tracing::info!(max_size, "PostgreSQL pool ready");
    Ok(pool)
}
