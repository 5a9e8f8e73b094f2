//! Interfaces between the application code and database.

use crate::error::ProgressError;
use crate::{
    Category, CategoryUpdate, StaffRanking, StaffRecord, StaffRef, SubmissionBatch, SummaryRow,
};
use chrono::{DateTime, NaiveDate, Utc};
use diesel::connection::SimpleConnection;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool, PooledConnection};
use std::env;
use std::time::Duration;

mod progress;
mod staff;

pub use progress::*;
pub use staff::*;

use progress::{EntryRow, execute_upsert};

pub type PgPool = Pool<ConnectionManager<PgConnection>>;
pub type PgPooledConnection = PooledConnection<ConnectionManager<PgConnection>>;

const POOL_CHECKOUT_TIMEOUT_SECS: u64 = 5;

/// Tables and constraints the store relies on. Safe to run repeatedly.
const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS staff (
    id SERIAL PRIMARY KEY,
    name VARCHAR NOT NULL UNIQUE
);
CREATE TABLE IF NOT EXISTS progress (
    id BIGSERIAL PRIMARY KEY,
    year INTEGER NOT NULL,
    date DATE NOT NULL,
    collector_id INTEGER,
    staff_id INTEGER NOT NULL REFERENCES staff (id),
    content TEXT,
    category VARCHAR NOT NULL,
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    UNIQUE (staff_id, date, category)
);
CREATE INDEX IF NOT EXISTS progress_updated_at_idx ON progress (updated_at);
";

/// Read the database URL from the environment, loading `.env` first.
///
/// # Errors
/// Returns a validation error if `DATABASE_URL` is not set.
pub fn get_database_url() -> Result<String, ProgressError> {
    dotenvy::dotenv().ok();
    env::var("DATABASE_URL").map_err(|_| ProgressError::validation("DATABASE_URL must be set"))
}

/// Open a single connection, for scripts and tests.
///
/// # Errors
/// Returns an error if the URL is missing or the connection cannot be established.
pub fn get_database_connection() -> Result<PgConnection, ProgressError> {
    let database_url = get_database_url()?;
    Ok(PgConnection::establish(&database_url)?)
}

/// Build the connection pool shared by all request handlers.
///
/// Connections are opened on first checkout, so an unreachable database surfaces as a
/// per-request error instead of a startup failure.
#[must_use]
pub fn get_database_pool(database_url: &str, max_size: u32) -> PgPool {
    let manager = ConnectionManager::<PgConnection>::new(database_url);
    Pool::builder()
        .max_size(max_size)
        .connection_timeout(Duration::from_secs(POOL_CHECKOUT_TIMEOUT_SECS))
        .build_unchecked(manager)
}

/// Check a connection out of the pool.
///
/// # Errors
/// Returns an error if the pool times out.
pub fn get_pooled_database_connection(pool: &PgPool) -> Result<PgPooledConnection, ProgressError> {
    Ok(pool.get()?)
}

/// Create the tables if they do not exist yet.
///
/// # Errors
/// Returns an error if the DDL fails.
pub fn ensure_schema(conn: &mut PgConnection) -> Result<(), ProgressError> {
    conn.batch_execute(SCHEMA)?;
    Ok(())
}

/// Persist a whole submission batch in one transaction.
///
/// Staff referenced by name are looked up or created atomically. If any statement
/// fails, nothing from the batch is kept. Returns the number of entries written.
///
/// # Errors
/// Returns an error if any entry fails to persist.
pub fn apply_submission_batch(
    conn: &mut PgConnection,
    batch: &SubmissionBatch,
) -> Result<usize, ProgressError> {
    conn.transaction::<_, ProgressError, _>(|conn| {
        for entry in &batch.entries {
            let staff_id = match &entry.staff {
                StaffRef::Id(id) => *id,
                StaffRef::Name(name) => insert_or_get_staff(conn, name)?,
            };
            execute_upsert(
                conn,
                EntryRow {
                    year: batch.year,
                    date: batch.date,
                    collector_id: batch.collector_id,
                    staff_id,
                    content: entry.text.clone(),
                    category: entry.category.map(|c| c.label().to_string()),
                },
            )?;
        }
        Ok(batch.entries.len())
    })
}

fn parse_category(raw: &str) -> Option<Category> {
    let category = Category::from_label(raw);
    if category.is_none() {
        log::warn!("Ignoring progress row with unknown category {raw:?}");
    }
    category
}
