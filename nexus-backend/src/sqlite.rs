//! The `sqlite` backend variant: SQLite with a small pool of concurrent
//! readers.
//!
//! Functionally identical to [`crate::lite`]; the two exist as separate
//! configuration choices because some deployments want concurrent read
//! throughput (`sqlite`) while others want a single durable writer and
//! accept serialized access (`lite`), the same trade-off the teacher's
//! `PostgresSecretManager` makes explicit by capping its pool at one
//! connection.

use sqlx::sqlite::SqlitePoolOptions;

use crate::sql::SqlBackend;
use crate::{Backend, Error};

/// Opens a `sqlite`-variant backend at `database_url` (e.g.
/// `sqlite://nexus.db`), allowing up to `max_connections` concurrent
/// connections.
pub async fn open(database_url: &str, max_connections: u32) -> Result<impl Backend, Error> {
    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
        .map_err(|err| Error::Persistence(format!("while connecting to sqlite: {err}")))?;
    SqlBackend::open(pool).await
}
