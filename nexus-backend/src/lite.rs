//! The `lite` backend variant: SQLite with a single writer connection.
//!
//! Mirrors `oprf-key-gen`'s `PostgresSecretManager::init`, which caps its
//! pool at `max_connections(1)` because it does not want multiple
//! connections racing on the same small database: serialized writers, no
//! lock contention at the SQLite file level.

use sqlx::sqlite::SqlitePoolOptions;

use crate::sql::SqlBackend;
use crate::{Backend, Error};

/// Opens a `lite`-variant backend at `database_url` with exactly one
/// connection.
pub async fn open(database_url: &str) -> Result<impl Backend, Error> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect(database_url)
        .await
        .map_err(|err| Error::Persistence(format!("while connecting to sqlite: {err}")))?;
    SqlBackend::open(pool).await
}
