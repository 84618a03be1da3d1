//! Shared SQLite-backed storage engine for the `sqlite` and `lite` backend
//! variants.
//!
//! The two variants differ only in how the connection pool is sized (see
//! [`crate::sqlite`] and [`crate::lite`]); everything else — schema, AEAD
//! keying, versioning — is this one implementation, following Design Note
//! §9's "variant backends should be a tagged abstraction with a single
//! trait", applied one level deeper so the two SQL-backed variants don't
//! duplicate query logic.

use std::collections::HashMap;

use async_trait::async_trait;
use nexus_types::secret::SecretVersion;
use nexus_types::{NotFound, Policy, Secret};
use parking_lot::RwLock;
use sqlx::SqlitePool;
use uuid::Uuid;
use zeroize::Zeroize;

use crate::{Backend, Error, LookupError, aead, versioning};

#[derive(sqlx::FromRow)]
struct SecretRow {
    path: String,
    current_version: i64,
    oldest_version: i64,
    encrypted_versions: Vec<u8>,
}

#[derive(sqlx::FromRow)]
struct PolicyRow {
    encrypted_record: Vec<u8>,
}

/// The shared SQLite-backed implementation of [`Backend`].
pub struct SqlBackend {
    pool: SqlitePool,
    root_key: RwLock<Option<[u8; 32]>>,
    /// Serializes every read-modify-write on `secrets` so that two
    /// concurrent upserts on the same path can't both read the same
    /// `current_version` and clobber each other on write. A single global
    /// lock is sufficient here: the pool this guards is small (see
    /// `crate::sqlite`/`crate::lite`) and secret writes are not the hot path.
    write_lock: tokio::sync::Mutex<()>,
}

impl SqlBackend {
    pub(crate) async fn open(pool: SqlitePool) -> Result<Self, Error> {
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|err| Error::Persistence(format!("while running migrations: {err}")))?;
        Ok(Self {
            pool,
            root_key: RwLock::new(None),
            write_lock: tokio::sync::Mutex::new(()),
        })
    }

    fn key(&self) -> Result<[u8; 32], Error> {
        self.root_key
            .read()
            .ok_or(Error::InvalidRootKeyState("no root key installed"))
    }
}

#[async_trait]
impl Backend for SqlBackend {
    async fn initialize(&self, root_key: Option<[u8; 32]>) -> Result<(), Error> {
        let mut key = root_key.ok_or(Error::InvalidRootKeyState(
            "sqlite/lite backends require a non-zero root key",
        ))?;
        if key == [0u8; 32] {
            key.zeroize();
            return Err(Error::InvalidRootKeyState(
                "sqlite/lite backends require a non-zero root key",
            ));
        }
        *self.root_key.write() = Some(key);
        Ok(())
    }

    async fn store_secret(
        &self,
        path: &str,
        data: HashMap<String, String>,
        now: u64,
        max_versions: u64,
    ) -> Result<(), Error> {
        let key = self.key()?;
        let _guard = self.write_lock.lock().await;
        let mut secret = self.read_secret(path).await?.unwrap_or_else(|| Secret::new(path));
        versioning::upsert(&mut secret, data, now, max_versions);
        self.write_secret(&key, &secret).await
    }

    async fn load_secret(&self, path: &str) -> Result<Secret, LookupError> {
        let secret = self.read_secret(path).await?.ok_or(NotFound)?;
        if secret.all_versions_deleted() {
            return Err(NotFound.into());
        }
        Ok(secret)
    }

    async fn load_all_secrets(&self) -> Result<HashMap<String, Secret>, Error> {
        let rows: Vec<SecretRow> = sqlx::query_as("SELECT * FROM secrets")
            .fetch_all(&self.pool)
            .await
            .map_err(|err| Error::Persistence(err.to_string()))?;
        let key = self.key()?;
        let mut out = HashMap::with_capacity(rows.len());
        for row in rows {
            let secret = self.decode_row(&key, row)?;
            out.insert(secret.path.clone(), secret);
        }
        Ok(out)
    }

    async fn delete_secret_versions(
        &self,
        path: &str,
        versions: &[u64],
        now: u64,
    ) -> Result<(), LookupError> {
        let key = self.key()?;
        let _guard = self.write_lock.lock().await;
        let mut secret = self.read_secret(path).await?.ok_or(NotFound)?;
        versioning::delete(&mut secret, versions, now);
        self.write_secret(&key, &secret).await?;
        Ok(())
    }

    async fn undelete_secret_versions(
        &self,
        path: &str,
        versions: &[u64],
    ) -> Result<(), LookupError> {
        let key = self.key()?;
        let _guard = self.write_lock.lock().await;
        let mut secret = self.read_secret(path).await?.ok_or(NotFound)?;
        versioning::undelete(&mut secret, versions);
        self.write_secret(&key, &secret).await?;
        Ok(())
    }

    async fn store_policy(&self, policy: Policy) -> Result<(), Error> {
        let key = self.key()?;
        let plaintext =
            serde_json::to_vec(&policy).map_err(|err| Error::Persistence(err.to_string()))?;
        let encrypted = aead::encrypt(&key, &plaintext);
        sqlx::query(
            r#"
                INSERT INTO policies (id, name, created_at, updated_at, encrypted_record)
                VALUES (?, ?, ?, ?, ?)
                ON CONFLICT (id) DO UPDATE SET
                    name = excluded.name,
                    updated_at = excluded.updated_at,
                    encrypted_record = excluded.encrypted_record
            "#,
        )
        .bind(policy.id.to_string())
        .bind(&policy.name)
        .bind(policy.created_at as i64)
        .bind(policy.updated_at as i64)
        .bind(encrypted)
        .execute(&self.pool)
        .await
        .map_err(|err| Error::Persistence(err.to_string()))?;
        Ok(())
    }

    async fn load_policy(&self, id: Uuid) -> Result<Policy, LookupError> {
        let key = self.key()?;
        let row: Option<PolicyRow> = sqlx::query_as("SELECT * FROM policies WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|err| Error::Persistence(err.to_string()))?;
        let row = row.ok_or(NotFound)?;
        let plaintext = aead::decrypt(&key, &row.encrypted_record)?;
        serde_json::from_slice(&plaintext)
            .map_err(|err| Error::Persistence(err.to_string()).into())
    }

    async fn delete_policy(&self, id: Uuid) -> Result<(), LookupError> {
        let rows_affected = sqlx::query("DELETE FROM policies WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|err| Error::Persistence(err.to_string()))?
            .rows_affected();
        if rows_affected == 0 {
            return Err(NotFound.into());
        }
        Ok(())
    }

    async fn load_all_policies(&self) -> Result<Vec<Policy>, Error> {
        let key = self.key()?;
        let rows: Vec<PolicyRow> = sqlx::query_as("SELECT * FROM policies")
            .fetch_all(&self.pool)
            .await
            .map_err(|err| Error::Persistence(err.to_string()))?;
        rows.into_iter()
            .map(|row| {
                let plaintext = aead::decrypt(&key, &row.encrypted_record)?;
                serde_json::from_slice(&plaintext).map_err(|err| Error::Persistence(err.to_string()))
            })
            .collect()
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

impl SqlBackend {
    async fn read_secret(&self, path: &str) -> Result<Option<Secret>, Error> {
        let row: Option<SecretRow> = sqlx::query_as("SELECT * FROM secrets WHERE path = ?")
            .bind(path)
            .fetch_optional(&self.pool)
            .await
            .map_err(|err| Error::Persistence(err.to_string()))?;
        let Some(row) = row else {
            return Ok(None);
        };
        let key = self.key()?;
        Ok(Some(self.decode_row(&key, row)?))
    }

    fn decode_row(&self, key: &[u8; 32], row: SecretRow) -> Result<Secret, Error> {
        let plaintext = aead::decrypt(key, &row.encrypted_versions)?;
        let versions: std::collections::BTreeMap<u64, SecretVersion> =
            serde_json::from_slice(&plaintext).map_err(|err| Error::Persistence(err.to_string()))?;
        Ok(Secret {
            path: row.path,
            current_version: row.current_version as u64,
            oldest_version: row.oldest_version as u64,
            versions,
        })
    }

    async fn write_secret(&self, key: &[u8; 32], secret: &Secret) -> Result<(), Error> {
        let plaintext = serde_json::to_vec(&secret.versions)
            .map_err(|err| Error::Persistence(err.to_string()))?;
        let encrypted = aead::encrypt(key, &plaintext);
        sqlx::query(
            r#"
                INSERT INTO secrets (path, current_version, oldest_version, encrypted_versions)
                VALUES (?, ?, ?, ?)
                ON CONFLICT (path) DO UPDATE SET
                    current_version = excluded.current_version,
                    oldest_version = excluded.oldest_version,
                    encrypted_versions = excluded.encrypted_versions
            "#,
        )
        .bind(&secret.path)
        .bind(secret.current_version as i64)
        .bind(secret.oldest_version as i64)
        .bind(encrypted)
        .execute(&self.pool)
        .await
        .map_err(|err| Error::Persistence(err.to_string()))?;
        Ok(())
    }
}
