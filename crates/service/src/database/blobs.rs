use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sqlx::Row;

use common::crypto::IV_SIZE;
use common::kid::Kid;

use super::{DKid, Database, RegistryError};

pub const MIN_BLOB_NAME_LENGTH: usize = 3;
pub const MAX_BLOB_NAME_LENGTH: usize = 100;

/// Lifecycle of an encrypted blob. A blob is created `fresh` with no
///  content and moves to `up` exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlobState {
    Fresh,
    Up,
}

impl BlobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlobState::Fresh => "fresh",
            BlobState::Up => "up",
        }
    }
}

impl FromStr for BlobState {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fresh" => Ok(BlobState::Fresh),
            "up" => Ok(BlobState::Up),
            other => Err(RegistryError::Database(sqlx::Error::Decode(
                format!("unknown blob state {:?}", other).into(),
            ))),
        }
    }
}

impl fmt::Display for BlobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A symmetric key as stored, wrapped under one of the requester's
///  public keys
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrappedKey {
    pub wrapped_key: Vec<u8>,
    pub public_key_kid: Kid,
}

/// An uploaded blob with everything needed to decrypt it, bar the key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobRecord {
    pub kid: Kid,
    pub name: String,
    pub iv: Vec<u8>,
    pub ciphertext: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobSummary {
    pub kid: Kid,
    pub name: String,
    pub state: BlobState,
    pub created_at: i64,
}

/// A blob that never left the `fresh` state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbandonedUpload {
    pub kid: Kid,
    pub owner: String,
    pub name: String,
    pub created_at: i64,
}

fn validate_blob_name(name: &str) -> Result<(), RegistryError> {
    let length = name.chars().count();
    if !(MIN_BLOB_NAME_LENGTH..=MAX_BLOB_NAME_LENGTH).contains(&length) {
        return Err(RegistryError::BadRequest(format!(
            "file name must be {} to {} characters, got {}",
            MIN_BLOB_NAME_LENGTH, MAX_BLOB_NAME_LENGTH, length
        )));
    }
    Ok(())
}

impl Database {
    /// Store a wrapped symmetric key and create the empty blob it will
    ///  encrypt. Both share one freshly minted KID.
    pub async fn begin_upload(
        &self,
        owner: &str,
        public_key_kid: &Kid,
        file_name: &str,
        iv: &[u8],
        wrapped_key: &[u8],
    ) -> Result<Kid, RegistryError> {
        validate_blob_name(file_name)?;
        if iv.len() != IV_SIZE {
            return Err(RegistryError::BadRequest(format!(
                "iv must be {} bytes, got {}",
                IV_SIZE,
                iv.len()
            )));
        }

        let mut tx = self.begin_write().await?;

        let row = sqlx::query(
            r#"
            SELECT COUNT(*) AS count FROM public_keys
            WHERE kid = ?1 AND owner = ?2
            "#,
        )
        .bind(DKid::from(*public_key_kid))
        .bind(owner)
        .fetch_one(&mut *tx)
        .await?;
        match row.get::<i64, _>("count") {
            0 => {
                return Err(RegistryError::BadRequest(format!(
                    "no public key {} uploaded",
                    public_key_kid
                )))
            }
            1 => {}
            n => {
                return Err(RegistryError::Conflict(format!(
                    "{} public keys share kid {}",
                    n, public_key_kid
                )))
            }
        }

        let kid = DKid::generate();
        let now = chrono::Utc::now().timestamp();

        sqlx::query(
            r#"
            INSERT INTO symmetric_keys (kid, public_key, key, created_at)
            VALUES (?1, ?2, ?3, ?4)
            "#,
        )
        .bind(kid)
        .bind(DKid::from(*public_key_kid))
        .bind(wrapped_key)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| RegistryError::from_constraint(e, "symmetric key kid already in use"))?;

        sqlx::query(
            r#"
            INSERT INTO encrypted_blobs (kid, name, owner, iv, state, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(kid)
        .bind(file_name)
        .bind(owner)
        .bind(iv)
        .bind(BlobState::Fresh.as_str())
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| RegistryError::from_constraint(e, "blob kid already in use"))?;

        tx.commit().await?;
        tracing::info!(kid = %kid, %owner, "upload started");
        Ok(kid.into())
    }

    /// Attach ciphertext to a `fresh` blob. A blob that is already `up`
    ///  is never overwritten and reads as missing.
    pub async fn complete_upload(
        &self,
        kid: &Kid,
        owner: &str,
        ciphertext: &[u8],
    ) -> Result<(), RegistryError> {
        let updated = sqlx::query(
            r#"
            UPDATE encrypted_blobs
            SET state = ?1, blob = ?2, uploaded_at = ?3
            WHERE kid = ?4 AND owner = ?5 AND state = ?6
            "#,
        )
        .bind(BlobState::Up.as_str())
        .bind(ciphertext)
        .bind(chrono::Utc::now().timestamp())
        .bind(DKid::from(*kid))
        .bind(owner)
        .bind(BlobState::Fresh.as_str())
        .execute(&**self)
        .await?
        .rows_affected();

        if updated == 0 {
            return Err(RegistryError::NotFound);
        }
        tracing::info!(%kid, bytes = ciphertext.len(), "upload completed");
        Ok(())
    }

    /// The wrapped key for blob `kid`, provided `requester` owns the
    ///  public key it is wrapped under
    pub async fn fetch_wrapped_key(
        &self,
        kid: &Kid,
        requester: &str,
    ) -> Result<WrappedKey, RegistryError> {
        let rows = sqlx::query(
            r#"
            SELECT symmetric_keys.key AS key, symmetric_keys.public_key AS public_key
            FROM symmetric_keys
            JOIN public_keys ON symmetric_keys.public_key = public_keys.kid
            WHERE symmetric_keys.kid = ?1 AND public_keys.owner = ?2
            "#,
        )
        .bind(DKid::from(*kid))
        .bind(requester)
        .fetch_all(&**self)
        .await?;

        match rows.as_slice() {
            [row] => Ok(WrappedKey {
                wrapped_key: row.get("key"),
                public_key_kid: row.get::<DKid, _>("public_key").into(),
            }),
            _ => Err(RegistryError::NotFound),
        }
    }

    pub async fn rename_blob(
        &self,
        kid: &Kid,
        owner: &str,
        new_name: &str,
    ) -> Result<String, RegistryError> {
        validate_blob_name(new_name)?;

        let mut tx = self.begin_write().await?;
        let renamed = sqlx::query("UPDATE encrypted_blobs SET name = ?1 WHERE kid = ?2 AND owner = ?3")
            .bind(new_name)
            .bind(DKid::from(*kid))
            .bind(owner)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        match renamed {
            0 => Err(RegistryError::NotFound),
            1 => {
                tx.commit().await?;
                Ok(new_name.to_string())
            }
            n => {
                tracing::error!(%kid, rows = n, "rename matched more than one blob");
                Err(RegistryError::Conflict(format!("{} blobs share kid {}", n, kid)))
            }
        }
    }

    /// Remove a blob together with its symmetric key
    pub async fn delete_blob(&self, kid: &Kid, owner: &str) -> Result<(), RegistryError> {
        let mut tx = self.begin_write().await?;

        let deleted = sqlx::query("DELETE FROM encrypted_blobs WHERE kid = ?1 AND owner = ?2")
            .bind(DKid::from(*kid))
            .bind(owner)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        match deleted {
            0 => return Err(RegistryError::NotFound),
            1 => {}
            n => {
                tracing::error!(%kid, rows = n, "delete matched more than one blob");
                return Err(RegistryError::Conflict(format!("{} blobs share kid {}", n, kid)));
            }
        }

        sqlx::query("DELETE FROM symmetric_keys WHERE kid = ?1")
            .bind(DKid::from(*kid))
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        tracing::info!(%kid, %owner, "blob deleted");
        Ok(())
    }

    /// Ciphertext of one of `owner`'s uploaded blobs
    pub async fn fetch_blob(&self, kid: &Kid, owner: &str) -> Result<BlobRecord, RegistryError> {
        let row = sqlx::query(
            r#"
            SELECT kid, name, iv, blob FROM encrypted_blobs
            WHERE kid = ?1 AND owner = ?2 AND state = ?3
            "#,
        )
        .bind(DKid::from(*kid))
        .bind(owner)
        .bind(BlobState::Up.as_str())
        .fetch_optional(&**self)
        .await?
        .ok_or(RegistryError::NotFound)?;

        Ok(BlobRecord {
            kid: row.get::<DKid, _>("kid").into(),
            name: row.get("name"),
            iv: row.get("iv"),
            ciphertext: row.get("blob"),
        })
    }

    pub async fn list_blobs(&self, owner: &str) -> Result<Vec<BlobSummary>, RegistryError> {
        let rows = sqlx::query(
            r#"
            SELECT kid, name, state, created_at FROM encrypted_blobs
            WHERE owner = ?1
            ORDER BY kid ASC
            "#,
        )
        .bind(owner)
        .fetch_all(&**self)
        .await?;

        rows.iter()
            .map(|r| {
                Ok(BlobSummary {
                    kid: r.get::<DKid, _>("kid").into(),
                    name: r.get("name"),
                    state: r.get::<String, _>("state").parse()?,
                    created_at: r.get("created_at"),
                })
            })
            .collect()
    }

    /// Blobs still `fresh` that were created strictly before `older_than`
    ///  (unix seconds). Nothing is removed.
    pub async fn abandoned_uploads(
        &self,
        older_than: i64,
    ) -> Result<Vec<AbandonedUpload>, RegistryError> {
        let rows = sqlx::query(
            r#"
            SELECT kid, owner, name, created_at FROM encrypted_blobs
            WHERE state = ?1 AND created_at < ?2
            ORDER BY created_at ASC, kid ASC
            "#,
        )
        .bind(BlobState::Fresh.as_str())
        .bind(older_than)
        .fetch_all(&**self)
        .await?;

        Ok(rows
            .iter()
            .map(|r| AbandonedUpload {
                kid: r.get::<DKid, _>("kid").into(),
                owner: r.get("owner"),
                name: r.get("name"),
                created_at: r.get("created_at"),
            })
            .collect())
    }
}
