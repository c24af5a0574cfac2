use serde::{Deserialize, Serialize};
use sqlx::Row;

use common::key_format::validate_name;
use common::kid::Kid;

use super::reservations::consume_reservation;
use super::{DKid, Database, RegistryError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKeySummary {
    pub kid: Kid,
    pub name: String,
    pub created_at: i64,
}

impl Database {
    /// Store `owner`'s public key under a KID they reserved earlier.
    ///
    /// Spending the reservation and inserting the key commit together or
    ///  not at all.
    pub async fn upload_public_key(
        &self,
        kid: &Kid,
        name: &str,
        owner: &str,
        key: &[u8],
    ) -> Result<Kid, RegistryError> {
        validate_name(name).map_err(|e| RegistryError::BadRequest(e.to_string()))?;

        let mut tx = self.begin_write().await?;

        let existing = sqlx::query("SELECT 1 FROM public_keys WHERE kid = ?1")
            .bind(DKid::from(*kid))
            .fetch_optional(&mut *tx)
            .await?;
        if existing.is_some() {
            return Err(RegistryError::Conflict(format!(
                "a public key with kid {} already exists",
                kid
            )));
        }

        consume_reservation(kid, owner, &mut tx).await?;

        sqlx::query(
            r#"
            INSERT INTO public_keys (kid, name, owner, key, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(DKid::from(*kid))
        .bind(name)
        .bind(owner)
        .bind(key)
        .bind(chrono::Utc::now().timestamp())
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            RegistryError::from_constraint(e, &format!("a public key with kid {} already exists", kid))
        })?;

        tx.commit().await?;
        tracing::info!(%kid, %owner, "public key uploaded");
        Ok(*kid)
    }

    /// Serialized public key, readable by any authenticated caller
    pub async fn download_public_key(&self, kid: &Kid) -> Result<Vec<u8>, RegistryError> {
        let row = sqlx::query("SELECT key FROM public_keys WHERE kid = ?1")
            .bind(DKid::from(*kid))
            .fetch_optional(&**self)
            .await?
            .ok_or(RegistryError::NotFound)?;
        Ok(row.get("key"))
    }

    /// Remove one of `owner`'s public keys. A key someone else owns is
    ///  reported exactly like a missing one.
    pub async fn delete_public_key(&self, kid: &Kid, owner: &str) -> Result<Kid, RegistryError> {
        let deleted = sqlx::query("DELETE FROM public_keys WHERE kid = ?1 AND owner = ?2")
            .bind(DKid::from(*kid))
            .bind(owner)
            .execute(&**self)
            .await
            .map_err(|e| {
                RegistryError::from_constraint(e, "public key still wraps symmetric keys")
            })?
            .rows_affected();

        if deleted == 0 {
            return Err(RegistryError::NotFound);
        }
        tracing::info!(%kid, %owner, "public key deleted");
        Ok(*kid)
    }

    pub async fn rename_public_key(
        &self,
        kid: &Kid,
        owner: &str,
        new_name: &str,
    ) -> Result<String, RegistryError> {
        validate_name(new_name).map_err(|e| RegistryError::BadRequest(e.to_string()))?;

        let mut tx = self.begin_write().await?;
        let renamed = sqlx::query("UPDATE public_keys SET name = ?1 WHERE kid = ?2 AND owner = ?3")
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
                tracing::error!(%kid, rows = n, "rename matched more than one public key");
                Err(RegistryError::Conflict(format!(
                    "{} public keys share kid {}",
                    n, kid
                )))
            }
        }
    }

    pub async fn list_public_keys(&self, owner: &str) -> Result<Vec<PublicKeySummary>, RegistryError> {
        let rows = sqlx::query(
            r#"
            SELECT kid, name, created_at FROM public_keys
            WHERE owner = ?1
            ORDER BY kid ASC
            "#,
        )
        .bind(owner)
        .fetch_all(&**self)
        .await?;

        Ok(rows
            .iter()
            .map(|r| PublicKeySummary {
                kid: r.get::<DKid, _>("kid").into(),
                name: r.get("name"),
                created_at: r.get("created_at"),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn reserve(db: &Database, user: &str) -> Kid {
        db.reserve_kid(user, 5).await.unwrap().kid
    }

    #[tokio::test]
    async fn test_upload_consumes_reservation() {
        let db = Database::in_memory().await.unwrap();
        let kid = reserve(&db, "alice").await;

        let uploaded = db
            .upload_public_key(&kid, "alice laptop", "alice", b"{\"kty\":\"RSA\"}")
            .await
            .unwrap();
        assert_eq!(uploaded, kid);
        assert!(db.list_reservations("alice").await.unwrap().is_empty());
        assert_eq!(
            db.download_public_key(&kid).await.unwrap(),
            b"{\"kty\":\"RSA\"}"
        );
    }

    #[tokio::test]
    async fn test_upload_without_reservation_leaves_no_row() {
        let db = Database::in_memory().await.unwrap();
        let kid = Kid::generate();

        let result = db.upload_public_key(&kid, "stray key", "alice", b"key").await;
        assert!(matches!(result, Err(RegistryError::BadRequest(_))));
        assert!(matches!(
            db.download_public_key(&kid).await,
            Err(RegistryError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_upload_with_someone_elses_reservation() {
        let db = Database::in_memory().await.unwrap();
        let kid = reserve(&db, "alice").await;

        let result = db.upload_public_key(&kid, "not mine", "mallory", b"key").await;
        assert!(matches!(result, Err(RegistryError::BadRequest(_))));
        assert_eq!(db.list_reservations("alice").await.unwrap(), vec![kid]);
    }

    #[tokio::test]
    async fn test_duplicate_upload_conflicts() {
        let db = Database::in_memory().await.unwrap();
        let kid = reserve(&db, "alice").await;
        // A rejected name leaves the reservation in place
        db.upload_public_key(&kid, "abc", "alice", b"one")
            .await
            .unwrap_err();
        db.upload_public_key(&kid, "first key", "alice", b"one")
            .await
            .unwrap();

        let result = db.upload_public_key(&kid, "second key", "alice", b"two").await;
        assert!(matches!(result, Err(RegistryError::Conflict(_))));
        assert_eq!(db.download_public_key(&kid).await.unwrap(), b"one");
    }

    #[tokio::test]
    async fn test_rename_and_delete_are_owner_scoped() {
        let db = Database::in_memory().await.unwrap();
        let kid = reserve(&db, "alice").await;
        db.upload_public_key(&kid, "old name", "alice", b"key")
            .await
            .unwrap();

        assert!(matches!(
            db.rename_public_key(&kid, "mallory", "stolen").await,
            Err(RegistryError::NotFound)
        ));
        assert!(matches!(
            db.rename_public_key(&kid, "alice", "no").await,
            Err(RegistryError::BadRequest(_))
        ));
        let renamed = db.rename_public_key(&kid, "alice", "new name").await.unwrap();
        assert_eq!(renamed, "new name");
        assert_eq!(db.list_public_keys("alice").await.unwrap()[0].name, "new name");

        assert!(matches!(
            db.delete_public_key(&kid, "mallory").await,
            Err(RegistryError::NotFound)
        ));
        db.delete_public_key(&kid, "alice").await.unwrap();
        assert!(db.list_public_keys("alice").await.unwrap().is_empty());
    }
}
