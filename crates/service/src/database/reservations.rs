use serde::{Deserialize, Serialize};
use sqlx::{Row, SqliteConnection};

use common::kid::Kid;

use super::{DKid, Database, RegistryError};

/// A KID held for a user until they upload a public key under it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    pub kid: Kid,
    /// True when the user was at their cap and got an existing
    ///  reservation back instead of a new one
    pub reused: bool,
}

impl Database {
    /// Reserve a KID for `user`, holding at most `cap` at once.
    ///
    /// At the cap one of the user's existing reservations is chosen
    ///  uniformly at random and handed back with `reused` set.
    pub async fn reserve_kid(&self, user: &str, cap: i64) -> Result<Reservation, RegistryError> {
        let mut tx = self.begin_write().await?;
        let kid = Kid::generate();
        let now = chrono::Utc::now().timestamp();

        // The cap check and the insert must be a single statement
        let inserted = sqlx::query(
            r#"
            INSERT INTO reserved_kids (kid, user_id, created_at)
            SELECT ?1, ?2, ?3
            WHERE (SELECT COUNT(*) FROM reserved_kids WHERE user_id = ?2) < ?4
            "#,
        )
        .bind(DKid::from(kid))
        .bind(user)
        .bind(now)
        .bind(cap)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        let reservation = if inserted == 1 {
            Reservation { kid, reused: false }
        } else {
            let row = sqlx::query(
                r#"
                SELECT kid FROM reserved_kids
                WHERE user_id = ?1
                ORDER BY RANDOM()
                LIMIT 1
                "#,
            )
            .bind(user)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| {
                RegistryError::Conflict("no reservation could be made".to_string())
            })?;
            let kid: DKid = row.get("kid");
            Reservation {
                kid: kid.into(),
                reused: true,
            }
        };

        tx.commit().await?;
        tracing::debug!(%user, kid = %reservation.kid, reused = reservation.reused, "reserved kid");
        Ok(reservation)
    }

    /// The KIDs currently reserved by `user`, oldest first
    pub async fn list_reservations(&self, user: &str) -> Result<Vec<Kid>, RegistryError> {
        let rows = sqlx::query(
            r#"
            SELECT kid FROM reserved_kids
            WHERE user_id = ?1
            ORDER BY kid ASC
            "#,
        )
        .bind(user)
        .fetch_all(&**self)
        .await?;

        Ok(rows
            .iter()
            .map(|r| Kid::from(r.get::<DKid, _>("kid")))
            .collect())
    }
}

/// Spend `user`'s reservation of `kid` inside the caller's transaction.
///
/// Anything other than exactly one deleted row is an error, which the
///  caller propagates to abort the transaction.
pub(crate) async fn consume_reservation(
    kid: &Kid,
    user: &str,
    conn: &mut SqliteConnection,
) -> Result<(), RegistryError> {
    let deleted = sqlx::query(
        r#"
        DELETE FROM reserved_kids
        WHERE kid = ?1 AND user_id = ?2
        "#,
    )
    .bind(DKid::from(*kid))
    .bind(user)
    .execute(conn)
    .await?
    .rows_affected();

    match deleted {
        1 => Ok(()),
        0 => Err(RegistryError::BadRequest(format!(
            "kid {} is not reserved",
            kid
        ))),
        n => Err(RegistryError::Conflict(format!(
            "kid {} was reserved {} times",
            kid, n
        ))),
    }
}
