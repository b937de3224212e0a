use serde::Serialize;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

/// The local record of a subscriber. The platform is the source of truth for
/// everything but the email to token mapping.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Subscriber {
    pub email: String,
    pub token: String,
}

impl TryFrom<PgRow> for Subscriber {
    type Error = sqlx::Error;

    fn try_from(row: PgRow) -> Result<Self, Self::Error> {
        Ok(Self {
            email: row.try_get("email")?,
            token: row.try_get("token")?,
        })
    }
}

impl Subscriber {
    pub async fn find_by_email(email: &str, pool: &PgPool) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query("SELECT email, token FROM subscribers WHERE email = $1")
            .bind(email)
            .fetch_optional(pool)
            .await?
            .map(Subscriber::try_from)
            .transpose()
    }

    pub async fn find_by_token(token: &str, pool: &PgPool) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query("SELECT email, token FROM subscribers WHERE token = $1")
            .bind(token)
            .fetch_optional(pool)
            .await?
            .map(Subscriber::try_from)
            .transpose()
    }

    /// Returns the subscriber for `email`, minting a fresh token if there was
    /// none. The flag is true when this call created the record.
    #[tracing::instrument(name = "Getting or creating a local subscriber", skip(pool))]
    pub async fn get_or_create(email: &str, pool: &PgPool) -> Result<(Self, bool), sqlx::Error> {
        let inserted = sqlx::query(
            r#"
              INSERT INTO subscribers (email, token)
              VALUES ($1, $2)
              ON CONFLICT (email) DO NOTHING
              RETURNING email, token
            "#,
        )
        .bind(email)
        .bind(Uuid::new_v4().to_string())
        .fetch_optional(pool)
        .await?;

        if let Some(row) = inserted {
            return Ok((Subscriber::try_from(row)?, true));
        }

        let existing = sqlx::query("SELECT email, token FROM subscribers WHERE email = $1")
            .bind(email)
            .fetch_one(pool)
            .await?;

        Ok((Subscriber::try_from(existing)?, false))
    }

    /// Make the local record match what the platform knows about this email.
    #[tracing::instrument(name = "Syncing a local subscriber", skip(pool, token))]
    pub async fn get_and_sync(
        email: &str,
        token: &str,
        pool: &PgPool,
    ) -> Result<Self, sqlx::Error> {
        let row = sqlx::query(
            r#"
              INSERT INTO subscribers (email, token)
              VALUES ($1, $2)
              ON CONFLICT (email) DO UPDATE SET token = EXCLUDED.token
              RETURNING email, token
            "#,
        )
        .bind(email)
        .bind(token)
        .fetch_one(pool)
        .await?;

        Subscriber::try_from(row)
    }
}
