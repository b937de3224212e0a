use crate::clients::platform_client::{PlatformClient, PlatformError};
use crate::models::{NewsletterCatalog, Subscriber};
use crate::reconciliation::{Lookup, LookupKey, fetch_user};
use crate::utils::{ErrorCode, e400, e500, e500_with_code};
use anyhow::Context;
use sqlx::PgPool;

/// Find the local subscriber for `key`, consulting the platform when the
/// local store has never seen them. The flag is true when a new local
/// record was created. Returns `None` for a token nobody knows.
#[tracing::instrument(name = "Looking up a subscriber", skip(pool, platform, catalog))]
pub async fn lookup_subscriber(
    pool: &PgPool,
    platform: &PlatformClient,
    catalog: &NewsletterCatalog,
    key: LookupKey<'_>,
) -> Result<Option<(Subscriber, bool)>, actix_web::Error> {
    let local = match key {
        LookupKey::Email(email) => Subscriber::find_by_email(email, pool).await,
        LookupKey::Token(token) => Subscriber::find_by_token(token, pool).await,
    }
    .context("Failed to query local subscribers.")
    .map_err(e500)?;

    if let Some(subscriber) = local {
        return Ok(Some((subscriber, false)));
    }

    match fetch_user(platform, catalog, key).await.map_err(platform_error)? {
        Lookup::Found(snapshot) if !snapshot.email.is_empty() && !snapshot.token.is_empty() => {
            let subscriber = Subscriber::get_and_sync(&snapshot.email, &snapshot.token, pool)
                .await
                .context("Failed to sync a subscriber known to the mailing platform.")
                .map_err(e500)?;

            Ok(Some((subscriber, false)))
        }
        _ => match key {
            LookupKey::Email(email) => {
                let (subscriber, created) = Subscriber::get_or_create(email, pool)
                    .await
                    .context("Failed to create a local subscriber.")
                    .map_err(e500)?;

                Ok(Some((subscriber, created)))
            }
            LookupKey::Token(_) => Ok(None),
        },
    }
}

pub fn platform_error(e: PlatformError) -> actix_web::Error {
    match e {
        PlatformError::Unauthorized => e500_with_code(ErrorCode::EmailProviderAuthFailure, e),
        PlatformError::Rejected(_) => e500(e),
        PlatformError::Network(_) | PlatformError::Unavailable(_) => {
            e400(ErrorCode::NetworkFailure, e)
        }
    }
}
