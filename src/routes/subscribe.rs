use crate::clients::platform_client::PlatformClient;
use crate::domain::{ChangeType, SubscriberEmail};
use crate::models::NewsletterCatalog;
use crate::reconciliation::LookupKey;
use crate::routes::{UpdateParams, lookup_subscriber, parse_change, queue_update};
use crate::utils::{ErrorCode, e400, e500, is_empty_or_whitespace};
use actix_web::{HttpResponse, post, web};
use anyhow::Context;
use sqlx::PgPool;

#[post("/subscribe")]
#[tracing::instrument(
    name = "Subscribing to newsletters",
    skip(params, pool, platform),
    fields(newsletters = ?params.newsletters)
)]
pub async fn post(
    params: web::Form<UpdateParams>,
    pool: web::Data<PgPool>,
    platform: web::Data<PlatformClient>,
) -> Result<HttpResponse, actix_web::Error> {
    if params.newsletters.as_deref().is_none_or(is_empty_or_whitespace) {
        return Err(e400(ErrorCode::UsageError, "newsletters is missing"));
    }

    let email = params
        .email
        .clone()
        .ok_or_else(|| e400(ErrorCode::UsageError, "email or token is required"))?;
    let email = SubscriberEmail::parse(email).map_err(|e| e400(ErrorCode::InvalidEmail, e))?;

    let catalog = NewsletterCatalog::load(&pool)
        .await
        .context("Failed to load the newsletter catalog.")
        .map_err(e500)?;
    let change = parse_change(&params, ChangeType::Subscribe, &catalog)?;

    let Some((subscriber, created)) =
        lookup_subscriber(&pool, &platform, &catalog, LookupKey::Email(email.as_ref())).await?
    else {
        return Err(e500("Email lookup returned no subscriber."));
    };

    queue_update(&pool, subscriber, created, change).await
}
