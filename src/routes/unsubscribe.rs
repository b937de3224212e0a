use crate::clients::platform_client::PlatformClient;
use crate::domain::ChangeType;
use crate::models::NewsletterCatalog;
use crate::reconciliation::LookupKey;
use crate::routes::{UpdateParams, lookup_subscriber, parse_change, queue_update};
use crate::utils::{ErrorCode, e403, e500};
use actix_web::{HttpResponse, post, web};
use anyhow::Context;
use sqlx::PgPool;

#[post("/unsubscribe/{token}")]
#[tracing::instrument(
    name = "Unsubscribing from newsletters",
    skip(params, pool, platform),
    fields(newsletters = ?params.newsletters)
)]
pub async fn post(
    token: web::Path<String>,
    params: web::Form<UpdateParams>,
    pool: web::Data<PgPool>,
    platform: web::Data<PlatformClient>,
) -> Result<HttpResponse, actix_web::Error> {
    let catalog = NewsletterCatalog::load(&pool)
        .await
        .context("Failed to load the newsletter catalog.")
        .map_err(e500)?;

    let mut params = params.into_inner();
    if params.optout.as_deref().map(str::trim) == Some("Y") {
        params.newsletters = Some(catalog.slugs().join(","));
    }
    let change = parse_change(&params, ChangeType::Unsubscribe, &catalog)?;

    let Some((subscriber, created)) =
        lookup_subscriber(&pool, &platform, &catalog, LookupKey::Token(token.as_str())).await?
    else {
        return Err(e403(ErrorCode::UsageError, "unknown token"));
    };

    queue_update(&pool, subscriber, created, change).await
}
