use crate::clients::platform_client::PlatformClient;
use crate::domain::ChangeType;
use crate::models::{NewsletterCatalog, Subscriber};
use crate::reconciliation::{Lookup, LookupKey, RemoteUserSnapshot, fetch_user};
use crate::routes::{UpdateParams, lookup_subscriber, parse_change, platform_error, queue_update};
use crate::utils::{ErrorCode, e403, e404, e500};
use actix_web::http::header::ContentType;
use actix_web::{HttpResponse, get, post, web};
use anyhow::Context;
use serde::Serialize;
use sqlx::PgPool;

#[derive(Serialize)]
struct UserResponse {
    status: &'static str,
    #[serde(flatten)]
    snapshot: RemoteUserSnapshot,
}

/// The subscriber's state as the platform sees it right now.
#[get("/user/{token}")]
#[tracing::instrument(name = "Retrieving a subscriber", skip(pool, platform))]
pub async fn get(
    token: web::Path<String>,
    pool: web::Data<PgPool>,
    platform: web::Data<PlatformClient>,
) -> Result<HttpResponse, actix_web::Error> {
    let catalog = NewsletterCatalog::load(&pool)
        .await
        .context("Failed to load the newsletter catalog.")
        .map_err(e500)?;

    let Lookup::Found(snapshot) = fetch_user(&platform, &catalog, LookupKey::Token(token.as_str()))
        .await
        .map_err(platform_error)?
    else {
        return Err(e404(ErrorCode::UnknownToken, "unknown token"));
    };

    if !snapshot.email.is_empty() {
        Subscriber::get_and_sync(&snapshot.email, &token, &pool)
            .await
            .context("Failed to sync a subscriber known to the mailing platform.")
            .map_err(e500)?;
    }

    Ok(HttpResponse::Ok()
        .content_type(ContentType::json())
        .json(UserResponse {
            status: "ok",
            snapshot,
        }))
}

/// Replace the subscriber's newsletters with exactly the ones given.
#[post("/user/{token}")]
#[tracing::instrument(
    name = "Setting a subscriber's newsletters",
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
    let change = parse_change(&params, ChangeType::Set, &catalog)?;

    let Some((subscriber, created)) =
        lookup_subscriber(&pool, &platform, &catalog, LookupKey::Token(token.as_str())).await?
    else {
        return Err(e403(ErrorCode::UsageError, "unknown token"));
    };

    queue_update(&pool, subscriber, created, change).await
}
