use crate::clients::platform_client::PlatformClient;
use crate::models::NewsletterCatalog;
use crate::reconciliation::{LookupKey, ReconcileError, confirm_user};
use crate::routes::lookup_subscriber;
use crate::utils::{ErrorCode, e400, e403, e500, e500_with_code};
use actix_web::http::header::ContentType;
use actix_web::{HttpResponse, post, web};
use anyhow::Context;
use serde_json::json;
use sqlx::PgPool;

#[post("/confirm/{token}")]
#[tracing::instrument(name = "Confirming a subscription", skip(pool, platform))]
pub async fn post(
    token: web::Path<String>,
    pool: web::Data<PgPool>,
    platform: web::Data<PlatformClient>,
) -> Result<HttpResponse, actix_web::Error> {
    let catalog = NewsletterCatalog::load(&pool)
        .await
        .context("Failed to load the newsletter catalog.")
        .map_err(e500)?;

    if lookup_subscriber(&pool, &platform, &catalog, LookupKey::Token(token.as_str()))
        .await?
        .is_none()
    {
        return Err(e403(ErrorCode::UsageError, "unknown token"));
    }

    confirm_user(&platform, &token).await.map_err(|e| match e {
        ReconcileError::AuthFailure(_) => e500_with_code(ErrorCode::EmailProviderAuthFailure, e),
        ReconcileError::TransientNetwork(_) => e400(ErrorCode::NetworkFailure, e),
        _ => e500(e),
    })?;

    Ok(HttpResponse::Ok()
        .content_type(ContentType::json())
        .json(json!({ "status": "ok" })))
}
