use crate::models::{Newsletter, NewsletterCatalog};
use crate::utils::e500;
use actix_web::http::header::ContentType;
use actix_web::{HttpResponse, get, web};
use anyhow::Context;
use serde::Serialize;
use sqlx::PgPool;
use std::collections::BTreeMap;

#[derive(Serialize)]
struct NewslettersResponse<'a> {
    status: &'static str,
    newsletters: BTreeMap<&'a str, &'a Newsletter>,
}

#[get("/newsletters")]
#[tracing::instrument(name = "Retrieving the newsletter catalog", skip_all)]
pub async fn get(pool: web::Data<PgPool>) -> Result<HttpResponse, actix_web::Error> {
    let catalog = NewsletterCatalog::load(&pool)
        .await
        .context("Failed to load the newsletter catalog.")
        .map_err(e500)?;

    Ok(HttpResponse::Ok()
        .content_type(ContentType::json())
        .json(NewslettersResponse {
            status: "ok",
            newsletters: catalog.iter().map(|n| (n.slug.as_str(), n)).collect(),
        }))
}
