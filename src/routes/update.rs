use crate::domain::{
    ChangeType, DesiredChange, EmailFormat, NewsletterSlugs, TriggerWelcome,
    language_code_is_valid,
};
use crate::models::{NewsletterCatalog, Subscriber};
use crate::reconciliation::UpdateRequest;
use crate::update_user_worker::enqueue_update;
use crate::utils::{ErrorCode, e400, e500};
use actix_web::HttpResponse;
use actix_web::http::header::ContentType;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

/// Form fields shared by every route that changes a subscription.
#[derive(Deserialize, Debug, Default)]
pub struct UpdateParams {
    pub email: Option<String>,
    pub newsletters: Option<String>,
    pub lang: Option<String>,
    pub format: Option<String>,
    pub country: Option<String>,
    pub source_url: Option<String>,
    pub optin: Option<String>,
    pub trigger_welcome: Option<String>,
    pub optout: Option<String>,
}

#[derive(Serialize, Debug)]
struct UpdateResponse<'a> {
    status: &'static str,
    token: &'a str,
    created: bool,
}

/// Validate the form against the catalog. `optin` is only honoured for
/// subscribes, where it defaults to yes.
pub fn parse_change(
    params: &UpdateParams,
    change_type: ChangeType,
    catalog: &NewsletterCatalog,
) -> Result<DesiredChange, actix_web::Error> {
    let newsletters = NewsletterSlugs::parse(params.newsletters.as_deref().unwrap_or_default());

    if let Some(unknown) = newsletters.iter().find(|slug| catalog.by_slug(slug).is_none()) {
        return Err(e400(
            ErrorCode::InvalidNewsletter,
            format!("invalid newsletter: {}", unknown),
        ));
    }

    let lang = non_empty(&params.lang);
    if let Some(lang) = &lang {
        if !language_code_is_valid(lang, &catalog.languages()) {
            return Err(e400(ErrorCode::InvalidLanguage, "invalid language"));
        }
    }

    let format = non_empty(&params.format)
        .map(|format| EmailFormat::parse(&format))
        .transpose()
        .map_err(|e| e400(ErrorCode::UsageError, e))?;

    let optin = change_type == ChangeType::Subscribe
        && params
            .optin
            .as_deref()
            .is_none_or(|optin| optin.trim().eq_ignore_ascii_case("y"));

    Ok(DesiredChange {
        change_type,
        newsletters,
        lang,
        format,
        country: non_empty(&params.country),
        source_url: non_empty(&params.source_url),
        trigger_welcome: TriggerWelcome::parse(params.trigger_welcome.as_deref()),
        optin,
    })
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}

/// Hand the change to the background worker and acknowledge it.
pub async fn queue_update(
    pool: &PgPool,
    subscriber: Subscriber,
    created: bool,
    change: DesiredChange,
) -> Result<HttpResponse, actix_web::Error> {
    let request = UpdateRequest {
        email: subscriber.email,
        token: subscriber.token,
        created,
        change,
    };

    enqueue_update(pool, &request)
        .await
        .context("Failed to queue the subscriber update.")
        .map_err(e500)?;

    Ok(HttpResponse::Ok()
        .content_type(ContentType::json())
        .json(UpdateResponse {
            status: "ok",
            token: &request.token,
            created,
        }))
}
