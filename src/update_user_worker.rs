use crate::clients::platform_client::PlatformClient;
use crate::configuration::{Settings, WorkerSettings};
use crate::domain::{ChangeType, DesiredChange, EmailFormat, NewsletterSlugs, TriggerWelcome};
use crate::models::NewsletterCatalog;
use crate::reconciliation::{UpdateRequest, update_user};
use crate::startup::get_connection_pool;
use chrono::{Duration, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row, Transaction};
use std::time::Duration as StdDuration;
use tracing::{Span, field::display};
use uuid::Uuid;

type PgTransaction = Transaction<'static, Postgres>;

#[derive(Debug)]
pub enum ExecutionOutcome {
    TaskCompleted,
    EmptyQueue,
}

/// Queue a reconciliation to run in the background. Returns the task id.
#[tracing::instrument(name = "Enqueuing a subscriber update", skip(pool, request))]
pub async fn enqueue_update(pool: &PgPool, request: &UpdateRequest) -> Result<Uuid, sqlx::Error> {
    let task_id = Uuid::new_v4();
    let change = &request.change;

    sqlx::query(
        r#"
          INSERT INTO update_user_queue (
            id,
            email,
            token,
            created,
            change_type,
            newsletters,
            lang,
            format,
            country,
            source_url,
            trigger_welcome,
            optin
          )
          VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
        "#,
    )
    .bind(task_id)
    .bind(&request.email)
    .bind(&request.token)
    .bind(request.created)
    .bind(change.change_type.as_str())
    .bind(change.newsletters.joined())
    .bind(&change.lang)
    .bind(change.format.map(|format| format.as_code()))
    .bind(&change.country)
    .bind(&change.source_url)
    .bind(change.trigger_welcome.as_str())
    .bind(change.optin)
    .execute(pool)
    .await?;

    Ok(task_id)
}

struct QueuedUpdate {
    id: Uuid,
    n_retries: i32,
    request: UpdateRequest,
}

impl TryFrom<PgRow> for QueuedUpdate {
    type Error = anyhow::Error;

    fn try_from(row: PgRow) -> Result<Self, Self::Error> {
        let format: Option<String> = row.try_get("format")?;
        let newsletters: String = row.try_get("newsletters")?;
        let change = DesiredChange {
            change_type: ChangeType::try_from(row.try_get::<String, _>("change_type")?)
                .map_err(anyhow::Error::msg)?,
            newsletters: NewsletterSlugs::parse(&newsletters),
            lang: row.try_get("lang")?,
            format: format
                .as_deref()
                .map(EmailFormat::parse)
                .transpose()
                .map_err(anyhow::Error::msg)?,
            country: row.try_get("country")?,
            source_url: row.try_get("source_url")?,
            trigger_welcome: TriggerWelcome::try_from(row.try_get::<String, _>("trigger_welcome")?)
                .map_err(anyhow::Error::msg)?,
            optin: row.try_get("optin")?,
        };

        Ok(Self {
            id: row.try_get("id")?,
            n_retries: row.try_get("n_retries")?,
            request: UpdateRequest {
                email: row.try_get("email")?,
                token: row.try_get("token")?,
                created: row.try_get("created")?,
                change,
            },
        })
    }
}

#[tracing::instrument(
    skip_all,
    fields(task_id = tracing::field::Empty, token = tracing::field::Empty),
    err
)]
pub async fn try_execute_task(
    pool: &PgPool,
    platform: &PlatformClient,
    policy: &WorkerSettings,
) -> Result<ExecutionOutcome, anyhow::Error> {
    let Some((transaction, task)) = dequeue_task(pool).await? else {
        return Ok(ExecutionOutcome::EmptyQueue);
    };

    Span::current()
        .record("task_id", display(&task.id))
        .record("token", display(&task.request.token));

    // The catalog can change between enqueue and execution.
    let catalog = NewsletterCatalog::load(pool).await?;

    match update_user(platform, &catalog, &task.request).await {
        Ok(outcome) => {
            tracing::info!(?outcome, "Subscriber update completed");
            delete_task(transaction, task.id).await?;
        }
        Err(e) if e.is_retryable() && task.n_retries < policy.max_retries => {
            let n_retries = task.n_retries + 1;
            let delay = Duration::seconds(policy.retry_delay_seconds * i64::from(n_retries));

            tracing::warn!(
                error.cause_chain = ?e,
                error.message = %e,
                n_retries,
                "Subscriber update failed. Retrying later."
            );
            schedule_retry(transaction, task.id, n_retries, delay).await?;
        }
        Err(e) => {
            tracing::error!(
                error.cause_chain = ?e,
                error.message = %e,
                n_retries = task.n_retries,
                "Subscriber update failed. Giving up."
            );
            delete_task(transaction, task.id).await?;
        }
    }

    Ok(ExecutionOutcome::TaskCompleted)
}

#[tracing::instrument(skip_all)]
async fn dequeue_task(
    pool: &PgPool,
) -> Result<Option<(PgTransaction, QueuedUpdate)>, anyhow::Error> {
    let mut transaction = pool.begin().await?;
    let row = sqlx::query(
        r#"
          SELECT
            id,
            email,
            token,
            created,
            change_type,
            newsletters,
            lang,
            format,
            country,
            source_url,
            trigger_welcome,
            optin,
            n_retries
          FROM update_user_queue
          WHERE execute_after <= now()
          ORDER BY enqueued_at
          FOR UPDATE
          SKIP LOCKED
          LIMIT 1
        "#,
    )
    .fetch_optional(&mut *transaction)
    .await?;

    match row {
        Some(row) => Ok(Some((transaction, QueuedUpdate::try_from(row)?))),
        None => Ok(None),
    }
}

#[tracing::instrument(skip(transaction))]
async fn delete_task(mut transaction: PgTransaction, task_id: Uuid) -> Result<(), anyhow::Error> {
    sqlx::query("DELETE FROM update_user_queue WHERE id = $1")
        .bind(task_id)
        .execute(&mut *transaction)
        .await?;

    transaction.commit().await?;

    Ok(())
}

#[tracing::instrument(skip(transaction))]
async fn schedule_retry(
    mut transaction: PgTransaction,
    task_id: Uuid,
    n_retries: i32,
    delay: Duration,
) -> Result<(), anyhow::Error> {
    sqlx::query(
        r#"
          UPDATE update_user_queue
          SET n_retries = $2, execute_after = $3
          WHERE id = $1
        "#,
    )
    .bind(task_id)
    .bind(n_retries)
    .bind(Utc::now() + delay)
    .execute(&mut *transaction)
    .await?;

    transaction.commit().await?;

    Ok(())
}

async fn worker_loop(
    pool: PgPool,
    platform: PlatformClient,
    policy: WorkerSettings,
) -> Result<(), anyhow::Error> {
    loop {
        match try_execute_task(&pool, &platform, &policy).await {
            Err(_) => tokio::time::sleep(StdDuration::from_secs(1)).await,
            Ok(ExecutionOutcome::EmptyQueue) => {
                tokio::time::sleep(StdDuration::from_secs(10)).await
            }
            Ok(ExecutionOutcome::TaskCompleted) => {}
        }
    }
}

pub async fn run_worker_until_stopped(configuration: Settings) -> Result<(), anyhow::Error> {
    let connection_pool = get_connection_pool(&configuration.database);
    let platform = configuration.platform.client();

    worker_loop(connection_pool, platform, configuration.worker).await
}
