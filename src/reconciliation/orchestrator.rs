use crate::clients::platform_client::{
    FieldMap, Partition, PlatformClient, PlatformError, Recipient, fields,
};
use crate::domain::{ChangeType, DesiredChange};
use crate::models::NewsletterCatalog;
use crate::reconciliation::{
    LookupKey, PlatformWrite, RemoteUserSnapshot, build_write, confirmation_required, fetch_user,
    platform_timestamp, resolve_format, resolve_lang, select_welcomes,
};
use crate::utils::error_chain_fmt;
use chrono::Utc;

/// One unit of reconciliation work for a single subscriber.
#[derive(Debug, Clone)]
pub struct UpdateRequest {
    pub email: String,
    pub token: String,
    /// The local record was created by the request that queued this update,
    /// so the platform cannot know the subscriber yet.
    pub created: bool,
    pub change: DesiredChange,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The subscriber had already confirmed their address.
    AlreadyConfirmed,
    /// Written straight to the master list, no confirmation needed.
    ExemptNew,
    /// Written to the pending list and sent a confirmation email.
    ConfirmationPending,
}

#[derive(thiserror::Error)]
pub enum ReconcileError {
    #[error("The mailing platform could not be reached.")]
    TransientNetwork(#[source] PlatformError),
    #[error("The mailing platform rejected our credentials.")]
    AuthFailure(#[source] PlatformError),
    #[error("The mailing platform still requires a missing field: {0}")]
    MissingRequiredField(String),
    #[error("The mailing platform rejected the update: {0}")]
    Rejected(String),
}

impl ReconcileError {
    /// Only network trouble is worth another attempt later on.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ReconcileError::TransientNetwork(_))
    }
}

impl std::fmt::Debug for ReconcileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl From<PlatformError> for ReconcileError {
    fn from(e: PlatformError) -> Self {
        match e {
            PlatformError::Rejected(message) => ReconcileError::Rejected(message),
            PlatformError::Unauthorized => ReconcileError::AuthFailure(PlatformError::Unauthorized),
            other => ReconcileError::TransientNetwork(other),
        }
    }
}

/// Bring the platform in line with `request.change`.
#[tracing::instrument(
    name = "Reconciling a subscriber",
    skip(platform, catalog, request),
    fields(
        token = %request.token,
        change_type = %request.change.change_type,
        newsletters = %request.change.newsletters.joined(),
    )
)]
pub async fn update_user(
    platform: &PlatformClient,
    catalog: &NewsletterCatalog,
    request: &UpdateRequest,
) -> Result<UpdateOutcome, ReconcileError> {
    let change = &request.change;
    let existing = fetch_existing(platform, catalog, request).await?;
    let existing = existing.as_ref();

    let lang = resolve_lang(change, existing);
    let format = resolve_format(change, existing);
    let confirmation = confirmation_required(change, existing, catalog, &lang);

    let write = build_write(request, existing, catalog, confirmation.is_some(), Utc::now());
    apply_write(platform, write).await?;

    let recipient = Recipient {
        email: &request.email,
        token: &request.token,
        format: format.as_code(),
    };

    if let Some(message_id) = confirmation {
        trigger(platform, message_id, &recipient).await;
        return Ok(UpdateOutcome::ConfirmationPending);
    }

    for message_id in select_welcomes(change, existing, catalog, &lang, format) {
        trigger(platform, &message_id, &recipient).await;
    }

    if existing.is_some_and(|snapshot| snapshot.confirmed) {
        Ok(UpdateOutcome::AlreadyConfirmed)
    } else {
        Ok(UpdateOutcome::ExemptNew)
    }
}

/// Record that the subscriber behind `token` clicked their confirmation link.
/// The platform moves the pending row to master on its own schedule.
#[tracing::instrument(name = "Confirming a subscriber", skip(platform))]
pub async fn confirm_user(platform: &PlatformClient, token: &str) -> Result<(), ReconcileError> {
    let mut fields = FieldMap::new();
    fields.insert(fields::TOKEN.into(), token.to_string());

    platform
        .add_record(Partition::Confirmation, &fields)
        .await
        .map_err(ReconcileError::from)
}

/// A subscribe needs the current state to decide on confirmation, so any
/// failure aborts it. Unsubscribes and SETs go ahead without a snapshot and
/// write every flag they touch, unless the platform rejected our credentials.
async fn fetch_existing(
    platform: &PlatformClient,
    catalog: &NewsletterCatalog,
    request: &UpdateRequest,
) -> Result<Option<RemoteUserSnapshot>, ReconcileError> {
    if request.created {
        return Ok(None);
    }

    match fetch_user(platform, catalog, LookupKey::Email(&request.email)).await {
        Ok(lookup) => Ok(lookup.into_snapshot()),
        Err(e @ PlatformError::Unauthorized) => Err(e.into()),
        Err(e) if request.change.change_type == ChangeType::Subscribe => Err(e.into()),
        Err(e) => {
            tracing::warn!(
                error.cause_chain = ?e,
                error.message = %e,
                "Proceeding without the current subscriber state"
            );
            Ok(None)
        }
    }
}

/// Write once, and once more with a creation date if the platform says the
/// row is missing one.
async fn apply_write(
    platform: &PlatformClient,
    write: PlatformWrite,
) -> Result<(), ReconcileError> {
    let PlatformWrite {
        partition,
        mut fields,
    } = write;

    match platform.add_record(partition, &fields).await {
        Ok(()) => Ok(()),
        Err(PlatformError::Rejected(message)) if message.contains("CREATED_DATE") => {
            tracing::info!("Resubmitting the write with a creation date");
            fields.insert(fields::CREATED_DATE.into(), platform_timestamp(Utc::now()));

            match platform.add_record(partition, &fields).await {
                Ok(()) => Ok(()),
                Err(PlatformError::Rejected(message)) if message.contains("CREATED_DATE") => {
                    Err(ReconcileError::MissingRequiredField(message))
                }
                Err(e) => Err(e.into()),
            }
        }
        Err(e) => Err(e.into()),
    }
}

async fn trigger(platform: &PlatformClient, message_id: &str, recipient: &Recipient<'_>) {
    if let Err(e) = platform.trigger_send(message_id, recipient).await {
        tracing::error!(
            error.cause_chain = ?e,
            error.message = %e,
            message_id,
            "Failed to trigger a message. Skipping.",
        );
    }
}
