use crate::clients::platform_client::{FieldMap, Partition, fields};
use crate::domain::{ChangeType, DesiredChange};
use crate::models::{Newsletter, NewsletterCatalog};
use crate::reconciliation::{RemoteUserSnapshot, UpdateRequest};
use chrono::{DateTime, Duration, Utc};

/// Everything the platform is told about one subscriber in a single upsert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformWrite {
    pub partition: Partition,
    pub fields: FieldMap,
}

/// Platform timestamps are written slightly in the future so they sort after
/// any row the platform itself touched while the request was in flight.
pub fn platform_timestamp(now: DateTime<Utc>) -> String {
    (now + Duration::minutes(10))
        .format("%a, %d %b %Y %H:%M:%S GMT")
        .to_string()
}

fn flag_date(now: DateTime<Utc>) -> String {
    now.format("%Y-%m-%d").to_string()
}

/// Build the minimal write that moves the platform from `existing` to the
/// requested state. Without a snapshot every named newsletter is written.
pub fn build_write(
    request: &UpdateRequest,
    existing: Option<&RemoteUserSnapshot>,
    catalog: &NewsletterCatalog,
    needs_confirmation: bool,
    now: DateTime<Utc>,
) -> PlatformWrite {
    let change = &request.change;
    let timestamp = platform_timestamp(now);
    let mut fields = FieldMap::new();

    fields.insert(fields::EMAIL_ADDRESS.into(), request.email.clone());
    fields.insert(fields::TOKEN.into(), request.token.clone());
    fields.insert(fields::PERMISSION_STATUS.into(), "I".into());
    fields.insert(fields::MODIFIED_DATE.into(), timestamp.clone());

    if request.created {
        fields.insert(fields::CREATED_DATE.into(), timestamp);
    }

    if let Some(format) = change.format {
        fields.insert(fields::EMAIL_FORMAT.into(), format.as_code().into());
    }

    for (name, value) in [
        (fields::COUNTRY, &change.country),
        (fields::LANGUAGE, &change.lang),
        (fields::SOURCE_URL, &change.source_url),
    ] {
        if let Some(value) = value.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
            fields.insert(name.into(), value.into());
        }
    }

    fields.extend(newsletter_flags(change, existing, catalog, now));

    let partition = if needs_confirmation {
        fields.insert(fields::SUBSCRIBER_KEY.into(), request.token.clone());
        fields.insert(fields::EMAIL_ADDRESS_ALIAS.into(), request.email.clone());
        Partition::Pending
    } else {
        Partition::Master
    };

    PlatformWrite { partition, fields }
}

/// Flag and date fields for every newsletter whose state actually changes.
pub fn newsletter_flags(
    change: &DesiredChange,
    existing: Option<&RemoteUserSnapshot>,
    catalog: &NewsletterCatalog,
    now: DateTime<Utc>,
) -> FieldMap {
    let requested: Vec<&Newsletter> = change
        .newsletters
        .iter()
        .filter_map(|slug| {
            let newsletter = catalog.by_slug(slug);
            if newsletter.is_none() {
                tracing::warn!(slug, "Skipping a newsletter missing from the catalog");
            }
            newsletter
        })
        .collect();

    let (subscribe, unsubscribe): (Vec<&Newsletter>, Vec<&Newsletter>) = match change.change_type
    {
        ChangeType::Subscribe => (requested, vec![]),
        ChangeType::Unsubscribe => (vec![], requested),
        ChangeType::Set => {
            let complement = catalog
                .iter()
                .filter(|newsletter| !change.newsletters.contains(&newsletter.slug))
                .collect();
            (requested, complement)
        }
    };

    let is_subscribed =
        |newsletter: &Newsletter| existing.map(|snapshot| snapshot.is_subscribed(&newsletter.slug));
    let date = flag_date(now);
    let mut flags = FieldMap::new();

    for newsletter in subscribe {
        if is_subscribed(newsletter) != Some(true) {
            flags.insert(newsletter.flag_field(), "Y".into());
            flags.insert(newsletter.date_field(), date.clone());
        }
    }

    for newsletter in unsubscribe {
        if is_subscribed(newsletter) != Some(false) {
            flags.insert(newsletter.flag_field(), "N".into());
            flags.insert(newsletter.date_field(), date.clone());
        }
    }

    flags
}
