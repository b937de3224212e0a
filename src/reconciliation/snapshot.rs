use crate::clients::platform_client::{
    Partition, PlatformClient, PlatformError, PlatformRecord, fields,
};
use crate::domain::EmailFormat;
use crate::models::NewsletterCatalog;
use serde::Serialize;

/// How a subscriber is looked up on the platform.
#[derive(Debug, Clone, Copy)]
pub enum LookupKey<'a> {
    Email(&'a str),
    Token(&'a str),
}

impl<'a> LookupKey<'a> {
    fn field(&self) -> &'static str {
        match self {
            LookupKey::Email(_) => fields::EMAIL_ADDRESS,
            LookupKey::Token(_) => fields::TOKEN,
        }
    }

    fn value(&self) -> &'a str {
        match self {
            LookupKey::Email(value) | LookupKey::Token(value) => value,
        }
    }
}

#[derive(Debug, Clone)]
pub enum Lookup {
    NotFound,
    Found(RemoteUserSnapshot),
}

impl Lookup {
    pub fn into_snapshot(self) -> Option<RemoteUserSnapshot> {
        match self {
            Lookup::NotFound => None,
            Lookup::Found(snapshot) => Some(snapshot),
        }
    }
}

/// What the platform currently holds for one subscriber.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct RemoteUserSnapshot {
    pub email: String,
    pub token: String,
    pub format: EmailFormat,
    pub country: String,
    pub lang: String,
    #[serde(rename = "created-date")]
    pub created_date: Option<String>,
    #[serde(rename = "newsletters")]
    pub subscribed_newsletters: Vec<String>,
    pub master: bool,
    pub pending: bool,
    pub confirmed: bool,
}

impl RemoteUserSnapshot {
    pub fn is_subscribed(&self, slug: &str) -> bool {
        self.subscribed_newsletters.iter().any(|s| s == slug)
    }

    /// The snapshot's language, if it has a usable one.
    pub fn known_lang(&self) -> Option<&str> {
        let lang = self.lang.trim();
        (!lang.is_empty()).then_some(lang)
    }
}

/// Which partition a row was found in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Status {
    Master,
    Pending { confirmed: bool },
}

/// The fields read for every lookup, followed by one flag per newsletter.
pub fn lookup_fields(catalog: &NewsletterCatalog) -> Vec<String> {
    let mut names: Vec<String> = [
        fields::EMAIL_ADDRESS,
        fields::EMAIL_FORMAT,
        fields::COUNTRY,
        fields::LANGUAGE,
        fields::TOKEN,
        fields::CREATED_DATE,
    ]
    .iter()
    .map(|name| name.to_string())
    .collect();

    names.extend(catalog.iter().map(|newsletter| newsletter.flag_field()));

    names
}

/// Look the subscriber up in the master partition, falling back to the
/// pending one. A pending row counts as confirmed when its token has reached
/// the confirmation partition, even though the platform has not yet moved
/// the row to master.
#[tracing::instrument(name = "Fetching remote subscriber state", skip(platform, catalog))]
pub async fn fetch_user(
    platform: &PlatformClient,
    catalog: &NewsletterCatalog,
    key: LookupKey<'_>,
) -> Result<Lookup, PlatformError> {
    let requested = lookup_fields(catalog);

    if let Some(record) = platform
        .get_record(Partition::Master, key.field(), key.value(), &requested)
        .await?
    {
        return Ok(Lookup::Found(snapshot_from_record(
            &record,
            catalog,
            Status::Master,
        )));
    }

    let Some(record) = platform
        .get_record(Partition::Pending, key.field(), key.value(), &requested)
        .await?
    else {
        return Ok(Lookup::NotFound);
    };

    let token = field(&record, fields::TOKEN);
    let confirmed = !token.is_empty()
        && platform
            .get_record(
                Partition::Confirmation,
                fields::TOKEN,
                &token,
                &[fields::TOKEN.to_string()],
            )
            .await?
            .is_some();

    Ok(Lookup::Found(snapshot_from_record(
        &record,
        catalog,
        Status::Pending { confirmed },
    )))
}

fn snapshot_from_record(
    record: &PlatformRecord,
    catalog: &NewsletterCatalog,
    status: Status,
) -> RemoteUserSnapshot {
    let subscribed_newsletters = catalog
        .iter()
        .filter(|newsletter| field(record, &newsletter.flag_field()).eq_ignore_ascii_case("y"))
        .map(|newsletter| newsletter.slug.clone())
        .collect();
    let created_date = Some(field(record, fields::CREATED_DATE)).filter(|d| !d.is_empty());
    let (master, pending, confirmed) = match status {
        Status::Master => (true, false, true),
        Status::Pending { confirmed: true } => (false, false, true),
        Status::Pending { confirmed: false } => (false, true, false),
    };

    RemoteUserSnapshot {
        email: field(record, fields::EMAIL_ADDRESS),
        token: field(record, fields::TOKEN),
        format: EmailFormat::from_platform(
            record.get(fields::EMAIL_FORMAT).and_then(Option::as_deref),
        ),
        country: field(record, fields::COUNTRY),
        lang: field(record, fields::LANGUAGE),
        created_date,
        subscribed_newsletters,
        master,
        pending,
        confirmed,
    }
}

fn field(record: &PlatformRecord, name: &str) -> String {
    record
        .get(name)
        .and_then(Option::as_deref)
        .map(str::trim)
        .unwrap_or_default()
        .to_string()
}
