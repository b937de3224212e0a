use crate::utils::error_chain_fmt;
use reqwest::{Client, Response, StatusCode};
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Field names as they are written to, and read from, the platform.
pub type FieldMap = BTreeMap<String, String>;

/// A row read back from the platform. Unset fields come back as `None`.
pub type PlatformRecord = HashMap<String, Option<String>>;

/// Names of the platform fields shared by every partition.
pub mod fields {
    pub const EMAIL_ADDRESS: &str = "EMAIL_ADDRESS_";
    pub const EMAIL_FORMAT: &str = "EMAIL_FORMAT_";
    pub const COUNTRY: &str = "COUNTRY_";
    pub const LANGUAGE: &str = "LANGUAGE_ISO2";
    pub const TOKEN: &str = "TOKEN";
    pub const CREATED_DATE: &str = "CREATED_DATE_";
    pub const MODIFIED_DATE: &str = "MODIFIED_DATE_";
    pub const PERMISSION_STATUS: &str = "EMAIL_PERMISSION_STATUS_";
    pub const SOURCE_URL: &str = "SOURCE_URL";
    // Only the double opt-in partition carries these two.
    pub const SUBSCRIBER_KEY: &str = "SubscriberKey";
    pub const EMAIL_ADDRESS_ALIAS: &str = "EmailAddress";

    pub fn flag(vendor_id: &str) -> String {
        format!("{}_FLG", vendor_id)
    }

    pub fn date(vendor_id: &str) -> String {
        format!("{}_DATE", vendor_id)
    }
}

/// The record stores the platform keeps subscriber rows in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Partition {
    /// Confirmed subscribers.
    Master,
    /// Subscribers waiting on their confirmation email.
    Pending,
    /// Tokens of subscribers who clicked their confirmation link.
    Confirmation,
}

#[derive(Deserialize, Clone, Debug)]
pub struct PartitionNames {
    pub master: String,
    pub pending: String,
    pub confirmation: String,
}

impl PartitionNames {
    pub fn name(&self, partition: Partition) -> &str {
        match partition {
            Partition::Master => &self.master,
            Partition::Pending => &self.pending,
            Partition::Confirmation => &self.confirmation,
        }
    }
}

#[derive(thiserror::Error)]
pub enum PlatformError {
    #[error("Failed to reach the mailing platform.")]
    Network(#[from] reqwest::Error),
    #[error("The mailing platform rejected our credentials.")]
    Unauthorized,
    #[error("The mailing platform is unavailable (status {0}).")]
    Unavailable(u16),
    #[error("{0}")]
    Rejected(String),
}

impl std::fmt::Debug for PlatformError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

pub struct PlatformClient {
    http_client: Client,
    base_url: String,
    api_key: Secret<String>,
    partitions: PartitionNames,
}

impl PlatformClient {
    pub fn new(
        base_url: String,
        api_key: Secret<String>,
        partitions: PartitionNames,
        timeout: std::time::Duration,
    ) -> Self {
        let http_client = Client::builder().timeout(timeout).build().unwrap();

        Self {
            http_client,
            base_url,
            api_key,
            partitions,
        }
    }

    /// Look up a single row by `key_field`. `Ok(None)` means the platform has
    /// no row for that key, which is not an error.
    #[tracing::instrument(name = "Fetching a platform record", skip(self, key_value, fields))]
    pub async fn get_record(
        &self,
        partition: Partition,
        key_field: &str,
        key_value: &str,
        fields: &[String],
    ) -> Result<Option<PlatformRecord>, PlatformError> {
        let url = format!(
            "{}/data_extensions/{}/rows/search",
            self.base_url,
            self.partitions.name(partition)
        );
        let request_body = SearchRequest {
            key_field,
            key_value,
            fields,
        };

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(self.api_key.expose_secret())
            .json(&request_body)
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let row: SearchResponse = check_status(response).await?.json().await?;

        Ok(Some(row.fields))
    }

    /// Upsert a row. The platform merges on its primary key, so only the
    /// fields present in `fields` are touched.
    #[tracing::instrument(name = "Writing a platform record", skip(self, fields))]
    pub async fn add_record(
        &self,
        partition: Partition,
        fields: &FieldMap,
    ) -> Result<(), PlatformError> {
        let url = format!(
            "{}/data_extensions/{}/rows",
            self.base_url,
            self.partitions.name(partition)
        );

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(self.api_key.expose_secret())
            .json(&AddRecordRequest { fields })
            .send()
            .await?;

        check_status(response).await?;

        Ok(())
    }

    #[tracing::instrument(name = "Triggering a platform message", skip(self, recipient))]
    pub async fn trigger_send(
        &self,
        message_id: &str,
        recipient: &Recipient<'_>,
    ) -> Result<(), PlatformError> {
        let url = format!(
            "{}/triggered_sends/{}/deliveries",
            self.base_url, message_id
        );

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(self.api_key.expose_secret())
            .json(&TriggerRequest {
                subscriber: recipient,
            })
            .send()
            .await?;

        check_status(response).await?;

        Ok(())
    }
}

async fn check_status(response: Response) -> Result<Response, PlatformError> {
    let status = response.status();

    if status.is_success() {
        return Ok(response);
    }

    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(PlatformError::Unauthorized);
    }

    if status.is_server_error() {
        return Err(PlatformError::Unavailable(status.as_u16()));
    }

    let body = response.text().await?;
    let message = serde_json::from_str::<RejectionBody>(&body)
        .map(|rejection| rejection.message)
        .unwrap_or(body);

    Err(PlatformError::Rejected(message))
}

/// Who a triggered message goes to.
#[derive(Serialize, Debug)]
pub struct Recipient<'a> {
    #[serde(rename = "EMAIL_ADDRESS_")]
    pub email: &'a str,
    #[serde(rename = "TOKEN")]
    pub token: &'a str,
    #[serde(rename = "EMAIL_FORMAT_")]
    pub format: &'a str,
}

#[derive(Serialize)]
struct SearchRequest<'a> {
    key_field: &'a str,
    key_value: &'a str,
    fields: &'a [String],
}

#[derive(Deserialize)]
struct SearchResponse {
    fields: PlatformRecord,
}

#[derive(Serialize)]
struct AddRecordRequest<'a> {
    fields: &'a FieldMap,
}

#[derive(Serialize)]
struct TriggerRequest<'a> {
    subscriber: &'a Recipient<'a>,
}

#[derive(Deserialize)]
struct RejectionBody {
    message: String,
}
