use crate::config::Config;
use crate::record::AuditRecord;
use async_trait::async_trait;
use thiserror::Error;

/// The six upstream fields rendered into every outbound message, in order.
const MESSAGE_FIELDS: [&str; 6] = [
    "Action",
    "Section",
    "Display",
    "CreatedByUser",
    "AuditCreatedDate",
    "DelegateUser",
];

const MISSING_FIELD: &str = "N/A";

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("channel returned status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("webhook URL is not configured")]
    NotConfigured,

    #[error("delivery attempt timed out")]
    Timeout,
}

/// Boundary to the downstream notification channel.
///
/// One record in, success or a described failure out. Implementations must
/// resolve within the configured delivery timeout; retry lives entirely in
/// the dispatcher, never here.
#[async_trait]
pub trait DeliveryChannel: Send + Sync {
    async fn deliver(&self, record: &AuditRecord) -> Result<(), DeliveryError>;
}

/// Delivers records as `{ "text": ... }` posts to a webhook URL.
pub struct WebhookChannel {
    client: reqwest::Client,
    url: Option<String>,
}

impl WebhookChannel {
    pub fn new(config: &Config) -> Result<Self, DeliveryError> {
        let client = reqwest::Client::builder()
            .timeout(config.delivery_timeout)
            .build()?;

        Ok(Self {
            client,
            url: config.webhook_url.clone(),
        })
    }
}

#[async_trait]
impl DeliveryChannel for WebhookChannel {
    async fn deliver(&self, record: &AuditRecord) -> Result<(), DeliveryError> {
        let url = self.url.as_deref().ok_or(DeliveryError::NotConfigured)?;

        let body = serde_json::json!({ "text": render_text(record) });
        let response = self.client.post(url).json(&body).send().await?;

        if !response.status().is_success() {
            return Err(DeliveryError::Rejected {
                status: response.status().as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        Ok(())
    }
}

/// Render a record as newline-joined `*Label:* value` lines, one per
/// message field, substituting `N/A` for anything absent.
pub fn render_text(record: &AuditRecord) -> String {
    MESSAGE_FIELDS
        .iter()
        .map(|field| {
            let value = record.field(field).unwrap_or(MISSING_FIELD);
            format!("*{field}:* {value}")
        })
        .collect::<Vec<_>>()
        .join("\n")
}
