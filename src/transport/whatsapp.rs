use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Serialize;

use crate::config::AppConfig;
use crate::errors::AppError;
use crate::transport::{Button, ChatTransport};

const MESSAGING_PRODUCT: &str = "whatsapp";

/// WhatsApp Cloud API client: one HTTP POST per message to
/// `{base}/{phone_number_id}/messages` with a bearer token.
pub struct WhatsAppTransport {
    http: Client,
    endpoint: String,
    token: String,
}

impl WhatsAppTransport {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            http: Client::new(),
            endpoint: format!(
                "{}/{}/messages",
                config.transport_base_url.trim_end_matches('/'),
                config.transport_sender_id
            ),
            token: config.transport_token.clone(),
        }
    }

    async fn post<T: Serialize>(&self, payload: &T) -> Result<(), AppError> {
        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.token)
            .json(payload)
            .send()
            .await
            .map_err(|e| AppError::TransportTransient(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        // 429 and server errors are retryable; other 4xx are not.
        if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
            Err(AppError::TransportTransient(format!("{status}: {body}")))
        } else {
            Err(AppError::TransportPermanent(format!("{status}: {body}")))
        }
    }
}

#[derive(Serialize)]
struct TextPayload<'a> {
    messaging_product: &'static str,
    to: &'a str,
    #[serde(rename = "type")]
    kind: &'static str,
    text: TextBody<'a>,
}

#[derive(Serialize)]
struct TextBody<'a> {
    body: &'a str,
}

#[derive(Serialize)]
struct InteractivePayload<'a> {
    messaging_product: &'static str,
    to: &'a str,
    #[serde(rename = "type")]
    kind: &'static str,
    interactive: Interactive<'a>,
}

#[derive(Serialize)]
struct Interactive<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    body: TextBody<'a>,
    action: InteractiveAction<'a>,
}

#[derive(Serialize)]
struct InteractiveAction<'a> {
    buttons: Vec<ReplyButton<'a>>,
}

#[derive(Serialize)]
struct ReplyButton<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    reply: &'a Button,
}

#[async_trait]
impl ChatTransport for WhatsAppTransport {
    async fn send_text(&self, to: &str, body: &str) -> Result<(), AppError> {
        self.post(&TextPayload {
            messaging_product: MESSAGING_PRODUCT,
            to,
            kind: "text",
            text: TextBody { body },
        })
        .await
    }

    async fn send_buttons(
        &self,
        to: &str,
        body: &str,
        buttons: &[Button],
    ) -> Result<(), AppError> {
        if buttons.is_empty() || buttons.len() > 3 {
            return Err(AppError::Validation(format!(
                "interactive messages carry 1..=3 buttons, got {}",
                buttons.len()
            )));
        }
        self.post(&InteractivePayload {
            messaging_product: MESSAGING_PRODUCT,
            to,
            kind: "interactive",
            interactive: Interactive {
                kind: "button",
                body: TextBody { body },
                action: InteractiveAction {
                    buttons: buttons
                        .iter()
                        .map(|b| ReplyButton {
                            kind: "reply",
                            reply: b,
                        })
                        .collect(),
                },
            },
        })
        .await
    }
}
