// Chat transport: the outbound half of the WhatsApp Cloud API.
//
// The engine and outbound queue talk to the `ChatTransport` trait; the
// concrete client lives in `whatsapp.rs`. Delivery is at-least-once and the
// receiver is duplicate-tolerant, so the trait promises nothing stronger.

mod whatsapp;

pub use whatsapp::WhatsAppTransport;

use async_trait::async_trait;
use serde::Serialize;

use crate::errors::AppError;

/// One reply button. Ids are stable `btn_1..btn_3`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Button {
    pub id: String,
    pub title: String,
}

impl Button {
    pub fn numbered(index: usize, title: impl Into<String>) -> Self {
        Self {
            id: format!("btn_{}", index + 1),
            title: title.into(),
        }
    }
}

/// Outbound chat-message sender.
///
/// Implementations classify failures into `AppError::TransportTransient`
/// (worth retrying) and `AppError::TransportPermanent` (drop and record).
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn send_text(&self, to: &str, body: &str) -> Result<(), AppError>;

    /// Body plus up to three reply buttons.
    async fn send_buttons(&self, to: &str, body: &str, buttons: &[Button])
    -> Result<(), AppError>;
}
