use serde::Deserialize;

/// Inbound webhook envelope from the chat transport.
///
/// The transport nests messages three levels deep; every level can appear
/// without the fields we care about, so everything defaults to empty.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEnvelope {
    #[serde(default)]
    pub entry: Vec<Entry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Entry {
    #[serde(default)]
    pub changes: Vec<Change>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Change {
    pub value: ChangeValue,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChangeValue {
    #[serde(default)]
    pub messages: Vec<InboundMessage>,
    #[serde(default)]
    pub contacts: Vec<Contact>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Contact {
    pub wa_id: String,
    #[serde(default)]
    pub profile: Option<Profile>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Profile {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InboundMessage {
    /// Sender handle (phone id); resolves the user.
    pub from: String,
    /// Transport message id; the idempotency key.
    pub id: String,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub text: Option<TextContent>,
    #[serde(default)]
    pub interactive: Option<InteractiveContent>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TextContent {
    pub body: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InteractiveContent {
    #[serde(default)]
    pub button_reply: Option<ButtonReply>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ButtonReply {
    pub id: String,
    pub title: String,
}

impl InboundMessage {
    /// The answer text: a typed body or the tapped button's title.
    pub fn body(&self) -> Option<&str> {
        if let Some(text) = &self.text {
            return Some(text.body.as_str());
        }
        self.interactive
            .as_ref()
            .and_then(|i| i.button_reply.as_ref())
            .map(|r| r.title.as_str())
    }
}

impl WebhookEnvelope {
    /// Flatten to the messages with their sender's display name, when the
    /// contact block carries one.
    pub fn messages(&self) -> Vec<(&InboundMessage, Option<&str>)> {
        let mut out = Vec::new();
        for entry in &self.entry {
            for change in &entry.changes {
                for message in &change.value.messages {
                    let name = change
                        .value
                        .contacts
                        .iter()
                        .find(|c| c.wa_id == message.from)
                        .and_then(|c| c.profile.as_ref())
                        .and_then(|p| p.name.as_deref());
                    out.push((message, name));
                }
            }
        }
        out
    }
}
