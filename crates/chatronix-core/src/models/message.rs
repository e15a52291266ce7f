//! Message model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Opaque message identifier.
///
/// Remote messages carry the id assigned by the message store. Messages built
/// on the device before confirmation carry a random numeric token.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(String);

impl MessageId {
    /// Generate a local numeric-string id for a pending message.
    #[must_use]
    pub fn new_local() -> Self {
        Self(Uuid::new_v4().as_u128().to_string())
    }

    /// Wrap a store-assigned id. Returns `None` when the id is blank.
    pub fn from_remote(id: impl Into<String>) -> Option<Self> {
        let id = id.into();
        if id.trim().is_empty() {
            None
        } else {
            Some(Self(id))
        }
    }

    /// Get the string representation of this ID
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Message author as shown next to each bubble.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Author {
    pub id: String,
    pub display_name: String,
    #[serde(
        rename = "avatarURL",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub avatar_url: Option<String>,
}

impl Author {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            avatar_url: None,
        }
    }
}

/// A single attachment carried by a message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Attachment {
    Location { latitude: f64, longitude: f64 },
    Image { url: String },
}

/// A chat message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Unique identifier, never empty
    pub id: MessageId,
    /// Message body, empty when the message only carries an attachment
    #[serde(default)]
    pub text: String,
    /// Creation instant
    pub created_at: DateTime<Utc>,
    pub author: Author,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment: Option<Attachment>,
}

impl Message {
    /// Create a pending text message authored now.
    #[must_use]
    pub fn text(author: Author, text: impl Into<String>) -> Self {
        Self {
            id: MessageId::new_local(),
            text: text.into(),
            created_at: Utc::now(),
            author,
            attachment: None,
        }
    }

    /// Create a pending attachment-only message authored now.
    #[must_use]
    pub fn with_attachment(author: Author, attachment: Attachment) -> Self {
        Self {
            id: MessageId::new_local(),
            text: String::new(),
            created_at: Utc::now(),
            author,
            attachment: Some(attachment),
        }
    }

    /// Whether there is nothing to show for this message.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty() && self.attachment.is_none()
    }
}
