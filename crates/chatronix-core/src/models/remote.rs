//! Remote document shape and translation to and from [`Message`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::message::{Attachment, Author, Message, MessageId};

/// Timestamp as stored by the remote message store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RemoteTimestamp {
    pub seconds: i64,
    pub nanoseconds: u32,
}

impl RemoteTimestamp {
    /// Convert to a wall-clock instant. `None` when out of range.
    pub fn to_datetime(self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.seconds, self.nanoseconds)
    }
}

impl From<DateTime<Utc>> for RemoteTimestamp {
    fn from(value: DateTime<Utc>) -> Self {
        Self {
            seconds: value.timestamp(),
            nanoseconds: value.timestamp_subsec_nanos(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteUser {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RemoteLocation {
    pub latitude: f64,
    pub longitude: f64,
}

/// Document body in the message collection.
///
/// `location` and `image` are independent fields remotely; at most one of
/// them survives translation into a [`Message`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteRecord {
    #[serde(default)]
    pub text: String,
    pub created_at: RemoteTimestamp,
    pub user: RemoteUser,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<RemoteLocation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Id generated on the sending device, kept for diagnostics.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
}

impl From<&Message> for RemoteRecord {
    fn from(message: &Message) -> Self {
        let (location, image) = match &message.attachment {
            Some(Attachment::Location {
                latitude,
                longitude,
            }) => (
                Some(RemoteLocation {
                    latitude: *latitude,
                    longitude: *longitude,
                }),
                None,
            ),
            Some(Attachment::Image { url }) => (None, Some(url.clone())),
            None => (None, None),
        };

        Self {
            text: message.text.clone(),
            created_at: message.created_at.into(),
            user: RemoteUser {
                id: message.author.id.clone(),
                name: message.author.display_name.clone(),
                avatar: message.author.avatar_url.clone(),
            },
            location,
            image,
            client_id: Some(message.id.to_string()),
        }
    }
}

/// A record paired with the id the store assigned to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteDocument {
    pub id: String,
    pub record: RemoteRecord,
}

impl RemoteDocument {
    pub fn new(id: impl Into<String>, record: RemoteRecord) -> Self {
        Self {
            id: id.into(),
            record,
        }
    }

    /// Translate into the in-memory message shape.
    ///
    /// Returns `None` for documents without an id or with a timestamp that
    /// cannot be represented.
    pub fn into_message(self) -> Option<Message> {
        let Some(id) = MessageId::from_remote(self.id.clone()) else {
            tracing::warn!("Skipping remote message without an id");
            return None;
        };
        let Some(created_at) = self.record.created_at.to_datetime() else {
            tracing::warn!("Skipping remote message {} with invalid timestamp", id);
            return None;
        };

        let RemoteRecord {
            text,
            user,
            location,
            image,
            ..
        } = self.record;

        let attachment = match (image, location) {
            (Some(url), location) => {
                if location.is_some() {
                    tracing::warn!(
                        "Remote message {} carries both image and location; keeping image",
                        id
                    );
                }
                Some(Attachment::Image { url })
            }
            (None, Some(location)) => Some(Attachment::Location {
                latitude: location.latitude,
                longitude: location.longitude,
            }),
            (None, None) => None,
        };

        Some(Message {
            id,
            text,
            created_at,
            author: Author {
                id: user.id,
                display_name: user.name,
                avatar_url: user.avatar,
            },
            attachment,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn record(seconds: i64) -> RemoteRecord {
        RemoteRecord {
            text: "hello".to_string(),
            created_at: RemoteTimestamp {
                seconds,
                nanoseconds: 500,
            },
            user: RemoteUser {
                id: "u1".to_string(),
                name: "Ada".to_string(),
                avatar: None,
            },
            location: None,
            image: None,
            client_id: None,
        }
    }

    #[test]
    fn translates_document_into_message() {
        let message = RemoteDocument::new("doc-1", record(1_700_000_000))
            .into_message()
            .unwrap();

        assert_eq!(message.id.as_str(), "doc-1");
        assert_eq!(message.text, "hello");
        assert_eq!(message.author, Author::new("u1", "Ada"));
        assert_eq!(message.created_at.timestamp(), 1_700_000_000);
        assert_eq!(message.created_at.timestamp_subsec_nanos(), 500);
        assert_eq!(message.attachment, None);
    }

    #[test]
    fn skips_document_without_id() {
        assert!(RemoteDocument::new("", record(1)).into_message().is_none());
    }

    #[test]
    fn image_wins_over_location() {
        let mut both = record(1);
        both.image = Some("https://x/y.png".to_string());
        both.location = Some(RemoteLocation {
            latitude: 1.0,
            longitude: 2.0,
        });

        let message = RemoteDocument::new("d", both).into_message().unwrap();
        assert_eq!(
            message.attachment,
            Some(Attachment::Image {
                url: "https://x/y.png".to_string()
            })
        );
    }

    #[test]
    fn record_from_message_carries_attachment_and_timestamp() {
        let message = Message::with_attachment(
            Author::new("u1", "Ada"),
            Attachment::Location {
                latitude: 48.85,
                longitude: 2.35,
            },
        );
        let record = RemoteRecord::from(&message);

        assert_eq!(record.text, "");
        assert_eq!(record.created_at.seconds, message.created_at.timestamp());
        assert_eq!(
            record.location,
            Some(RemoteLocation {
                latitude: 48.85,
                longitude: 2.35
            })
        );
        assert_eq!(record.image, None);
        assert_eq!(record.client_id.as_deref(), Some(message.id.as_str()));
    }

    #[test]
    fn record_json_uses_remote_field_names() {
        let value = serde_json::to_value(record(7)).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "text": "hello",
                "createdAt": { "seconds": 7, "nanoseconds": 500 },
                "user": { "_id": "u1", "name": "Ada" }
            })
        );
    }
}
