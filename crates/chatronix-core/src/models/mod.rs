//! Data models for Chatronix

mod message;
mod remote;

pub use message::{Attachment, Author, Message, MessageId};
pub use remote::{RemoteDocument, RemoteLocation, RemoteRecord, RemoteTimestamp, RemoteUser};
