//! Terminal rendering of the message list.

use std::collections::HashSet;

use chatronix_core::{Attachment, Message};

pub fn format_message_line(message: &Message) -> String {
    let time = message
        .created_at
        .with_timezone(&chrono::Local)
        .format("%H:%M");
    let body = match &message.attachment {
        Some(Attachment::Location {
            latitude,
            longitude,
        }) => format!("[location {latitude:.5}, {longitude:.5}]"),
        Some(Attachment::Image { url }) => format!("[image {url}]"),
        None => message.text.clone(),
    };
    format!("{time} {}: {body}", message.author.display_name)
}

/// Lines for messages not rendered yet, oldest first so the newest ends up
/// at the bottom of the terminal.
pub fn unseen_lines(messages: &[Message], seen: &mut HashSet<String>) -> Vec<String> {
    messages
        .iter()
        .rev()
        .filter(|message| seen.insert(message.id.as_str().to_string()))
        .map(format_message_line)
        .collect()
}
