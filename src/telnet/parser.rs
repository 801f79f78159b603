//! Turn console lines into chat messages.

use crate::common::ChatMessage;
use crate::game::channels::classify;
use crate::game::{convert_links, sanitize, sanitize_name};

/// Parse a console line such as `Shin says ooc, 'hello'`.
///
/// Returns `None` for lines that are not chat, or whose author or body is
/// empty after sanitizing. The source is left empty for the endpoint to fill.
pub fn parse_line(line: &str, item_url: &str) -> Option<ChatMessage> {
    let (offset, entry) = classify(line)?;

    let author = line[..offset].split_whitespace().last().unwrap_or_default();
    let author = sanitize_name(author);
    if author.is_empty() {
        return None;
    }

    let rest = &line[offset + entry.phrase.len()..];
    let body = match rest.rfind('\'') {
        Some(end) => &rest[..end],
        None => rest,
    };

    let body = sanitize(&convert_links(body, item_url));
    if body.is_empty() {
        return None;
    }

    let mut message = ChatMessage::new("", author, body).with_channel_number(entry.channel_number);
    if let Some(discriminator) = entry.discriminator {
        message = message.with_discriminator(discriminator);
    }
    Some(message)
}
