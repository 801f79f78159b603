//! Text sanitization for messages entering the relay.
//!
//! The game server only understands printable ASCII and treats `%` as a
//! format character, so every inbound body is reduced to that alphabet
//! before routing.

/// Sanitize a message body.
///
/// Unicode emojis become `:shortcode:`, other non-ASCII and control
/// characters are dropped, line breaks become spaces, and `%` is escaped
/// as `%%`.
pub fn sanitize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());

    for ch in text.chars() {
        match ch {
            '%' => out.push_str("%%"),
            ' '..='~' => out.push(ch),
            '\t' | '\n' | '\r' => out.push(' '),
            _ => {
                if let Some(emoji) = emojis::get(ch.encode_utf8(&mut [0u8; 4])) {
                    out.push(':');
                    out.push_str(emoji.shortcode().unwrap_or_else(|| emoji.name()));
                    out.push(':');
                }
            }
        }
    }

    out.trim().to_string()
}

/// Sanitize a display name: letters, digits, spaces, `_`, `-` and `'`.
pub fn sanitize_name(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, ' ' | '_' | '-' | '\''))
        .collect::<String>()
        .trim()
        .to_string()
}

/// Undo the `%` escaping applied by [`sanitize`].
pub fn unescape(text: &str) -> String {
    text.replace("%%", "%")
}
