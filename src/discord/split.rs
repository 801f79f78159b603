//! Splitting long bodies into Discord-sized messages.

/// Discord rejects messages longer than this many characters.
pub const DISCORD_MESSAGE_LIMIT: usize = 2000;

/// Byte offset just past the first `count` characters of `s`.
fn char_offset(s: &str, count: usize) -> usize {
    s.char_indices().nth(count).map_or(s.len(), |(i, _)| i)
}

/// Split `message` into chunks of at most `max_chars` characters.
///
/// Prefers the last space inside each window; a word longer than the
/// window is cut hard. Leading spaces of a chunk are dropped.
pub fn split_message(message: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    if message.chars().count() <= max_chars {
        return vec![message.to_string()];
    }

    let mut chunks = Vec::new();
    let mut remaining = message;

    loop {
        remaining = remaining.trim_start();
        if remaining.is_empty() {
            break;
        }

        let split_at = char_offset(remaining, max_chars);
        if split_at == remaining.len() {
            chunks.push(remaining.to_string());
            break;
        }

        let window = &remaining[..split_at];
        match window.rfind(' ') {
            Some(space) if space > 0 => {
                chunks.push(window[..space].to_string());
                remaining = &remaining[space + 1..];
            }
            _ => {
                chunks.push(window.to_string());
                remaining = &remaining[split_at..];
            }
        }
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_message_untouched() {
        assert_eq!(split_message("hello", 10), vec!["hello"]);
        assert_eq!(split_message("", 10), vec![""]);
    }

    #[test]
    fn test_splits_on_word_boundary() {
        assert_eq!(
            split_message("Hello beautiful world", 15),
            vec!["Hello", "beautiful world"]
        );
    }

    #[test]
    fn test_hard_split_without_spaces() {
        assert_eq!(
            split_message("HelloBeautifulWorld", 10),
            vec!["HelloBeaut", "ifulWorld"]
        );
    }

    #[test]
    fn test_counts_characters_not_bytes() {
        let message = "éééé éééé";
        assert_eq!(split_message(message, 9), vec![message]);
        assert_eq!(split_message(message, 5), vec!["éééé", "éééé"]);
    }

    #[test]
    fn test_limit_respected_for_long_body() {
        let message = "word ".repeat(1000);
        let chunks = split_message(&message, DISCORD_MESSAGE_LIMIT);
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= DISCORD_MESSAGE_LIMIT);
        }
        assert_eq!(chunks.join(" ").split_whitespace().count(), 1000);
    }
}
