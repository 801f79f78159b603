//! Item link decoding.
//!
//! The game embeds item references in chat as `0x12 <id:6> <padding> <name> 0x12`.
//! The id is six hex digits; the padding is a run of hex digits whose length
//! depends on the client generation. Links are rewritten as a URL when an item
//! URL prefix is configured, otherwise as `*name*`.

/// Byte that opens and closes an item link.
pub const LINK_SENTINEL: char = '\u{12}';

/// Number of characters holding the item id.
const ITEM_ID_LEN: usize = 6;

/// Padding between id and name, newest (longest) format first.
const LINK_PADDING: [usize; 2] = [50, 39];

/// A decoded item link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemLink<'a> {
    /// Item id, 0 when the id field was not valid hex.
    pub id: u32,
    /// Human-readable item name.
    pub name: &'a str,
}

impl ItemLink<'_> {
    /// Render as readable text.
    pub fn render(&self, item_url: &str) -> String {
        if self.id == 0 || item_url.is_empty() {
            format!("*{}*", self.name)
        } else {
            format!("{}{} ({})", item_url, self.id, self.name)
        }
    }
}

/// Decode the text between two sentinels, or `None` if it is not a link.
pub fn decode_link(body: &str) -> Option<ItemLink<'_>> {
    if !body.is_char_boundary(ITEM_ID_LEN) {
        return None;
    }

    for padding in LINK_PADDING {
        let header = ITEM_ID_LEN + padding;
        if body.len() <= header || !body.is_char_boundary(header) {
            continue;
        }

        let (head, name) = body.split_at(header);
        if !head[ITEM_ID_LEN..].bytes().all(|b| b.is_ascii_hexdigit()) {
            continue;
        }

        let name = name.trim();
        if name.is_empty() {
            continue;
        }

        let id_field = &head[..ITEM_ID_LEN];
        let id = if id_field.bytes().all(|b| b.is_ascii_hexdigit()) {
            u32::from_str_radix(id_field, 16).unwrap_or(0)
        } else {
            0
        };

        return Some(ItemLink { id, name });
    }

    None
}

/// Rewrite every item link in `text`.
///
/// Scans left to right once. A sentinel pair that does not decode is kept
/// verbatim and its closing sentinel is retried as the opener of the next
/// pair, so a stray sentinel cannot hide a real link behind it.
pub fn convert_links(text: &str, item_url: &str) -> String {
    if !text.contains(LINK_SENTINEL) {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(open) = rest.find(LINK_SENTINEL) {
        let after = &rest[open + LINK_SENTINEL.len_utf8()..];
        let Some(close) = after.find(LINK_SENTINEL) else {
            break;
        };

        out.push_str(&rest[..open]);
        let body = &after[..close];

        match decode_link(body) {
            Some(link) => {
                out.push_str(&link.render(item_url));
                rest = &after[close + LINK_SENTINEL.len_utf8()..];
            }
            None => {
                out.push(LINK_SENTINEL);
                out.push_str(body);
                rest = &after[close..];
            }
        }
    }

    out.push_str(rest);
    out
}
