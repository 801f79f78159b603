//! Game chat channel numbers and the phrases that identify them.

/// Protocol-level chat channel numbers.
pub mod channel_numbers {
    pub const SAY: u32 = 256;
    pub const GUILD: u32 = 259;
    pub const OOC: u32 = 260;
    pub const AUCTION: u32 = 261;
    pub const SHOUT: u32 = 262;
    pub const BROADCAST: u32 = 15;
}

use channel_numbers::*;

/// How a say-phrase classifies a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelPhrase {
    /// Text between the speaker's name and the quoted message.
    pub phrase: &'static str,
    /// Channel the phrase belongs to.
    pub channel_number: u32,
    /// Discriminator for traffic that must not be treated as plain chat.
    pub discriminator: Option<&'static str>,
}

const fn phrase(phrase: &'static str, channel_number: u32) -> ChannelPhrase {
    ChannelPhrase {
        phrase,
        channel_number,
        discriminator: None,
    }
}

const fn tagged(
    phrase: &'static str,
    channel_number: u32,
    discriminator: &'static str,
) -> ChannelPhrase {
    ChannelPhrase {
        phrase,
        channel_number,
        discriminator: Some(discriminator),
    }
}

/// Phrases in match order. A phrase must come before any phrase it contains
/// (`says ooc,` before `says,`).
pub const CHANNEL_PHRASES: &[ChannelPhrase] = &[
    tagged(" says from discord, '", OOC, crate::common::messages::DISCRIMINATOR_EMOTE),
    phrase(" says ooc, '", OOC),
    phrase(" auctions, '", AUCTION),
    phrase(" shouts, '", SHOUT),
    phrase(" tells the guild, '", GUILD),
    tagged(" BROADCASTS, '", BROADCAST, crate::common::messages::DISCRIMINATOR_BROADCAST),
    phrase(" says, '", SAY),
];

/// Find the phrase closest to the start of `line`, with its byte offset.
///
/// Ties go to the earlier table entry.
pub fn classify(line: &str) -> Option<(usize, &'static ChannelPhrase)> {
    CHANNEL_PHRASES
        .iter()
        .filter_map(|entry| line.find(entry.phrase).map(|offset| (offset, entry)))
        .min_by_key(|(offset, _)| *offset)
}
