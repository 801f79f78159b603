//! Message templates for route output.
//!
//! Supported placeholders:
//! - `%name` - Author (or the route's name capture)
//! - `%message` - Message body (or the route's message capture)
//! - `%channel` - Destination channel id
//! - `%channel_number` - Game channel number of the inbound message
//! - `%guild` - Guild key the destination was resolved from
//! - `%source` - Name of the endpoint the message came from
//! - `%time` - Current time (HH:MM:SS)
//!
//! `%%` renders a literal `%`.

use chrono::Local;

use crate::common::error::TemplateError;

/// Default pattern when a route has none.
pub const DEFAULT_PATTERN: &str = "%name: %message";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Placeholder {
    Name,
    Message,
    Channel,
    ChannelNumber,
    Guild,
    Source,
    Time,
}

impl Placeholder {
    /// Longer keywords first so `%channel_number` is not read as `%channel`.
    const ALL: [(&'static str, Placeholder); 7] = [
        ("channel_number", Placeholder::ChannelNumber),
        ("channel", Placeholder::Channel),
        ("message", Placeholder::Message),
        ("source", Placeholder::Source),
        ("guild", Placeholder::Guild),
        ("name", Placeholder::Name),
        ("time", Placeholder::Time),
    ];
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Value(Placeholder),
}

/// Values a template is rendered against.
#[derive(Debug, Clone, Default)]
pub struct TemplateContext<'a> {
    pub name: &'a str,
    pub message: &'a str,
    pub channel: &'a str,
    pub channel_number: Option<u32>,
    pub guild: Option<&'a str>,
    pub source: &'a str,
}

/// A compiled message pattern.
#[derive(Debug, Clone)]
pub struct Template {
    pattern: String,
    segments: Vec<Segment>,
}

impl Template {
    /// Compile `pattern`, rejecting unknown placeholders and lone `%`.
    pub fn compile(pattern: &str) -> Result<Self, TemplateError> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut rest = pattern;
        let mut offset = 0;

        while let Some(pos) = rest.find('%') {
            literal.push_str(&rest[..pos]);
            let at = offset + pos;
            let after = &rest[pos + 1..];

            if let Some(tail) = after.strip_prefix('%') {
                literal.push('%');
                offset = at + 2;
                rest = tail;
                continue;
            }

            if !after.starts_with(|c: char| c.is_ascii_alphabetic()) {
                return Err(TemplateError::DanglingPercent { offset: at });
            }

            let Some((keyword, placeholder)) = Placeholder::ALL
                .iter()
                .find(|(keyword, _)| after.starts_with(keyword))
            else {
                let name: String = after
                    .chars()
                    .take_while(|c| c.is_ascii_alphanumeric() || *c == '_')
                    .collect();
                return Err(TemplateError::UnknownPlaceholder { name, offset: at });
            };

            if !literal.is_empty() {
                segments.push(Segment::Literal(std::mem::take(&mut literal)));
            }
            segments.push(Segment::Value(*placeholder));

            offset = at + 1 + keyword.len();
            rest = &after[keyword.len()..];
        }

        literal.push_str(rest);
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Ok(Self {
            pattern: pattern.to_string(),
            segments,
        })
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Render against `ctx`. Fails if the pattern needs a value the
    /// message does not have.
    pub fn render(&self, ctx: &TemplateContext<'_>) -> Result<String, TemplateError> {
        let mut out = String::with_capacity(self.pattern.len() + ctx.message.len());

        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Value(Placeholder::Name) => out.push_str(ctx.name),
                Segment::Value(Placeholder::Message) => out.push_str(ctx.message),
                Segment::Value(Placeholder::Channel) => out.push_str(ctx.channel),
                Segment::Value(Placeholder::Source) => out.push_str(ctx.source),
                Segment::Value(Placeholder::Time) => {
                    out.push_str(&Local::now().format("%H:%M:%S").to_string())
                }
                Segment::Value(Placeholder::ChannelNumber) => {
                    let number = ctx.channel_number.ok_or(TemplateError::MissingValue {
                        placeholder: "channel_number",
                    })?;
                    out.push_str(&number.to_string());
                }
                Segment::Value(Placeholder::Guild) => {
                    let guild = ctx
                        .guild
                        .ok_or(TemplateError::MissingValue { placeholder: "guild" })?;
                    out.push_str(guild);
                }
            }
        }

        Ok(out)
    }
}
