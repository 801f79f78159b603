//! Line codec for the game server's telnet console.
//!
//! Option negotiation is stripped rather than answered; the console works
//! without any negotiated options.

use std::io;

use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

const IAC: u8 = 255;
const DONT: u8 = 254;
const DO: u8 = 253;
const WONT: u8 = 252;
const WILL: u8 = 251;
const SB: u8 = 250;
const SE: u8 = 240;

/// One unit of console output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TelnetFrame {
    /// A complete line, without its line ending.
    Line(String),
    /// Text the server left waiting for input (`Username:`, `> `).
    Prompt(String),
}

#[derive(Debug, Default)]
pub struct TelnetCodec {
    line: Vec<u8>,
}

impl TelnetCodec {
    pub fn new() -> Self {
        Self::default()
    }

    fn take_line(&mut self) -> String {
        let text = String::from_utf8_lossy(&self.line)
            .trim_end_matches('\r')
            .to_string();
        self.line.clear();
        text
    }

    fn holds_prompt(&self) -> bool {
        let text = String::from_utf8_lossy(&self.line);
        let text = text.trim();
        if text.is_empty() {
            return false;
        }

        let lower = text.to_ascii_lowercase();
        lower.ends_with("username:")
            || lower.ends_with("password:")
            || lower.ends_with("login:")
            || (text.ends_with('>') && !text.contains('\''))
    }
}

/// Length of the telnet command at the start of `buf`, or `None` if it is
/// not complete yet.
fn command_len(buf: &[u8]) -> Option<usize> {
    let command = *buf.get(1)?;
    match command {
        WILL | WONT | DO | DONT => (buf.len() >= 3).then_some(3),
        SB => buf[2..]
            .windows(2)
            .position(|pair| pair == [IAC, SE])
            .map(|pos| pos + 4),
        _ => Some(2),
    }
}

impl Decoder for TelnetCodec {
    type Item = TelnetFrame;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let mut consumed = 0;
        let mut frame = None;

        while consumed < src.len() {
            let byte = src[consumed];

            if byte == IAC {
                let Some(len) = command_len(&src[consumed..]) else {
                    break;
                };
                if src[consumed + 1] == IAC {
                    self.line.push(IAC);
                }
                consumed += len;
                continue;
            }

            consumed += 1;
            match byte {
                b'\n' => {
                    frame = Some(TelnetFrame::Line(self.take_line()));
                    break;
                }
                0 => {}
                _ => self.line.push(byte),
            }
        }

        src.advance(consumed);

        if frame.is_none() && src.is_empty() && self.holds_prompt() {
            frame = Some(TelnetFrame::Prompt(self.take_line()));
        }
        Ok(frame)
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(frame) = self.decode(src)? {
            return Ok(Some(frame));
        }
        src.clear();

        if self.line.is_empty() {
            Ok(None)
        } else {
            Ok(Some(TelnetFrame::Line(self.take_line())))
        }
    }
}

impl Encoder<String> for TelnetCodec {
    type Error = io::Error;

    fn encode(&mut self, item: String, dst: &mut BytesMut) -> Result<(), Self::Error> {
        // 0xFF never occurs in UTF-8, so there is no IAC to escape.
        dst.reserve(item.len() + 2);
        dst.put_slice(item.as_bytes());
        dst.put_slice(b"\r\n");
        Ok(())
    }
}
