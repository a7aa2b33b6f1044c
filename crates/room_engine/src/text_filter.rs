//! Chat text sanitizing.
//!
//! Deep word filtering belongs to moderation. The engine only needs text
//! that cannot break the wire format, which [`filter_injection_chars`]
//! guarantees.

use habitat_protocol::{FRAME_END, STRING_END};

/// Longest chat line kept; the rest is cut.
pub const MAX_CHAT_LENGTH: usize = 100;

pub trait TextFilter: Send + Sync + std::fmt::Debug {
    fn filter(&self, text: &str) -> String;
}

/// Default filter: strips protocol control characters and trims.
#[derive(Debug, Default, Clone, Copy)]
pub struct InjectionFilter;

impl TextFilter for InjectionFilter {
    fn filter(&self, text: &str) -> String {
        let cleaned = filter_injection_chars(text);
        let trimmed = cleaned.trim();
        match trimmed.char_indices().nth(MAX_CHAT_LENGTH) {
            Some((cut, _)) => trimmed[..cut].to_string(),
            None => trimmed.to_string(),
        }
    }
}

/// Replaces bytes the client treats as field or frame separators, and
/// every other control character, with spaces.
pub fn filter_injection_chars(text: &str) -> String {
    text.chars()
        .map(|c| {
            let code = u32::from(c);
            if code == u32::from(FRAME_END) || code == u32::from(STRING_END) || c.is_control() {
                ' '
            } else {
                c
            }
        })
        .collect()
}
