use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use rand::Rng;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Length of a chat identifier in decimal digits
pub const CHAT_ID_LEN: usize = 10;

/// Identifier of a chat, the "token" shown in the web UI
///
/// Ten decimal digits (e.g. `0194673258`). The server draws one when an offer
/// is made, and the offering party shares it out of band with the trade
/// partner (and, once a dispute is raised, with the moderator).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChatId([u8; CHAT_ID_LEN]);

impl ChatId {
    /// Draws a fresh random identifier
    pub fn generate<R: Rng>(rng: &mut R) -> Self {
        let mut digits = [0u8; CHAT_ID_LEN];
        for digit in &mut digits {
            *digit = b'0' + rng.gen_range(0..10);
        }
        Self(digits)
    }

    /// Identifier as a string of digits
    pub fn as_str(&self) -> &str {
        // Both constructors only ever produce ASCII digits
        std::str::from_utf8(&self.0).expect("chat id is ASCII")
    }
}

impl FromStr for ChatId {
    type Err = InvalidChatId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != CHAT_ID_LEN {
            return Err(InvalidChatId::WrongLength { len: s.len() });
        }
        if !s.bytes().all(|byte| byte.is_ascii_digit()) {
            return Err(InvalidChatId::NotDigits);
        }
        let mut digits = [0u8; CHAT_ID_LEN];
        digits.copy_from_slice(s.as_bytes());
        Ok(Self(digits))
    }
}

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "ChatId({})", self.as_str())
    }
}

impl Serialize for ChatId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ChatId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = <Cow<str>>::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

/// Explains why a string is not a valid [`ChatId`]
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InvalidChatId {
    #[error("chat id must be {CHAT_ID_LEN} digits long, got {len} characters")]
    WrongLength { len: usize },
    #[error("chat id must consist of decimal digits")]
    NotDigits,
}

#[cfg(test)]
mod tests {
    use matches::assert_matches;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::{ChatId, InvalidChatId, CHAT_ID_LEN};

    #[test]
    fn generated_id_is_ten_digits() {
        let mut rng = StdRng::seed_from_u64(42);
        let id = ChatId::generate(&mut rng);
        assert_eq!(id.as_str().len(), CHAT_ID_LEN);
        assert!(id.as_str().bytes().all(|byte| byte.is_ascii_digit()));
    }

    #[test]
    fn generated_id_parses_back() {
        let mut rng = StdRng::seed_from_u64(1);
        let id = ChatId::generate(&mut rng);
        let parsed: ChatId = id.as_str().parse().unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn consecutive_draws_differ() {
        let mut rng = StdRng::seed_from_u64(7);
        let first = ChatId::generate(&mut rng);
        let second = ChatId::generate(&mut rng);
        assert_ne!(first, second);
    }

    #[test]
    fn rejects_wrong_length() {
        assert_matches!(
            "123".parse::<ChatId>(),
            Err(InvalidChatId::WrongLength { len: 3 })
        );
        assert_matches!(
            "01234567890".parse::<ChatId>(),
            Err(InvalidChatId::WrongLength { len: 11 })
        );
    }

    #[test]
    fn rejects_non_digits() {
        assert_matches!(
            "0123a56789".parse::<ChatId>(),
            Err(InvalidChatId::NotDigits)
        );
        assert_matches!(
            "0123456 89".parse::<ChatId>(),
            Err(InvalidChatId::NotDigits)
        );
    }

    #[test]
    fn serializes_as_json_string() {
        let id: ChatId = "0123456789".parse().unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, r#""0123456789""#);
        let back: ChatId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
