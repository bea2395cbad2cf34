//! Core types of the escrow chat
//!
//! The escrow chat lets the two parties of a trade talk through an untrusted
//! server. Messages are encrypted and signed in the browser with OpenPGP; the
//! server only ever stores armored blobs it cannot read. If the trade goes
//! wrong, either party raises a dispute and reveals their private key to a
//! moderator, who can then read the conversation and judge.
//!
//! This crate defines the chat document and its lifecycle rules, plus the
//! wire types shared between the server and the API client.

pub mod api;
pub mod armor;
pub mod chat;
mod chat_id;

pub use self::armor::{ArmoredMessage, ArmoredPrivateKey, ArmoredPublicKey, InvalidArmor};
pub use self::chat::{Chat, ChatPhase, Dispute, Party};
pub use self::chat_id::{ChatId, InvalidChatId, CHAT_ID_LEN};
