//! Client of the escrow chat server
//!
//! Wraps the REST API into a typestate interface: a [`Detached`] client makes
//! or accepts an offer and becomes an [`InChat`] client bound to that chat
//! and its key pair. Key generation and OpenPGP encryption happen on the
//! caller's side, the client only ships armored blobs around.
//!
//! ```no_run
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! use escrow_chat::{ApiClient, HttpClient, KeyPair};
//!
//! let client = ApiClient::new(HttpClient::new(), "http://localhost:8000/".parse()?);
//! let keys = KeyPair {
//!     public: std::fs::read_to_string("alice.pub.asc")?.parse()?,
//!     private: std::fs::read_to_string("alice.sec.asc")?.parse()?,
//! };
//!
//! let chat = client.make_offer(keys).await?;
//! println!("pass this token to the partner: {}", chat.chat_id());
//! # Ok(()) }
//! ```

pub use self::client::{ApiClient, Detached, Error as ApiError, InChat, KeyPair};
pub use reqwest::Client as HttpClient;

mod client;
