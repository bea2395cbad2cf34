//! Server configuration
//!
//! Read from Rocket's figment, so everything can be set via `Rocket.toml` or
//! `ROCKET_*` environment variables:
//!
//! ```toml
//! [default.escrow]
//! storage = "files"
//! data_dir = "data"
//! # storage = "database"
//! # database_url = "postgres://escrow@localhost/escrow"
//! static_dir = "public"
//! ```

use std::path::PathBuf;

use rocket::figment::providers::Serialized;
use rocket::figment::{self, Figment};
use serde::{Deserialize, Serialize};

/// The `escrow` section of the server configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EscrowConfig {
    /// Which persistence backend keeps the chats
    pub storage: StorageKind,
    /// Directory of chat files, used by the `files` backend
    pub data_dir: PathBuf,
    /// Connection URL, required by the `database` backend
    pub database_url: Option<String>,
    /// Directory of browser assets (scripts, stylesheets) to serve, if any
    pub static_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    /// One JSON file per chat in `data_dir`
    Files,
    /// PostgreSQL or SQLite reached via `database_url`
    Database,
}

impl Default for EscrowConfig {
    fn default() -> Self {
        Self {
            storage: StorageKind::Files,
            data_dir: "data".into(),
            database_url: None,
            static_dir: None,
        }
    }
}

impl EscrowConfig {
    /// Extracts the `escrow` section, falling back to defaults for anything
    /// left out
    pub fn from_figment(figment: &Figment) -> Result<Self, figment::Error> {
        Figment::from(Serialized::defaults(Self::default()))
            .merge(figment.focus("escrow"))
            .extract()
    }
}
