//! Server of the escrow chat
//!
//! A thin REST and UI layer over stored chat documents. The server relays
//! armored OpenPGP blobs between the two parties of a chat and cannot read
//! any of them; the only lifecycle rules it enforces are "an offer is
//! accepted once" and "a disputed chat is frozen".

use std::sync::Arc;

use rocket::figment::Figment;
use rocket::{routes, Build, Rocket};
use thiserror::Error;

use crate::storage::{ChatStore, DataDir, SqlStore, StorageError};

mod db;
mod routes;

pub mod config;
pub mod storage;

#[cfg(any(test, feature = "dev"))]
#[cfg_attr(docsrs, doc(cfg(feature = "dev")))]
pub mod dev;

pub use crate::config::{EscrowConfig, StorageKind};
pub use crate::db::{Db, DbError};

/// Assembles a rocket instance from the default figment
///
/// Reads `Rocket.toml` and `ROCKET_*` environment variables, like
/// [`rocket::Config::figment`] does.
pub async fn rocket() -> Result<Rocket<Build>, SetupError> {
    custom(rocket::Config::figment()).await
}

/// Assembles a rocket instance from the given figment
///
/// The figment supplies both Rocket's own configuration and the
/// [`escrow` section](EscrowConfig).
pub async fn custom(figment: Figment) -> Result<Rocket<Build>, SetupError> {
    let config = EscrowConfig::from_figment(&figment)?;
    let store = open_store(&config).await?;

    tracing::info!(storage = ?config.storage, "assembling escrow chat server");

    let mut rocket = rocket::custom(figment)
        .mount(
            "/",
            routes![
                routes::chat::make_offer,
                routes::chat::accept_offer,
                routes::chat::add_message,
                routes::chat::raise_dispute,
                routes::chat::fetch_chat,
                routes::pages::index,
                routes::pages::make_offer_page,
                routes::pages::accept_offer_page,
                routes::pages::room_page,
                routes::pages::moderator_page,
            ],
        )
        .manage(Db::with_store(store));
    if let Some(static_dir) = &config.static_dir {
        rocket = rocket.mount("/", rocket::fs::FileServer::from(static_dir));
    }
    Ok(rocket)
}

async fn open_store(config: &EscrowConfig) -> Result<Arc<dyn ChatStore>, SetupError> {
    match config.storage {
        StorageKind::Files => Ok(Arc::new(DataDir::open(&config.data_dir).await?)),
        StorageKind::Database => {
            let url = config
                .database_url
                .as_deref()
                .ok_or(SetupError::MissingDatabaseUrl)?;
            Ok(Arc::new(SqlStore::connect(url).await?))
        }
    }
}

#[derive(Debug, Error)]
pub enum SetupError {
    #[error("invalid configuration")]
    Config(#[from] rocket::figment::Error),
    #[error("the `database` storage backend requires escrow.database_url to be set")]
    MissingDatabaseUrl,
    #[error("failed to open the storage backend")]
    Storage(#[from] StorageError),
}
