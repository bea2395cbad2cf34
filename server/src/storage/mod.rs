//! Persistence backends for chat documents

use std::io;
use std::path::PathBuf;

use rocket::async_trait;
use thiserror::Error;

use escrow_chat_core::{Chat, ChatId};

mod data_dir;
mod sql;

pub use self::data_dir::DataDir;
pub use self::sql::SqlStore;

/// Where chat documents live
///
/// A backend stores every chat as one JSON document keyed by its id. All
/// concurrency coordination happens a level above, in [`Db`](crate::Db):
/// backends may assume that operations on the same chat do not overlap.
#[async_trait]
pub trait ChatStore: Send + Sync + 'static {
    /// Stores a new chat under an id that must not be taken yet
    async fn insert(&self, id: ChatId, chat: &Chat) -> Result<(), StorageError>;

    /// Loads a chat, `None` if the id is unknown
    async fn load(&self, id: ChatId) -> Result<Option<Chat>, StorageError>;

    /// Stores the chat under the given id, replacing the previous version
    async fn store(&self, id: ChatId, chat: &Chat) -> Result<(), StorageError>;
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("chat {id} is already in the store")]
    AlreadyExists { id: ChatId },
    #[error("create data directory {}", path.display())]
    CreateDataDir {
        path: PathBuf,
        #[source] source: io::Error,
    },
    #[error("read chat document")]
    Read(#[source] io::Error),
    #[error("write chat document")]
    Write(#[source] io::Error),
    #[error("chat document is malformed")]
    MalformedDocument(#[source] serde_json::Error),
    #[error("database query failed")]
    Database(#[from] sqlx::Error),
}
