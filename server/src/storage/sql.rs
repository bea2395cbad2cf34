use std::sync::Once;

use rocket::async_trait;
use sqlx::any::AnyPoolOptions;
use sqlx::AnyPool;

use escrow_chat_core::{Chat, ChatId};

use super::{ChatStore, StorageError};

/// Chats in a relational database, one row per chat
///
/// Works with PostgreSQL and SQLite; the backend is picked by the connection
/// URL scheme. The whole chat document is kept as JSON text in a single
/// column: chats are small, always read and written whole, and never queried
/// by content.
pub struct SqlStore {
    pool: AnyPool,
}

impl SqlStore {
    /// Connects to the database and prepares the schema
    pub async fn connect(database_url: &str) -> Result<Self, StorageError> {
        static INSTALL_DRIVERS: Once = Once::new();
        INSTALL_DRIVERS.call_once(sqlx::any::install_default_drivers);

        let pool = AnyPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;
        sqlx::query("CREATE TABLE IF NOT EXISTS chats (id TEXT PRIMARY KEY, doc TEXT NOT NULL)")
            .execute(&pool)
            .await?;
        Ok(Self { pool })
    }
}

#[async_trait]
impl ChatStore for SqlStore {
    async fn insert(&self, id: ChatId, chat: &Chat) -> Result<(), StorageError> {
        let doc = serde_json::to_string(chat).map_err(StorageError::MalformedDocument)?;
        let inserted = sqlx::query("INSERT INTO chats (id, doc) VALUES ($1, $2)")
            .bind(id.as_str())
            .bind(doc)
            .execute(&self.pool)
            .await;
        match inserted {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(err)) if err.is_unique_violation() => {
                Err(StorageError::AlreadyExists { id })
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn load(&self, id: ChatId) -> Result<Option<Chat>, StorageError> {
        let doc: Option<String> = sqlx::query_scalar("SELECT doc FROM chats WHERE id = $1")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await?;
        doc.map(|doc| serde_json::from_str(&doc).map_err(StorageError::MalformedDocument))
            .transpose()
    }

    async fn store(&self, id: ChatId, chat: &Chat) -> Result<(), StorageError> {
        let doc = serde_json::to_string(chat).map_err(StorageError::MalformedDocument)?;
        sqlx::query(
            "INSERT INTO chats (id, doc) VALUES ($1, $2) \
             ON CONFLICT (id) DO UPDATE SET doc = excluded.doc",
        )
        .bind(id.as_str())
        .bind(doc)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use matches::assert_matches;

    use escrow_chat_core::{Chat, ChatId};

    use super::SqlStore;
    use crate::storage::{ChatStore, StorageError};

    fn sqlite_url(name: &str) -> String {
        static COUNTER: AtomicUsize = AtomicUsize::new(0);
        let unique = COUNTER.fetch_add(1, Ordering::Relaxed);
        let path = std::env::temp_dir().join(format!(
            "escrow-chat-sql-{name}-{}-{unique}.db",
            std::process::id()
        ));
        format!("sqlite://{}?mode=rwc", path.display())
    }

    fn chat_id(digits: &str) -> ChatId {
        digits.parse().unwrap()
    }

    fn sample_chat() -> Chat {
        Chat::offered(
            "-----BEGIN PGP PUBLIC KEY BLOCK-----\n\nmQENalice\n-----END PGP PUBLIC KEY BLOCK-----"
                .parse()
                .unwrap(),
        )
    }

    #[tokio::test]
    async fn inserted_chat_loads_back() {
        let store = SqlStore::connect(&sqlite_url("insert-load")).await.unwrap();
        let id = chat_id("0000000001");
        let chat = sample_chat();

        store.insert(id, &chat).await.unwrap();
        let loaded = store.load(id).await.unwrap();
        assert_eq!(loaded, Some(chat));
    }

    #[tokio::test]
    async fn unknown_id_loads_none() {
        let store = SqlStore::connect(&sqlite_url("load-none")).await.unwrap();
        let loaded = store.load(chat_id("0000000002")).await.unwrap();
        assert_eq!(loaded, None);
    }

    #[tokio::test]
    async fn double_insert_is_detected() {
        let store = SqlStore::connect(&sqlite_url("double-insert"))
            .await
            .unwrap();
        let id = chat_id("0000000003");

        store.insert(id, &sample_chat()).await.unwrap();
        let err = store.insert(id, &sample_chat()).await;
        assert_matches!(err, Err(StorageError::AlreadyExists { .. }));
    }

    #[tokio::test]
    async fn store_replaces_previous_version() {
        let store = SqlStore::connect(&sqlite_url("store-replace"))
            .await
            .unwrap();
        let id = chat_id("0000000004");
        let mut chat = sample_chat();

        store.insert(id, &chat).await.unwrap();
        chat.accept(
            "-----BEGIN PGP PUBLIC KEY BLOCK-----\n\nmQENbob\n-----END PGP PUBLIC KEY BLOCK-----"
                .parse()
                .unwrap(),
        )
        .unwrap();
        store.store(id, &chat).await.unwrap();

        let loaded = store.load(id).await.unwrap();
        assert_eq!(loaded, Some(chat));
    }

    #[tokio::test]
    async fn survives_reconnecting() {
        let url = sqlite_url("reconnect");
        let id = chat_id("0000000005");
        let chat = sample_chat();

        {
            let store = SqlStore::connect(&url).await.unwrap();
            store.insert(id, &chat).await.unwrap();
        }

        let store = SqlStore::connect(&url).await.unwrap();
        let loaded = store.load(id).await.unwrap();
        assert_eq!(loaded, Some(chat));
    }
}
