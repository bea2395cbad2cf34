use std::io;
use std::path::PathBuf;

use rocket::async_trait;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;

use escrow_chat_core::{Chat, ChatId};

use super::{ChatStore, StorageError};

/// Directory of `<chat id>.json` files, one file per chat
///
/// The layout is human-inspectable: `data/0194673258.json` holds the chat
/// exactly as the API serves it.
pub struct DataDir {
    dir: PathBuf,
}

impl DataDir {
    /// Opens the directory, creating it if it does not exist yet
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|source| StorageError::CreateDataDir {
                path: dir.clone(),
                source,
            })?;
        Ok(Self { dir })
    }

    fn chat_path(&self, id: ChatId) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }
}

#[async_trait]
impl ChatStore for DataDir {
    async fn insert(&self, id: ChatId, chat: &Chat) -> Result<(), StorageError> {
        let bytes = serde_json::to_vec(chat).map_err(StorageError::MalformedDocument)?;
        // create_new detects id collisions
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(self.chat_path(id))
            .await
            .map_err(|err| {
                if err.kind() == io::ErrorKind::AlreadyExists {
                    StorageError::AlreadyExists { id }
                } else {
                    StorageError::Write(err)
                }
            })?;
        file.write_all(&bytes).await.map_err(StorageError::Write)?;
        Ok(())
    }

    async fn load(&self, id: ChatId) -> Result<Option<Chat>, StorageError> {
        let bytes = match tokio::fs::read(self.chat_path(id)).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(StorageError::Read(err)),
        };
        let chat = serde_json::from_slice(&bytes).map_err(StorageError::MalformedDocument)?;
        Ok(Some(chat))
    }

    async fn store(&self, id: ChatId, chat: &Chat) -> Result<(), StorageError> {
        let bytes = serde_json::to_vec(chat).map_err(StorageError::MalformedDocument)?;
        tokio::fs::write(self.chat_path(id), bytes)
            .await
            .map_err(StorageError::Write)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use matches::assert_matches;

    use escrow_chat_core::{Chat, ChatId};

    use super::DataDir;
    use crate::storage::{ChatStore, StorageError};

    fn temp_dir(name: &str) -> PathBuf {
        static COUNTER: AtomicUsize = AtomicUsize::new(0);
        let unique = COUNTER.fetch_add(1, Ordering::Relaxed);
        std::env::temp_dir().join(format!(
            "escrow-chat-{name}-{}-{unique}",
            std::process::id()
        ))
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
        let store = DataDir::open(temp_dir("insert-load")).await.unwrap();
        let id = chat_id("0000000001");
        let chat = sample_chat();

        store.insert(id, &chat).await.unwrap();
        let loaded = store.load(id).await.unwrap();
        assert_eq!(loaded, Some(chat));
    }

    #[tokio::test]
    async fn unknown_id_loads_none() {
        let store = DataDir::open(temp_dir("load-none")).await.unwrap();
        let loaded = store.load(chat_id("0000000002")).await.unwrap();
        assert_eq!(loaded, None);
    }

    #[tokio::test]
    async fn double_insert_is_detected() {
        let store = DataDir::open(temp_dir("double-insert")).await.unwrap();
        let id = chat_id("0000000003");

        store.insert(id, &sample_chat()).await.unwrap();
        let err = store.insert(id, &sample_chat()).await;
        assert_matches!(err, Err(StorageError::AlreadyExists { .. }));
    }

    #[tokio::test]
    async fn store_replaces_previous_version() {
        let store = DataDir::open(temp_dir("store-replace")).await.unwrap();
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
    async fn corrupted_file_is_reported() {
        let dir = temp_dir("corrupted");
        let store = DataDir::open(&dir).await.unwrap();
        let id = chat_id("0000000005");

        tokio::fs::write(dir.join(format!("{id}.json")), b"{ not json")
            .await
            .unwrap();
        let err = store.load(id).await;
        assert_matches!(err, Err(StorageError::MalformedDocument(_)));
    }

    #[tokio::test]
    async fn survives_reopening() {
        let dir = temp_dir("reopen");
        let id = chat_id("0000000006");
        let chat = sample_chat();

        {
            let store = DataDir::open(&dir).await.unwrap();
            store.insert(id, &chat).await.unwrap();
        }

        let store = DataDir::open(&dir).await.unwrap();
        let loaded = store.load(id).await.unwrap();
        assert_eq!(loaded, Some(chat));
    }
}
