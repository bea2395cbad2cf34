//! Helpers for tests and local development

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

use rocket::figment::Figment;
use rocket::{Orbit, Rocket};
use url::Url;

/// Escrow chat server for tests
pub struct TestServer {
    port: u16,
    shutdown: Option<rocket::Shutdown>,
    handle: Option<tokio::task::JoinHandle<Result<Rocket<rocket::Ignite>, rocket::Error>>>,
}

impl TestServer {
    /// Launches a server in the background with a fresh temporary data dir
    ///
    /// The server takes a random available TCP port, so several `TestServer`s
    /// may co-exist. Retrieve the server address via
    /// [`.address()`](Self::address).
    ///
    /// This function returns when the server is ready to accept requests.
    pub async fn launch() -> Self {
        static COUNTER: AtomicUsize = AtomicUsize::new(0);
        let data_dir = std::env::temp_dir().join(format!(
            "escrow-chat-test-server-{}-{}",
            std::process::id(),
            COUNTER.fetch_add(1, Ordering::Relaxed),
        ));
        Self::launch_with_data_dir(data_dir).await
    }

    /// Launches a server that keeps chats in the given directory
    ///
    /// Launching a second server against the same directory after shutting
    /// the first one down simulates a server restart.
    pub async fn launch_with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir: PathBuf = data_dir.into();
        let (launched_tx, launched_rx) = tokio::sync::oneshot::channel();

        struct OnLaunch(std::sync::Mutex<Option<tokio::sync::oneshot::Sender<u16>>>);
        #[rocket::async_trait]
        impl rocket::fairing::Fairing for OnLaunch {
            fn info(&self) -> rocket::fairing::Info {
                rocket::fairing::Info {
                    name: "on launch fairing",
                    kind: rocket::fairing::Kind::Liftoff,
                }
            }
            async fn on_liftoff(&self, rocket: &Rocket<Orbit>) {
                let channel = {
                    let mut lock = self.0.lock().unwrap();
                    lock.take()
                };
                if let Some(channel) = channel {
                    let _ = channel.send(rocket.config().port);
                }
            }
        }

        let figment = Figment::from(rocket::Config {
            address: std::net::Ipv4Addr::new(127, 0, 0, 1).into(),
            port: 0,
            ..rocket::Config::debug_default()
        })
        .merge(("escrow.data_dir", data_dir));

        let rocket = crate::custom(figment)
            .await
            .expect("failed to assemble server")
            .attach(OnLaunch(std::sync::Mutex::new(Some(launched_tx))))
            .ignite()
            .await
            .expect("failed to ignite rocket instance");
        let shutdown = rocket.shutdown();

        let handle = tokio::spawn(rocket.launch());
        let port = launched_rx.await.expect("server did not lift off");

        Self {
            port,
            shutdown: Some(shutdown),
            handle: Some(handle),
        }
    }

    /// Returns the address the server listens on
    pub fn address(&self) -> Url {
        Url::parse(&format!("http://127.0.0.1:{}/", self.port)).expect("address is a valid url")
    }

    /// Stops the server and waits until it has actually quit
    pub async fn shutdown(mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            shutdown.notify();
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            shutdown.notify();
        }
    }
}
