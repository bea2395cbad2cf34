use anyhow::Context;
use tracing_subscriber::EnvFilter;

#[rocket::main]
async fn main() -> anyhow::Result<()> {
    init_logging();

    let rocket = escrow_chat_server::rocket()
        .await
        .context("failed to set up the server")?;
    rocket.launch().await.context("failed to launch the server")?;
    Ok(())
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("escrow_chat_server=info,rocket=warn"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
