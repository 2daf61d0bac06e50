use anyhow::Context;
use corral::types::{Object, Value};
use corral::{ConnectOptions, Corral, LoggerConfig};
use std::path::Path;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_max_level(tracing::Level::DEBUG).init();

    let root = Path::new(env!("CARGO_MANIFEST_DIR"));
    let mut corral = Corral::connect(
        ConnectOptions::default()
            .config_path(root.join("config/database"))
            .models_path(root.join("app/models"))
            .logger(LoggerConfig::Console),
    )
    .await
    .context("Connecting the aviary")?;

    let bird = corral.model("bird").context("bird model not loaded")?.clone();
    let parrot = corral.model("parrot").context("parrot model not loaded")?.clone();

    let mut doc = Object::default();
    doc.insert("name".to_owned(), Value::String("Flappy".to_owned()));
    let flappy = bird.create(doc).await?;
    info!(name = ?flappy.get("name"), "Flappy bird created");

    let mut doc = Object::default();
    doc.insert("name".to_owned(), Value::String("Polly".to_owned()));
    let polly = parrot.create(doc).await?;
    info!(name = ?polly.get("name"), kind = ?polly.get("kind"), "Polly parrot created");

    let flock = bird.find().await?;
    info!(count = flock.len(), "All birds");

    corral.disconnect();
    Ok(())
}
