use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use yolohook::app::config::AppConfig;
use yolohook::app::App;
use yolohook::pipeline::TFLiteModel;

#[derive(Parser)]
#[command(version, about = "Object detection webhook publishing to MQTT")]
struct Args {
    /// YAML config file; environment variables override it.
    #[arg(short, long, default_value = "yolohook.yaml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = Args::parse();
    let config = AppConfig::load(&args.config)?;

    let model = tokio::task::spawn_blocking({
        let model_config = config.model.clone();
        move || TFLiteModel::load(&model_config)
    })
    .await??;

    let app = App::start(config, Arc::new(model)).await?;
    app.serve().await?;
    Ok(())
}
