pub mod config;
pub mod handler;

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;

use crate::app::config::AppConfig;
use crate::app::handler::AppHandler;
use crate::error::StartupError;
use crate::mqtt::{MqttBus, Publisher};
use crate::pipeline::{Detector, HttpImageSource, ObjectModel, Pipeline, Renderer};

pub struct App {
    listener: TcpListener,
    handler: AppHandler,
}

impl App {
    /// Wires the components around an already loaded model and binds the
    /// listener. Nothing is contacted until the first request.
    pub async fn start(
        config: AppConfig,
        model: Arc<dyn ObjectModel>,
    ) -> Result<App, StartupError> {
        tracing::info!(%config.model, "detector");
        tracing::info!(%config.mqtt, "publisher");

        let detector = Detector::from_config(model, &config.model);
        let renderer = Arc::new(Renderer::from_config(&config.render)?);
        let bus = Arc::new(MqttBus::new(&config.mqtt));
        let publisher = Publisher::from_config(bus, &config.mqtt);
        let source = Arc::new(HttpImageSource::new());
        let pipeline = Pipeline::new(source, detector, renderer, publisher);
        let handler = AppHandler::new(Arc::new(pipeline));

        let addr = format!("{}:{}", config.server.host, config.server.port);
        let listener = TcpListener::bind(&addr).await?;
        tracing::info!(%addr, "listening");
        Ok(Self { listener, handler })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Serves until Ctrl-C, letting in-flight requests finish.
    pub async fn serve(self) -> std::io::Result<()> {
        axum::serve(self.listener, handler::router(self.handler))
            .with_graceful_shutdown(async {
                let _ = tokio::signal::ctrl_c().await;
                tracing::info!("shutting down");
            })
            .await
    }
}
