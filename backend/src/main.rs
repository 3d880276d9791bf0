use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use syllabus_backend::config::AppConfig;
use syllabus_backend::generation::GeminiProvider;
use syllabus_backend::server::router;
use syllabus_backend::service::StudyService;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "syllabus_backend=info,tower_http=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Arc::new(AppConfig::from_env()?);

    // Checked once here; requests keep failing fast until the key is fixed
    let api_key = match config.validate() {
        Ok(key) => {
            info!("🧠 Gemini AI    : READY");
            key.to_string()
        }
        Err(e) => {
            error!("🧠 Gemini AI    : {}", e);
            String::new()
        }
    };
    info!(
        model = %config.preferred_model,
        fallback_families = ?config.family_markers,
        attach_documents = config.attach_documents,
        "🔧 Generation settings"
    );

    let provider = GeminiProvider::new(config.api_base.clone(), api_key, config.request_timeout)?;
    let service = Arc::new(StudyService::new(config.clone(), Arc::new(provider)));
    let app = router(service);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("🚀 Listening on http://{}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
