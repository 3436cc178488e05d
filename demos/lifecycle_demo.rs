use phaseflow::prelude::*;
use std::time::Duration;

#[derive(Capable)]
#[lifecycle(initialise, dispose)]
struct Database {
    url: String,
}

#[async_trait]
impl LifecycleTarget for Database {
    fn name(&self) -> &str {
        "database"
    }

    fn capabilities(&self) -> Capabilities {
        Self::CAPABILITIES
    }

    async fn initialise(&self) -> anyhow::Result<()> {
        tracing::info!("📦 Connecting to {}", self.url);
        tokio::time::sleep(Duration::from_millis(20)).await;
        Ok(())
    }

    async fn dispose(&self) -> anyhow::Result<()> {
        tracing::info!("📦 Closing connection pool");
        Ok(())
    }
}

#[derive(Capable)]
#[lifecycle(all)]
struct HttpListener {
    port: u16,
}

#[async_trait]
impl LifecycleTarget for HttpListener {
    fn name(&self) -> &str {
        "http-listener"
    }

    fn kind(&self) -> &str {
        "endpoint"
    }

    fn capabilities(&self) -> Capabilities {
        Self::CAPABILITIES
    }

    async fn start(&self) -> anyhow::Result<()> {
        tracing::info!("🌐 Listening on 0.0.0.0:{}", self.port);
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!("🌐 No longer accepting connections");
        Ok(())
    }
}

/// Fails to initialise, so registration is rolled back
#[derive(Capable)]
#[lifecycle(initialise, dispose)]
struct MetricsExporter;

#[async_trait]
impl LifecycleTarget for MetricsExporter {
    fn name(&self) -> &str {
        "metrics-exporter"
    }

    fn capabilities(&self) -> Capabilities {
        Self::CAPABILITIES
    }

    async fn initialise(&self) -> anyhow::Result<()> {
        anyhow::bail!("collector endpoint unreachable")
    }

    async fn dispose(&self) -> anyhow::Result<()> {
        tracing::info!("📈 Flushing metrics");
        Ok(())
    }
}

#[tokio::main]
async fn main() -> phaseflow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,phaseflow=debug".into()),
        )
        .init();

    tracing::info!("🚀 Starting lifecycle demo...");

    let app = Application::builder()
        .register(Database {
            url: "postgres://localhost/demo".to_string(),
        })
        .register(HttpListener { port: 8080 })
        .interceptor(CompositeInterceptor::standard().with(LoggingInterceptor::new()))
        .config_from_env()
        .build()
        .await?;

    // Registered late: caught up through initialise, which fails
    if let Err(e) = app.register(MetricsExporter).await {
        tracing::warn!("⚠️ {}", e);
    }

    app.stop().await?;
    app.start().await?;

    let snapshot = app.coordinator().snapshot().await;
    if let Ok(json) = snapshot.to_json() {
        println!("{json}");
    }

    app.shutdown().await?;
    tracing::info!("👋 Demo finished");
    Ok(())
}
