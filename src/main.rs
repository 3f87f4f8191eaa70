//src/main.rs

use anyhow::Context;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use crm_backend::{config::{AppState, Config}, db, routes::create_router};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // RUST_LOG manda; sem ele, info
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    // Se a configuração falhar, a aplicação não deve iniciar.
    let config = Config::from_env().context("Falha ao carregar a configuração.")?;

    let db_pool = db::connect(&config).await?;

    // Faz o app rodar as migrações do SQLx na inicialização
    sqlx::migrate!()
        .run(&db_pool)
        .await
        .context("Falha ao rodar as migrações do banco de dados.")?;

    tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");

    let bind_addr = config.bind_addr.clone();
    let app = create_router(AppState::with_pool(config, db_pool));

    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Falha ao iniciar o listener TCP em {bind_addr}"))?;
    tracing::info!("🚀 Servidor escutando em {}", listener.local_addr()?);

    axum::serve(listener, app).await.context("Erro no servidor Axum")?;
    Ok(())
}
