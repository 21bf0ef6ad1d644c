//! WebGarden - marketing and blog site backend

use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use webgarden::{
    api::{self, AppState},
    cli::{Cli, Commands},
    config::Config,
    db::{
        self,
        repositories::{
            SqlxContactRepository, SqlxPostRepository, SqlxSessionRepository,
            SqlxUploadRepository, SqlxUserRepository,
        },
    },
    services::{ContactService, Mailer, PostService, RateLimiter, UserService},
};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "webgarden=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = Config::load(&cli.config)?;

    match &cli.command {
        Some(Commands::Serve) | None => serve(config).await,
        Some(command) => webgarden::cli::run_command(&config, command).await,
    }
}

async fn serve(config: Config) -> Result<()> {
    tracing::info!(site = %config.site.name, "starting webgarden");

    let pool = db::create_pool(&config.database).await?;
    db::migrations::run_migrations(&pool).await?;
    tracing::info!("database ready");

    let rate_limiter = Arc::new(RateLimiter::new());
    let user_service = Arc::new(UserService::new(
        SqlxUserRepository::boxed(pool.clone()),
        SqlxSessionRepository::boxed(pool.clone()),
        rate_limiter.clone(),
    ));
    let post_service = Arc::new(PostService::new(SqlxPostRepository::boxed(pool.clone())));
    let contact_service = Arc::new(ContactService::new(SqlxContactRepository::boxed(
        pool.clone(),
    )));
    let upload_repo = SqlxUploadRepository::boxed(pool.clone());
    let mailer = Arc::new(Mailer::new(config.mail.clone(), config.site.clone()));
    if !mailer.is_enabled() {
        tracing::info!("mail disabled, contact notifications will be skipped");
    }

    let state = AppState {
        config: Arc::new(config),
        user_service: user_service.clone(),
        post_service,
        contact_service,
        upload_repo,
        mailer,
        rate_limiter: rate_limiter.clone(),
    };

    // Periodic maintenance: expired sessions and stale rate-limit entries
    {
        let user_service = user_service.clone();
        let limiter = rate_limiter.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(tokio::time::Duration::from_secs(300));
            loop {
                interval.tick().await;
                limiter.cleanup().await;
                if let Err(e) = user_service.cleanup_expired_sessions().await {
                    tracing::warn!(error = %e, "session cleanup failed");
                }
            }
        });
    }

    let addr = format!(
        "{}:{}",
        state.config.server.host, state.config.server.port
    );
    let app = api::build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("listening on http://{}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
