use caby_mail::{DisabledProvider, MailProvider, SmtpProvider};
use caby_platform_access::{IdentityResolver, IdentitySource};
use caby_realtime::{NatsPublisher, RealtimePublisher, TokenVerifier};
use caby_server::{
    app,
    auth::{
        self, EndpointIdentityResolver, HttpTokenEndpoint, TokenSubjectResolver,
        db::{PgAccountStore, PgSessionStore},
    },
    config::ServerConfig,
    mail::PgSuppressionStore,
    state::{AppState, Collaborators},
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration from environment
    let config = ServerConfig::from_env()?;
    config.validate()?;
    tracing::info!(app = %config.app.name, stage = %config.app.stage, "Loaded configuration");
    if config.mail.webhook_token.is_none() {
        tracing::warn!("MAIL__WEBHOOK_TOKEN is not configured, mail webhooks reject every request");
    }

    // Create database connection pool
    let db_pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;

    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations").run(&db_pool).await?;

    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.auth.http_timeout_seconds))
        .build()?;

    let identity: Arc<dyn IdentityResolver> = match config.auth.exchange.identity() {
        IdentitySource::Endpoint => {
            let session_url = config
                .auth
                .exchange
                .session_url()
                .ok_or("session_url is required when identity is 'endpoint'")?;
            Arc::new(EndpointIdentityResolver::new(http.clone(), session_url))
        }
        IdentitySource::TokenSubject => Arc::new(TokenSubjectResolver::new(TokenVerifier::new(
            config.realtime.token_secret.as_bytes(),
            config.realtime.issuer.as_deref(),
            config.realtime.audience.as_deref(),
        ))),
    };

    let mail_provider: Arc<dyn MailProvider> = match &config.mail.smtp {
        Some(smtp) => Arc::new(SmtpProvider::new(smtp).map_err(|r| r.to_string())?),
        None => {
            tracing::warn!("MAIL__SMTP is not configured, outgoing mail is disabled");
            Arc::new(DisabledProvider)
        }
    };

    let publisher: Option<Arc<dyn RealtimePublisher>> = match &config.realtime.nats_url {
        Some(url) => {
            let nats = NatsPublisher::connect(url)
                .await
                .map_err(|r| r.to_string())?;
            tracing::info!(%url, "Connected to NATS");
            Some(Arc::new(nats))
        }
        None => {
            tracing::info!("REALTIME__NATS_URL is not configured, event publishing is disabled");
            None
        }
    };

    let sessions = Arc::new(PgSessionStore::new(db_pool.clone()));
    let _cleanup = auth::spawn_session_cleanup(
        sessions.clone(),
        Duration::from_secs(config.auth.cleanup_interval_seconds),
    );

    let state = AppState::new(
        &config,
        Collaborators {
            token_endpoint: Arc::new(HttpTokenEndpoint::new(
                http,
                config.auth.exchange.token_url(),
            )),
            identity,
            sessions,
            accounts: Arc::new(PgAccountStore::new(db_pool.clone())),
            suppression: Arc::new(PgSuppressionStore::new(db_pool)),
            mail_provider,
            publisher,
        },
    );

    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    tracing::info!("listening on http://{}", config.listen_addr);

    axum::serve(listener, app::router(Arc::new(state)))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
    tracing::info!("shutting down");
}
