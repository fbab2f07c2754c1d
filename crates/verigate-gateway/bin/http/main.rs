mod cli;

use crate::cli::{LogFormat, StorageBackendArg, CLI};
use anyhow::Context;
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use verigate_gateway::{
    App, AppState, GatewayConfig, RateLimitSettings, RateLimiter, RedirectGateway,
};
use verigate_shortlink::{
    HttpShortenerClient, HttpShortenerSettings, ResolverSettings, ShortlinkResolver,
};
use verigate_storage::{InMemoryRecordStore, MySqlRecordStore, RecordStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = CLI::try_parse()?;
    init_tracing(config.log_format);

    info!(
        listen_addr = %config.listen_addr,
        storage_backend = %config.storage,
        debug = config.debug,
        "starting verigate gateway"
    );

    let store: Arc<dyn RecordStore> = match config.storage {
        StorageBackendArg::InMemory => {
            warn!("using in-memory store, records are lost on restart");
            Arc::new(InMemoryRecordStore::new())
        }
        StorageBackendArg::Mysql => {
            let mysql_dsn = config
                .mysql_dsn
                .as_deref()
                .context("mysql dsn is required when storage backend is mysql")?;
            Arc::new(MySqlRecordStore::connect(mysql_dsn).await?)
        }
    };

    let allowed_domains: Vec<String> = config
        .allowed_domains
        .iter()
        .map(|domain| domain.trim().to_owned())
        .filter(|domain| !domain.is_empty())
        .collect();
    let shortlinks = build_shortlinks(&config, &allowed_domains)?;
    let gateway_config = GatewayConfig::builder()
        .bot_username_opt(config.bot_username.clone())
        .session_ttl(Duration::from_secs(config.session_ttl_secs))
        .redirect_ttl(Duration::from_secs(config.redirect_ttl_secs))
        .store_timeout(Duration::from_secs(config.store_timeout_secs))
        .allowed_domains(allowed_domains)
        .require_shortlink(config.require_shortlink)
        .debug(config.debug)
        .build();

    let gateway = RedirectGateway::new(store, shortlinks, gateway_config);
    if let Some(fault) = gateway.config_fault() {
        error!(fault = %fault, "configuration fault, verification requests will fail");
    }

    let limiter = RateLimiter::new(
        RateLimitSettings::builder()
            .limit(config.rate_limit)
            .window(Duration::from_secs(config.rate_window_secs))
            .build(),
    );
    let router = App::router(AppState::new(gateway, limiter));

    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    info!(listen_addr = %listener.local_addr()?, "listening");
    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("gateway stopped");
    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Pretty => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

/// Builds the resolver when both shortener settings are present.
fn build_shortlinks(
    config: &CLI,
    allowed_domains: &[String],
) -> anyhow::Result<Option<ShortlinkResolver>> {
    let (Some(domain), Some(api_key)) = (
        config.shortener_domain.as_deref().filter(|d| !d.is_empty()),
        config.shortener_api_key.as_deref().filter(|k| !k.is_empty()),
    ) else {
        return Ok(None);
    };

    let client = HttpShortenerClient::new(
        HttpShortenerSettings::builder()
            .api_url(HttpShortenerClient::api_url_for_domain(domain))
            .api_key(api_key.to_owned())
            .shorten_timeout(Duration::from_secs(config.shortener_timeout_secs))
            .follow_timeout(Duration::from_secs(config.resolve_timeout_secs))
            .build(),
    )
    .context("failed to build shortener http client")?;

    info!(shortener_domain = domain, "shortener configured");
    Ok(Some(ShortlinkResolver::new(
        Arc::new(client),
        ResolverSettings::builder()
            .allowed_domains(allowed_domains.to_vec())
            .build(),
    )))
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        error!(error = %error, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
