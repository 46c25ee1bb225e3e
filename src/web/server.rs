//! Web server for devcloud.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tower_http::compression::CompressionLayer;

use crate::auth::CredentialHasher;
use crate::cloud::ScopedFileBrowser;
use crate::config::Config;
use crate::{Database, DevcloudError, Result};

use super::handlers::{AppState, SharedDatabase};
use super::middleware::JwtState;
use super::openapi::create_swagger_router;
use super::router::{create_health_router, create_router, RouterConfig};

/// Web server for the API.
pub struct WebServer {
    /// Server address.
    addr: SocketAddr,
    /// Application state.
    app_state: Arc<AppState>,
    /// JWT state.
    jwt_state: Arc<JwtState>,
    /// Router settings.
    router_config: RouterConfig,
}

impl WebServer {
    /// Create a new web server.
    pub fn new(config: &Config, db: SharedDatabase) -> Result<Self> {
        let web = &config.web;
        let addr: SocketAddr = format!("{}:{}", web.host, web.port)
            .parse()
            .map_err(|e| DevcloudError::Config(format!("invalid web server address: {e}")))?;

        let browser = ScopedFileBrowser::from_config(db.pool().clone(), &config.cloud);
        let hasher = CredentialHasher::new(&config.auth)
            .map_err(|e| DevcloudError::Config(e.to_string()))?;
        let app_state = AppState::new(
            db,
            browser,
            &web.jwt_secret,
            web.jwt_access_token_expiry_secs,
        )
        .with_session_cookie(&web.session_cookie)
        .with_hasher(hasher);

        let jwt_state =
            Arc::new(JwtState::new(&web.jwt_secret).with_cookie_name(&web.session_cookie));

        let router_config = RouterConfig {
            cors_origins: web.cors_origins.clone(),
            max_upload_bytes: usize::try_from(config.cloud.max_upload_size_mb)
                .unwrap_or(usize::MAX)
                .saturating_mul(1024 * 1024),
            login_rate_limit: web.login_rate_limit,
            api_rate_limit: web.api_rate_limit,
        };

        Ok(Self {
            addr,
            app_state: Arc::new(app_state),
            jwt_state,
            router_config,
        })
    }

    /// Create a new web server from a raw Database.
    pub fn from_database(config: &Config, db: Database) -> Result<Self> {
        Self::new(config, Arc::new(db))
    }

    /// Get the server address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Build the complete application router.
    pub fn router(&self) -> Router {
        create_router(
            self.app_state.clone(),
            self.jwt_state.clone(),
            &self.router_config,
        )
        .merge(create_health_router())
        .merge(create_swagger_router())
        .layer(CompressionLayer::new())
    }

    async fn bind(&self) -> std::io::Result<(TcpListener, SocketAddr)> {
        let listener = TcpListener::bind(self.addr).await?;
        let local_addr = listener.local_addr()?;
        tracing::info!("Web server listening on http://{}", local_addr);
        Ok((listener, local_addr))
    }

    /// Run the web server.
    pub async fn run(self) -> std::result::Result<(), std::io::Error> {
        let router = self.router();
        let (listener, _) = self.bind().await?;

        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
    }

    /// Run the server and return the actual bound address.
    ///
    /// This is useful for testing when binding to port 0.
    pub async fn run_with_addr(self) -> std::result::Result<SocketAddr, std::io::Error> {
        let router = self.router();
        let (listener, local_addr) = self.bind().await?;

        tokio::spawn(async move {
            let service = router.into_make_service_with_connect_info::<SocketAddr>();
            if let Err(e) = axum::serve(listener, service).await {
                tracing::error!("Web server error: {}", e);
            }
        });

        Ok(local_addr)
    }
}
