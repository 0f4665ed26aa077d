//! The webhook HTTP server.
//!
//! One POST route per registered bot callback path; every route feeds the
//! shared [`DispatchEngine`]. The server owns nothing else -- request
//! bytes and the signature header go in, a status plus the platform-style
//! JSON reply comes out.

use std::sync::Arc;

use axum::body::Bytes;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use tracing::info;

use crate::engine::{DispatchEngine, WebhookOutcome};

/// Default name of the header carrying the callback signature.
pub const DEFAULT_SIGN_HEADER: &str = "x-rpc-bot_sign";

impl IntoResponse for WebhookOutcome {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.http_status()).unwrap_or(StatusCode::OK);
        (status, Json(self.reply_body())).into_response()
    }
}

/// Serves webhook callbacks for every registered bot.
pub struct WebhookServer {
    engine: Arc<DispatchEngine>,
    addr: String,
    sign_header: String,
}

impl WebhookServer {
    /// Creates a server bound to the given address.
    pub fn new(engine: Arc<DispatchEngine>, addr: impl Into<String>) -> Self {
        Self {
            engine,
            addr: addr.into(),
            sign_header: DEFAULT_SIGN_HEADER.to_string(),
        }
    }

    /// Overrides the signature header name. The header is platform-defined
    /// configuration, not a protocol constant.
    pub fn with_sign_header(mut self, name: impl Into<String>) -> Self {
        self.sign_header = name.into();
        self
    }

    /// Builds the router: one POST route per registered callback path.
    ///
    /// Routes are snapshotted at call time; bots registered afterwards
    /// need a rebuilt router.
    pub fn router(&self) -> Router {
        let mut router = Router::new();
        for (bot_id, path) in self.engine.registry().routes() {
            let engine = Arc::clone(&self.engine);
            let sign_header = self.sign_header.clone();
            router = router.route(
                &path,
                post(move |headers: HeaderMap, body: Bytes| {
                    let engine = Arc::clone(&engine);
                    let bot_id = bot_id.clone();
                    let sign_header = sign_header.clone();
                    async move {
                        let sign = headers
                            .get(sign_header.as_str())
                            .and_then(|v| v.to_str().ok());
                        engine.handle_request(&bot_id, sign, &body).await
                    }
                }),
            );
        }
        router
    }

    /// Binds and serves until ctrl-c or SIGTERM.
    pub async fn serve(self) -> std::io::Result<()> {
        let listener = tokio::net::TcpListener::bind(&self.addr).await?;
        info!(addr = %listener.local_addr()?, "webhook server listening");

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown_signal())
            .await
    }
}

/// Completes on ctrl-c or SIGTERM.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to register SIGTERM handler");

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("received ctrl-c, shutting down");
            }
            _ = sigterm.recv() => {
                info!("received SIGTERM, shutting down");
            }
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to listen for ctrl-c");
        info!("received ctrl-c, shutting down");
    }
}
