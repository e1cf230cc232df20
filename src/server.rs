use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    extract::{RawQuery, State},
    http::StatusCode,
    routing::get,
};
use tokio::net::TcpListener;
use tokio::sync::{Mutex, oneshot, watch};
use tracing::{debug, error, info, warn};
use url::form_urlencoded;

use crate::error::TokenKind;
use crate::types::CALLBACK_PATH;
use crate::{AuthClient, AuthConfig, AuthError, AuthSession, FlowResult, Result, Verifier, jwt};

const SUCCESS_BODY: &str =
    "Authenticated successfully. Please close this page and return to your terminal.";

#[derive(Debug, Default, PartialEq)]
struct CallbackQuery {
    code: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

impl CallbackQuery {
    /// Lenient parse: the first value of a repeated key wins and malformed
    /// input never rejects the request.
    fn parse(query: Option<&str>) -> Self {
        let mut params = Self::default();
        for (key, value) in form_urlencoded::parse(query.unwrap_or_default().as_bytes()) {
            let field = match key.as_ref() {
                "code" => &mut params.code,
                "error" => &mut params.error,
                "error_description" => &mut params.error_description,
                _ => continue,
            };
            if field.is_none() {
                *field = Some(value.into_owned());
            }
        }
        params
    }
}

/// Single-slot handoff from the callback handler to the waiting flow
///
/// The sender can be claimed exactly once; every later claim returns `None`.
pub struct ResultSlot {
    tx: Mutex<Option<oneshot::Sender<FlowResult>>>,
}

impl ResultSlot {
    pub fn channel() -> (Self, oneshot::Receiver<FlowResult>) {
        let (tx, rx) = oneshot::channel();
        let slot = Self {
            tx: Mutex::new(Some(tx)),
        };
        (slot, rx)
    }

    /// Take the right to deliver the flow's result
    pub async fn claim(&self) -> Option<Delivery> {
        self.tx.lock().await.take().map(Delivery)
    }
}

/// Consume-once right to deliver the terminal result
pub struct Delivery(oneshot::Sender<FlowResult>);

impl Delivery {
    pub fn deliver(self, result: FlowResult) {
        if self.0.send(result).is_err() {
            debug!("flow stopped waiting before the result was delivered");
        }
    }
}

struct ServerState {
    slot: ResultSlot,
    client: AuthClient,
    verifier: Verifier,
}

/// Local listener receiving the identity provider's redirect
///
/// Binding and serving are split so the bound port is known before the
/// authorization URL is built. With `callback_port` set to `0` the operating
/// system picks the port and [`CallbackServer::config`] reflects it.
///
/// The redirect URI names `localhost`, so the port is bound on both loopback
/// addresses: `127.0.0.1` is required, `::1` is added when the host has IPv6.
pub struct CallbackServer {
    listeners: Vec<TcpListener>,
    config: AuthConfig,
}

impl CallbackServer {
    /// Bind the callback listener on the loopback interface
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::ListenerBind`] if the IPv4 loopback port cannot
    /// be bound
    pub async fn bind(config: &AuthConfig) -> Result<Self> {
        let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), config.callback_port);
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| AuthError::ListenerBind(format!("{}: {}", addr, e)))?;
        let port = listener
            .local_addr()
            .map_err(|e| AuthError::ListenerBind(e.to_string()))?
            .port();

        let mut listeners = vec![listener];
        let v6 = SocketAddr::new(IpAddr::V6(Ipv6Addr::LOCALHOST), port);
        match TcpListener::bind(v6).await {
            Ok(listener) => listeners.push(listener),
            Err(e) => debug!(addr = %v6, error = %e, "IPv6 loopback unavailable"),
        }

        Ok(Self {
            listeners,
            config: config.with_callback_port(port),
        })
    }

    /// Configuration resolved to the bound port
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Start serving `GET /callback` in the background
    ///
    /// The first request to reach the handler runs the token exchange,
    /// verification and claim extraction and delivers the outcome to the
    /// returned [`PendingResult`]. Requests after it are refused without any
    /// network I/O.
    pub fn serve(self, client: AuthClient, verifier: Verifier) -> PendingResult {
        let (slot, rx) = ResultSlot::channel();
        let state = Arc::new(ServerState {
            slot,
            client,
            verifier,
        });

        let app = Router::new()
            .route(CALLBACK_PATH, get(handle_callback))
            .with_state(state);

        let (shutdown_tx, shutdown_rx) = watch::channel(());
        let port = self.config.callback_port;
        for listener in self.listeners {
            let app = app.clone();
            let mut shutdown_rx = shutdown_rx.clone();
            tokio::spawn(async move {
                let result = axum::serve(listener, app)
                    .with_graceful_shutdown(async move {
                        // Resolves once the sender is dropped
                        let _ = shutdown_rx.changed().await;
                    })
                    .await;
                match result {
                    Ok(()) => debug!(port, "callback server stopped"),
                    Err(e) => error!(port, error = %e, "callback server failed"),
                }
            });
        }

        info!(port, "listening for the authorization callback");
        PendingResult {
            rx,
            shutdown: Some(shutdown_tx),
        }
    }
}

/// Receiving end of the result handoff
///
/// Completing [`PendingResult::wait`] or dropping the value shuts the
/// listener down and frees the port.
pub struct PendingResult {
    rx: oneshot::Receiver<FlowResult>,
    shutdown: Option<watch::Sender<()>>,
}

impl PendingResult {
    /// Block until the callback handler delivers the flow's result
    ///
    /// # Errors
    ///
    /// Returns the delivered error, [`AuthError::Timeout`] when `timeout`
    /// elapses first, or [`AuthError::CallbackServer`] if the listener went
    /// away without delivering.
    pub async fn wait(mut self, timeout: Option<Duration>) -> FlowResult {
        let received = match timeout {
            Some(limit) => tokio::time::timeout(limit, &mut self.rx)
                .await
                .map_err(|_| AuthError::Timeout(limit))?,
            None => (&mut self.rx).await,
        };

        received.map_err(|_| {
            AuthError::CallbackServer("server shut down unexpectedly".to_string())
        })?
    }
}

impl Drop for PendingResult {
    fn drop(&mut self) {
        drop(self.shutdown.take());
    }
}

async fn handle_callback(
    State(state): State<Arc<ServerState>>,
    RawQuery(query): RawQuery,
) -> (StatusCode, String) {
    let params = CallbackQuery::parse(query.as_deref());

    let Some(delivery) = state.slot.claim().await else {
        warn!("ignoring callback: authorization already handled");
        return (
            StatusCode::CONFLICT,
            "ERROR: authorization already handled\n".to_string(),
        );
    };

    if let Some(provider_error) = &params.error {
        warn!(
            error = %provider_error,
            description = params.error_description.as_deref().unwrap_or_default(),
            "identity provider returned an error"
        );
    }

    // Runs detached from the connection so a closed browser tab cannot
    // cancel the exchange after the slot has been claimed.
    let task = tokio::spawn(async move {
        let result =
            complete_authorization(&state.client, &state.verifier, params.code.as_deref()).await;
        let response = match &result {
            Ok(_) => {
                info!("authorization completed");
                (StatusCode::OK, SUCCESS_BODY.to_string())
            }
            Err(e) => {
                let status = match e {
                    AuthError::MissingAuthorizationCode => StatusCode::BAD_REQUEST,
                    _ => StatusCode::BAD_GATEWAY,
                };
                (status, format!("ERROR: {}\n", e))
            }
        };
        delivery.deliver(result);
        response
    });

    match task.await {
        Ok(response) => response,
        Err(e) => {
            error!(error = %e, "callback task failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "ERROR: internal error\n".to_string(),
            )
        }
    }
}

async fn complete_authorization(
    client: &AuthClient,
    verifier: &Verifier,
    code: Option<&str>,
) -> FlowResult {
    let code = code
        .filter(|code| !code.is_empty())
        .ok_or(AuthError::MissingAuthorizationCode)?;

    let tokens = client
        .exchange_code(verifier.secret(), code)
        .await
        .map_err(|e| {
            debug!(error = %e, "token exchange failed");
            AuthError::token_exchange(e)
        })?;
    if !tokens.is_complete() {
        debug!("token response is missing the access token or ID token");
        return Err(AuthError::TokenExchange { source: None });
    }

    // The access token's claims are unused, but verifying it proves the
    // response came from the provider.
    client
        .verify_token(TokenKind::Access, &tokens.access_token)
        .await?;
    let claims = client.verify_token(TokenKind::Id, &tokens.id_token).await?;
    let session_token = jwt::extract_session_token(&claims)?;

    Ok(AuthSession {
        tokens,
        session_token,
    })
}
