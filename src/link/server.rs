//! Transient HTTP server that hosts the Link widget and receives its callback.

use std::net::{IpAddr, SocketAddr};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::rejection::FormRejection;
use axum::extract::{Form, State};
use axum::http::{Method, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use serde::Deserialize;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::error::LinkError;
use super::{page, FlowKind};
use crate::provider::{LinkToken, PublicToken};

const SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

/// Sending halves of the three per-flow channels.
#[derive(Clone)]
pub(crate) struct Senders {
    pub results: mpsc::Sender<PublicToken>,
    pub relinked: mpsc::Sender<bool>,
    pub errors: mpsc::Sender<LinkError>,
}

/// Receiving halves, owned by the coordinator.
pub(crate) struct Receivers {
    pub results: mpsc::Receiver<PublicToken>,
    pub relinked: mpsc::Receiver<bool>,
    pub errors: mpsc::Receiver<LinkError>,
}

/// Create the result, relink-success and error channels, each holding one message.
pub(crate) fn channels() -> (Senders, Receivers) {
    let (results_tx, results_rx) = mpsc::channel(1);
    let (relinked_tx, relinked_rx) = mpsc::channel(1);
    let (errors_tx, errors_rx) = mpsc::channel(1);
    (
        Senders {
            results: results_tx,
            relinked: relinked_tx,
            errors: errors_tx,
        },
        Receivers {
            results: results_rx,
            relinked: relinked_rx,
            errors: errors_rx,
        },
    )
}

#[derive(Clone)]
struct CallbackState {
    flow: FlowKind,
    token: LinkToken,
    senders: Senders,
    /// Set by the first completion signal; later callbacks are not delivered.
    resolved: Arc<AtomicBool>,
}

enum Signal {
    Token(PublicToken),
    Relinked,
    Failed(LinkError),
}

impl CallbackState {
    fn deliver(&self, signal: Signal) {
        if self.resolved.swap(true, Ordering::SeqCst) {
            debug!(flow = ?self.flow, "Ignoring callback received after the flow resolved");
            return;
        }
        let sent = match signal {
            Signal::Token(token) => self.senders.results.try_send(token).is_ok(),
            Signal::Relinked => self.senders.relinked.try_send(true).is_ok(),
            Signal::Failed(err) => self.senders.errors.try_send(err).is_ok(),
        };
        if !sent {
            debug!(flow = ?self.flow, "Coordinator stopped listening before the callback arrived");
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct CallbackForm {
    #[serde(default)]
    public_token: String,
    #[serde(default)]
    error: String,
}

/// Router serving `GET` and `POST` on the flow's path.
pub(crate) fn router(flow: FlowKind, token: LinkToken, senders: Senders) -> Router {
    let state = CallbackState {
        flow,
        token,
        senders,
        resolved: Arc::new(AtomicBool::new(false)),
    };
    Router::new()
        .route(
            flow.path(),
            get(render_page).post(receive_callback).fallback(reject_method),
        )
        .with_state(state)
}

async fn render_page(State(state): State<CallbackState>) -> Html<String> {
    Html(page::render(state.flow, &state.token))
}

async fn receive_callback(
    State(state): State<CallbackState>,
    form: Result<Form<CallbackForm>, FormRejection>,
) -> Response {
    let form = match form {
        Ok(Form(form)) => form,
        Err(FormRejection::BytesRejection(rejection)) => {
            let message = rejection.body_text();
            state.deliver(Signal::Failed(LinkError::Server(format!(
                "could not read callback body: {message}"
            ))));
            return (StatusCode::INTERNAL_SERVER_ERROR, message).into_response();
        }
        Err(rejection) => {
            let message = rejection.body_text();
            state.deliver(Signal::Failed(LinkError::Protocol(message.clone())));
            return (StatusCode::BAD_REQUEST, message).into_response();
        }
    };

    match state.flow {
        FlowKind::Link if !form.error.is_empty() => {
            state.deliver(Signal::Failed(LinkError::Widget(form.error)));
        }
        FlowKind::Link if form.public_token.is_empty() => {
            state.deliver(Signal::Failed(LinkError::Protocol(
                "empty public_token".to_string(),
            )));
            return (StatusCode::BAD_REQUEST, "empty public_token").into_response();
        }
        FlowKind::Link => {
            state.deliver(Signal::Token(PublicToken::new(form.public_token)));
        }
        FlowKind::Relink if !form.error.is_empty() => {
            state.deliver(Signal::Failed(LinkError::Widget(form.error)));
        }
        FlowKind::Relink => state.deliver(Signal::Relinked),
    }

    (StatusCode::OK, "ok").into_response()
}

async fn reject_method(State(state): State<CallbackState>, method: Method) -> impl IntoResponse {
    state.deliver(Signal::Failed(LinkError::Protocol(format!(
        "unsupported method {method} on {}",
        state.flow.path()
    ))));
    (StatusCode::METHOD_NOT_ALLOWED, "method not allowed")
}

/// Bind the callback listener. Port 0 picks an ephemeral port.
pub(crate) async fn bind(host: IpAddr, port: u16) -> Result<TcpListener, LinkError> {
    TcpListener::bind(SocketAddr::new(host, port))
        .await
        .map_err(|err| LinkError::Listener {
            port,
            message: err.to_string(),
        })
}

/// A running callback server.
pub(crate) struct CallbackServer {
    addr: SocketAddr,
    shutdown: CancellationToken,
    handle: JoinHandle<()>,
}

impl CallbackServer {
    /// Serve `router` on its own task. Serve failures are reported on `errors`.
    pub(crate) fn spawn(
        listener: TcpListener,
        router: Router,
        errors: mpsc::Sender<LinkError>,
    ) -> Result<Self, LinkError> {
        let addr = listener.local_addr().map_err(|err| LinkError::Listener {
            port: 0,
            message: err.to_string(),
        })?;
        let shutdown = CancellationToken::new();
        let signal = shutdown.clone();
        let handle = tokio::spawn(async move {
            let result = axum::serve(listener, router)
                .with_graceful_shutdown(signal.cancelled_owned())
                .await;
            if let Err(err) = result {
                let _ = errors.try_send(LinkError::Server(err.to_string()));
            }
        });
        Ok(Self {
            addr,
            shutdown,
            handle,
        })
    }

    pub(crate) fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Stop accepting connections and wait briefly for in-flight requests.
    pub(crate) async fn shutdown(self) {
        self.shutdown.cancel();
        let mut handle = self.handle;
        if tokio::time::timeout(SHUTDOWN_GRACE, &mut handle).await.is_err() {
            debug!(addr = %self.addr, "Callback server did not stop in time; aborting");
            handle.abort();
        }
    }
}
