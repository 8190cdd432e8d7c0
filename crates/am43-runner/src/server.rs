//! HTTP trigger.
//!
//! `GET /` answers with a banner and `GET /<Action>` runs the action across
//! the fleet and answers with the merged readings (or `ERROR`). Fleet work
//! runs on the blocking pool behind a mutex, so at most one action touches
//! the radio at a time.

use am43_control::{CancelToken, FleetDispatcher};
use am43_link::Connector;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Html;
use axum::routing::get;
use axum::Router;
use parking_lot::Mutex;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::response::{format_outcome, BANNER, ERROR_BODY};

/// Dispatcher shared between request handlers.
pub type SharedDispatcher<C> = Arc<Mutex<FleetDispatcher<C>>>;

/// How often the graceful shutdown future checks the token.
const SHUTDOWN_POLL: Duration = Duration::from_millis(100);

struct AppState<C: Connector> {
    dispatcher: SharedDispatcher<C>,
    cancel: CancelToken,
}

impl<C: Connector> Clone for AppState<C> {
    fn clone(&self) -> Self {
        AppState {
            dispatcher: Arc::clone(&self.dispatcher),
            cancel: self.cancel.clone(),
        }
    }
}

/// Build the router. Every action runs with `cancel` as its token, so
/// cancelling it also aborts an action in flight.
pub fn app<C>(dispatcher: SharedDispatcher<C>, cancel: CancelToken) -> Router
where
    C: Connector + Send + 'static,
{
    Router::new()
        .route("/", get(banner))
        .route("/:action", get(run_action::<C>))
        .with_state(AppState { dispatcher, cancel })
}

/// Serve [`app`] on `listener` until `shutdown` is cancelled.
pub async fn serve<C>(
    listener: TcpListener,
    dispatcher: SharedDispatcher<C>,
    shutdown: CancelToken,
) -> io::Result<()>
where
    C: Connector + Send + 'static,
{
    info!(addr = %listener.local_addr()?, "listening");
    let router = app(dispatcher, shutdown.clone());
    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(cancelled(shutdown))
        .await?;
    info!("shutting down");
    Ok(())
}

/// Bind `addr` and [`serve`] on it.
pub async fn bind_and_serve<C>(
    addr: SocketAddr,
    dispatcher: SharedDispatcher<C>,
    shutdown: CancelToken,
) -> io::Result<()>
where
    C: Connector + Send + 'static,
{
    let listener = TcpListener::bind(addr).await?;
    serve(listener, dispatcher, shutdown).await
}

async fn banner() -> Html<&'static str> {
    Html(BANNER)
}

async fn run_action<C>(
    State(state): State<AppState<C>>,
    Path(name): Path<String>,
) -> Result<Html<String>, (StatusCode, Html<&'static str>)>
where
    C: Connector + Send + 'static,
{
    info!(action = %name, "action requested");
    tokio::task::spawn_blocking(move || {
        let mut dispatcher = state.dispatcher.lock();
        format_outcome(&dispatcher.perform_action(&name, &state.cancel))
    })
    .await
    .map(Html)
    .map_err(|e| {
        warn!(error = %e, "action task failed");
        (StatusCode::INTERNAL_SERVER_ERROR, Html(ERROR_BODY))
    })
}

/// Resolve once `token` is cancelled.
async fn cancelled(token: CancelToken) {
    while !token.is_cancelled() {
        tokio::time::sleep(SHUTDOWN_POLL).await;
    }
}
