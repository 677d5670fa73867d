use std::sync::Arc;

use axum::{
    extract::State,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use blocks_common::metrics::setup_metrics_routes;
use metrics_exporter_prometheus::BuildError;
use tokio::task::JoinError;

use crate::app_context::AppContext;
use crate::error::StartupError;

pub async fn listen(app: Router, bind: String) -> eyre::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind).await?;

    axum::serve(listener, app).await?;

    Ok(())
}

/// The server task never ends on its own, so however it ended is an error.
pub fn exit_error(result: Result<eyre::Result<()>, JoinError>) -> StartupError {
    match result {
        Ok(Ok(())) => StartupError::Server(eyre::eyre!("server stopped accepting connections")),
        Ok(Err(e)) => StartupError::Server(e),
        Err(e) => StartupError::Server(eyre::Report::new(e)),
    }
}

pub async fn index() -> &'static str {
    "blocks relay"
}

async fn liveness(State(context): State<Arc<AppContext>>) -> Response {
    context.health.get_status().into_response()
}

pub fn app(context: Arc<AppContext>) -> Result<Router, BuildError> {
    let router: Router<Arc<AppContext>> = Router::new()
        .route("/", get(index))
        .route("/_readiness", get(index))
        .route("/_liveness", get(liveness));

    // The recorder is process global, tests build the app without it
    let router = if context.metrics {
        setup_metrics_routes(router)?
    } else {
        router
    };

    Ok(router.with_state(context))
}
