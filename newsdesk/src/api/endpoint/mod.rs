use std::future::Future;
use std::time::Duration;

use anyhow::Result;
use axum::extract::{DefaultBodyLimit, FromRef};
use axum::http::StatusCode;
use axum::routing::{get, post};
use tokio::net::TcpListener;

use crate::api::controllers;
use crate::api::state::*;

#[derive(Default)]
pub struct ApiEndpointBuilder {
    common: ApiEndpointBuilderCommon,
}

impl ApiEndpointBuilder {
    /// Builds the router with middleware and state attached.
    pub fn build(self, state: ApiState) -> axum::Router {
        with_middleware(self.common.build(), state)
    }

    pub async fn bind(self, state: ApiState) -> Result<ApiEndpoint> {
        let listener = state.bind_socket().await?;
        Ok(ApiEndpoint {
            listener,
            router: self.build(state),
        })
    }
}

struct ApiEndpointBuilderCommon {
    healthcheck_route: Option<String>,
}

impl Default for ApiEndpointBuilderCommon {
    fn default() -> Self {
        Self {
            healthcheck_route: Some("/".to_owned()),
        }
    }
}

impl ApiEndpointBuilderCommon {
    fn build<S>(self) -> axum::Router<S>
    where
        ApiState: FromRef<S>,
        S: Clone + Send + Sync + 'static,
    {
        let mut router = axum::Router::new();

        if let Some(route) = self.healthcheck_route {
            router = router.route(&route, get(controllers::home));
        }

        router.nest("/api", api_router())
    }
}

pub struct ApiEndpoint {
    listener: TcpListener,
    router: axum::Router<()>,
}

impl ApiEndpoint {
    pub fn builder() -> ApiEndpointBuilder {
        ApiEndpointBuilder::default()
    }

    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.listener.local_addr()
    }

    pub async fn serve_with_shutdown<F>(self, signal: F) -> std::io::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(signal)
            .await
    }
}

fn with_middleware<S>(router: axum::Router<S>, state: S) -> axum::Router
where
    S: Clone + Send + Sync + 'static,
{
    use tower::ServiceBuilder;
    use tower_http::cors::CorsLayer;
    use tower_http::timeout::TimeoutLayer;
    use tower_http::trace::TraceLayer;

    let service = ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(MAX_REQUEST_SIZE))
        .layer(CorsLayer::permissive())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            REQUEST_TIMEOUT,
        ));

    #[cfg(feature = "compression")]
    let service = service.layer(tower_http::compression::CompressionLayer::new().gzip(true));

    router.layer(service).with_state(state)
}

fn api_router<S>() -> axum::Router<S>
where
    ApiState: FromRef<S>,
    S: Clone + Send + Sync + 'static,
{
    axum::Router::new()
        .route("/news/", get(controllers::news::search))
        .route("/token/refresh/", post(controllers::token::refresh))
        .route("/auth/google/", post(controllers::auth::google_login))
        .route("/me/", get(controllers::user::me))
}

const MAX_REQUEST_SIZE: usize = 2 << 17; // 256kb
const REQUEST_TIMEOUT: Duration = Duration::from_secs(25);
