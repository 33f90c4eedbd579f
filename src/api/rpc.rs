//! RPC Handlers
//!
//! Maps `POST /v1/providers/{provider_id}/{rpc}` onto [`Provider`] entry
//! points. Each request is resolved to its provider, decoded, then run on that
//! provider's worker pool. Every RPC but `hello` answers with an
//! [`RpcResponse`], failures included.

use super::messages::*;
use crate::error::{Error, Result, RpcStatus};
use crate::provider::{metrics, Provider, ProviderSet};
use axum::{
    extract::{rejection::JsonRejection, rejection::PathRejection, Json, Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use std::future::Future;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{debug, error};

// =============================================================================
// RPC Router
// =============================================================================

/// RPC router builder
pub struct RpcRouter {
    providers: Arc<ProviderSet>,
}

impl RpcRouter {
    pub fn new(providers: Arc<ProviderSet>) -> Self {
        Self { providers }
    }

    /// Build the Axum router
    pub fn build(self) -> Router {
        let state = AppState {
            providers: self.providers,
        };

        Router::new()
            // Admin RPCs
            .route(&route(RPC_CREATE_COLLECTOR), post(create_collector))
            .route(&route(RPC_OPEN_COLLECTOR), post(open_collector))
            .route(&route(RPC_CLOSE_COLLECTOR), post(close_collector))
            .route(&route(RPC_DESTROY_COLLECTOR), post(destroy_collector))
            .route(&route(RPC_LIST_COLLECTORS), post(list_collectors))
            // Collector RPCs
            .route(&route(RPC_HELLO), post(hello))
            .route(&route(RPC_SUM), post(sum))
            .route(&route(RPC_INVOKE), post(invoke))
            // Operational endpoints
            .route("/health", get(health_check))
            .route("/metrics", get(metrics_text))
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }
}

fn route(rpc: &str) -> String {
    format!("/v1/providers/:provider_id/{}", rpc)
}

/// Shared application state
#[derive(Clone)]
struct AppState {
    providers: Arc<ProviderSet>,
}

type ProviderPath = std::result::Result<Path<u16>, PathRejection>;
type Body<T> = std::result::Result<Json<T>, JsonRejection>;

impl AppState {
    fn provider(&self, path: ProviderPath) -> Result<Arc<Provider>> {
        let Path(provider_id) =
            path.map_err(|e| Error::InvalidArgs(format!("bad provider id: {}", e.body_text())))?;
        self.providers.get(provider_id).map_err(|e| {
            error!(provider_id, "Request addressed to an unknown provider");
            e
        })
    }

    /// Resolve, decode, run on the provider's pool, then report
    async fn dispatch<Req, T, F, Fut>(
        &self,
        rpc: &'static str,
        path: ProviderPath,
        body: Body<Req>,
        handler: F,
    ) -> Json<RpcResponse<T>>
    where
        F: FnOnce(Arc<Provider>, Req) -> Fut,
        Fut: Future<Output = Result<T>> + Send + 'static,
        T: Send + 'static,
    {
        let result = async {
            let provider = self.provider(path)?;
            let Json(request) = body.map_err(|e| {
                error!(rpc, error = %e.body_text(), "Could not deserialize request");
                Error::Protocol(e.body_text())
            })?;
            let task = handler(provider.clone(), request);
            provider.pool().run(task).await
        }
        .await;

        let status = match &result {
            Ok(_) => RpcStatus::Success,
            Err(e) => e.status(),
        };
        metrics::record_request(rpc, status);
        debug!(rpc, status = %status, "Handled request");
        Json(RpcResponse::from_result(result))
    }
}

// =============================================================================
// Admin Handlers
// =============================================================================

async fn create_collector(
    State(state): State<AppState>,
    path: ProviderPath,
    body: Body<InstantiateRequest>,
) -> Json<RpcResponse<CollectorIdReply>> {
    state
        .dispatch(RPC_CREATE_COLLECTOR, path, body, |provider, req| async move {
            let id = provider
                .create_collector(req.token.as_deref(), &req.backend, req.config.as_deref())
                .await?;
            Ok(CollectorIdReply { id })
        })
        .await
}

async fn open_collector(
    State(state): State<AppState>,
    path: ProviderPath,
    body: Body<InstantiateRequest>,
) -> Json<RpcResponse<CollectorIdReply>> {
    state
        .dispatch(RPC_OPEN_COLLECTOR, path, body, |provider, req| async move {
            let id = provider
                .open_collector(req.token.as_deref(), &req.backend, req.config.as_deref())
                .await?;
            Ok(CollectorIdReply { id })
        })
        .await
}

async fn close_collector(
    State(state): State<AppState>,
    path: ProviderPath,
    body: Body<CollectorAdminRequest>,
) -> Json<RpcResponse<()>> {
    state
        .dispatch(RPC_CLOSE_COLLECTOR, path, body, |provider, req| async move {
            provider.close_collector(req.token.as_deref(), req.id).await
        })
        .await
}

async fn destroy_collector(
    State(state): State<AppState>,
    path: ProviderPath,
    body: Body<CollectorAdminRequest>,
) -> Json<RpcResponse<()>> {
    state
        .dispatch(RPC_DESTROY_COLLECTOR, path, body, |provider, req| async move {
            provider.destroy_collector(req.token.as_deref(), req.id).await
        })
        .await
}

async fn list_collectors(
    State(state): State<AppState>,
    path: ProviderPath,
    body: Body<ListCollectorsRequest>,
) -> Json<RpcResponse<ListCollectorsReply>> {
    state
        .dispatch(RPC_LIST_COLLECTORS, path, body, |provider, req| async move {
            let ids = provider.list_collectors(req.token.as_deref(), req.max_ids)?;
            Ok(ListCollectorsReply {
                count: ids.len(),
                ids,
            })
        })
        .await
}

// =============================================================================
// Collector Handlers
// =============================================================================

/// Fire-and-forget: acknowledged before the work runs, never reports failure
async fn hello(
    State(state): State<AppState>,
    path: ProviderPath,
    body: Body<HelloRequest>,
) -> StatusCode {
    let status = match (state.provider(path), body) {
        (Ok(provider), Ok(Json(req))) => {
            let worker = provider.clone();
            drop(provider.pool().spawn(async move {
                worker.hello(req.id).await;
                Ok(())
            }));
            RpcStatus::Success
        }
        (Err(e), _) => e.status(),
        (_, Err(e)) => {
            error!(rpc = RPC_HELLO, error = %e.body_text(), "Could not deserialize request");
            RpcStatus::FromTransport
        }
    };
    metrics::record_request(RPC_HELLO, status);
    StatusCode::ACCEPTED
}

async fn sum(
    State(state): State<AppState>,
    path: ProviderPath,
    body: Body<SumRequest>,
) -> Json<RpcResponse<SumReply>> {
    state
        .dispatch(RPC_SUM, path, body, |provider, req| async move {
            let result = provider.sum(req.id, req.x, req.y).await?;
            Ok(SumReply { result })
        })
        .await
}

async fn invoke(
    State(state): State<AppState>,
    path: ProviderPath,
    body: Body<InvokeRequest>,
) -> Json<RpcResponse<InvokeReply>> {
    state
        .dispatch(RPC_INVOKE, path, body, |provider, req| async move {
            let result = provider.invoke(req.id, &req.operation, req.args).await?;
            Ok(InvokeReply { result })
        })
        .await
}

// =============================================================================
// Operational Handlers
// =============================================================================

async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

async fn metrics_text() -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        metrics::gather_text(),
    )
}
