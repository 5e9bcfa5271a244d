//! REST API for the load planning service.
//!
//! Thin axum layer over the three core operations. Requests are validated
//! eagerly; malformed input is answered with `422` and an [`ErrorResponse`].

use axum::extract::rejection::JsonRejection;
use axum::extract::{Json, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::{
    Router,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
#[allow(unused_imports)]
use serde_json::json;
use std::ops::ControlFlow;
use std::sync::OnceLock;
use tokio::sync::mpsc;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;
use tower_http::cors::{Any, CorsLayer};
use tracing::{debug, info, warn};
use utoipa::{OpenApi, ToSchema};

use crate::chargeable::{self, ChargeableWeight, ItemChargeable, ShipmentChargeable, TransportMode};
use crate::config::ApiConfig;
use crate::engine::SearchCap;
use crate::error::LoadingError;
use crate::model::{
    ContainerType, FitBlocker, Item, ItemInstance, Orientation, Placement, UnplacedItem,
    UnplacedReason,
};
use crate::optimizer::{
    LoadingConfig, PackEvent, PackedContainer, PackingResult, PackingWarning, optimize_loading,
    optimize_loading_with_progress, validate_input,
};
use crate::types::Vec3;
use crate::utilization::{self, ConsolidationHint, ContainerUtilization, UtilizationReport};

#[derive(Clone)]
struct ApiState {
    loading: LoadingConfig,
}

static OPENAPI_DOC: OnceLock<utoipa::openapi::OpenApi> = OnceLock::new();

const SWAGGER_UI_HTML: &str = r##"<!DOCTYPE html>
<html lang="en">
    <head>
        <meta charset="utf-8" />
        <title>load-planner API Docs</title>
        <link
            rel="stylesheet"
            href="https://unpkg.com/swagger-ui-dist@5.17.14/swagger-ui.css"
            integrity="sha384-wxLW6kwyHktdDGr6Pv1zgm/VGJh99lfUbzSn6HNHBENZlCN7W602k9VkGdxuFvPn"
            crossorigin="anonymous"
        />
    </head>
    <body>
        <div id="swagger-ui"></div>
        <script
            src="https://unpkg.com/swagger-ui-dist@5.17.14/swagger-ui-bundle.js"
            integrity="sha384-wmyclcVGX/WhUkdkATwhaK1X1JtiNrr2EoYJ+diV3vj4v6OC5yCeSu+yW13SYJep"
            crossorigin="anonymous"
        ></script>
        <script>
            window.onload = function () {
                window.ui = SwaggerUIBundle({
                    url: "/docs/openapi.json",
                    dom_id: "#swagger-ui",
                });
            };
        </script>
    </body>
    </html>"##;

fn openapi_doc() -> &'static utoipa::openapi::OpenApi {
    OPENAPI_DOC.get_or_init(ApiDoc::openapi)
}

/// Request for `POST /chargeable-weight`.
#[derive(Deserialize, ToSchema)]
#[schema(
    example = json!({
        "items": [
            { "id": "carton", "length": 60.0, "width": 40.0, "height": 138.0, "weight": 40.0 }
        ],
        "mode": "air"
    })
)]
pub struct ChargeableRequest {
    pub items: Vec<Item>,
    /// Falls back to the configured default mode.
    #[serde(default)]
    #[schema(nullable = true)]
    pub mode: Option<TransportMode>,
}

/// Request for `POST /optimize` and `POST /optimize_stream`.
#[derive(Deserialize, ToSchema)]
#[schema(
    example = json!({
        "containers": [
            { "id": "20ft-dry", "length": 589.8, "width": 235.2, "height": 239.3, "max_payload": 28200.0 }
        ],
        "items": [
            { "id": "pallet", "length": 120.0, "width": 80.0, "height": 100.0, "weight": 250.0, "quantity": 4 }
        ],
        "search_budget": 50000
    })
)]
pub struct OptimizeRequest {
    pub containers: Vec<ContainerType>,
    pub items: Vec<Item>,
    #[serde(default)]
    #[schema(nullable = true)]
    pub mode: Option<TransportMode>,
    #[serde(default)]
    #[schema(nullable = true)]
    pub search_budget: Option<u64>,
    #[serde(default)]
    #[schema(nullable = true)]
    pub support_fraction: Option<f64>,
}

impl OptimizeRequest {
    /// Applies the request-level overrides on top of the service configuration.
    fn effective_config(&self, base: LoadingConfig) -> LoadingConfig {
        let mut config = base;
        if let Some(mode) = self.mode {
            config.chargeable.default_mode = mode;
        }
        if let Some(budget) = self.search_budget {
            config.packing.max_placement_attempts = budget;
        }
        if let Some(fraction) = self.support_fraction {
            config.packing.support_fraction = fraction;
        }
        config
    }
}

#[derive(Debug)]
struct ValidatedOptimizeRequest {
    items: Vec<Item>,
    containers: Vec<ContainerType>,
    config: LoadingConfig,
}

/// Response of `POST /optimize`.
#[derive(Serialize, ToSchema)]
pub struct OptimizeResponse {
    pub is_complete: bool,
    pub result: PackingResult,
    pub utilization: UtilizationReport,
}

/// Request for `POST /utilization`.
#[derive(Deserialize, ToSchema)]
pub struct UtilizationRequest {
    pub result: PackingResult,
    #[serde(default)]
    #[schema(nullable = true)]
    pub consolidation_threshold: Option<f64>,
}

#[derive(Serialize, ToSchema)]
struct ErrorResponse {
    error: String,
    code: String,
    details: String,
}

impl ErrorResponse {
    fn new(error: impl Into<String>, code: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: code.into(),
            details: details.into(),
        }
    }
}

fn error_response(
    status: StatusCode,
    error: impl Into<String>,
    code: impl Into<String>,
    details: impl Into<String>,
) -> Response {
    (status, Json(ErrorResponse::new(error, code, details))).into_response()
}

fn json_deserialize_error(err: JsonRejection) -> Response {
    error_response(
        StatusCode::UNPROCESSABLE_ENTITY,
        "Invalid JSON data",
        "invalid_json",
        err.to_string(),
    )
}

fn loading_error(err: LoadingError) -> Response {
    let error = match err {
        LoadingError::InvalidContainer { .. } => "Invalid container configuration",
        LoadingError::InvalidConfiguration(_) => "Invalid configuration",
        _ => "Invalid input data",
    };
    error_response(
        StatusCode::UNPROCESSABLE_ENTITY,
        error,
        err.code(),
        err.to_string(),
    )
}

fn parse_optimize_request(
    payload: Result<Json<OptimizeRequest>, JsonRejection>,
    base: LoadingConfig,
) -> Result<ValidatedOptimizeRequest, Response> {
    let Json(payload) = payload.map_err(json_deserialize_error)?;

    if payload.containers.is_empty() {
        return Err(error_response(
            StatusCode::UNPROCESSABLE_ENTITY,
            "Invalid input data",
            "missing_containers",
            "At least one container type must be specified",
        ));
    }

    let config = payload.effective_config(base);
    validate_input(&payload.items, &payload.containers, &config).map_err(loading_error)?;

    Ok(ValidatedOptimizeRequest {
        items: payload.items,
        containers: payload.containers,
        config,
    })
}

#[derive(OpenApi)]
#[openapi(
    paths(handle_chargeable_weight, handle_optimize, handle_optimize_stream, handle_utilization),
    components(
        schemas(
            ChargeableRequest,
            OptimizeRequest,
            OptimizeResponse,
            UtilizationRequest,
            ErrorResponse,
            Item,
            ItemInstance,
            Orientation,
            ContainerType,
            Placement,
            UnplacedItem,
            UnplacedReason,
            FitBlocker,
            Vec3,
            TransportMode,
            ChargeableWeight,
            ItemChargeable,
            ShipmentChargeable,
            PackedContainer,
            PackingResult,
            PackingWarning,
            SearchCap,
            PackEvent,
            UtilizationReport,
            ContainerUtilization,
            ConsolidationHint
        )
    ),
    tags((name = "loading", description = "Chargeable weight, load optimisation and utilization"))
)]
struct ApiDoc;

/// Builds the application router.
pub fn router(loading: LoadingConfig) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    Router::new()
        .route("/chargeable-weight", post(handle_chargeable_weight))
        .route("/optimize", post(handle_optimize))
        .route("/optimize_stream", post(handle_optimize_stream))
        .route("/utilization", post(handle_utilization))
        .route("/docs/openapi.json", get(serve_openapi_json))
        .route("/docs", get(serve_openapi_ui))
        .layer(cors)
        .with_state(ApiState { loading })
}

/// Starts the API server and serves until it terminates.
pub async fn start_api_server(config: ApiConfig, loading: LoadingConfig) -> std::io::Result<()> {
    let addr = config.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!(
        "Server running on http://{}:{}",
        config.display_host(),
        config.port()
    );
    if config.binds_to_all_interfaces() {
        info!("Local access: http://localhost:{}", config.port());
    }
    info!("API documentation at /docs");

    axum::serve(listener, router(loading)).await
}

/// Handler for POST /chargeable-weight.
#[utoipa::path(
    post,
    path = "/chargeable-weight",
    request_body = ChargeableRequest,
    responses(
        (status = 200, description = "Chargeable weight per item and for the shipment", body = ShipmentChargeable),
        (status = UNPROCESSABLE_ENTITY, description = "Invalid item data", body = ErrorResponse)
    ),
    tag = "loading"
)]
async fn handle_chargeable_weight(
    State(state): State<ApiState>,
    payload: Result<Json<ChargeableRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(err) => return json_deserialize_error(err),
    };

    let config = state.loading.chargeable;
    let mode = request.mode.unwrap_or(config.default_mode);
    match chargeable::compute_shipment(&request.items, mode, &config) {
        Ok(weights) => (StatusCode::OK, Json(weights)).into_response(),
        Err(err) => loading_error(err),
    }
}

/// Handler for POST /optimize.
///
/// Packs the items into containers from the supplied catalog and returns the
/// assignment together with its utilization report.
#[utoipa::path(
    post,
    path = "/optimize",
    request_body = OptimizeRequest,
    responses(
        (status = 200, description = "Items allocated to containers", body = OptimizeResponse),
        (
            status = UNPROCESSABLE_ENTITY,
            description = "Invalid request, item or container configuration",
            body = ErrorResponse
        )
    ),
    tag = "loading"
)]
async fn handle_optimize(
    State(state): State<ApiState>,
    payload: Result<Json<OptimizeRequest>, JsonRejection>,
) -> Response {
    let request = match parse_optimize_request(payload, state.loading) {
        Ok(request) => request,
        Err(response) => return response,
    };

    info!(
        items = request.items.len(),
        container_types = request.containers.len(),
        "optimize request"
    );

    let ValidatedOptimizeRequest {
        items,
        containers,
        config,
    } = request;
    let outcome = tokio::task::spawn_blocking(move || {
        let result = optimize_loading(&items, &containers, &config)?;
        let utilization = utilization::analyze(&result, &config.utilization)?;
        Ok::<_, LoadingError>((result, utilization))
    })
    .await;

    match outcome {
        Ok(Ok((result, utilization))) => {
            info!(
                containers = result.container_count(),
                unplaced = result.unplaced_count(),
                "optimize finished"
            );
            let response = OptimizeResponse {
                is_complete: result.is_complete(),
                result,
                utilization,
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Ok(Err(err)) => loading_error(err),
        Err(err) => error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Optimisation failed",
            "internal",
            err.to_string(),
        ),
    }
}

/// Sends one event to the SSE channel; breaks once the receiver is gone.
fn forward_event(tx: &mpsc::Sender<String>, evt: &PackEvent) -> ControlFlow<()> {
    let json = match serde_json::to_string(evt) {
        Ok(json) => json,
        Err(err) => {
            warn!(error = %err, "could not serialise pack event");
            return ControlFlow::Continue(());
        }
    };
    match tx.blocking_send(json) {
        Ok(()) => ControlFlow::Continue(()),
        Err(_) => ControlFlow::Break(()),
    }
}

/// Handler for POST /optimize_stream endpoint (SSE).
///
/// Streams [`PackEvent`]s as Server-Sent Events while the allocation runs.
#[utoipa::path(
    post,
    path = "/optimize_stream",
    request_body = OptimizeRequest,
    responses(
        (
            status = 200,
            description = "Streams pack events in real-time",
            content_type = "text/event-stream",
            body = PackEvent
        ),
        (
            status = UNPROCESSABLE_ENTITY,
            description = "Invalid request, item or container configuration",
            body = ErrorResponse
        )
    ),
    tag = "loading"
)]
async fn handle_optimize_stream(
    State(state): State<ApiState>,
    payload: Result<Json<OptimizeRequest>, JsonRejection>,
) -> Response {
    let ValidatedOptimizeRequest {
        items,
        containers,
        config,
    } = match parse_optimize_request(payload, state.loading) {
        Ok(request) => request,
        Err(response) => return response,
    };

    let (tx, rx) = mpsc::channel::<String>(32);

    tokio::task::spawn_blocking(move || {
        let outcome =
            optimize_loading_with_progress(&items, &containers, &config, |evt| forward_event(&tx, evt));
        match outcome {
            Ok(_) => {}
            Err(LoadingError::Cancelled) => debug!("stream client disconnected, optimisation stopped"),
            Err(err) => warn!(error = %err, "streamed optimisation failed after validation"),
        }
    });

    let stream = ReceiverStream::new(rx)
        .map(|msg| Ok::<_, std::convert::Infallible>(Event::default().data(msg)));
    Sse::new(stream)
        .keep_alive(
            KeepAlive::new()
                .interval(std::time::Duration::from_secs(10))
                .text("keep-alive"),
        )
        .into_response()
}

/// Handler for POST /utilization.
#[utoipa::path(
    post,
    path = "/utilization",
    request_body = UtilizationRequest,
    responses(
        (status = 200, description = "Utilization report of the given packing", body = UtilizationReport),
        (status = UNPROCESSABLE_ENTITY, description = "Invalid packing result or threshold", body = ErrorResponse)
    ),
    tag = "loading"
)]
async fn handle_utilization(
    State(state): State<ApiState>,
    payload: Result<Json<UtilizationRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(err) => return json_deserialize_error(err),
    };

    let mut config = state.loading.utilization;
    if let Some(threshold) = request.consolidation_threshold {
        config.consolidation_threshold = threshold;
    }
    match utilization::analyze(&request.result, &config) {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(err) => loading_error(err),
    }
}

async fn serve_openapi_json() -> impl IntoResponse {
    Json(openapi_doc())
}

async fn serve_openapi_ui() -> impl IntoResponse {
    Html(SWAGGER_UI_HTML)
}
