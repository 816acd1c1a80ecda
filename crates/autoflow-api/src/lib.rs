//! # AutoFlow HTTP Service
//!
//! HTTP server for the AutoFlow deployment orchestration backend.
//!
//! This service provides:
//! - Push-event intake with HMAC signature validation
//! - Status-callback intake for external CI runs reporting outcomes
//! - Manual deploy dispatch for a project by ID
//! - Health, readiness, and Prometheus metrics endpoints
//!
//! Each inbound request is handled independently; all state lives behind the
//! storage collaborators inside [`WebhookIntake`].

// Public modules
pub mod metrics;




use autoflow_core::{
    Deployment, DeploymentId, DeploymentStatus, IntakeError, ProjectId, StatusReport,
    WebhookIntake,
};
use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    middleware,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info, instrument, warn};

pub use metrics::ServiceMetrics;

/// Header carrying the event-type tag.
pub const EVENT_TYPE_HEADER: &str = "x-github-event";

/// Header carrying the `sha256=<hex>` HMAC signature.
pub const SIGNATURE_HEADER: &str = "x-hub-signature-256";

// ============================================================================
// Application State
// ============================================================================

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Configuration for the service
    pub config: ServiceConfig,

    /// Composed intake pipeline handling all deployment-driving requests
    pub intake: Arc<WebhookIntake>,

    /// Metrics collector for observability
    pub metrics: Arc<ServiceMetrics>,
}

impl AppState {
    /// Create new application state
    pub fn new(
        config: ServiceConfig,
        intake: Arc<WebhookIntake>,
        metrics: Arc<ServiceMetrics>,
    ) -> Self {
        Self {
            config,
            intake,
            metrics,
        }
    }
}

// ============================================================================
// Configuration
// ============================================================================

/// Service configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// HTTP server settings
    pub server: ServerConfig,

    /// Webhook intake settings
    pub webhooks: WebhookConfig,

    /// Outbound deploy-trigger settings
    pub triggers: TriggerConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Graceful shutdown timeout in seconds
    pub shutdown_timeout_seconds: u64,

    /// Enable CORS
    pub enable_cors: bool,

    /// Enable compression
    pub enable_compression: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            shutdown_timeout_seconds: 30,
            enable_cors: true,
            enable_compression: true,
        }
    }
}

/// Webhook intake configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WebhookConfig {
    /// Shared secret for push-event signature verification.
    ///
    /// Leaving this unset blocks the entire push intake path: every request
    /// fails with a 500-class misconfiguration error rather than being
    /// accepted unsigned.
    pub secret: Option<String>,
}

/// Outbound deploy-trigger configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TriggerConfig {
    /// Vercel-style deploy hook URL for projects on the Vercel path
    pub vercel_deploy_hook_url: Option<String>,

    /// Base URL of the workflow-dispatch API
    pub github_api_url: String,

    /// Bearer token for workflow-dispatch calls
    pub github_token: Option<String>,

    /// Workflow file invoked by workflow-dispatch
    pub workflow_file: String,

    /// Public URL external CI runs call back with deployment status
    pub callback_url: Option<String>,

    /// Upper bound on a single trigger call, in seconds
    pub timeout_seconds: u64,
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            vercel_deploy_hook_url: None,
            github_api_url: "https://api.github.com".to_string(),
            github_token: None,
            workflow_file: "autoflow-deploy.yml".to_string(),
            callback_url: None,
            timeout_seconds: 30,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Logging level
    pub level: String,

    /// Enable JSON structured logging
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

// ============================================================================
// HTTP Server
// ============================================================================

/// Create HTTP router with all endpoints
pub fn create_router(state: AppState) -> Router {
    let webhook_routes = Router::new()
        .route("/api/webhooks/push", post(handle_push_webhook))
        .route("/api/webhooks/deployment", post(handle_status_callback));

    let deploy_routes = Router::new().route("/api/projects/{id}/deploy", post(handle_manual_deploy));

    let health_routes = Router::new()
        .route("/health", get(handle_health_check))
        .route("/ready", get(handle_readiness_check));

    let observability_routes = Router::new().route("/metrics", get(metrics_endpoint));

    Router::new()
        .merge(webhook_routes)
        .merge(deploy_routes)
        .merge(health_routes)
        .merge(observability_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(CorsLayer::permissive())
                .layer(middleware::from_fn(request_logging_middleware))
                .layer(middleware::from_fn_with_state(
                    state.clone(),
                    metrics_middleware,
                ))
                .into_inner(),
        )
        .with_state(state)
}

/// Start HTTP server with graceful shutdown
pub async fn start_server(state: AppState) -> Result<(), ServiceError> {
    let shutdown_timeout =
        std::time::Duration::from_secs(state.config.server.shutdown_timeout_seconds);
    let address = format!(
        "{}:{}",
        state.config.server.host, state.config.server.port
    );

    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .map_err(|e| ServiceError::BindFailed {
            address: address.clone(),
            message: e.to_string(),
        })?;

    info!("Starting HTTP server on {}", address);

    let shutdown_signal = async move {
        let ctrl_c = async {
            tokio::signal::ctrl_c()
                .await
                .expect("Failed to install Ctrl+C signal handler");
        };

        #[cfg(unix)]
        let terminate = async {
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("Failed to install SIGTERM signal handler")
                .recv()
                .await;
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {
                info!("Received SIGINT (Ctrl+C), initiating graceful shutdown with {}s timeout", shutdown_timeout.as_secs());
            },
            _ = terminate => {
                info!("Received SIGTERM, initiating graceful shutdown with {}s timeout", shutdown_timeout.as_secs());
            },
        }
    };

    // axum's graceful shutdown stops accepting new connections immediately and
    // lets in-flight requests drain before returning.
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await
        .map_err(|e| ServiceError::ServerFailed {
            message: e.to_string(),
        })?;

    info!("HTTP server shutdown complete");
    Ok(())
}

// ============================================================================
// Webhook Handlers
// ============================================================================

/// Handle push-event intake.
///
/// Pipeline: verify signature over the exact received bytes -> normalize the
/// payload -> resolve the project -> dispatch the deployment. Any stage
/// failure short-circuits with its stage-specific status code and no further
/// writes occur. A trigger failure after dispatch does NOT fail this request;
/// the created deployment carries the failure state instead.
#[instrument(skip(state, headers, body))]
pub async fn handle_push_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<PushIntakeResponse>), ApiError> {
    state.metrics.webhooks_received_total.inc();

    match push_webhook_inner(&state, &headers, &body).await {
        Ok(deployment) => {
            state.metrics.deployments_dispatched_total.inc();
            if deployment.status == DeploymentStatus::Failed {
                state.metrics.trigger_failures_total.inc();
            }

            info!(
                deployment_id = %deployment.id,
                status = %deployment.status,
                "Push event dispatched"
            );

            Ok((
                StatusCode::CREATED,
                Json(PushIntakeResponse {
                    message: "Deployment started".to_string(),
                    deployment_id: deployment.id,
                }),
            ))
        }
        Err(error) => {
            state
                .metrics
                .webhooks_rejected_total
                .with_label_values(&[error.category()])
                .inc();
            Err(error.into())
        }
    }
}

async fn push_webhook_inner(
    state: &AppState,
    headers: &HeaderMap,
    body: &Bytes,
) -> Result<Deployment, IntakeError> {
    let event_type = header_value(headers, EVENT_TYPE_HEADER)
        .ok_or_else(|| IntakeError::malformed("missing X-GitHub-Event header"))?;
    let signature = header_value(headers, SIGNATURE_HEADER);

    state.intake.handle_push(event_type, signature, body).await
}

/// Handle status-callback intake from an external CI run.
///
/// Body: `{deployment_id, status, logs?, deployment_url?}`. A missing
/// `deployment_id` is a 400; an unknown one is a 404 with no writes.
#[instrument(skip(state, body))]
pub async fn handle_status_callback(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<CallbackResponse>, ApiError> {
    state.metrics.status_callbacks_total.inc();

    let request: StatusCallbackRequest = serde_json::from_slice(&body)
        .map_err(|e| IntakeError::malformed(format!("invalid JSON body: {e}")))?;
    let report = request.into_report()?;

    let deployment = state.intake.record_status(report).await?;

    info!(
        deployment_id = %deployment.id,
        status = %deployment.status,
        "Status callback recorded"
    );

    Ok(Json(CallbackResponse {
        message: "Webhook processed successfully".to_string(),
    }))
}

/// Handle a manual deploy request for a project by ID.
///
/// Runs the same dispatch sequence as push intake, with placeholder commit
/// metadata when the body names none.
#[instrument(skip(state, body))]
pub async fn handle_manual_deploy(
    State(state): State<AppState>,
    Path(project_id): Path<i64>,
    body: Bytes,
) -> Result<(StatusCode, Json<Deployment>), ApiError> {
    let request: ManualDeployRequest = if body.is_empty() {
        ManualDeployRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| IntakeError::malformed(format!("invalid JSON body: {e}")))?
    };

    let deployment = state
        .intake
        .deploy_project(
            ProjectId::new(project_id),
            request.commit_hash,
            request.commit_message,
        )
        .await?;

    state.metrics.deployments_dispatched_total.inc();
    if deployment.status == DeploymentStatus::Failed {
        state.metrics.trigger_failures_total.inc();
    }

    info!(
        deployment_id = %deployment.id,
        project_id = %project_id,
        "Manual deploy dispatched"
    );

    Ok((StatusCode::CREATED, Json(deployment)))
}

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

// ============================================================================
// Health Check Handlers
// ============================================================================

/// Basic health check endpoint
async fn handle_health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Readiness check endpoint
async fn handle_readiness_check() -> Json<ReadinessResponse> {
    Json(ReadinessResponse { ready: true })
}

// ============================================================================
// Observability Handlers
// ============================================================================

/// Prometheus metrics endpoint
#[instrument(skip_all)]
async fn metrics_endpoint(State(state): State<AppState>) -> Result<String, ApiError> {
    state.metrics.encode().map_err(|e| ApiError::Internal {
        message: format!("failed to encode metrics: {e}"),
    })
}

// ============================================================================
// Middleware
// ============================================================================

/// Request logging middleware with correlation ID tracking.
///
/// Extracts or generates a correlation ID, logs request start and completion
/// with structured fields, and propagates the ID through response headers.
#[instrument(skip(request, next), fields(
    method = %request.method(),
    uri = %request.uri(),
    correlation_id
))]
async fn request_logging_middleware(
    mut request: axum::extract::Request,
    next: axum::middleware::Next,
) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = std::time::Instant::now();

    let correlation_id = request
        .headers()
        .get("x-correlation-id")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    tracing::Span::current().record("correlation_id", correlation_id.as_str());
    request.extensions_mut().insert(correlation_id.clone());

    let mut response = next.run(request).await;
    let duration = start.elapsed();

    if let Ok(header_value) = correlation_id.parse() {
        response
            .headers_mut()
            .insert("x-correlation-id", header_value);
    }

    let status = response.status();

    if status.is_server_error() {
        error!(
            correlation_id = %correlation_id,
            method = %method,
            uri = %uri,
            status = %status,
            duration_ms = %duration.as_millis(),
            "Request completed with server error"
        );
    } else if status.is_client_error() {
        warn!(
            correlation_id = %correlation_id,
            method = %method,
            uri = %uri,
            status = %status,
            duration_ms = %duration.as_millis(),
            "Request completed with client error"
        );
    } else {
        info!(
            correlation_id = %correlation_id,
            method = %method,
            uri = %uri,
            status = %status,
            duration_ms = %duration.as_millis(),
            "Request completed successfully"
        );
    }

    response
}

/// Records the request duration histogram for every response.
async fn metrics_middleware(
    State(state): State<AppState>,
    request: axum::extract::Request,
    next: axum::middleware::Next,
) -> Response {
    let start = std::time::Instant::now();
    let response = next.run(request).await;
    state
        .metrics
        .http_request_duration
        .observe(start.elapsed().as_secs_f64());
    response
}

// ============================================================================
// Request Types
// ============================================================================

/// Status callback body from an external CI run.
#[derive(Debug, Deserialize)]
pub struct StatusCallbackRequest {
    #[serde(default)]
    pub deployment_id: Option<IdField>,
    pub status: String,
    #[serde(default)]
    pub logs: Option<String>,
    #[serde(default)]
    pub deployment_url: Option<String>,
}

/// CI runners interpolate the deployment ID into shell commands, so it may
/// arrive as a JSON number or a quoted string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum IdField {
    Number(i64),
    Text(String),
}

impl StatusCallbackRequest {
    /// Validate the loosely-typed body into a strict [`StatusReport`].
    fn into_report(self) -> Result<StatusReport, IntakeError> {
        let deployment_id = match self.deployment_id {
            Some(IdField::Number(id)) => DeploymentId::new(id),
            Some(IdField::Text(text)) => text
                .parse::<DeploymentId>()
                .map_err(|_| IntakeError::malformed("deployment_id must be an integer"))?,
            None => return Err(IntakeError::malformed("deployment_id is required")),
        };

        let status = self
            .status
            .parse::<DeploymentStatus>()
            .map_err(|_| {
                IntakeError::malformed(format!("unknown deployment status '{}'", self.status))
            })?;

        Ok(StatusReport {
            deployment_id,
            status,
            logs: self.logs,
            deployment_url: self.deployment_url,
        })
    }
}

/// Manual deploy body; both fields fall back to placeholders.
#[derive(Debug, Default, Deserialize)]
pub struct ManualDeployRequest {
    #[serde(default)]
    pub commit_hash: Option<String>,
    #[serde(default)]
    pub commit_message: Option<String>,
}

// ============================================================================
// Response Types
// ============================================================================

/// Push-event intake response
#[derive(Debug, Serialize)]
pub struct PushIntakeResponse {
    pub message: String,
    pub deployment_id: DeploymentId,
}

/// Status-callback response
#[derive(Debug, Serialize)]
pub struct CallbackResponse {
    pub message: String,
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Readiness check response
#[derive(Debug, Serialize)]
pub struct ReadinessResponse {
    pub ready: bool,
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub message: String,
}

// ============================================================================
// Error Types
// ============================================================================

/// Server startup errors
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("failed to bind {address}: {message}")]
    BindFailed { address: String, message: String },

    #[error("server failed: {message}")]
    ServerFailed { message: String },
}

/// Handler errors with HTTP status code mapping.
///
/// The intake taxonomy maps to REST status codes:
///
/// - `Unauthenticated` -> 401 (signature mismatch)
/// - `Malformed` -> 400 (missing/invalid fields, unsupported event)
/// - `NotFound` -> 404 (no matching project or deployment)
/// - `Misconfigured` -> 500, logged at high severity since it blocks the
///   entire intake path
/// - `Upstream` -> 502; in practice trigger failures are absorbed by the
///   dispatcher's compensating writes and never reach this mapping
/// - `Unexpected` -> 500 with a generic message; details stay server-side
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Intake(#[from] IntakeError),

    #[error("internal server error: {message}")]
    Internal { message: String },
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::Intake(intake_error) => match intake_error {
                IntakeError::Unauthenticated => {
                    (StatusCode::UNAUTHORIZED, intake_error.to_string())
                }
                IntakeError::Malformed { .. } => (StatusCode::BAD_REQUEST, intake_error.to_string()),
                IntakeError::NotFound { .. } => (StatusCode::NOT_FOUND, intake_error.to_string()),
                IntakeError::Misconfigured { .. } => {
                    error!(error = %intake_error, "Intake blocked by server misconfiguration");
                    (StatusCode::INTERNAL_SERVER_ERROR, intake_error.to_string())
                }
                IntakeError::Upstream(_) => {
                    warn!(error = %intake_error, "Upstream trigger failure surfaced to client");
                    (StatusCode::BAD_GATEWAY, intake_error.to_string())
                }
                IntakeError::Unexpected { message } => {
                    error!(error = %message, "Unexpected intake failure");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "Internal server error".to_string(),
                    )
                }
            },
            Self::Internal { message } => {
                error!(error = %message, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        (status, Json(ErrorResponse { message })).into_response()
    }
}
