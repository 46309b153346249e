use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;
use tracing::error;

use super::domain::{ManualFactorSubmission, OrganizationId, WorkerId};
use super::orchestrator::AssessmentError;
use super::repository::{
    ClassificationStore, RepositoryError, RiskAlertPublisher, WorkforceDirectory,
};
use super::service::{ClassificationService, ClassificationServiceError};

type SharedService<S, D, A> = Arc<ClassificationService<S, D, A>>;

#[derive(Debug, Deserialize)]
pub(crate) struct RunAssessmentRequest {
    pub(crate) organization_id: String,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct HistoryQuery {
    #[serde(default)]
    pub(crate) limit: Option<usize>,
}

/// Router builder exposing assessment, factor, dashboard, and batch endpoints.
pub fn classification_router<S, D, A>(service: SharedService<S, D, A>) -> Router
where
    S: ClassificationStore + 'static,
    D: WorkforceDirectory + 'static,
    A: RiskAlertPublisher + 'static,
{
    Router::new()
        .route(
            "/api/v1/workers/:worker_id/assessments",
            post(run_assessment_handler::<S, D, A>).get(history_handler::<S, D, A>),
        )
        .route(
            "/api/v1/workers/:worker_id/assessments/latest",
            get(latest_handler::<S, D, A>),
        )
        .route(
            "/api/v1/workers/:worker_id/factors",
            post(submit_factor_handler::<S, D, A>),
        )
        .route(
            "/api/v1/organizations/:organization_id/dashboard",
            get(dashboard_handler::<S, D, A>),
        )
        .route(
            "/api/v1/reassessments",
            post(reassessment_handler::<S, D, A>),
        )
        .with_state(service)
}

pub(crate) async fn run_assessment_handler<S, D, A>(
    State(service): State<SharedService<S, D, A>>,
    Path(worker_id): Path<String>,
    axum::Json(request): axum::Json<RunAssessmentRequest>,
) -> Response
where
    S: ClassificationStore + 'static,
    D: WorkforceDirectory + 'static,
    A: RiskAlertPublisher + 'static,
{
    let worker_id = WorkerId(worker_id);
    let organization_id = OrganizationId(request.organization_id);
    match service.run_assessment(&worker_id, &organization_id) {
        Ok(assessment) => (StatusCode::CREATED, axum::Json(assessment)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn latest_handler<S, D, A>(
    State(service): State<SharedService<S, D, A>>,
    Path(worker_id): Path<String>,
) -> Response
where
    S: ClassificationStore + 'static,
    D: WorkforceDirectory + 'static,
    A: RiskAlertPublisher + 'static,
{
    let worker_id = WorkerId(worker_id);
    match service.latest_assessment(&worker_id) {
        Ok(assessment) => (StatusCode::OK, axum::Json(assessment)).into_response(),
        Err(ClassificationServiceError::Repository(RepositoryError::NotFound)) => {
            let payload = json!({
                "worker_id": worker_id.0,
                "error": "no classification assessment has been recorded for this worker",
            });
            (StatusCode::NOT_FOUND, axum::Json(payload)).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn history_handler<S, D, A>(
    State(service): State<SharedService<S, D, A>>,
    Path(worker_id): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Response
where
    S: ClassificationStore + 'static,
    D: WorkforceDirectory + 'static,
    A: RiskAlertPublisher + 'static,
{
    match service.assessment_history(&WorkerId(worker_id), query.limit) {
        Ok(history) => (StatusCode::OK, axum::Json(history)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn submit_factor_handler<S, D, A>(
    State(service): State<SharedService<S, D, A>>,
    Path(worker_id): Path<String>,
    axum::Json(submission): axum::Json<ManualFactorSubmission>,
) -> Response
where
    S: ClassificationStore + 'static,
    D: WorkforceDirectory + 'static,
    A: RiskAlertPublisher + 'static,
{
    match service.submit_manual_factor(&WorkerId(worker_id), submission) {
        Ok(factor) => (StatusCode::CREATED, axum::Json(factor)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn dashboard_handler<S, D, A>(
    State(service): State<SharedService<S, D, A>>,
    Path(organization_id): Path<String>,
) -> Response
where
    S: ClassificationStore + 'static,
    D: WorkforceDirectory + 'static,
    A: RiskAlertPublisher + 'static,
{
    match service.dashboard_summary(&OrganizationId(organization_id)) {
        Ok(summary) => (StatusCode::OK, axum::Json(summary)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn reassessment_handler<S, D, A>(
    State(service): State<SharedService<S, D, A>>,
) -> Response
where
    S: ClassificationStore + 'static,
    D: WorkforceDirectory + 'static,
    A: RiskAlertPublisher + 'static,
{
    let outcome = tokio::task::spawn_blocking(move || service.run_reassessment_batch()).await;
    match outcome {
        Ok(Ok(report)) => (StatusCode::ACCEPTED, axum::Json(report)).into_response(),
        Ok(Err(err)) => error_response(err),
        Err(join_error) => {
            error!(error = %join_error, "reassessment batch task aborted");
            let payload = json!({ "error": "reassessment batch aborted" });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
    }
}

fn error_response(err: ClassificationServiceError) -> Response {
    let status = match &err {
        ClassificationServiceError::InvalidFactor(_) => StatusCode::UNPROCESSABLE_ENTITY,
        ClassificationServiceError::Repository(RepositoryError::NotFound)
        | ClassificationServiceError::Assessment(AssessmentError::ComputedFactors {
            source: RepositoryError::NotFound,
            ..
        }) => StatusCode::NOT_FOUND,
        ClassificationServiceError::Repository(RepositoryError::Conflict) => StatusCode::CONFLICT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };

    if status == StatusCode::INTERNAL_SERVER_ERROR {
        error!(error = %err, "classification request failed");
    }

    let payload = json!({
        "error": err.to_string(),
    });
    (status, axum::Json(payload)).into_response()
}
