//! # API REST
//!
//! REST API implementation for CERA.
//!
//! Handles:
//! - HTTP endpoints with axum
//! - OpenAPI/Swagger documentation
//! - REST-specific concerns (JSON serialization, CORS, error → status
//!   mapping)
//!
//! The caller's identity arrives pre-resolved as `x-actor-*` headers (see
//! `api_shared::auth`); every handler resolves the actor first and passes it
//! into the core services. Uses `api-shared` for the request/response types.

#![warn(rust_2018_idioms)]

use axum::{
    extract::{Path as AxumPath, State},
    http::{HeaderMap, StatusCode},
    response::Json,
    routing::{get, put},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use api_shared::auth::{self, ActorHeaders};
use api_shared::{
    ApplicationRes, CreateApplicationReq, CreateApplicationRes, DecisionItemRes,
    GetApplicationRes, HealthService, ListApplicationsRes, ListDecisionsRes, ReviewRes,
    StatusHistoryEntryRes, TransitionReq, TransitionRes,
};
use api_shared::health::HealthRes;
use cera_core::{
    Actor, ApplicationError, ApplicationService, ApplicationUuid, NewApplication, NonEmptyText,
    Role, TransitionEvent,
};

/// Application state for the REST API server.
///
/// Contains shared state that needs to be accessible to all request
/// handlers, chiefly the `ApplicationService` instance owning the process's
/// lock registry.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<ApplicationService>,
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health,
        create_application,
        list_applications,
        list_review_queue,
        list_decision_queue,
        get_application,
        submit_application,
        delete_application,
        update_status,
    ),
    components(schemas(
        HealthRes,
        CreateApplicationReq,
        CreateApplicationRes,
        TransitionReq,
        TransitionRes,
        ApplicationRes,
        StatusHistoryEntryRes,
        ReviewRes,
        GetApplicationRes,
        ListApplicationsRes,
        DecisionItemRes,
        ListDecisionsRes,
    ))
)]
pub struct ApiDoc;

/// Build the REST router over the given state.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/applications", get(list_applications).post(create_application))
        .route("/applications/review", get(list_review_queue))
        .route("/applications/manage", get(list_decision_queue))
        .route(
            "/applications/:id",
            get(get_application).delete(delete_application),
        )
        .route("/applications/:id/submit", put(submit_application))
        .route("/applications/:id/status", put(update_status))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Resolve the acting user from the request headers.
fn actor_from_headers(headers: &HeaderMap) -> Result<Actor, (StatusCode, &'static str)> {
    let value = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());

    auth::resolve_actor(ActorHeaders {
        id: value(auth::ACTOR_ID_HEADER),
        name: value(auth::ACTOR_NAME_HEADER),
        email: value(auth::ACTOR_EMAIL_HEADER),
        role: value(auth::ACTOR_ROLE_HEADER),
    })
    .map_err(|e| {
        tracing::warn!("actor resolution failed: {e}");
        (StatusCode::UNAUTHORIZED, "Unauthorized")
    })
}

fn parse_application_id(id: &str) -> Result<ApplicationUuid, (StatusCode, &'static str)> {
    ApplicationUuid::parse(id).map_err(|e| {
        tracing::warn!("invalid application id: {e}");
        (StatusCode::BAD_REQUEST, "Invalid application id")
    })
}

/// Map a core error to its HTTP representation.
///
/// `InvalidTransition` and `CollisionDetected` are conflicts with current
/// state (the latter retryable); `Contention` asks the caller to retry
/// later; everything in the persistence family is an internal error.
fn error_response(error: &ApplicationError) -> (StatusCode, &'static str) {
    match error {
        ApplicationError::NotFound(_) => (StatusCode::NOT_FOUND, "Application not found"),
        ApplicationError::InvalidCategory(_)
        | ApplicationError::InvalidInvestigationType(_)
        | ApplicationError::InvalidEvent(_)
        | ApplicationError::InvalidInput(_) => (StatusCode::BAD_REQUEST, "Invalid request"),
        ApplicationError::InvalidTransition { .. } => (
            StatusCode::CONFLICT,
            "Cannot change status of application in its current state",
        ),
        ApplicationError::CollisionDetected { .. } => (
            StatusCode::CONFLICT,
            "Identifier collision detected, please retry",
        ),
        ApplicationError::Contention => (
            StatusCode::SERVICE_UNAVAILABLE,
            "Application is busy, please retry",
        ),
        _ => (StatusCode::INTERNAL_SERVER_ERROR, "Internal error"),
    }
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Health check endpoint for the REST API.
///
/// Used for monitoring and load balancer health checks.
#[axum::debug_handler]
async fn health(State(_state): State<AppState>) -> Json<HealthRes> {
    Json(HealthService::check_health())
}

#[utoipa::path(
    post,
    path = "/applications",
    request_body = CreateApplicationReq,
    responses(
        (status = 200, description = "Application created", body = CreateApplicationRes),
        (status = 400, description = "Bad request"),
        (status = 401, description = "Unauthorized"),
        (status = 409, description = "Identifier collision, retryable"),
        (status = 500, description = "Internal server error")
    )
)]
/// Create a new application owned by the caller.
///
/// Generates the codification and sequential number inside the creation
/// critical section and records the creation history entry.
#[axum::debug_handler]
async fn create_application(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<CreateApplicationReq>,
) -> Result<Json<CreateApplicationRes>, (StatusCode, &'static str)> {
    let actor = actor_from_headers(&headers)?;

    let project_title = NonEmptyText::new(&req.project_title)
        .map_err(|_| (StatusCode::BAD_REQUEST, "project_title is required"))?;
    let investigation_type = req.investigation_type.parse().map_err(|e| {
        tracing::warn!("create application rejected: {e}");
        error_response(&e)
    })?;
    let category_type = req.category_type.parse().map_err(|e| {
        tracing::warn!("create application rejected: {e}");
        error_response(&e)
    })?;

    let new_application = NewApplication {
        project_title,
        investigation_type,
        category_type,
        metadata: req.metadata,
    };

    match state.service.create_application(&actor, new_application) {
        Ok(created) => Ok(Json(created.into())),
        Err(e) => {
            tracing::error!("Create application error: {:?}", e);
            Err(error_response(&e))
        }
    }
}

#[utoipa::path(
    get,
    path = "/applications",
    responses(
        (status = 200, description = "The caller's applications", body = ListApplicationsRes),
        (status = 401, description = "Unauthorized")
    )
)]
/// List the caller's own applications, newest first.
///
/// Deleted applications are excluded from the listing.
#[axum::debug_handler]
async fn list_applications(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<ListApplicationsRes>, (StatusCode, &'static str)> {
    let actor = actor_from_headers(&headers)?;

    let applications = state
        .service
        .list_for_owner(actor.id.as_str())
        .into_iter()
        .map(Into::into)
        .collect();
    Ok(Json(ListApplicationsRes { applications }))
}

#[utoipa::path(
    get,
    path = "/applications/review",
    responses(
        (status = 200, description = "Applications awaiting first review", body = ListApplicationsRes),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    )
)]
/// List all applications under review. Reviewers only.
#[axum::debug_handler]
async fn list_review_queue(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<ListApplicationsRes>, (StatusCode, &'static str)> {
    let actor = actor_from_headers(&headers)?;
    if actor.role != Role::Reviewer {
        return Err((StatusCode::FORBIDDEN, "Forbidden"));
    }

    let applications = state
        .service
        .list_under_review()
        .into_iter()
        .map(Into::into)
        .collect();
    Ok(Json(ListApplicationsRes { applications }))
}

#[utoipa::path(
    get,
    path = "/applications/manage",
    responses(
        (status = 200, description = "Applications awaiting a final decision", body = ListDecisionsRes),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    )
)]
/// List all applications awaiting a final decision, each with its most
/// recent review. Managers only.
#[axum::debug_handler]
async fn list_decision_queue(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<ListDecisionsRes>, (StatusCode, &'static str)> {
    let actor = actor_from_headers(&headers)?;
    if actor.role != Role::Manager {
        return Err((StatusCode::FORBIDDEN, "Forbidden"));
    }

    let applications = state
        .service
        .list_for_decision()
        .into_iter()
        .map(|(application, review)| DecisionItemRes {
            application: application.into(),
            latest_review: review.map(Into::into),
        })
        .collect();
    Ok(Json(ListDecisionsRes { applications }))
}

#[utoipa::path(
    get,
    path = "/applications/{id}",
    params(("id" = String, Path, description = "Application id")),
    responses(
        (status = 200, description = "Application with history and reviews", body = GetApplicationRes),
        (status = 400, description = "Bad request"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Application not found"),
        (status = 500, description = "Internal server error")
    )
)]
/// Fetch one application with its full status history and reviews.
///
/// Visible to the owner and to committee roles; others receive 404.
#[axum::debug_handler]
async fn get_application(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
    headers: HeaderMap,
) -> Result<Json<GetApplicationRes>, (StatusCode, &'static str)> {
    let actor = actor_from_headers(&headers)?;
    let id = parse_application_id(&id)?;

    match state.service.get_application(&actor, &id) {
        Ok(dossier) => Ok(Json(dossier.into())),
        Err(e @ ApplicationError::NotFound(_)) => Err(error_response(&e)),
        Err(e) => {
            tracing::error!("Get application error: {:?}", e);
            Err(error_response(&e))
        }
    }
}

#[utoipa::path(
    put,
    path = "/applications/{id}/submit",
    params(("id" = String, Path, description = "Application id")),
    responses(
        (status = 200, description = "Application submitted", body = TransitionRes),
        (status = 400, description = "Bad request"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Application not found"),
        (status = 409, description = "Not submittable in its current state"),
        (status = 500, description = "Internal server error")
    )
)]
/// Submit a draft (or not-completed) application for review. Owner only.
#[axum::debug_handler]
async fn submit_application(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
    headers: HeaderMap,
) -> Result<Json<TransitionRes>, (StatusCode, &'static str)> {
    let actor = actor_from_headers(&headers)?;
    let id = parse_application_id(&id)?;

    match state
        .service
        .apply_transition(&id, TransitionEvent::Submit, &actor, None)
    {
        Ok(new_status) => Ok(Json(TransitionRes {
            new_status: new_status.as_str().to_string(),
        })),
        Err(e) => {
            tracing::error!("Submit application error: {:?}", e);
            Err(error_response(&e))
        }
    }
}

#[utoipa::path(
    delete,
    path = "/applications/{id}",
    params(("id" = String, Path, description = "Application id")),
    responses(
        (status = 200, description = "Application deleted", body = TransitionRes),
        (status = 400, description = "Bad request"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Application not found"),
        (status = 409, description = "Not deletable in its current state"),
        (status = 500, description = "Internal server error")
    )
)]
/// Soft-delete a draft (or not-completed) application. Owner only.
///
/// The record is never physically removed; `DELETED` is a terminal status
/// and the history remains queryable.
#[axum::debug_handler]
async fn delete_application(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
    headers: HeaderMap,
) -> Result<Json<TransitionRes>, (StatusCode, &'static str)> {
    let actor = actor_from_headers(&headers)?;
    let id = parse_application_id(&id)?;

    match state
        .service
        .apply_transition(&id, TransitionEvent::Delete, &actor, None)
    {
        Ok(new_status) => Ok(Json(TransitionRes {
            new_status: new_status.as_str().to_string(),
        })),
        Err(e) => {
            tracing::error!("Delete application error: {:?}", e);
            Err(error_response(&e))
        }
    }
}

#[utoipa::path(
    put,
    path = "/applications/{id}/status",
    params(("id" = String, Path, description = "Application id")),
    request_body = TransitionReq,
    responses(
        (status = 200, description = "Status updated", body = TransitionRes),
        (status = 400, description = "Bad request"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Application not found"),
        (status = 409, description = "Event not valid from the current state"),
        (status = 500, description = "Internal server error")
    )
)]
/// Apply a committee transition (review or final decision) to an
/// application.
///
/// Owner events (`submit`, `delete`) use their dedicated routes and are
/// rejected here.
#[axum::debug_handler]
async fn update_status(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
    headers: HeaderMap,
    Json(req): Json<TransitionReq>,
) -> Result<Json<TransitionRes>, (StatusCode, &'static str)> {
    let actor = actor_from_headers(&headers)?;
    let id = parse_application_id(&id)?;

    let event: TransitionEvent = req.event.parse().map_err(|e| {
        tracing::warn!("status update rejected: {e}");
        (StatusCode::BAD_REQUEST, "Invalid event")
    })?;
    if matches!(event, TransitionEvent::Submit | TransitionEvent::Delete) {
        return Err((
            StatusCode::BAD_REQUEST,
            "Owner events use their dedicated routes",
        ));
    }

    match state
        .service
        .apply_transition(&id, event, &actor, req.comment)
    {
        Ok(new_status) => Ok(Json(TransitionRes {
            new_status: new_status.as_str().to_string(),
        })),
        Err(e) => {
            tracing::error!("Update status error: {:?}", e);
            Err(error_response(&e))
        }
    }
}
