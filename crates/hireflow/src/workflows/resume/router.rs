use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::domain::{
    DepartmentId, NewResume, NotificationId, PersonId, ResumeId, ResumeRecord, ResumeStatus,
};
use super::monitor::{SlaMonitor, SweepError};
use super::report::Page;
use super::repository::{Directory, NotificationSink, ResumeFilter, ResumeRepository};
use super::service::{available_actions, ResumeWorkflowService, WorkflowError};
use super::state_machine::WorkflowAction;

/// Header carrying the acting person's id.
pub const OPERATOR_HEADER: &str = "x-operator-id";

const DEFAULT_INBOX_LIMIT: usize = 50;
const MAX_INBOX_LIMIT: usize = 100;

/// Shared state behind the résumé endpoints.
pub struct ResumeApi<R, D, N> {
    pub service: Arc<ResumeWorkflowService<R, D, N>>,
    pub monitor: Arc<SlaMonitor<R, D, N>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResumeView {
    #[serde(flatten)]
    pub record: ResumeRecord,
    pub status_label: &'static str,
    pub available_actions: Vec<WorkflowAction>,
}

impl From<ResumeRecord> for ResumeView {
    fn from(record: ResumeRecord) -> Self {
        Self {
            status_label: record.status.label(),
            available_actions: available_actions(&record),
            record,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct DistributeL2Request {
    pub l2_department_id: DepartmentId,
}

#[derive(Debug, Deserialize)]
pub struct DistributeL3Request {
    pub l3_department_id: DepartmentId,
}

#[derive(Debug, Deserialize)]
pub struct AssignExpertRequest {
    pub expert_id: PersonId,
}

#[derive(Debug, Deserialize)]
pub struct IdentificationRequest {
    pub identified: bool,
    #[serde(default)]
    pub comment: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ContactInfoRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct FeedbackRequest {
    pub feedback: String,
    #[serde(default = "archive_by_default")]
    pub archive: bool,
}

fn archive_by_default() -> bool {
    true
}

#[derive(Debug, Default, Deserialize)]
pub struct ReleaseRequest {
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct OverdueReasonRequest {
    pub reason: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub status: Option<ResumeStatus>,
    pub l2_department: Option<DepartmentId>,
    pub l3_department: Option<DepartmentId>,
    pub expert: Option<PersonId>,
    pub source: Option<String>,
    pub is_overdue: Option<bool>,
    pub page: Option<usize>,
    pub page_size: Option<usize>,
}

impl From<ListQuery> for ResumeFilter {
    fn from(query: ListQuery) -> Self {
        Self {
            statuses: query.status.map(|status| vec![status]),
            l2_department: query.l2_department,
            l3_department: query.l3_department,
            expert: query.expert,
            source: query.source,
            is_overdue: query.is_overdue,
            deadline: None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct InboxQuery {
    #[serde(default)]
    pub unread_only: bool,
    pub limit: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SweepQuery {
    pub lookahead_hours: Option<i64>,
}

/// Router builder exposing the résumé workflow, inbox, and SLA endpoints.
pub fn resume_router<R, D, N>(api: Arc<ResumeApi<R, D, N>>) -> Router
where
    R: ResumeRepository + 'static,
    D: Directory + 'static,
    N: NotificationSink + 'static,
{
    Router::new()
        .route(
            "/api/v1/resumes",
            post(upload_handler::<R, D, N>).get(list_handler::<R, D, N>),
        )
        .route("/api/v1/resumes/stats", get(stats_handler::<R, D, N>))
        .route("/api/v1/resumes/overdue", get(overdue_handler::<R, D, N>))
        .route("/api/v1/resumes/dwell", get(dwell_handler::<R, D, N>))
        .route("/api/v1/resumes/:resume_id", get(detail_handler::<R, D, N>))
        .route(
            "/api/v1/resumes/:resume_id/audit",
            get(audit_handler::<R, D, N>),
        )
        .route(
            "/api/v1/resumes/:resume_id/actions",
            get(actions_handler::<R, D, N>),
        )
        .route(
            "/api/v1/resumes/:resume_id/submit-l2",
            post(submit_l2_handler::<R, D, N>),
        )
        .route(
            "/api/v1/resumes/:resume_id/route-l3",
            post(route_l3_handler::<R, D, N>),
        )
        .route(
            "/api/v1/resumes/:resume_id/assign-expert",
            post(assign_expert_handler::<R, D, N>),
        )
        .route(
            "/api/v1/resumes/:resume_id/identification",
            post(identification_handler::<R, D, N>),
        )
        .route(
            "/api/v1/resumes/:resume_id/contact-info",
            post(contact_info_handler::<R, D, N>),
        )
        .route(
            "/api/v1/resumes/:resume_id/connection",
            post(connection_handler::<R, D, N>),
        )
        .route(
            "/api/v1/resumes/:resume_id/feedback",
            post(feedback_handler::<R, D, N>),
        )
        .route(
            "/api/v1/resumes/:resume_id/release",
            post(release_handler::<R, D, N>),
        )
        .route(
            "/api/v1/resumes/:resume_id/overdue-reason",
            post(overdue_reason_handler::<R, D, N>),
        )
        .route("/api/v1/worklist", get(worklist_handler::<R, D, N>))
        .route("/api/v1/notifications", get(inbox_handler::<R, D, N>))
        .route(
            "/api/v1/notifications/count",
            get(inbox_count_handler::<R, D, N>),
        )
        .route(
            "/api/v1/notifications/read-all",
            post(mark_all_read_handler::<R, D, N>),
        )
        .route(
            "/api/v1/notifications/:notification_id/read",
            post(mark_read_handler::<R, D, N>),
        )
        .route(
            "/api/v1/notifications/:notification_id",
            delete(delete_notification_handler::<R, D, N>),
        )
        .route("/api/v1/sla/sweep", post(sweep_handler::<R, D, N>))
        .with_state(api)
}

pub(crate) fn sweep_error_response(error: SweepError) -> Response {
    match error {
        SweepError::AlreadyRunning => {
            let payload = json!({
                "error": error.to_string(),
                "kind": "sweep_in_progress",
            });
            (StatusCode::CONFLICT, Json(payload)).into_response()
        }
        SweepError::Store(error) => workflow_error_response(WorkflowError::Store(error)),
    }
}

pub(crate) fn workflow_error_response(error: WorkflowError) -> Response {
    let status = match &error {
        WorkflowError::InvalidTransition { .. } | WorkflowError::Conflict => StatusCode::CONFLICT,
        WorkflowError::Forbidden { .. } => StatusCode::FORBIDDEN,
        WorkflowError::ValidationFailed(_) => StatusCode::UNPROCESSABLE_ENTITY,
        WorkflowError::PreconditionFailed { .. } => StatusCode::PRECONDITION_FAILED,
        WorkflowError::NotFound { .. } => StatusCode::NOT_FOUND,
        WorkflowError::Store(_) => match error.kind() {
            "not_found" => StatusCode::NOT_FOUND,
            "conflict" => StatusCode::CONFLICT,
            _ => StatusCode::SERVICE_UNAVAILABLE,
        },
    };

    let mut payload = json!({
        "error": error.to_string(),
        "kind": error.kind(),
    });
    if let Some(current) = error.current_status() {
        payload["current_status"] = json!(current);
    }
    (status, Json(payload)).into_response()
}

fn operator(headers: &HeaderMap) -> Result<PersonId, Response> {
    headers
        .get(OPERATOR_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(|value| PersonId(value.to_string()))
        .ok_or_else(|| {
            let payload = json!({
                "error": format!("missing {OPERATOR_HEADER} header"),
                "kind": "unauthenticated",
            });
            (StatusCode::UNAUTHORIZED, Json(payload)).into_response()
        })
}

fn respond<T: Serialize>(result: Result<T, WorkflowError>) -> Response {
    match result {
        Ok(body) => (StatusCode::OK, Json(body)).into_response(),
        Err(error) => workflow_error_response(error),
    }
}

fn respond_record(result: Result<ResumeRecord, WorkflowError>) -> Response {
    respond(result.map(ResumeView::from))
}

macro_rules! operator_or_reject {
    ($headers:expr) => {
        match operator(&$headers) {
            Ok(operator) => operator,
            Err(response) => return response,
        }
    };
}

pub(crate) async fn upload_handler<R, D, N>(
    State(api): State<Arc<ResumeApi<R, D, N>>>,
    headers: HeaderMap,
    Json(intake): Json<NewResume>,
) -> Response
where
    R: ResumeRepository + 'static,
    D: Directory + 'static,
    N: NotificationSink + 'static,
{
    let uploader = operator_or_reject!(headers);
    match api.service.upload(intake, &uploader) {
        Ok(record) => (StatusCode::CREATED, Json(ResumeView::from(record))).into_response(),
        Err(error) => workflow_error_response(error),
    }
}

pub(crate) async fn list_handler<R, D, N>(
    State(api): State<Arc<ResumeApi<R, D, N>>>,
    Query(query): Query<ListQuery>,
) -> Response
where
    R: ResumeRepository + 'static,
    D: Directory + 'static,
    N: NotificationSink + 'static,
{
    let page = query.page.unwrap_or(1);
    let page_size = query.page_size.unwrap_or(Page::<ResumeView>::DEFAULT_SIZE);
    let filter = ResumeFilter::from(query);
    respond(
        api.service
            .list_page(&filter, page, page_size)
            .map(|page| page.map(ResumeView::from)),
    )
}

pub(crate) async fn stats_handler<R, D, N>(State(api): State<Arc<ResumeApi<R, D, N>>>) -> Response
where
    R: ResumeRepository + 'static,
    D: Directory + 'static,
    N: NotificationSink + 'static,
{
    respond(api.service.stats())
}

pub(crate) async fn overdue_handler<R, D, N>(
    State(api): State<Arc<ResumeApi<R, D, N>>>,
) -> Response
where
    R: ResumeRepository + 'static,
    D: Directory + 'static,
    N: NotificationSink + 'static,
{
    respond(api.service.overdue_summary())
}

pub(crate) async fn dwell_handler<R, D, N>(State(api): State<Arc<ResumeApi<R, D, N>>>) -> Response
where
    R: ResumeRepository + 'static,
    D: Directory + 'static,
    N: NotificationSink + 'static,
{
    respond(api.service.dwell_report())
}

pub(crate) async fn detail_handler<R, D, N>(
    State(api): State<Arc<ResumeApi<R, D, N>>>,
    Path(resume_id): Path<String>,
) -> Response
where
    R: ResumeRepository + 'static,
    D: Directory + 'static,
    N: NotificationSink + 'static,
{
    respond_record(api.service.get(&ResumeId(resume_id)))
}

pub(crate) async fn audit_handler<R, D, N>(
    State(api): State<Arc<ResumeApi<R, D, N>>>,
    Path(resume_id): Path<String>,
) -> Response
where
    R: ResumeRepository + 'static,
    D: Directory + 'static,
    N: NotificationSink + 'static,
{
    respond(api.service.audit_log(&ResumeId(resume_id)))
}

pub(crate) async fn actions_handler<R, D, N>(
    State(api): State<Arc<ResumeApi<R, D, N>>>,
    Path(resume_id): Path<String>,
) -> Response
where
    R: ResumeRepository + 'static,
    D: Directory + 'static,
    N: NotificationSink + 'static,
{
    respond(api.service.available_actions(&ResumeId(resume_id)))
}

pub(crate) async fn submit_l2_handler<R, D, N>(
    State(api): State<Arc<ResumeApi<R, D, N>>>,
    Path(resume_id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<DistributeL2Request>,
) -> Response
where
    R: ResumeRepository + 'static,
    D: Directory + 'static,
    N: NotificationSink + 'static,
{
    let operator = operator_or_reject!(headers);
    respond_record(api.service.submit_for_l2(
        &ResumeId(resume_id),
        &operator,
        &body.l2_department_id,
    ))
}

pub(crate) async fn route_l3_handler<R, D, N>(
    State(api): State<Arc<ResumeApi<R, D, N>>>,
    Path(resume_id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<DistributeL3Request>,
) -> Response
where
    R: ResumeRepository + 'static,
    D: Directory + 'static,
    N: NotificationSink + 'static,
{
    let operator = operator_or_reject!(headers);
    respond_record(api.service.route_to_l3(
        &ResumeId(resume_id),
        &operator,
        &body.l3_department_id,
    ))
}

pub(crate) async fn assign_expert_handler<R, D, N>(
    State(api): State<Arc<ResumeApi<R, D, N>>>,
    Path(resume_id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<AssignExpertRequest>,
) -> Response
where
    R: ResumeRepository + 'static,
    D: Directory + 'static,
    N: NotificationSink + 'static,
{
    let operator = operator_or_reject!(headers);
    respond_record(
        api.service
            .assign_expert(&ResumeId(resume_id), &operator, &body.expert_id),
    )
}

pub(crate) async fn identification_handler<R, D, N>(
    State(api): State<Arc<ResumeApi<R, D, N>>>,
    Path(resume_id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<IdentificationRequest>,
) -> Response
where
    R: ResumeRepository + 'static,
    D: Directory + 'static,
    N: NotificationSink + 'static,
{
    let operator = operator_or_reject!(headers);
    respond_record(api.service.record_identification(
        &ResumeId(resume_id),
        &operator,
        body.identified,
        body.comment,
    ))
}

pub(crate) async fn contact_info_handler<R, D, N>(
    State(api): State<Arc<ResumeApi<R, D, N>>>,
    Path(resume_id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<ContactInfoRequest>,
) -> Response
where
    R: ResumeRepository + 'static,
    D: Directory + 'static,
    N: NotificationSink + 'static,
{
    let operator = operator_or_reject!(headers);
    respond_record(api.service.fill_contact_info(
        &ResumeId(resume_id),
        &operator,
        body.email,
        body.phone,
    ))
}

pub(crate) async fn connection_handler<R, D, N>(
    State(api): State<Arc<ResumeApi<R, D, N>>>,
    Path(resume_id): Path<String>,
    headers: HeaderMap,
) -> Response
where
    R: ResumeRepository + 'static,
    D: Directory + 'static,
    N: NotificationSink + 'static,
{
    let operator = operator_or_reject!(headers);
    respond_record(api.service.start_connection(&ResumeId(resume_id), &operator))
}

pub(crate) async fn feedback_handler<R, D, N>(
    State(api): State<Arc<ResumeApi<R, D, N>>>,
    Path(resume_id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<FeedbackRequest>,
) -> Response
where
    R: ResumeRepository + 'static,
    D: Directory + 'static,
    N: NotificationSink + 'static,
{
    let operator = operator_or_reject!(headers);
    respond_record(api.service.submit_feedback(
        &ResumeId(resume_id),
        &operator,
        body.feedback,
        body.archive,
    ))
}

pub(crate) async fn release_handler<R, D, N>(
    State(api): State<Arc<ResumeApi<R, D, N>>>,
    Path(resume_id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<ReleaseRequest>,
) -> Response
where
    R: ResumeRepository + 'static,
    D: Directory + 'static,
    N: NotificationSink + 'static,
{
    let operator = operator_or_reject!(headers);
    respond_record(
        api.service
            .release(&ResumeId(resume_id), &operator, body.reason),
    )
}

pub(crate) async fn overdue_reason_handler<R, D, N>(
    State(api): State<Arc<ResumeApi<R, D, N>>>,
    Path(resume_id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<OverdueReasonRequest>,
) -> Response
where
    R: ResumeRepository + 'static,
    D: Directory + 'static,
    N: NotificationSink + 'static,
{
    let operator = operator_or_reject!(headers);
    respond_record(api.service.submit_overdue_reason(
        &ResumeId(resume_id),
        &operator,
        body.reason,
    ))
}

pub(crate) async fn worklist_handler<R, D, N>(
    State(api): State<Arc<ResumeApi<R, D, N>>>,
    headers: HeaderMap,
) -> Response
where
    R: ResumeRepository + 'static,
    D: Directory + 'static,
    N: NotificationSink + 'static,
{
    let operator = operator_or_reject!(headers);
    respond(api.service.worklist(&operator))
}

pub(crate) async fn inbox_handler<R, D, N>(
    State(api): State<Arc<ResumeApi<R, D, N>>>,
    headers: HeaderMap,
    Query(query): Query<InboxQuery>,
) -> Response
where
    R: ResumeRepository + 'static,
    D: Directory + 'static,
    N: NotificationSink + 'static,
{
    let recipient = operator_or_reject!(headers);
    let limit = query
        .limit
        .unwrap_or(DEFAULT_INBOX_LIMIT)
        .clamp(1, MAX_INBOX_LIMIT);
    respond(
        api.service
            .notifications(&recipient, query.unread_only, limit),
    )
}

pub(crate) async fn inbox_count_handler<R, D, N>(
    State(api): State<Arc<ResumeApi<R, D, N>>>,
    headers: HeaderMap,
) -> Response
where
    R: ResumeRepository + 'static,
    D: Directory + 'static,
    N: NotificationSink + 'static,
{
    let recipient = operator_or_reject!(headers);
    respond(api.service.notification_counts(&recipient))
}

pub(crate) async fn mark_read_handler<R, D, N>(
    State(api): State<Arc<ResumeApi<R, D, N>>>,
    Path(notification_id): Path<String>,
    headers: HeaderMap,
) -> Response
where
    R: ResumeRepository + 'static,
    D: Directory + 'static,
    N: NotificationSink + 'static,
{
    let recipient = operator_or_reject!(headers);
    match api
        .service
        .mark_read(&recipient, &NotificationId(notification_id))
    {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => workflow_error_response(error),
    }
}

pub(crate) async fn mark_all_read_handler<R, D, N>(
    State(api): State<Arc<ResumeApi<R, D, N>>>,
    headers: HeaderMap,
) -> Response
where
    R: ResumeRepository + 'static,
    D: Directory + 'static,
    N: NotificationSink + 'static,
{
    let recipient = operator_or_reject!(headers);
    respond(
        api.service
            .mark_all_read(&recipient)
            .map(|marked| json!({ "marked": marked })),
    )
}

pub(crate) async fn delete_notification_handler<R, D, N>(
    State(api): State<Arc<ResumeApi<R, D, N>>>,
    Path(notification_id): Path<String>,
    headers: HeaderMap,
) -> Response
where
    R: ResumeRepository + 'static,
    D: Directory + 'static,
    N: NotificationSink + 'static,
{
    let recipient = operator_or_reject!(headers);
    match api
        .service
        .delete_notification(&recipient, &NotificationId(notification_id))
    {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => workflow_error_response(error),
    }
}

pub(crate) async fn sweep_handler<R, D, N>(
    State(api): State<Arc<ResumeApi<R, D, N>>>,
    Query(query): Query<SweepQuery>,
) -> Response
where
    R: ResumeRepository + 'static,
    D: Directory + 'static,
    N: NotificationSink + 'static,
{
    let lookahead = match query.lookahead_hours {
        None => api.monitor.config().lookahead,
        Some(hours) => match Duration::try_hours(hours).filter(|_| hours > 0) {
            Some(lookahead) => lookahead,
            None => {
                return workflow_error_response(WorkflowError::ValidationFailed(format!(
                    "lookahead_hours must be a positive number of hours, got {hours}"
                )))
            }
        },
    };

    let monitor = Arc::clone(&api.monitor);
    let outcome = tokio::task::spawn_blocking(move || monitor.run_sla_sweep(lookahead)).await;
    match outcome {
        Ok(Ok(report)) => (StatusCode::OK, Json(report)).into_response(),
        Ok(Err(error)) => sweep_error_response(error),
        Err(error) => {
            let payload = json!({
                "error": error.to_string(),
                "kind": "internal",
            });
            (StatusCode::INTERNAL_SERVER_ERROR, Json(payload)).into_response()
        }
    }
}
