//! Admin API endpoints.

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde::{Deserialize, Serialize};

use super::{error, success, ApiResult};
use crate::admin::{ConnectionReport, FlushReport, RemoveOutcome, UpsertOutcome};
use crate::auth::AdminTier;
use crate::errors::{AppError, AppErrorWithRevision};
use crate::models::{canonical_code, DepartmentMapping, UpsertDepartmentRequest};
use crate::qr::{self, QrFormat};
use crate::resolver::ResolutionSource;
use crate::AppState;

/// Header carrying the link encoded by a QR response.
pub const INVITATION_URL_HEADER: &str = "x-invitation-url";

/// Request body for the admin login check.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub password: String,
}

/// Granted tier and the freshly resolved mapping for the editor.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub tier: AdminTier,
    pub can_flush: bool,
    pub departments: DepartmentMapping,
}

/// Result of an explicit resolution pass.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReloadResponse {
    pub source: ResolutionSource,
    pub departments: DepartmentMapping,
}

/// POST /api/admin/login - Check a secret and load departments for editing.
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> ApiResult<LoginResponse> {
    let Some(tier) = state.gate.check(&request.password) else {
        let revision_id = state.departments.revision().await;
        tracing::warn!("Admin login rejected");
        return error(
            AppError::Unauthorized("ACCESS DENIED: INVALID CREDENTIALS".to_string()),
            revision_id,
        );
    };

    tracing::info!(?tier, "Admin login");
    let resolution = state.admin.reload().await;
    let revision_id = state.departments.revision().await;

    success(
        LoginResponse {
            tier,
            can_flush: tier.can_flush(),
            departments: resolution.mapping,
        },
        revision_id,
    )
}

/// PUT /api/admin/departments - Create or replace a department.
pub async fn upsert_department(
    State(state): State<AppState>,
    Json(request): Json<UpsertDepartmentRequest>,
) -> ApiResult<UpsertOutcome> {
    let revision_id = state.departments.revision().await;

    match state.admin.upsert(request).await {
        Ok(outcome) => success(outcome, state.departments.revision().await),
        Err(e) => error(e, revision_id),
    }
}

/// DELETE /api/admin/departments/{code} - Remove a department.
pub async fn delete_department(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> ApiResult<RemoveOutcome> {
    let revision_id = state.departments.revision().await;

    match state.admin.remove(&code).await {
        Ok(outcome) => success(outcome, state.departments.revision().await),
        Err(e) => error(e, revision_id),
    }
}

/// POST /api/admin/flush - Delete every department. Super admin only.
pub async fn flush_departments(
    State(state): State<AppState>,
    Extension(tier): Extension<AdminTier>,
) -> ApiResult<FlushReport> {
    let revision_id = state.departments.revision().await;

    if !tier.can_flush() {
        return error(
            AppError::Forbidden("Flush requires the super admin tier".to_string()),
            revision_id,
        );
    }

    let report = state.admin.flush_all().await;
    success(report, state.departments.revision().await)
}

/// POST /api/admin/reload - Run a resolution pass.
pub async fn reload_departments(State(state): State<AppState>) -> ApiResult<ReloadResponse> {
    let resolution = state.admin.reload().await;

    success(
        ReloadResponse {
            source: resolution.source,
            departments: resolution.mapping,
        },
        state.departments.revision().await,
    )
}

/// POST /api/admin/test-connection - Probe the remote store.
pub async fn test_connection(State(state): State<AppState>) -> ApiResult<ConnectionReport> {
    let report = state.admin.test_connection().await;
    success(report, state.departments.revision().await)
}

/// Query parameters for the QR download.
#[derive(Debug, Default, Deserialize)]
pub struct QrQuery {
    /// `png` (default) or `svg`.
    #[serde(default)]
    pub format: Option<String>,
}

/// GET /api/admin/departments/{code}/qr - Downloadable QR code for the invitation link.
pub async fn department_qr(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Query(query): Query<QrQuery>,
) -> Result<Response, AppErrorWithRevision> {
    let revision_id = state.departments.revision().await;
    let with_revision = |error: AppError| AppErrorWithRevision { error, revision_id };

    let code = canonical_code(&code);
    if code.is_empty() {
        return Err(with_revision(AppError::Validation(
            "Department code is required".to_string(),
        )));
    }

    let format = match query.format.as_deref() {
        None => QrFormat::default(),
        Some(raw) => QrFormat::parse(raw).ok_or_else(|| {
            with_revision(AppError::Validation(format!(
                "Unsupported QR format {raw:?}, expected png or svg"
            )))
        })?,
    };

    let url = qr::invitation_url(&state.config.public_origin, &state.config.public_path, &code)
        .map_err(with_revision)?;
    let body = qr::render(&url, format).map_err(with_revision)?;
    tracing::info!(code = %code, url = %url, ?format, "Generated invitation QR code");

    let disposition = format!(
        "attachment; filename=\"{}\"",
        qr::qr_filename(&code, format)
    );
    let mut response = (StatusCode::OK, body).into_response();
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(format.content_type()),
    );
    if let Ok(value) = HeaderValue::from_str(&disposition) {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }
    if let Ok(value) = HeaderValue::from_str(&url) {
        headers.insert(INVITATION_URL_HEADER, value);
    }
    Ok(response)
}
