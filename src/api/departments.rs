//! Public department endpoints.

use axum::extract::{Path, Query, State};
use serde::Serialize;

use super::{error, success, ApiResult};
use crate::errors::AppError;
use crate::models::{canonical_code, ActiveDepartment, DepartmentMapping, DepartmentRecord};
use crate::resolver::resolve_active;
use crate::AppState;

/// Query value of `secret` that reveals the admin login prompt.
pub const ADMIN_SECRET_PARAM: &str = "admin";

/// Landing page query parameters.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct InvitationQuery {
    /// Department code, case-insensitive.
    pub dept: Option<String>,
    pub secret: Option<String>,
}

impl InvitationQuery {
    /// Pick parameters out of raw query pairs. A repeated key keeps its
    /// first value; unknown keys are ignored.
    pub fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        let mut query = Self::default();
        for (key, value) in pairs {
            match key.as_str() {
                "dept" if query.dept.is_none() => query.dept = Some(value),
                "secret" if query.secret.is_none() => query.secret = Some(value),
                _ => {}
            }
        }
        query
    }

    pub fn show_admin_login(&self) -> bool {
        self.secret.as_deref() == Some(ADMIN_SECRET_PARAM)
    }
}

/// Active department plus page-level flags.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvitationView {
    #[serde(flatten)]
    pub active: ActiveDepartment,
    pub show_admin_login: bool,
}

/// GET /api/invitation - Resolve the active department for `?dept=`.
pub async fn get_invitation(
    State(state): State<AppState>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> ApiResult<InvitationView> {
    let query = InvitationQuery::from_pairs(pairs);
    let (mapping, revision_id) = state.departments.snapshot().await;
    let active = resolve_active(&mapping, query.dept.as_deref());

    success(
        InvitationView {
            active,
            show_admin_login: query.show_admin_login(),
        },
        revision_id,
    )
}

/// GET /api/departments - The resolved department mapping.
pub async fn list_departments(State(state): State<AppState>) -> ApiResult<DepartmentMapping> {
    let (mapping, revision_id) = state.departments.snapshot().await;
    success(mapping, revision_id)
}

/// GET /api/departments/{code} - One resolved department, without PUBLIC fallback.
pub async fn get_department(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> ApiResult<DepartmentRecord> {
    let revision_id = state.departments.revision().await;
    let code = canonical_code(&code);

    match state.departments.get(&code).await {
        Some(record) => success(record, revision_id),
        None => error(
            AppError::NotFound(format!("Department {} not found", code)),
            revision_id,
        ),
    }
}
