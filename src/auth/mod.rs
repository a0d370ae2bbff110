//! Shared-secret admin gate.
//!
//! Two fixed secrets map to two privilege tiers. This is a placeholder gate:
//! no credentials are issued, and any real deployment needs proper auth in
//! front of the admin routes. Comparison is constant-time to mitigate timing
//! attacks.

use axum::{
    extract::Request,
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use subtle::ConstantTimeEq;

use crate::errors::{codes, ErrorDetails, ErrorResponse};

/// Header name carrying the admin secret.
pub const ADMIN_KEY_HEADER: &str = "x-admin-key";

/// Privilege tier granted by a secret.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum AdminTier {
    Admin,
    /// Also allowed to flush every department.
    SuperAdmin,
}

impl AdminTier {
    pub fn can_flush(self) -> bool {
        matches!(self, AdminTier::SuperAdmin)
    }
}

/// The two configured secrets.
#[derive(Debug, Clone)]
pub struct AdminGate {
    admin_password: String,
    super_admin_password: String,
}

impl AdminGate {
    pub fn new(admin_password: impl Into<String>, super_admin_password: impl Into<String>) -> Self {
        Self {
            admin_password: admin_password.into(),
            super_admin_password: super_admin_password.into(),
        }
    }

    /// Tier granted by `candidate`, if any.
    pub fn check(&self, candidate: &str) -> Option<AdminTier> {
        // Evaluate both comparisons so timing does not reveal which tier matched.
        let is_super = constant_time_compare(candidate, &self.super_admin_password);
        let is_admin = constant_time_compare(candidate, &self.admin_password);
        if is_super {
            Some(AdminTier::SuperAdmin)
        } else if is_admin {
            Some(AdminTier::Admin)
        } else {
            None
        }
    }
}

/// Admin authentication layer. On success the granted [`AdminTier`] is added
/// to the request extensions for handlers to inspect.
pub async fn admin_auth_layer(gate: AdminGate, mut request: Request, next: Next) -> Response {
    let provided = request
        .headers()
        .get(ADMIN_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .or_else(|| {
            request
                .headers()
                .get(header::AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.strip_prefix("Bearer "))
        })
        .map(|s| s.to_string());

    let Some(provided) = provided else {
        return unauthorized_response("Missing admin key");
    };

    match gate.check(&provided) {
        Some(tier) => {
            request.extensions_mut().insert(tier);
            next.run(request).await
        }
        None => {
            tracing::warn!("Rejected admin request with invalid credentials");
            unauthorized_response("ACCESS DENIED: INVALID CREDENTIALS")
        }
    }
}

/// Perform constant-time string comparison.
fn constant_time_compare(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

/// Create an unauthorized response.
fn unauthorized_response(message: &str) -> Response {
    let body = ErrorResponse {
        success: false,
        error: ErrorDetails {
            code: codes::UNAUTHORIZED.to_string(),
            message: message.to_string(),
            details: None,
        },
        revision_id: 0,
    };

    (StatusCode::UNAUTHORIZED, Json(body)).into_response()
}
