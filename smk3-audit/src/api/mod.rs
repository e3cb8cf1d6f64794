//! HTTP API handlers for smk3-audit

pub mod admin;
pub mod audit;
pub mod auth;
pub mod clauses;
pub mod criteria;
pub mod documents;
pub mod exports;
pub mod extract;
pub mod health;
pub mod recommendations;
pub mod reports;
pub mod users;

pub use admin::admin_routes;
pub use audit::audit_routes;
pub use auth::{auth_middleware, require_role, CurrentUser};
pub use clauses::clause_routes;
pub use criteria::criteria_routes;
pub use documents::document_routes;
pub use exports::export_routes;
pub use health::health_routes;
pub use recommendations::recommendation_routes;
pub use reports::report_routes;
pub use users::{public_auth_routes, user_routes};

use axum::{
    http::header,
    response::{IntoResponse, Response},
};
use std::io;
use uuid::Uuid;

use crate::models::{Clause, Criterion};
use crate::services::blob_store::BlobStore;
use crate::{db, ApiError, ApiResult};

/// How a served file should be presented by the browser
#[derive(Debug, Clone, Copy)]
pub enum Disposition {
    Attachment,
    Inline,
}

/// Header-safe stand-in for a user-supplied filename
fn header_filename(filename: &str) -> String {
    filename
        .chars()
        .map(|c| {
            if (c.is_ascii_graphic() && c != '"' && c != '\\') || c == ' ' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

pub(crate) fn file_response(
    data: Vec<u8>,
    content_type: &str,
    disposition: Disposition,
    filename: &str,
) -> Response {
    let kind = match disposition {
        Disposition::Attachment => "attachment",
        Disposition::Inline => "inline",
    };
    (
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("{}; filename=\"{}\"", kind, header_filename(filename)),
            ),
        ],
        data,
    )
        .into_response()
}

/// Blob failures surface as 404 when the file is gone, else as upstream errors
pub(crate) fn blob_error(blob_ref: &str, err: io::Error) -> ApiError {
    if err.kind() == io::ErrorKind::NotFound {
        ApiError::NotFound(format!("Stored file {} is missing", blob_ref))
    } else {
        ApiError::Upstream(format!("Evidence store error: {}", err))
    }
}

/// Best-effort removal of blobs whose rows are already gone
pub(crate) async fn remove_blobs(blobs: &BlobStore, blob_refs: Vec<String>) -> usize {
    let mut removed = 0;
    for blob_ref in blob_refs {
        match blobs.delete(&blob_ref).await {
            Ok(()) => removed += 1,
            Err(e) => tracing::warn!("Failed to delete blob {}: {}", blob_ref, e),
        }
    }
    removed
}

pub(crate) async fn load_clause(pool: &sqlx::SqlitePool, id: Uuid) -> ApiResult<Clause> {
    db::clauses::get_clause(pool, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Clause {} not found", id)))
}

pub(crate) async fn load_criterion(pool: &sqlx::SqlitePool, id: Uuid) -> ApiResult<Criterion> {
    db::criteria::get_criterion(pool, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Criterion {} not found", id)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_filename() {
        assert_eq!(header_filename("Laporan K3.pdf"), "Laporan K3.pdf");
        assert_eq!(header_filename("foto \"lokasi\".jpg"), "foto _lokasi_.jpg");
        assert_eq!(header_filename("péta.png"), "p_ta.png");
    }

    #[test]
    fn test_file_response_headers() {
        let response = file_response(b"abc".to_vec(), "application/pdf", Disposition::Inline, "a.pdf");
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/pdf");
        assert_eq!(response.headers()[header::CONTENT_DISPOSITION], "inline; filename=\"a.pdf\"");
    }
}
