//! Evidence upload, download and deletion

use axum::{
    extract::{multipart::MultipartRejection, DefaultBodyLimit, Multipart, State},
    response::Response,
    routing::{delete, get, post},
    Extension, Json, Router,
};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use super::extract::ApiPath;
use super::{blob_error, file_response, load_clause, CurrentUser, Disposition};
use crate::models::EvidenceDocument;
use crate::services::archive;
use crate::{db, ApiError, ApiResult, AppState};

/// Largest accepted upload
pub const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

const DEFAULT_MIME: &str = "application/octet-stream";

#[derive(Debug, Serialize)]
pub struct DeleteDocumentResponse {
    pub message: String,
    pub remaining_documents: i64,
    pub audit_result_deleted: bool,
}

async fn load_document(state: &AppState, id: Uuid) -> ApiResult<EvidenceDocument> {
    db::documents::get_document(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Document {} not found", id)))
}

/// POST /api/clauses/:id/upload (multipart field `file`)
pub async fn upload_document(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    ApiPath(clause_id): ApiPath<Uuid>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Json<EvidenceDocument>> {
    let mut multipart = multipart?;
    load_clause(&state.db, clause_id).await?;

    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Invalid multipart body: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field
            .file_name()
            .map(str::to_string)
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| "document".to_string());
        let mime_type = field.content_type().unwrap_or(DEFAULT_MIME).to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(format!("Failed to read upload: {}", e)))?;
        upload = Some((filename, mime_type, data));
        break;
    }

    let (filename, mime_type, data) =
        upload.ok_or_else(|| ApiError::BadRequest("Missing multipart field 'file'".to_string()))?;
    if data.is_empty() {
        return Err(ApiError::BadRequest("Uploaded file is empty".to_string()));
    }

    let blob_ref = state
        .blobs
        .put(&data)
        .await
        .map_err(|e| ApiError::Upstream(format!("Failed to store evidence: {}", e)))?;

    let doc = EvidenceDocument {
        id: Uuid::new_v4(),
        clause_id,
        filename,
        blob_ref,
        mime_type,
        size: data.len() as i64,
        uploaded_by: user.0.id,
        uploaded_at: smk3_common::time::now(),
    };

    if let Err(e) = db::documents::insert_document(&state.db, &doc).await {
        if let Err(cleanup) = state.blobs.delete(&doc.blob_ref).await {
            warn!("Failed to remove orphaned blob {}: {}", doc.blob_ref, cleanup);
        }
        return Err(e.into());
    }

    info!(clause_id = %clause_id, document_id = %doc.id, size = doc.size, "Uploaded {}", doc.filename);
    Ok(Json(doc))
}

/// GET /api/clauses/:id/documents
pub async fn list_documents(
    State(state): State<AppState>,
    ApiPath(clause_id): ApiPath<Uuid>,
) -> ApiResult<Json<Vec<EvidenceDocument>>> {
    load_clause(&state.db, clause_id).await?;
    Ok(Json(db::documents::list_documents_for_clause(&state.db, clause_id).await?))
}

async fn serve_document(state: &AppState, id: Uuid, disposition: Disposition) -> ApiResult<Response> {
    let doc = load_document(state, id).await?;
    let data = state
        .blobs
        .get(&doc.blob_ref)
        .await
        .map_err(|e| blob_error(&doc.blob_ref, e))?;
    Ok(file_response(data, &doc.mime_type, disposition, &doc.filename))
}

/// GET /api/documents/:id/download
pub async fn download_document(State(state): State<AppState>, ApiPath(id): ApiPath<Uuid>) -> ApiResult<Response> {
    serve_document(&state, id, Disposition::Attachment).await
}

/// GET /api/documents/:id/preview
pub async fn preview_document(State(state): State<AppState>, ApiPath(id): ApiPath<Uuid>) -> ApiResult<Response> {
    serve_document(&state, id, Disposition::Inline).await
}

/// DELETE /api/documents/:id
///
/// Removing a clause's last document also removes its audit result.
pub async fn delete_document(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<DeleteDocumentResponse>> {
    let doc = load_document(&state, id).await?;

    db::documents::delete_document(&state.db, id).await?;
    if let Err(e) = state.blobs.delete(&doc.blob_ref).await {
        warn!(document_id = %id, "Failed to delete blob {}: {}", doc.blob_ref, e);
    }

    let remaining = db::documents::count_documents_for_clause(&state.db, doc.clause_id).await?;
    let audit_result_deleted = if remaining == 0 {
        db::results::delete_result_for_clause(&state.db, doc.clause_id).await?
    } else {
        false
    };

    info!(
        clause_id = %doc.clause_id,
        document_id = %id,
        remaining,
        audit_result_deleted,
        "Deleted {}",
        doc.filename
    );

    Ok(Json(DeleteDocumentResponse {
        message: "Document deleted".to_string(),
        remaining_documents: remaining,
        audit_result_deleted,
    }))
}

/// GET /api/clauses/:id/documents/download-all
pub async fn download_clause_documents(
    State(state): State<AppState>,
    ApiPath(clause_id): ApiPath<Uuid>,
) -> ApiResult<Response> {
    let clause = load_clause(&state.db, clause_id).await?;
    let documents = db::documents::list_documents_for_clause(&state.db, clause_id).await?;

    let entries = archive::gather_entries(
        &state.blobs,
        documents.into_iter().map(|d| (String::new(), d)).collect(),
    )
    .await;
    if entries.is_empty() {
        return Err(ApiError::NotFound(format!(
            "No evidence available for clause {}",
            clause.clause_number
        )));
    }

    let zip = archive::build_zip(&entries)
        .map_err(|e| ApiError::Internal(format!("Failed to build archive: {}", e)))?;
    Ok(file_response(
        zip,
        "application/zip",
        Disposition::Attachment,
        &archive::clause_archive_name(&clause),
    ))
}

pub fn document_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/clauses/:id/upload",
            post(upload_document).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route("/api/clauses/:id/documents", get(list_documents))
        .route("/api/clauses/:id/documents/download-all", get(download_clause_documents))
        .route("/api/documents/:id", delete(delete_document))
        .route("/api/documents/:id/download", get(download_document))
        .route("/api/documents/:id/preview", get(preview_document))
}
