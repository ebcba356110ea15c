use std::path::PathBuf;

use chrono::Utc;

use crate::{
    core::{
        errors::{AppError, AppResult},
        types::{ExtractedNetworkData, ImportReport},
    },
    extractor::{self, file_type::DocumentKind},
    importer::{self, DiagramFolder, ImportOptions},
    storage::Bucket,
    AppState,
};

fn existing_path(file_path: &str) -> AppResult<PathBuf> {
    let path = PathBuf::from(file_path);
    if !path.exists() {
        return Err(AppError::NotFound(format!("file {file_path}")));
    }
    Ok(path)
}

/// Parses the upload and returns the preview shown before import.
pub async fn extract_document(file_path: &str, mime_type: &str) -> AppResult<ExtractedNetworkData> {
    let path = existing_path(file_path)?;
    extractor::extract_file(&path, mime_type)
}

/// Extracts, keeps a copy of the upload in the documents bucket, then imports.
pub async fn import_document(
    state: &AppState,
    file_path: &str,
    mime_type: &str,
    folder: DiagramFolder,
) -> AppResult<ImportReport> {
    let path = existing_path(file_path)?;
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .to_string();
    DocumentKind::detect(mime_type, &file_name)?;
    let bytes = std::fs::read(&path).map_err(|err| AppError::Io(err.to_string()))?;
    let data = extractor::extract_bytes(&file_name, mime_type, &bytes)?;

    let key = format!("{}-{}", Utc::now().timestamp_millis(), file_name.replace(' ', "_"));
    if let Err(err) = state.store.upload(Bucket::Documents, &key, &bytes) {
        tracing::warn!(file = %file_name, error = %err, "could not archive original upload");
    }

    let options = ImportOptions {
        folder,
        ..ImportOptions::everything(Some(file_name))
    };
    importer::import_network_data(&state.db, &state.store, &data, &options).await
}
