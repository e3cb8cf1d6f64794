//! ZIP bundles of evidence files
//!
//! Layout for bulk exports:
//! `<order:02>_Kriteria_<name>/Klausul_<number>_<title>/<filename>`

use super::blob_store::BlobStore;
use crate::models::{Clause, Criterion, EvidenceDocument};
use std::collections::HashSet;
use std::io::{Cursor, Write};
use tracing::warn;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Longest clause title kept in a folder name
pub const MAX_TITLE_CHARS: usize = 50;

/// One file to place in the archive
#[derive(Debug, Clone)]
pub struct ArchiveEntry {
    pub path: String,
    pub data: Vec<u8>,
}

/// Folder and file names may not introduce extra path levels
pub fn sanitize(name: &str) -> String {
    name.replace(['/', '\\'], "-")
}

pub fn criterion_folder(criterion: &Criterion) -> String {
    format!("{:02}_Kriteria_{}", criterion.order, sanitize(&criterion.name))
}

pub fn clause_folder(clause: &Clause) -> String {
    let title: String = clause.title.chars().take(MAX_TITLE_CHARS).collect();
    format!("Klausul_{}_{}", sanitize(&clause.clause_number), sanitize(&title))
}

/// Download name for a single clause bundle
pub fn clause_archive_name(clause: &Clause) -> String {
    format!("Klausul_{}_Documents.zip", sanitize(&clause.clause_number))
}

/// Make `path` unique among `taken` by numbering the file stem
fn unique_path(path: String, taken: &mut HashSet<String>) -> String {
    if taken.insert(path.clone()) {
        return path;
    }

    let (dir, file) = match path.rsplit_once('/') {
        Some((dir, file)) => (format!("{}/", dir), file.to_string()),
        None => (String::new(), path.clone()),
    };
    let (stem, ext) = match file.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem.to_string(), format!(".{}", ext)),
        _ => (file.clone(), String::new()),
    };

    let mut n = 2;
    loop {
        let candidate = format!("{}{} ({}){}", dir, stem, n, ext);
        if taken.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}

/// Read each document's blob into an entry under `folder`
///
/// Unreadable blobs are logged and left out.
pub async fn gather_entries(
    store: &BlobStore,
    items: Vec<(String, EvidenceDocument)>,
) -> Vec<ArchiveEntry> {
    let mut entries = Vec::with_capacity(items.len());
    let mut taken = HashSet::new();

    for (folder, doc) in items {
        match store.get(&doc.blob_ref).await {
            Ok(data) => {
                let file = sanitize(&doc.filename);
                let path = if folder.is_empty() {
                    file
                } else {
                    format!("{}/{}", folder, file)
                };
                entries.push(ArchiveEntry {
                    path: unique_path(path, &mut taken),
                    data,
                });
            }
            Err(e) => {
                warn!(document_id = %doc.id, "Skipping {} in archive: {}", doc.filename, e);
            }
        }
    }

    entries
}

/// Write entries into an in-memory deflate ZIP
pub fn build_zip(entries: &[ArchiveEntry]) -> zip::result::ZipResult<Vec<u8>> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for entry in entries {
        writer.start_file(entry.path.as_str(), options)?;
        writer.write_all(&entry.data)?;
    }

    Ok(writer.finish()?.into_inner())
}
