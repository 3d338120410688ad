//! Bulk import of mapping files.

use crate::error::ChaosError;
use crate::mapping::{Mapping, MappingId};
use crate::store::MappingStore;
use std::path::{Path, PathBuf};
use tracing::{error, info};

/// Create a mapping from every `*.json` file in `dir` (non-recursive).
///
/// Files are imported in path order. A file that cannot be read, parsed or
/// created is logged and skipped. An inaccessible directory is an error,
/// distinct from `Ok` with an empty list for a directory without JSON files.
pub async fn populate_from_dir<S: MappingStore + ?Sized>(
    store: &S,
    dir: &Path,
) -> Result<Vec<MappingId>, ChaosError> {
    let files = json_files(dir).await?;

    let mut ids = Vec::new();
    for file in files {
        info!("Importing {}", file.display());
        let mapping = match read_mapping(&file).await {
            Ok(mapping) => mapping,
            Err(e) => {
                error!("[populate_from_dir]: Skipping {}: {}", file.display(), e);
                continue;
            }
        };
        match store.create_mapping(&mapping).await {
            Ok(id) => ids.push(id),
            Err(e) => error!(
                "[populate_from_dir]: Error creating mapping from {}: {}",
                file.display(),
                e
            ),
        }
    }
    Ok(ids)
}

async fn json_files(dir: &Path) -> Result<Vec<PathBuf>, ChaosError> {
    let mut entries = tokio::fs::read_dir(dir).await.map_err(|e| {
        error!("[populate_from_dir]: directory {} is not readable", dir.display());
        ChaosError::io(dir, e)
    })?;

    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(|e| ChaosError::io(dir, e))? {
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == "json") && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

async fn read_mapping(file: &Path) -> Result<Mapping, ChaosError> {
    let contents = tokio::fs::read_to_string(file)
        .await
        .map_err(|e| ChaosError::io(file, e))?;
    let mapping: Mapping = serde_json::from_str(&contents)?;
    Ok(mapping)
}
